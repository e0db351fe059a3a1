#![warn(unused_crate_dependencies)]

//! Idempotent ingestion, bounded retention, and keyed lookup of OSINT signals - the Signal Store
//! of the event orchestration core.

pub mod feed_registry;
pub mod ingest_source;
pub mod store;

pub use feed_registry::FeedRegistry;
pub use ingest_source::{IngestSource, StaticFeed};
pub use store::{IngestOutcome, SignalStore};
