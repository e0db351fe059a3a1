#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Low-level framework shared by every Echelon crate: the [`Clock`]/[`RandomSource`]
//! primitives, the [`channel`] fan-out building blocks used by the Event Bus, the
//! [`rate_limit::RateLimiter`] token bucket shared by the Platform Adapter and Agent Scheduler,
//! and a minimal HTTP/REST scaffolding for venue clients.

pub mod channel;
pub mod clock;
pub mod collection;
pub mod error;
pub mod metric;
pub mod protocol;
pub mod rate_limit;
pub mod snapshot;

pub use clock::{Clock, RandomSource, RandomnessBundle, SystemClock, TestClock, VrfProvenance};
pub use error::{SocketError, Unrecoverable};
