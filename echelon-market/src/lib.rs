#![warn(unused_crate_dependencies)]

//! Serialized, transactional CPMM mutation of market state - the Market State Engine of the
//! event orchestration core. Binary markets only; see [`cpmm::apply_trade`] for the pricing rule.

pub mod cpmm;
pub mod engine;
pub mod idempotency;

pub use engine::{ExecuteResult, MarketEngine, Quote, Refund, SettlementMode, DEFAULT_IDEMPOTENCY_TTL_S};
pub use idempotency::ExecuteReceipt;
