#![warn(unused_crate_dependencies)]

//! Core data model shared by every Echelon crate: markets, positions, timelines, agents,
//! signals, and the error taxonomy they all return. Pure data and invariant-checking methods -
//! no I/O, no locking, no async. The engines that mutate these types (`echelon-market`,
//! `echelon-timeline`, `echelon-agents`, `echelon-signals`) live elsewhere.

pub mod agent;
pub mod attribution;
pub mod error;
pub mod feed;
pub mod ids;
pub mod market;
pub mod mode;
pub mod position;
pub mod signal;
pub mod timeline;

pub use agent::{Agent, Archetype};
pub use attribution::BuilderAttributionRecord;
pub use error::{EchelonError, EchelonResult, ErrorClass, ErrorContext};
pub use feed::FeedStatus;
pub use ids::{AgentId, IdempotencyKey, MarketId, OwnerRef, SignalId, TimelineId, TradeId};
pub use market::{Market, MarketStatus, Side};
pub use mode::{ModeState, ModeTier, Restrictions};
pub use position::Position;
pub use signal::{Signal, SourceTier};
pub use timeline::{CapitalMode, Timeline, TimelineStatus, Visibility};
