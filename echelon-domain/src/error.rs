use crate::ids::{IdempotencyKey, MarketId, TimelineId, TradeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Observable-effect class an [`EchelonError`] belongs to (spec.md §7). The Orchestrator's
/// propagation policy matches on this once, rather than duplicating retry/surface logic per
/// variant - grounded in `jackbot::risk::check::RiskCheck`'s pattern of a small typed error
/// carrying exactly the context a caller needs to decide what to do next.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorClass {
    Validation,
    Capacity,
    TransientIo,
    Integrity,
    Lifecycle,
}

/// Structured context attached to every [`EchelonError`], so a lower layer can surface the raw
/// kind while the Orchestrator still knows which market/timeline/feed was involved without
/// re-parsing a string.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub market_id: Option<MarketId>,
    pub timeline_id: Option<TimelineId>,
    pub feed_tag: Option<SmolStr>,
}

impl ErrorContext {
    pub fn market(market_id: MarketId) -> Self {
        Self {
            market_id: Some(market_id),
            ..Default::default()
        }
    }

    pub fn timeline(timeline_id: TimelineId) -> Self {
        Self {
            timeline_id: Some(timeline_id),
            ..Default::default()
        }
    }

    pub fn feed(feed_tag: impl Into<SmolStr>) -> Self {
        Self {
            feed_tag: Some(feed_tag.into()),
            ..Default::default()
        }
    }
}

/// Full error taxonomy of the Event Orchestration Core (spec.md §7). Every public operation on
/// every component returns `Result<_, EchelonError>`.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum EchelonError {
    #[error("invalid argument: {reason} ({context:?})")]
    InvalidArg { reason: String, context: ErrorContext },

    #[error("market closed ({context:?})")]
    MarketClosed { context: ErrorContext },

    #[error("invalid state transition: {reason} ({context:?})")]
    InvalidTransition { reason: String, context: ErrorContext },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("busy ({context:?})")]
    Busy { context: ErrorContext },

    #[error("storage fault: {reason}")]
    StorageFault { reason: String },

    #[error("network error: {reason}")]
    NetworkError { reason: String },

    #[error("idempotent replay of trade {trade_id}")]
    IdempotentReplay { trade_id: TradeId, key: IdempotencyKey },

    #[error("slippage exceeded: expected {expected}, realized {realized}")]
    SlippageExceeded { expected: Decimal, realized: Decimal },

    #[error("conservation violated on market {market_id}: {reason}")]
    ConservationViolated { market_id: MarketId, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("shutting down")]
    Shutdown,

    #[error("not found: {reason} ({context:?})")]
    NotFound { reason: String, context: ErrorContext },

    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
}

impl EchelonError {
    pub fn class(&self) -> ErrorClass {
        use EchelonError::*;
        match self {
            InvalidArg { .. } | MarketClosed { .. } | InvalidTransition { .. } => ErrorClass::Validation,
            RateLimited { .. } | Busy { .. } => ErrorClass::Capacity,
            StorageFault { .. } | NetworkError { .. } => ErrorClass::TransientIo,
            IdempotentReplay { .. } | SlippageExceeded { .. } | ConservationViolated { .. } => {
                ErrorClass::Integrity
            }
            Cancelled | Shutdown => ErrorClass::Lifecycle,
            NotFound { .. } | InsufficientFunds { .. } => ErrorClass::Validation,
        }
    }

    /// `CONSERVATION_VIOLATED` is the only variant the emergency-halt channel reacts to
    /// (spec.md §7).
    pub fn is_fatal(&self) -> bool {
        matches!(self, EchelonError::ConservationViolated { .. })
    }
}

pub type EchelonResult<T> = Result<T, EchelonError>;
