use async_trait::async_trait;
use chrono::{DateTime, Utc};
use echelon_domain::{MarketId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A market as reported by an external platform's search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueMarket {
    pub venue_market_id: SmolStr,
    pub question: String,
    pub outcomes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub venue_market_id: SmolStr,
    pub outcome_idx: usize,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// The echelon-internal market this order is hedging or sourcing liquidity for; stamped onto
    /// the resulting `BuilderAttributionRecord` so attribution ledgers tie back to our own markets.
    pub market_id: MarketId,
    pub venue_market_id: SmolStr,
    pub outcome_idx: usize,
    pub side: Side,
    pub quote_amount: Decimal,
    pub builder_code: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub venue_order_id: SmolStr,
    pub filled_shares: Decimal,
    pub realized_price: Decimal,
    pub fee_bps: Decimal,
    pub ack_ts: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenuePosition {
    pub venue_market_id: SmolStr,
    pub outcome_idx: usize,
    pub shares: Decimal,
}

/// A venue-reported streaming event, keyed by the market it concerns (spec.md §4.5:
/// "subscriber callbacks keyed by symbol").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueStreamEvent {
    pub venue_market_id: SmolStr,
    pub order_book: OrderBook,
}

/// Shared surface every external platform sub-client implements (spec.md §4.5), grounded in
/// `jackbot-execution`'s per-venue `ExecutionClient` trait shape: one associated config, uniform
/// async methods, a trade/account stream.
#[async_trait]
pub trait VenueClient: Send + Sync {
    fn venue_tag(&self) -> &str;

    async fn search_markets(&self, query: &str) -> Result<Vec<VenueMarket>, VenueError>;
    async fn get_order_book(&self, venue_market_id: &str, outcome_idx: usize) -> Result<OrderBook, VenueError>;
    async fn create_order(&self, request: OrderRequest) -> Result<OrderAck, VenueError>;
    async fn cancel_order(&self, venue_order_id: &str) -> Result<(), VenueError>;
    async fn get_positions(&self) -> Result<Vec<VenuePosition>, VenueError>;
}

/// Errors a [`VenueClient`] call can fail with. `classify` decides retry eligibility
/// (spec.md §4.5: retry on 503/504/transport/429, surface everything else immediately).
#[derive(Debug, Clone, thiserror::Error)]
pub enum VenueError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
}

impl VenueError {
    pub fn is_retryable(&self) -> bool {
        match self {
            VenueError::Transport(_) | VenueError::RateLimited => true,
            VenueError::Http { status, .. } => matches!(status, 503 | 504 | 429),
        }
    }
}
