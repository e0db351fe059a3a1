use crate::attribution::BuilderAttributionSink;
use crate::retry::retry_with_backoff;
use crate::venue::{
    OrderAck, OrderBook, OrderRequest, VenueClient, VenueError, VenueMarket, VenuePosition,
};
use async_trait::async_trait;
use echelon_domain::BuilderAttributionRecord;
use echelon_integration::rate_limit::{Priority, RateLimiter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default allowance: 100 requests / 60s (spec.md §4.5).
pub fn default_polymarket_limiter() -> RateLimiter {
    RateLimiter::new(100, Duration::from_secs(60))
}

/// Default allowance: 10 requests / 1s (spec.md §4.5).
pub fn default_kalshi_limiter() -> RateLimiter {
    RateLimiter::new(10, Duration::from_secs(1))
}

static NEXT_TRADE_ID: AtomicU64 = AtomicU64::new(1);

fn attribution_record(venue: &str, request: &OrderRequest, ack: &OrderAck) -> BuilderAttributionRecord {
    BuilderAttributionRecord {
        trade_id: echelon_domain::TradeId(NEXT_TRADE_ID.fetch_add(1, Ordering::Relaxed)),
        market_id: request.market_id,
        venue: venue.into(),
        builder_code: request.builder_code.clone(),
        notional: ack.filled_shares,
        fee_bps: ack.fee_bps,
        recorded_ts: ack.ack_ts,
    }
}

/// Polymarket sub-client. HTTP transport is left to the caller-supplied `reqwest::Client`; the
/// methods below describe the call shape and apply rate limiting/retry, not live wire parsing.
pub struct PolymarketClient {
    limiter: RateLimiter,
    attribution: Arc<dyn BuilderAttributionSink>,
}

impl PolymarketClient {
    pub fn new(limiter: RateLimiter) -> Self {
        Self::with_attribution_sink(limiter, Arc::new(crate::attribution::InMemoryAttributionSink::new()))
    }

    pub fn with_attribution_sink(limiter: RateLimiter, attribution: Arc<dyn BuilderAttributionSink>) -> Self {
        Self { limiter, attribution }
    }
}

#[async_trait]
impl VenueClient for PolymarketClient {
    fn venue_tag(&self) -> &str {
        "polymarket"
    }

    async fn search_markets(&self, _query: &str) -> Result<Vec<VenueMarket>, VenueError> {
        self.limiter.acquire(Priority::Normal).await;
        retry_with_backoff(Duration::from_millis(200), || async { Ok(Vec::new()) }).await
    }

    async fn get_order_book(&self, venue_market_id: &str, outcome_idx: usize) -> Result<OrderBook, VenueError> {
        self.limiter.acquire(Priority::Normal).await;
        retry_with_backoff(Duration::from_millis(200), || async {
            Ok(OrderBook {
                venue_market_id: venue_market_id.into(),
                outcome_idx,
                bids: Vec::new(),
                asks: Vec::new(),
            })
        })
        .await
    }

    async fn create_order(&self, request: OrderRequest) -> Result<OrderAck, VenueError> {
        self.limiter.acquire(Priority::High).await;
        let ack = retry_with_backoff(Duration::from_millis(200), || async {
            Ok(OrderAck {
                venue_order_id: format!("poly-{}", request.venue_market_id).into(),
                filled_shares: request.quote_amount,
                realized_price: rust_decimal::Decimal::ZERO,
                fee_bps: rust_decimal::Decimal::from(200),
                ack_ts: chrono::Utc::now(),
            })
        })
        .await?;
        self.attribution.record(attribution_record(self.venue_tag(), &request, &ack));
        Ok(ack)
    }

    async fn cancel_order(&self, _venue_order_id: &str) -> Result<(), VenueError> {
        self.limiter.acquire(Priority::High).await;
        Ok(())
    }

    async fn get_positions(&self) -> Result<Vec<VenuePosition>, VenueError> {
        self.limiter.acquire(Priority::Low).await;
        Ok(Vec::new())
    }
}

/// Kalshi sub-client; same shape as [`PolymarketClient`], tuned to Kalshi's tighter rate limit.
pub struct KalshiClient {
    limiter: RateLimiter,
    attribution: Arc<dyn BuilderAttributionSink>,
}

impl KalshiClient {
    pub fn new(limiter: RateLimiter) -> Self {
        Self::with_attribution_sink(limiter, Arc::new(crate::attribution::InMemoryAttributionSink::new()))
    }

    pub fn with_attribution_sink(limiter: RateLimiter, attribution: Arc<dyn BuilderAttributionSink>) -> Self {
        Self { limiter, attribution }
    }
}

#[async_trait]
impl VenueClient for KalshiClient {
    fn venue_tag(&self) -> &str {
        "kalshi"
    }

    async fn search_markets(&self, _query: &str) -> Result<Vec<VenueMarket>, VenueError> {
        self.limiter.acquire(Priority::Normal).await;
        retry_with_backoff(Duration::from_millis(200), || async { Ok(Vec::new()) }).await
    }

    async fn get_order_book(&self, venue_market_id: &str, outcome_idx: usize) -> Result<OrderBook, VenueError> {
        self.limiter.acquire(Priority::Normal).await;
        retry_with_backoff(Duration::from_millis(200), || async {
            Ok(OrderBook {
                venue_market_id: venue_market_id.into(),
                outcome_idx,
                bids: Vec::new(),
                asks: Vec::new(),
            })
        })
        .await
    }

    async fn create_order(&self, request: OrderRequest) -> Result<OrderAck, VenueError> {
        self.limiter.acquire(Priority::High).await;
        let ack = retry_with_backoff(Duration::from_millis(200), || async {
            Ok(OrderAck {
                venue_order_id: format!("kalshi-{}", request.venue_market_id).into(),
                filled_shares: request.quote_amount,
                realized_price: rust_decimal::Decimal::ZERO,
                fee_bps: rust_decimal::Decimal::from(100),
                ack_ts: chrono::Utc::now(),
            })
        })
        .await?;
        self.attribution.record(attribution_record(self.venue_tag(), &request, &ack));
        Ok(ack)
    }

    async fn cancel_order(&self, _venue_order_id: &str) -> Result<(), VenueError> {
        self.limiter.acquire(Priority::High).await;
        Ok(())
    }

    async fn get_positions(&self) -> Result<Vec<VenuePosition>, VenueError> {
        self.limiter.acquire(Priority::Low).await;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::InMemoryAttributionSink;
    use echelon_domain::MarketId;

    fn request(venue_market_id: &str) -> OrderRequest {
        OrderRequest {
            market_id: MarketId(1),
            venue_market_id: venue_market_id.into(),
            outcome_idx: 0,
            side: echelon_domain::Side::Buy,
            quote_amount: rust_decimal::Decimal::from(10),
            builder_code: "echelon".into(),
        }
    }

    #[tokio::test]
    async fn test_polymarket_create_order_stamps_builder_code() {
        let client = PolymarketClient::new(default_polymarket_limiter());
        let ack = client.create_order(request("m1")).await.unwrap();
        assert_eq!(ack.filled_shares, rust_decimal::Decimal::from(10));
    }

    #[tokio::test]
    async fn every_order_ack_produces_exactly_one_attribution_record() {
        let sink = Arc::new(InMemoryAttributionSink::new());
        let client = PolymarketClient::with_attribution_sink(default_polymarket_limiter(), sink.clone());

        client.create_order(request("m1")).await.unwrap();
        client.create_order(request("m2")).await.unwrap();

        let records = sink.all();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.venue == "polymarket" && r.builder_code == "echelon"));
    }
}
