use crate::ids::{MarketId, TradeId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Record that a trade was routed through a venue under a given builder/referral code
/// (spec.md §4.5). Venue adapters emit one of these per fill so downstream export can reconcile
/// attribution revenue without re-querying the venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderAttributionRecord {
    pub trade_id: TradeId,
    pub market_id: MarketId,
    pub venue: SmolStr,
    pub builder_code: SmolStr,
    pub notional: Decimal,
    pub fee_bps: Decimal,
    pub recorded_ts: DateTime<Utc>,
}

impl BuilderAttributionRecord {
    pub fn fee_amount(&self) -> Decimal {
        self.notional * self.fee_bps / Decimal::from(10_000)
    }
}
