use crate::ids::{MarketId, OwnerRef};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A holder's stake in one outcome of one market (spec.md §3). Created on the first trade an
/// owner makes into an outcome; merged (weighted-average cost basis) on every subsequent trade
/// into the same outcome; zeroed out on market close or settlement payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub owner: OwnerRef,
    pub market_id: MarketId,
    pub outcome_idx: usize,
    pub shares: Decimal,
    /// Average cost per share, in quote currency.
    pub cost_basis: Decimal,
    pub opened_ts: DateTime<Utc>,
    pub updated_ts: DateTime<Utc>,
}

impl Position {
    pub fn open(
        owner: OwnerRef,
        market_id: MarketId,
        outcome_idx: usize,
        shares: Decimal,
        cost_basis: Decimal,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            owner,
            market_id,
            outcome_idx,
            shares,
            cost_basis,
            opened_ts: ts,
            updated_ts: ts,
        }
    }

    /// Merge an additional fill into this position. `additional_cost` is the total quote-currency
    /// cost of the new fill (not per-share); `cost_basis` is recomputed as the shares-weighted
    /// average of the existing and incoming cost.
    pub fn merge(&mut self, additional_shares: Decimal, additional_cost: Decimal, ts: DateTime<Utc>) {
        let total_shares = self.shares + additional_shares;
        if total_shares.is_zero() {
            self.shares = Decimal::ZERO;
            self.cost_basis = Decimal::ZERO;
        } else {
            let existing_total_cost = self.cost_basis * self.shares;
            self.cost_basis = (existing_total_cost + additional_cost) / total_shares;
            self.shares = total_shares;
        }
        self.updated_ts = ts;
    }

    /// Zero the position out - called on market close (losing side) or settlement payout, both
    /// of which extinguish the holding entirely rather than partially.
    pub fn zero(&mut self, ts: DateTime<Utc>) {
        self.shares = Decimal::ZERO;
        self.cost_basis = Decimal::ZERO;
        self.updated_ts = ts;
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_zero()
    }

    /// Unrealized P&L against a current per-share price, before any settlement has occurred.
    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        self.shares * current_price - self.cost_basis
    }
}
