use crate::ids::{MarketId, TimelineId};
use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`Market`] (spec.md §4.3). Transitions are enforced by
/// `echelon-market`, never mutated directly by callers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum MarketStatus {
    Open,
    Closed,
    Resolving,
    Resolved,
    Voided,
}

impl MarketStatus {
    /// Whether `next` is a legal successor of `self` per the state machine in spec.md §4.3:
    /// `open -> closed -> resolving -> resolved`, `open -> voided`, `resolved` terminal.
    pub fn can_transition_to(self, next: MarketStatus) -> bool {
        use MarketStatus::*;
        matches!(
            (self, next),
            (Open, Closed) | (Open, Voided) | (Closed, Resolving) | (Resolving, Resolved)
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum Side {
    Buy,
    Sell,
}

/// A tradable question with finitely many outcomes (spec.md §3). `reserves[i]` is the CPMM pool
/// balance backing outcome `i`; the product of all reserves is the invariant `k` the Market Engine
/// preserves on every trade. Binary markets are the only shape `echelon-market` currently accepts
/// (outcomes.len() == 2, outcomes[0] conventionally "YES"); the vector shape is kept so a future
/// N-outcome CPMM only has to lift the length restriction, not the representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub timeline_id: TimelineId,
    pub outcomes: Vec<String>,
    pub reserves: Vec<Decimal>,
    pub total_volume: Decimal,
    pub status: MarketStatus,
    pub created_ts: DateTime<Utc>,
    pub resolution_ts: Option<DateTime<Utc>>,
    pub winning_idx: Option<usize>,
}

impl Market {
    /// YES-side reserve of a binary market. Callers outside `echelon-market`'s binary path
    /// should index `reserves` directly rather than assume outcome count.
    pub fn yes_reserve(&self) -> Decimal {
        self.reserves[0]
    }

    pub fn no_reserve(&self) -> Decimal {
        self.reserves[1]
    }

    /// CPMM invariant `k = Pi reserves[i]`.
    pub fn invariant(&self) -> Decimal {
        self.reserves.iter().product()
    }

    /// Per-outcome odds as each reserve's share of the pool. A buy on outcome `j` shrinks
    /// `reserves[j]` and grows every other reserve (see `echelon-market`'s quote/execute), so an
    /// outcome becoming scarcer in the pool is exactly an outcome whose odds just fell - the
    /// orientation pinned by the two-step CPMM scenario in spec.md §8.
    pub fn outcome_odds(&self) -> Vec<Decimal> {
        let total: Decimal = self.reserves.iter().sum();
        if total.is_zero() {
            return vec![Decimal::ZERO; self.outcomes.len()];
        }
        self.reserves.iter().map(|r| *r / total).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seeded(reserve: Decimal) -> Market {
        Market {
            id: MarketId(1),
            timeline_id: TimelineId(1),
            outcomes: vec!["YES".into(), "NO".into()],
            reserves: vec![reserve, reserve],
            total_volume: Decimal::ZERO,
            status: MarketStatus::Open,
            created_ts: Utc::now(),
            resolution_ts: None,
            winning_idx: None,
        }
    }

    #[test]
    fn test_seeded_market_has_even_odds() {
        let market = seeded(dec!(1000));
        assert_eq!(market.outcome_odds(), vec![dec!(0.5), dec!(0.5)]);
    }

    #[test]
    fn test_open_to_resolving_is_illegal_without_closing_first() {
        assert!(!MarketStatus::Open.can_transition_to(MarketStatus::Resolving));
        assert!(MarketStatus::Open.can_transition_to(MarketStatus::Closed));
        assert!(MarketStatus::Closed.can_transition_to(MarketStatus::Resolving));
        assert!(MarketStatus::Resolving.can_transition_to(MarketStatus::Resolved));
    }

    #[test]
    fn test_resolved_is_terminal() {
        assert!(!MarketStatus::Resolved.can_transition_to(MarketStatus::Open));
        assert!(!MarketStatus::Resolved.can_transition_to(MarketStatus::Voided));
    }
}
