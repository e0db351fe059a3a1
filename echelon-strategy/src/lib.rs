#![warn(unused_crate_dependencies)]

//! Archetype decision policies for the Agent Scheduler (spec.md §4.6): Shark, Spy, Diplomat,
//! Saboteur. Each policy consumes a window of recent signals and current market/timeline state
//! and proposes a trade, or `NO_OP`.

use echelon_domain::{Agent, MarketId, Side, Signal};
use echelon_ta::indicators::SimpleMovingAverage;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A proposed trade, or nothing (`decide` returning `None` is the `NO_OP` of spec.md §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub market_id: MarketId,
    pub outcome_idx: usize,
    pub side: Side,
    pub size: Decimal,
}

/// Everything a policy needs to decide, gathered by the scheduler tick before dispatch
/// (spec.md §4.6 steps 3-4).
#[derive(Debug, Clone)]
pub struct PolicyInput<'a> {
    pub market_id: MarketId,
    /// Signals on topics the agent subscribes to, newest-first, since the agent's last
    /// observation.
    pub recent_signals: &'a [Signal],
    /// `outcome_idx -> outcome_odds`, as currently quoted by the Market Engine.
    pub outcome_odds: &'a HashMap<usize, f64>,
    /// The timeline's aggregate-signal prior per outcome, used by Diplomat to detect deviation.
    pub timeline_prior: &'a HashMap<usize, f64>,
    pub base_size: Decimal,
}

/// Implemented by each archetype's decision policy (spec.md §4.6 "Archetype decision shapes").
pub trait ArchetypePolicy {
    fn decide(&mut self, agent: &Agent, input: &PolicyInput<'_>) -> Option<Decision>;
}

/// Momentum policy: prefers outcomes whose recent signal-confidence gradient exceeds a
/// threshold; size scales with the gradient.
#[derive(Debug, Clone)]
pub struct SharkPolicy {
    confidence_avg: SimpleMovingAverage,
    gradient_threshold: Decimal,
}

impl SharkPolicy {
    pub fn new(window: usize, gradient_threshold: Decimal) -> Self {
        Self { confidence_avg: SimpleMovingAverage::new(window), gradient_threshold }
    }
}

impl ArchetypePolicy for SharkPolicy {
    fn decide(&mut self, _agent: &Agent, input: &PolicyInput<'_>) -> Option<Decision> {
        let (outcome_idx, signal) = input.recent_signals.first().map(|s| (0usize, s))?;
        let prev_avg = self.confidence_avg.average();
        let confidence = Decimal::try_from(signal.confidence).ok()?;
        let next_avg = self.confidence_avg.update(confidence);
        let gradient = next_avg - prev_avg;
        if gradient <= self.gradient_threshold {
            return None;
        }
        Some(Decision {
            market_id: input.market_id,
            outcome_idx,
            side: Side::Buy,
            size: input.base_size * gradient.max(Decimal::ONE),
        })
    }
}

/// Information policy: trades only on a signal no older than `t_exclusive_s` that no earlier
/// agent generation has already observed; otherwise `NO_OP`.
#[derive(Debug, Clone)]
pub struct SpyPolicy {
    t_exclusive_s: i64,
    seen: std::collections::HashSet<echelon_domain::SignalId>,
}

impl SpyPolicy {
    pub fn new(t_exclusive_s: i64) -> Self {
        Self { t_exclusive_s, seen: std::collections::HashSet::new() }
    }
}

impl ArchetypePolicy for SpyPolicy {
    fn decide(&mut self, _agent: &Agent, input: &PolicyInput<'_>) -> Option<Decision> {
        let now = chrono::Utc::now();
        for signal in input.recent_signals {
            if self.seen.contains(&signal.id) {
                continue;
            }
            self.seen.insert(signal.id);
            let age = now - signal.ts;
            if age <= chrono::Duration::seconds(self.t_exclusive_s) {
                return Some(Decision {
                    market_id: input.market_id,
                    outcome_idx: 0,
                    side: Side::Buy,
                    size: input.base_size,
                });
            }
        }
        None
    }
}

/// Stabilizer policy: trades against whichever outcome's implied probability has drifted from
/// the timeline's aggregate-signal prior by more than `delta_stability`.
#[derive(Debug, Clone)]
pub struct DiplomatPolicy {
    delta_stability: f64,
}

impl DiplomatPolicy {
    pub fn new(delta_stability: f64) -> Self {
        Self { delta_stability }
    }
}

impl ArchetypePolicy for DiplomatPolicy {
    fn decide(&mut self, _agent: &Agent, input: &PolicyInput<'_>) -> Option<Decision> {
        let (outcome_idx, odds) = input
            .outcome_odds
            .iter()
            .find(|(idx, odds)| {
                input
                    .timeline_prior
                    .get(idx)
                    .is_some_and(|prior| (*odds - prior).abs() > self.delta_stability)
            })
            .map(|(idx, odds)| (*idx, *odds))?;
        let prior = input.timeline_prior.get(&outcome_idx).copied().unwrap_or(odds);
        let side = if odds > prior { Side::Sell } else { Side::Buy };
        Some(Decision { market_id: input.market_id, outcome_idx, side, size: input.base_size })
    }
}

/// Adversary policy: trades to widen the logic gap of its target timeline. The hard cap of
/// `K_sabotage / h / agent` (spec.md §3, §4.6) is enforced by the caller via
/// `echelon_risk::SabotageCapTracker`, not here - this policy only proposes the trade.
#[derive(Debug, Clone)]
pub struct SaboteurPolicy;

impl ArchetypePolicy for SaboteurPolicy {
    fn decide(&mut self, _agent: &Agent, input: &PolicyInput<'_>) -> Option<Decision> {
        let (outcome_idx, odds) = input
            .outcome_odds
            .iter()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, odds)| (*idx, *odds))?;
        let side = if odds < 0.5 { Side::Buy } else { Side::Sell };
        Some(Decision { market_id: input.market_id, outcome_idx, side, size: input.base_size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echelon_domain::{AgentId, Archetype, SourceTier};
    use rust_decimal_macros::dec;

    fn agent() -> Agent {
        Agent::spawn(AgentId(1), Archetype::Shark, dec!(1000), 0, vec![])
    }

    #[test]
    fn test_shark_no_op_on_first_signal() {
        let mut policy = SharkPolicy::new(3, dec!(0.1));
        let signal = Signal::new("src", chrono::Utc::now(), "t", 0.9, vec![], SourceTier::Premium);
        let input = PolicyInput {
            market_id: MarketId(1),
            recent_signals: &[signal],
            outcome_odds: &HashMap::new(),
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
        };
        assert_eq!(policy.decide(&agent(), &input), None);
    }

    #[test]
    fn test_shark_trades_on_rising_confidence_gradient() {
        let mut policy = SharkPolicy::new(3, dec!(0.1));
        let low = Signal::new("src", chrono::Utc::now(), "t", 0.1, vec![], SourceTier::Premium);
        let high = Signal::new("src", chrono::Utc::now(), "t", 0.9, vec![1], SourceTier::Premium);
        let input_low = PolicyInput {
            market_id: MarketId(1),
            recent_signals: &[low],
            outcome_odds: &HashMap::new(),
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
        };
        policy.decide(&agent(), &input_low);
        let input_high = PolicyInput {
            market_id: MarketId(1),
            recent_signals: &[high],
            outcome_odds: &HashMap::new(),
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
        };
        assert!(policy.decide(&agent(), &input_high).is_some());
    }

    #[test]
    fn test_spy_ignores_stale_signals() {
        let mut policy = SpyPolicy::new(60);
        let old_signal = Signal::new(
            "src",
            chrono::Utc::now() - chrono::Duration::hours(1),
            "t",
            0.9,
            vec![],
            SourceTier::Premium,
        );
        let input = PolicyInput {
            market_id: MarketId(1),
            recent_signals: &[old_signal],
            outcome_odds: &HashMap::new(),
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
        };
        assert_eq!(policy.decide(&agent(), &input), None);
    }

    #[test]
    fn test_spy_trades_on_fresh_exclusive_signal() {
        let mut policy = SpyPolicy::new(60);
        let fresh = Signal::new("src", chrono::Utc::now(), "t", 0.9, vec![], SourceTier::Premium);
        let input = PolicyInput {
            market_id: MarketId(1),
            recent_signals: &[fresh],
            outcome_odds: &HashMap::new(),
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
        };
        assert!(policy.decide(&agent(), &input).is_some());
    }

    #[test]
    fn test_diplomat_trades_against_deviation() {
        let mut policy = DiplomatPolicy::new(0.05);
        let mut odds = HashMap::new();
        odds.insert(0usize, 0.7);
        let mut prior = HashMap::new();
        prior.insert(0usize, 0.5);
        let input = PolicyInput {
            market_id: MarketId(1),
            recent_signals: &[],
            outcome_odds: &odds,
            timeline_prior: &prior,
            base_size: dec!(10),
        };
        let decision = policy.decide(&agent(), &input).unwrap();
        assert_eq!(decision.side, Side::Sell);
    }

    #[test]
    fn test_diplomat_no_op_within_tolerance() {
        let mut policy = DiplomatPolicy::new(0.2);
        let mut odds = HashMap::new();
        odds.insert(0usize, 0.55);
        let mut prior = HashMap::new();
        prior.insert(0usize, 0.5);
        let input = PolicyInput {
            market_id: MarketId(1),
            recent_signals: &[],
            outcome_odds: &odds,
            timeline_prior: &prior,
            base_size: dec!(10),
        };
        assert!(policy.decide(&agent(), &input).is_none());
    }

    #[test]
    fn test_saboteur_targets_lowest_odds_outcome() {
        let mut policy = SaboteurPolicy;
        let mut odds = HashMap::new();
        odds.insert(0usize, 0.8);
        odds.insert(1usize, 0.2);
        let input = PolicyInput {
            market_id: MarketId(1),
            recent_signals: &[],
            outcome_odds: &odds,
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
        };
        let decision = policy.decide(&agent(), &input).unwrap();
        assert_eq!(decision.outcome_idx, 1);
        assert_eq!(decision.side, Side::Buy);
    }
}
