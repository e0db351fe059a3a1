use chrono::{DateTime, Duration, Utc};
use derive_more::Display;
use echelon_domain::{Agent, AgentId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Why an agent was terminated (spec.md §9 "Death mechanics for agents").
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum DeathReason {
    #[display("realized P&L floor breached")]
    PnlFloor,
    #[display("inactive for 30+ days")]
    Inactivity,
    #[display("failed paradox extraction")]
    FailedParadoxExtraction,
}

/// Default realized-P&L floor past which an agent is terminated (spec.md §9: "e.g. -$50,000").
pub const DEFAULT_PNL_FLOOR: i64 = -50_000;

pub const DEFAULT_MAX_INACTIVITY: Duration = Duration::days(30);

/// Evaluate the three termination conditions of spec.md §9 against one agent. Returns the first
/// matching reason; callers terminate on `Some`, never re-evaluate a dead agent.
pub fn check_death(
    agent: &Agent,
    realized_pnl: Decimal,
    now: DateTime<Utc>,
    pnl_floor: Decimal,
    max_inactivity: Duration,
    failed_paradox_extraction: bool,
) -> Option<DeathReason> {
    if realized_pnl <= pnl_floor {
        return Some(DeathReason::PnlFloor);
    }
    if failed_paradox_extraction {
        return Some(DeathReason::FailedParadoxExtraction);
    }
    if let Some(last) = agent.last_action_ts {
        if now - last >= max_inactivity {
            return Some(DeathReason::Inactivity);
        }
    }
    None
}

/// Per-agent, per-hour sabotage counter enforcing `K_sabotage / h / agent` monotonically
/// (spec.md §3 invariant, §4.6). A sliding window of timestamps rather than a fixed-bucket
/// counter, so the cap holds for any trailing 60-minute window, not just wall-clock-aligned ones.
#[derive(Default)]
pub struct SabotageCapTracker {
    actions: Mutex<HashMap<AgentId, Vec<DateTime<Utc>>>>,
}

impl SabotageCapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `agent_id` may perform one more sabotage action at `now` without breaching `cap`.
    /// Does not itself record the action - call [`Self::record`] only after the action commits.
    pub fn would_exceed(&self, agent_id: AgentId, now: DateTime<Utc>, cap: u32) -> bool {
        let actions = self.actions.lock();
        let count = actions
            .get(&agent_id)
            .map(|ts| ts.iter().filter(|t| now - **t < Duration::hours(1)).count())
            .unwrap_or(0);
        count as u32 >= cap
    }

    pub fn record(&self, agent_id: AgentId, now: DateTime<Utc>) {
        let mut actions = self.actions.lock();
        let entry = actions.entry(agent_id).or_default();
        entry.retain(|t| now - *t < Duration::hours(1));
        entry.push(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echelon_domain::Archetype;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pnl_floor_breach_terminates() {
        let agent = Agent::spawn(AgentId(1), Archetype::Shark, dec!(100), 0, vec![]);
        let reason = check_death(&agent, dec!(-60000), Utc::now(), Decimal::from(DEFAULT_PNL_FLOOR), DEFAULT_MAX_INACTIVITY, false);
        assert_eq!(reason, Some(DeathReason::PnlFloor));
    }

    #[test]
    fn test_healthy_agent_survives() {
        let mut agent = Agent::spawn(AgentId(1), Archetype::Spy, dec!(100), 0, vec![]);
        agent.last_action_ts = Some(Utc::now());
        let reason = check_death(&agent, dec!(0), Utc::now(), Decimal::from(DEFAULT_PNL_FLOOR), DEFAULT_MAX_INACTIVITY, false);
        assert_eq!(reason, None);
    }

    #[test]
    fn test_sabotage_cap_enforced_over_sliding_window() {
        let tracker = SabotageCapTracker::new();
        let now = Utc::now();
        let agent_id = AgentId(1);
        for _ in 0..3 {
            assert!(!tracker.would_exceed(agent_id, now, 3));
            tracker.record(agent_id, now);
        }
        assert!(tracker.would_exceed(agent_id, now, 3));
    }
}
