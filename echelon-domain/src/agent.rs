use crate::ids::AgentId;
use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decision-policy family an [`Agent`] follows (spec.md §4.6). Each archetype composes the same
/// technical-analysis primitives in `echelon-ta` differently; the archetype itself only selects
/// which policy `echelon-agents` dispatches to on tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum Archetype {
    Shark,
    Spy,
    Diplomat,
    Saboteur,
}

/// A simulated participant the Agent Scheduler ticks on a cooldown (spec.md §3, §4.6). `traits`
/// are per-archetype tunables (e.g. a Shark's aggression, a Saboteur's sabotage budget) read by
/// the corresponding policy in `echelon-strategy`; kept as a map rather than archetype-specific
/// fields so new traits don't require a schema migration per archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub archetype: Archetype,
    pub traits: BTreeMap<String, f64>,
    /// Composite health score in `[0, 100]`; an agent whose sanity reaches zero is retired by the
    /// scheduler.
    pub sanity: f64,
    pub budget_remaining: Decimal,
    /// Budget at spawn time, kept so [`Self::realized_pnl`] has a baseline to measure against
    /// without a separate portfolio-valuation pass (spec.md §9 "Death mechanics").
    pub initial_budget: Decimal,
    pub last_action_ts: Option<DateTime<Utc>>,
    pub generation: u32,
    pub parents: Vec<AgentId>,
}

impl Agent {
    pub fn spawn(id: AgentId, archetype: Archetype, budget: Decimal, generation: u32, parents: Vec<AgentId>) -> Self {
        Self {
            id,
            archetype,
            traits: BTreeMap::new(),
            sanity: 100.0,
            budget_remaining: budget,
            initial_budget: budget,
            last_action_ts: None,
            generation,
            parents,
        }
    }

    pub fn trait_value(&self, key: &str, default: f64) -> f64 {
        self.traits.get(key).copied().unwrap_or(default)
    }

    pub fn is_alive(&self) -> bool {
        self.sanity > 0.0 && self.budget_remaining > Decimal::ZERO
    }

    /// Net change in budget since spawn - the death rule's realized-P&L input (spec.md §9).
    /// Negative while an agent has only spent budget and not yet been refunded or paid out.
    pub fn realized_pnl(&self) -> Decimal {
        self.budget_remaining - self.initial_budget
    }

    /// Whether enough wall-clock time has elapsed since the last action for this agent to act
    /// again, given its per-tick cooldown.
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>, cooldown: chrono::Duration) -> bool {
        match self.last_action_ts {
            None => true,
            Some(last) => now - last >= cooldown,
        }
    }
}
