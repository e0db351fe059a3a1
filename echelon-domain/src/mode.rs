use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Degraded-mode tier the Mode Supervisor has the system parked in (spec.md §4.7). Higher tiers
/// progressively restrict agent activity; transitions are gated by dwell-time hysteresis, not a
/// bare threshold crossing, so a single noisy confidence sample can't flap the system between
/// tiers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Display)]
#[repr(u8)]
pub enum ModeTier {
    #[display("0")]
    Normal = 0,
    #[display("1")]
    Cautious = 1,
    #[display("2")]
    Locked = 2,
}

/// Bitset of restrictions a [`ModeTier`] imposes on the Agent Scheduler. A plain `u8` rather than
/// a `bitflags!`-generated type, since the set is small and fixed and the teacher's codebase
/// doesn't otherwise depend on the `bitflags` crate.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Default)]
pub struct Restrictions(pub u8);

impl Restrictions {
    pub const NONE: Restrictions = Restrictions(0);
    pub const NO_NEW_SABOTEURS: Restrictions = Restrictions(1 << 0);
    pub const HALVE_POSITION_SIZE: Restrictions = Restrictions(1 << 1);
    pub const REAL_CAPITAL_FROZEN: Restrictions = Restrictions(1 << 2);
    pub const NO_NEW_AGENTS: Restrictions = Restrictions(1 << 3);
    pub const NO_NEW_TIMELINES: Restrictions = Restrictions(1 << 4);
    pub const NO_NEW_MARKETS: Restrictions = Restrictions(1 << 5);

    pub fn contains(self, flag: Restrictions) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn with(self, flag: Restrictions) -> Restrictions {
        Restrictions(self.0 | flag.0)
    }

    /// The restriction set a tier imposes while the system dwells in it.
    pub fn for_tier(tier: ModeTier) -> Restrictions {
        match tier {
            ModeTier::Normal => Restrictions::NONE,
            ModeTier::Cautious => Restrictions::NONE
                .with(Restrictions::NO_NEW_SABOTEURS)
                .with(Restrictions::HALVE_POSITION_SIZE),
            ModeTier::Locked => Restrictions::NONE
                .with(Restrictions::NO_NEW_SABOTEURS)
                .with(Restrictions::HALVE_POSITION_SIZE)
                .with(Restrictions::REAL_CAPITAL_FROZEN)
                .with(Restrictions::NO_NEW_AGENTS)
                .with(Restrictions::NO_NEW_TIMELINES)
                .with(Restrictions::NO_NEW_MARKETS),
        }
    }
}

/// Current state of the Mode Supervisor (spec.md §4.7). `entered_ts` marks the start of the
/// current dwell so the supervisor can refuse a transition until the minimum dwell time passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeState {
    pub tier: ModeTier,
    pub entered_ts: DateTime<Utc>,
    pub aggregate_confidence: f64,
    pub restrictions: Restrictions,
}

impl ModeState {
    pub fn normal(now: DateTime<Utc>) -> Self {
        Self {
            tier: ModeTier::Normal,
            entered_ts: now,
            aggregate_confidence: 1.0,
            restrictions: Restrictions::for_tier(ModeTier::Normal),
        }
    }

    pub fn dwell_elapsed(&self, now: DateTime<Utc>, min_dwell: chrono::Duration) -> bool {
        now - self.entered_ts >= min_dwell
    }

    pub fn transition(&mut self, tier: ModeTier, now: DateTime<Utc>) {
        self.tier = tier;
        self.entered_ts = now;
        self.restrictions = Restrictions::for_tier(tier);
    }
}
