#![warn(unused_crate_dependencies)]

//! Mode Supervisor confidence scoring and agent death/sabotage-cap rules for the event
//! orchestration core.

pub mod confidence;
pub mod death;

pub use confidence::{aggregate_confidence, next_tier, tier_weight, HealthSample};
pub use death::{check_death, DeathReason, SabotageCapTracker, DEFAULT_MAX_INACTIVITY, DEFAULT_PNL_FLOOR};
