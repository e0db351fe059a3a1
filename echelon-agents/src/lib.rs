#![warn(unused_crate_dependencies)]

//! The Agent Scheduler: one logical worker per live agent, ticking archetype decision policies
//! against the Signal Store and Market Engine under a fairness budget (spec.md §4.6).

pub mod fairness;
pub mod scheduler;
pub mod worker;

pub use fairness::FairnessScheduler;
pub use scheduler::{spawn_agent_worker, AgentRiskSpec, AgentWorkerHandle, AgentWorkerSpec};
pub use worker::{tick, RiskConfig, TickContext, TickOutcome, SANITY_DELTA_ACT, SANITY_DELTA_NOOP};
