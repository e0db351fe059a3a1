#![warn(unused_crate_dependencies)]

//! Forks, visibility, and lifecycle of counterfactual timelines - the Timeline Registry of the
//! event orchestration core.

pub mod registry;

pub use registry::{ForkUserConfig, TimelineRegistry, UserVisibility};
