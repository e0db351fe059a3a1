#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! Technical analysis utilities shared by agent archetype policies.
//!
//! Simple indicators, pattern detection, and crossover signal generation reused across
//! `echelon-strategy`'s Shark/Spy/Diplomat/Saboteur decision policies.

pub mod indicators;
pub mod patterns;
pub mod signals;
