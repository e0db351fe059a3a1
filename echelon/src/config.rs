//! `EchelonConfig` (spec.md §6): the recognized environment knobs, pinned as a typed struct so
//! unknown options are rejected at boot rather than silently ignored (spec.md §9 "Dynamic typing
//! & config objects"). Values are read from the process environment; `#[serde(deny_unknown_fields)]`
//! guards the optional JSON config-file overlay the CLI also accepts.

use echelon_domain::{EchelonError, EchelonResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EchelonConfig {
    /// `MODE_CHECK_INTERVAL_S` - frequency of confidence recomputation (default 10).
    pub mode_check_interval_s: u64,
    /// `RATE_LIMIT_POLY` - Polymarket token-bucket capacity per 60s window.
    pub rate_limit_poly: u32,
    /// `RATE_LIMIT_KALSHI` - Kalshi token-bucket capacity per 1s window.
    pub rate_limit_kalshi: u32,
    /// `BUILDER_CODE` - attribution tag stamped on all outbound orders.
    pub builder_code: String,
    /// `AGENT_TICK_MS` - global scheduler cadence (default 1000).
    pub agent_tick_ms: u64,
    /// `MAX_POSITION_SIZE_USD` / `MIN_POSITION_SIZE_USD` - enforcement bounds.
    pub max_position_size_usd: u64,
    pub min_position_size_usd: u64,
    /// `SABOTAGE_CAP_PER_HOUR` - per-agent cap.
    pub sabotage_cap_per_hour: u32,
    /// `DISPUTE_WINDOW_S` - Mode-1 settlement delay (default 86400).
    pub dispute_window_s: u64,
}

impl EchelonConfig {
    pub const DEFAULT_MODE_CHECK_INTERVAL_S: u64 = 10;
    pub const DEFAULT_AGENT_TICK_MS: u64 = 1000;
    pub const DEFAULT_DISPUTE_WINDOW_S: u64 = 86_400;

    pub fn mode_check_interval(&self) -> Duration {
        Duration::from_secs(self.mode_check_interval_s)
    }

    pub fn agent_tick(&self) -> Duration {
        Duration::from_millis(self.agent_tick_ms)
    }

    pub fn dispute_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.dispute_window_s as i64)
    }

    /// Load from the recognized environment knobs (spec.md §6), falling back to the documented
    /// defaults. `BUILDER_CODE` has no default - a boot without attribution identity is a config
    /// error (exit code `1`, spec.md §6).
    pub fn from_env() -> EchelonResult<Self> {
        let builder_code = std::env::var("BUILDER_CODE").map_err(|_| EchelonError::InvalidArg {
            reason: "BUILDER_CODE must be set".into(),
            context: Default::default(),
        })?;

        Ok(Self {
            mode_check_interval_s: env_u64("MODE_CHECK_INTERVAL_S", Self::DEFAULT_MODE_CHECK_INTERVAL_S)?,
            rate_limit_poly: env_u32("RATE_LIMIT_POLY", 100)?,
            rate_limit_kalshi: env_u32("RATE_LIMIT_KALSHI", 10)?,
            builder_code,
            agent_tick_ms: env_u64("AGENT_TICK_MS", Self::DEFAULT_AGENT_TICK_MS)?,
            max_position_size_usd: env_u64("MAX_POSITION_SIZE_USD", 100_000)?,
            min_position_size_usd: env_u64("MIN_POSITION_SIZE_USD", 1)?,
            sabotage_cap_per_hour: env_u32("SABOTAGE_CAP_PER_HOUR", 5)?,
            dispute_window_s: env_u64("DISPUTE_WINDOW_S", Self::DEFAULT_DISPUTE_WINDOW_S)?,
        })
    }
}

fn env_u64(key: &str, default: u64) -> EchelonResult<u64> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| EchelonError::InvalidArg {
            reason: format!("{key} must be a non-negative integer, got {raw:?}"),
            context: Default::default(),
        }),
    }
}

fn env_u32(key: &str, default: u32) -> EchelonResult<u32> {
    env_u64(key, default as u64).map(|v| v as u32)
}
