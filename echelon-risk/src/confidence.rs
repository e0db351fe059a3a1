use chrono::Duration;
use echelon_domain::{FeedStatus, ModeTier, SourceTier};

/// Per-tier weight applied when folding [`FeedStatus`] rows into an aggregate confidence score
/// (spec.md §4.7). Premium feeds count for more than free or decentralized ones.
pub fn tier_weight(tier: SourceTier) -> f64 {
    match tier {
        SourceTier::Premium => 1.0,
        SourceTier::Free => 0.6,
        SourceTier::Decentralized => 0.3,
    }
}

/// Fold weighted per-feed freshness into a single `[0, 1]` aggregate confidence score, computed
/// every `T_health_s` from `FeedStatus` rows (spec.md §4.7). A stale feed (older than
/// `stale_after`) contributes zero regardless of weight.
pub fn aggregate_confidence(feeds: &[(SourceTier, FeedStatus)], now: chrono::DateTime<chrono::Utc>, stale_after: Duration) -> f64 {
    if feeds.is_empty() {
        return 0.0;
    }
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (tier, status) in feeds {
        let weight = tier_weight(*tier);
        weight_total += weight;
        if !status.is_stale(now, stale_after) {
            weighted_sum += weight;
        }
    }
    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

/// Inputs the Mode Supervisor samples every health tick to decide whether a transition is due
/// (spec.md §4.7). `dwell` is how long the *current* tier has already been held.
#[derive(Debug, Clone, Copy)]
pub struct HealthSample {
    pub aggregate_confidence: f64,
    pub dwell: Duration,
    pub unavailable_feed_categories: u32,
    pub critical_feed_down_for: Option<Duration>,
    /// Whether any single feed's staleness currently exceeds 5 minutes, independent of what that
    /// does to the weighted aggregate - spec.md §4.7's Mode-0-to-Mode-1 trigger is an OR of this
    /// and the aggregate threshold, not the aggregate alone.
    pub any_feed_stale: bool,
}

/// The concrete transition rules of spec.md §4.7, stated once: each candidate tier requires both
/// the triggering condition *and* the dwell time to have held continuously, except the immediate
/// critical-feed-absence escalation to Mode 2, which bypasses dwell entirely.
pub fn next_tier(current: ModeTier, sample: HealthSample) -> Option<ModeTier> {
    if sample.critical_feed_down_for.is_some_and(|d| d >= Duration::minutes(10)) {
        return (current != ModeTier::Locked).then_some(ModeTier::Locked);
    }

    match current {
        ModeTier::Normal => {
            let any_condition = sample.any_feed_stale || sample.aggregate_confidence < 0.8;
            if any_condition {
                Some(ModeTier::Cautious)
            } else if sample.unavailable_feed_categories >= 2 || sample.aggregate_confidence < 0.5 {
                (sample.dwell >= Duration::minutes(60)).then_some(ModeTier::Locked)
            } else {
                None
            }
        }
        ModeTier::Cautious => {
            if sample.aggregate_confidence >= 0.9 && sample.dwell >= Duration::minutes(30) {
                Some(ModeTier::Normal)
            } else if sample.unavailable_feed_categories >= 2
                || (sample.aggregate_confidence < 0.5 && sample.dwell >= Duration::minutes(60))
            {
                Some(ModeTier::Locked)
            } else {
                None
            }
        }
        ModeTier::Locked => {
            if sample.aggregate_confidence >= 0.9 && sample.dwell >= Duration::minutes(60) {
                Some(ModeTier::Normal)
            } else if sample.aggregate_confidence >= 0.6 && sample.dwell >= Duration::minutes(60) {
                Some(ModeTier::Cautious)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(confidence: f64, dwell_minutes: i64) -> HealthSample {
        HealthSample {
            aggregate_confidence: confidence,
            dwell: Duration::minutes(dwell_minutes),
            unavailable_feed_categories: 0,
            critical_feed_down_for: None,
            any_feed_stale: false,
        }
    }

    #[test]
    fn test_no_transition_without_dwell() {
        assert_eq!(next_tier(ModeTier::Cautious, sample(0.95, 5)), None);
    }

    #[test]
    fn test_transition_to_normal_after_sustained_high_confidence() {
        assert_eq!(next_tier(ModeTier::Cautious, sample(0.95, 30)), Some(ModeTier::Normal));
    }

    #[test]
    fn test_critical_feed_absence_escalates_immediately() {
        let sample = HealthSample {
            aggregate_confidence: 0.95,
            dwell: Duration::seconds(1),
            unavailable_feed_categories: 0,
            critical_feed_down_for: Some(Duration::minutes(11)),
            any_feed_stale: false,
        };
        assert_eq!(next_tier(ModeTier::Normal, sample), Some(ModeTier::Locked));
    }

    #[test]
    fn test_low_confidence_drops_normal_to_cautious_immediately() {
        assert_eq!(next_tier(ModeTier::Normal, sample(0.7, 0)), Some(ModeTier::Cautious));
    }
}
