use echelon_domain::Archetype;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Caps the fraction of the global per-window tick budget any single archetype may consume
/// (spec.md §4.6 "Fairness"). One token bucket per archetype, refilled on a shared window,
/// grounded on `echelon_integration::rate_limit::RateLimiter`'s refill-then-acquire shape.
pub struct FairnessScheduler {
    window: Duration,
    per_archetype_budget_ms: u64,
    buckets: Mutex<HashMap<Archetype, Bucket>>,
}

struct Bucket {
    consumed_ms: u64,
    window_start: Instant,
}

impl FairnessScheduler {
    /// `window` is the fairness accounting period; `max_fraction` caps each archetype's share of
    /// `tick_budget_ms` within it (e.g. 0.4 -> no archetype may consume more than 40% of ticks).
    pub fn new(window: Duration, tick_budget_ms: u64, max_fraction: f64) -> Self {
        Self {
            window,
            per_archetype_budget_ms: (tick_budget_ms as f64 * max_fraction) as u64,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `archetype` may spend `cost_ms` more of this window's tick budget.
    pub fn try_consume(&self, archetype: Archetype, cost_ms: u64, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(archetype).or_insert(Bucket { consumed_ms: 0, window_start: now });
        if now.duration_since(bucket.window_start) >= self.window {
            bucket.consumed_ms = 0;
            bucket.window_start = now;
        }
        if bucket.consumed_ms + cost_ms > self.per_archetype_budget_ms {
            return false;
        }
        bucket.consumed_ms += cost_ms;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_archetype_at_its_fraction() {
        let scheduler = FairnessScheduler::new(Duration::from_secs(1), 100, 0.5);
        let now = Instant::now();
        assert!(scheduler.try_consume(Archetype::Shark, 40, now));
        assert!(scheduler.try_consume(Archetype::Shark, 10, now));
        assert!(!scheduler.try_consume(Archetype::Shark, 5, now));
    }

    #[test]
    fn test_other_archetype_has_independent_budget() {
        let scheduler = FairnessScheduler::new(Duration::from_secs(1), 100, 0.5);
        let now = Instant::now();
        assert!(scheduler.try_consume(Archetype::Shark, 50, now));
        assert!(scheduler.try_consume(Archetype::Spy, 50, now));
    }

    #[test]
    fn test_window_resets_consumption() {
        let scheduler = FairnessScheduler::new(Duration::from_millis(10), 100, 0.5);
        let t0 = Instant::now();
        assert!(scheduler.try_consume(Archetype::Diplomat, 50, t0));
        let t1 = t0 + Duration::from_millis(20);
        assert!(scheduler.try_consume(Archetype::Diplomat, 50, t1));
    }
}
