use chrono::{DateTime, Utc};
use echelon_domain::FeedStatus;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Tracks one [`FeedStatus`] per `source_tag`. Split out from [`crate::store::SignalStore`]
/// because `touch` is called far more often than `ingest` reads FeedStatus back out, and the two
/// deserve independent locks.
#[derive(Default)]
pub struct FeedRegistry {
    feeds: RwLock<HashMap<String, FeedStatus>>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch_ok(&self, source_tag: &str, ts: DateTime<Utc>) {
        let mut feeds = self.feeds.write();
        feeds
            .entry(source_tag.to_string())
            .or_insert_with(|| FeedStatus::new(source_tag))
            .touch(ts);
    }

    pub fn touch_err(&self, source_tag: &str) {
        let mut feeds = self.feeds.write();
        feeds
            .entry(source_tag.to_string())
            .or_insert_with(|| FeedStatus::new(source_tag))
            .record_error();
    }

    pub fn get(&self, source_tag: &str) -> Option<FeedStatus> {
        self.feeds.read().get(source_tag).cloned()
    }

    pub fn all(&self) -> Vec<FeedStatus> {
        self.feeds.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_err_then_ok_resets_streak() {
        let registry = FeedRegistry::new();
        registry.touch_err("reuters");
        registry.touch_err("reuters");
        assert_eq!(registry.get("reuters").unwrap().consecutive_errors, 2);
        registry.touch_ok("reuters", Utc::now());
        assert_eq!(registry.get("reuters").unwrap().consecutive_errors, 0);
    }
}
