use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Health of one OSINT ingestion feed (spec.md §4.2). The Signal Store touches this on every
/// successful ingest and the Mode Supervisor reads staleness off it when computing aggregate
/// confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedStatus {
    pub feed_tag: SmolStr,
    pub last_touched_ts: Option<DateTime<Utc>>,
    pub signals_ingested: u64,
    pub consecutive_errors: u32,
}

impl FeedStatus {
    pub fn new(feed_tag: impl Into<SmolStr>) -> Self {
        Self {
            feed_tag: feed_tag.into(),
            last_touched_ts: None,
            signals_ingested: 0,
            consecutive_errors: 0,
        }
    }

    pub fn touch(&mut self, ts: DateTime<Utc>) {
        self.last_touched_ts = Some(ts);
        self.signals_ingested += 1;
        self.consecutive_errors = 0;
    }

    pub fn record_error(&mut self) {
        self.consecutive_errors += 1;
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        match self.last_touched_ts {
            None => true,
            Some(last) => now - last > max_age,
        }
    }
}
