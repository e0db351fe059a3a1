use async_trait::async_trait;
use chrono::Utc;
use echelon_domain::{EchelonResult, Signal, SourceTier};
use smol_str::SmolStr;

/// One upstream OSINT feed, normalized to [`Signal`] before it ever reaches
/// [`crate::store::SignalStore::ingest`]. Mirrors `jackbot-data`'s per-exchange `MarketStream`
/// split: the adapter owns connection/parsing concerns, the store owns dedup/retention.
#[async_trait]
pub trait IngestSource: Send + Sync {
    fn source_tag(&self) -> &str;
    fn tier(&self) -> SourceTier;

    /// Pull the next batch of normalized signals. Returns an empty vec on a quiet poll, not an
    /// error - only genuine upstream failure (backing medium unreachable) is `Err`.
    async fn poll(&mut self) -> EchelonResult<Vec<Signal>>;
}

/// Fixed-interval polling source over a raw `(topic, confidence, payload)` feed, used by tests and
/// by thin integrations that don't need their own `IngestSource` impl.
pub struct StaticFeed {
    source_tag: SmolStr,
    tier: SourceTier,
    pending: Vec<(SmolStr, f64, Vec<u8>)>,
}

impl StaticFeed {
    pub fn new(source_tag: impl Into<SmolStr>, tier: SourceTier) -> Self {
        Self {
            source_tag: source_tag.into(),
            tier,
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, topic: impl Into<SmolStr>, confidence: f64, payload: Vec<u8>) {
        self.pending.push((topic.into(), confidence, payload));
    }
}

#[async_trait]
impl IngestSource for StaticFeed {
    fn source_tag(&self) -> &str {
        &self.source_tag
    }

    fn tier(&self) -> SourceTier {
        self.tier
    }

    async fn poll(&mut self) -> EchelonResult<Vec<Signal>> {
        let now = Utc::now();
        let signals = self
            .pending
            .drain(..)
            .map(|(topic, confidence, payload)| {
                Signal::new(self.source_tag.clone(), now, topic, confidence, payload, self.tier)
            })
            .collect();
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_feed_drains_pending_on_poll() {
        let mut feed = StaticFeed::new("manual", SourceTier::Free);
        feed.push("btc-etf", 0.5, b"a".to_vec());
        feed.push("btc-etf", 0.6, b"b".to_vec());
        let signals = feed.poll().await.unwrap();
        assert_eq!(signals.len(), 2);
        assert!(feed.poll().await.unwrap().is_empty());
    }
}
