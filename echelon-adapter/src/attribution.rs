use echelon_domain::BuilderAttributionRecord;
use parking_lot::Mutex;

/// Persists [`BuilderAttributionRecord`]s emitted on every ACK. Kept external per spec.md §1's
/// "persistence driver is external"; the in-memory implementation below is the default for
/// tests and single-process deployments.
pub trait BuilderAttributionSink: Send + Sync {
    fn record(&self, record: BuilderAttributionRecord);
}

#[derive(Default)]
pub struct InMemoryAttributionSink {
    records: Mutex<Vec<BuilderAttributionRecord>>,
}

impl InMemoryAttributionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<BuilderAttributionRecord> {
        self.records.lock().clone()
    }
}

impl BuilderAttributionSink for InMemoryAttributionSink {
    fn record(&self, record: BuilderAttributionRecord) {
        self.records.lock().push(record);
    }
}
