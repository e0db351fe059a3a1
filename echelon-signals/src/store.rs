use crate::feed_registry::FeedRegistry;
use chrono::{DateTime, Utc};
use echelon_domain::{EchelonError, EchelonResult, ErrorContext, Signal, SignalId};
use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Outcome of an [`SignalStore::ingest`] call - `Duplicate` iff `signal.id` was already present
/// (spec.md §4.2); both are success, never an error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IngestOutcome {
    Inserted,
    Duplicate,
}

/// Idempotent, append-mostly log of OSINT [`Signal`]s plus a keyed recency index (spec.md §4.2).
/// Grounded in `jackbot-data`'s `InMemoryStore`: one `RwLock`-guarded map for the canonical
/// records, and a second ordered index kept in lockstep for range queries - except here the
/// second index is a `BTreeMap` rather than per-key `Vec`s, since `query` needs a stable
/// newest-first walk across an arbitrary `topic`.
pub struct SignalStore {
    signals: RwLock<IndexMap<SignalId, Signal>>,
    /// `(topic, ts, id) -> ()` so `query(topic, since_ts, limit)` is a bounded range scan instead
    /// of a full linear filter; `id` breaks ties between signals sharing a timestamp.
    recency: RwLock<BTreeMap<(SmolStr, DateTime<Utc>, SignalId), ()>>,
    feeds: FeedRegistry,
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalStore {
    pub fn new() -> Self {
        Self {
            signals: RwLock::new(IndexMap::new()),
            recency: RwLock::new(BTreeMap::new()),
            feeds: FeedRegistry::new(),
        }
    }

    /// Insert `signal` if its id hasn't been seen before. The recency index is updated under the
    /// same logical tick so a `query` issued immediately after observes the new signal
    /// (spec.md §4.2's same-tick-visibility contract).
    pub fn ingest(&self, signal: Signal) -> EchelonResult<IngestOutcome> {
        let mut signals = self.signals.write();
        if signals.contains_key(&signal.id) {
            return Ok(IngestOutcome::Duplicate);
        }
        let key = (signal.topic.clone(), signal.ts, signal.id);
        signals.insert(signal.id, signal);
        self.recency.write().insert(key, ());
        Ok(IngestOutcome::Inserted)
    }

    /// Signals for `topic` at or after `since_ts`, newest first, limited to `limit` entries.
    pub fn query(&self, topic: &str, since_ts: DateTime<Utc>, limit: usize) -> EchelonResult<Vec<Signal>> {
        let recency = self.recency.read();
        let signals = self.signals.read();
        let lower = (SmolStr::from(topic), since_ts, SignalId([0u8; 32]));
        let matches: Vec<SignalId> = recency
            .range(lower..)
            .take_while(|((t, _, _), _)| t.as_str() == topic)
            .map(|((_, _, id), _)| *id)
            .collect();
        let mut out: Vec<Signal> = matches
            .into_iter()
            .filter_map(|id| signals.get(&id).cloned())
            .collect();
        out.sort_by(|a, b| b.ts.cmp(&a.ts).then_with(|| b.id.cmp(&a.id)));
        out.truncate(limit);
        Ok(out)
    }

    pub fn touch_ok(&self, source_tag: &str, ts: DateTime<Utc>) {
        self.feeds.touch_ok(source_tag, ts);
    }

    pub fn touch_err(&self, source_tag: &str) {
        self.feeds.touch_err(source_tag);
    }

    pub fn feed_status(&self, source_tag: &str) -> EchelonResult<echelon_domain::FeedStatus> {
        self.feeds.get(source_tag).ok_or_else(|| EchelonError::NotFound {
            reason: format!("no feed status for {source_tag}"),
            context: ErrorContext::feed(source_tag),
        })
    }

    pub fn all_feed_statuses(&self) -> Vec<echelon_domain::FeedStatus> {
        self.feeds.all()
    }

    pub fn len(&self) -> usize {
        self.signals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
