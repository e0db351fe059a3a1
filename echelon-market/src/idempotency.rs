use chrono::{DateTime, Utc};
use echelon_domain::{IdempotencyKey, TradeId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// What `execute` returns, whether this is the first presentation of a key or a replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecuteReceipt {
    pub trade_id: TradeId,
    pub realized_price: Decimal,
    pub shares: Decimal,
}

struct Entry {
    receipt: ExecuteReceipt,
    recorded_ts: DateTime<Utc>,
}

/// Per-market idempotency cache: remembers `idempotency_key -> trade receipt` for at least
/// `T_idem_s` (spec.md §4.3 default 15 minutes), so a re-presented key returns the original
/// trade instead of executing twice.
pub struct IdempotencyCache {
    ttl: chrono::Duration,
    entries: HashMap<IdempotencyKey, Entry>,
}

impl IdempotencyCache {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the cached receipt for `key` if present and not expired as of `now`.
    pub fn get(&mut self, key: &IdempotencyKey, now: DateTime<Utc>) -> Option<ExecuteReceipt> {
        self.evict_expired(now);
        self.entries.get(key).map(|entry| entry.receipt)
    }

    pub fn insert(&mut self, key: IdempotencyKey, receipt: ExecuteReceipt, now: DateTime<Utc>) {
        self.entries.insert(key, Entry { receipt, recorded_ts: now });
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.recorded_ts < ttl);
    }
}
