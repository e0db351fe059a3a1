use crate::ids::SignalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Data tier an OSINT source is published under - affects the per-source confidence weighting
/// used by the Mode Supervisor (spec.md §4.7).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum SourceTier {
    Premium,
    Free,
    Decentralized,
}

/// One immutable OSINT observation (spec.md §3). Constructed by an ingester; `id` is a
/// content-addressed hash over `source_tag` and `payload` so re-ingestion of the same
/// observation is always detectable without holding it in memory first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub source_tag: SmolStr,
    pub ts: DateTime<Utc>,
    pub topic: SmolStr,
    pub confidence: f64,
    pub payload: Vec<u8>,
    pub tier: SourceTier,
}

impl Signal {
    /// Construct a [`Signal`], deriving its [`SignalId`] from `source_tag` and `payload`.
    ///
    /// `confidence` is clamped to `[0, 1]` - callers at the ingestion boundary may compute it
    /// from an upstream score that is not already normalized.
    pub fn new(
        source_tag: impl Into<SmolStr>,
        ts: DateTime<Utc>,
        topic: impl Into<SmolStr>,
        confidence: f64,
        payload: Vec<u8>,
        tier: SourceTier,
    ) -> Self {
        let source_tag = source_tag.into();
        let id = Self::derive_id(&source_tag, &payload);
        Self {
            id,
            source_tag,
            ts,
            topic: topic.into(),
            confidence: confidence.clamp(0.0, 1.0),
            payload,
            tier,
        }
    }

    pub fn derive_id(source_tag: &str, payload: &[u8]) -> SignalId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source_tag.as_bytes());
        hasher.update(b"\0");
        hasher.update(payload);
        SignalId(*hasher.finalize().as_bytes())
    }
}
