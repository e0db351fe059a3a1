use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Content-addressed identifier for a [`crate::signal::Signal`] - `blake3(source_tag || payload)`,
/// matching spec.md's "stable hash of source+payload". Computed by the ingester, never by the
/// store, so the store can treat `ingest` as a pure dedup-by-key operation.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, Constructor,
)]
pub struct SignalId(pub [u8; 32]);

impl SignalId {
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::LowerHex for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex())
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, Constructor, From,
)]
pub struct MarketId(pub u64);

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, Constructor, From,
)]
pub struct TimelineId(pub u64);

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, Constructor, From,
)]
pub struct AgentId(pub u64);

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, Constructor, From,
)]
pub struct TradeId(pub u64);

/// Either a user wallet or an agent - whoever owns a [`crate::position::Position`]. Modeled as a
/// sum type rather than a plain string so the Market Engine can distinguish "external wallet" vs
/// "internal agent" ownership without string-sniffing a prefix.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub enum OwnerRef {
    #[display("wallet:{_0}")]
    Wallet(SmolStr),
    #[display("agent:{_0}")]
    Agent(AgentId),
}

/// Idempotency key supplied by a caller to the Market Engine's `execute` operation. Opaque to
/// the domain crate; only equality/hash matter.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Display, From)]
pub struct IdempotencyKey(pub SmolStr);

impl From<&str> for IdempotencyKey {
    fn from(value: &str) -> Self {
        Self(SmolStr::from(value))
    }
}

impl From<String> for IdempotencyKey {
    fn from(value: String) -> Self {
        Self(SmolStr::from(value))
    }
}
