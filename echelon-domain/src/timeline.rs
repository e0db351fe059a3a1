use crate::ids::{OwnerRef, TimelineId};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Who can see and trade on a [`Timeline`] (spec.md §3). `GlobalOnChain` is the one shared
/// real-capital timeline; every other variant scopes a fork's visibility to its creator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum Visibility {
    GlobalOnChain,
    UserPrivate,
    UserPublic,
    AgentSandbox,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum TimelineStatus {
    Active,
    Resolved,
    Reaped,
}

/// Whether trades on a [`Timeline`] move real capital or simulated chips (spec.md §3). Only
/// `GlobalOnChain`/`UserPublic` timelines may carry `Real` - enforced by `echelon-timeline`, not
/// this type.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum CapitalMode {
    Real,
    Simulated,
}

/// A branch of event-history state (spec.md §3). `GlobalOnChain` is created once at genesis and
/// never forked from again in the same way a user/agent fork is; `parent_id` is `None` only for
/// that root timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub id: TimelineId,
    pub parent_id: Option<TimelineId>,
    pub fork_point_state_hash: [u8; 32],
    pub created_ts: DateTime<Utc>,
    pub expiry_ts: Option<DateTime<Utc>>,
    pub visibility: Visibility,
    pub status: TimelineStatus,
    pub capital_mode: CapitalMode,
    pub creator: OwnerRef,
    /// How far this fork's narrative has diverged from its parent, in `[0, 1]` - feeds into
    /// `stability` decay the longer a fork stays unresolved without fresh signal confirmation.
    pub stability: f64,
    /// Accumulated narrative inconsistency; a fork whose `logic_gap` crosses the reap threshold
    /// is a candidate for garbage collection regardless of `expiry_ts`.
    pub logic_gap: f64,
}

impl Timeline {
    pub fn is_real_capital(&self) -> bool {
        matches!(self.capital_mode, CapitalMode::Real)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_ts.is_some_and(|expiry| now >= expiry)
    }

    /// Whether `owner` may place trades on this timeline. The global on-chain timeline and public
    /// user forks are open to anyone; private/sandbox forks are restricted to their creator.
    pub fn can_participate(&self, owner: &OwnerRef) -> bool {
        match self.visibility {
            Visibility::GlobalOnChain | Visibility::UserPublic => true,
            Visibility::UserPrivate | Visibility::AgentSandbox => owner == &self.creator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(visibility: Visibility, creator: OwnerRef) -> Timeline {
        Timeline {
            id: TimelineId(1),
            parent_id: Some(TimelineId(0)),
            fork_point_state_hash: [0u8; 32],
            created_ts: Utc::now(),
            expiry_ts: None,
            visibility,
            status: TimelineStatus::Active,
            capital_mode: CapitalMode::Simulated,
            creator,
            stability: 1.0,
            logic_gap: 0.0,
        }
    }

    #[test]
    fn test_private_fork_excludes_non_creator() {
        let alice = OwnerRef::Wallet("alice".into());
        let bob = OwnerRef::Wallet("bob".into());
        let timeline = base(Visibility::UserPrivate, alice.clone());
        assert!(timeline.can_participate(&alice));
        assert!(!timeline.can_participate(&bob));
    }

    #[test]
    fn test_global_timeline_is_open_to_anyone() {
        let alice = OwnerRef::Wallet("alice".into());
        let bob = OwnerRef::Wallet("bob".into());
        let timeline = base(Visibility::GlobalOnChain, alice);
        assert!(timeline.can_participate(&bob));
    }

    #[test]
    fn test_expiry_check() {
        let mut timeline = base(Visibility::UserPublic, OwnerRef::Wallet("alice".into()));
        let now = Utc::now();
        timeline.expiry_ts = Some(now - chrono::Duration::seconds(1));
        assert!(timeline.is_expired(now));
    }
}
