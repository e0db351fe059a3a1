use chrono::{DateTime, Utc};
use echelon_domain::{
    CapitalMode, EchelonError, EchelonResult, ErrorContext, OwnerRef, Timeline, TimelineId,
    TimelineStatus, Visibility,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Caller-supplied options for [`TimelineRegistry::fork_user`] (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct ForkUserConfig {
    pub visibility: UserVisibility,
    pub simulated_capital: Decimal,
    pub invite_list: Option<HashSet<OwnerRef>>,
    pub leaderboard_enabled: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UserVisibility {
    Private,
    Public,
}

struct TimelineEntry {
    timeline: Timeline,
    invite_list: Option<HashSet<OwnerRef>>,
    leaderboard_enabled: bool,
    /// (owner, realized P&L) - populated by callers as trades settle; the registry itself never
    /// computes P&L, it only ranks what it's told.
    realized_pnl: HashMap<OwnerRef, Decimal>,
}

/// Manages the four flavors of timeline (spec.md §3, §4.4): only `global_on_chain` timelines
/// carry `capital_mode = real`; every fork is `simulated` and never emits external-platform
/// orders.
pub struct TimelineRegistry {
    timelines: RwLock<HashMap<TimelineId, TimelineEntry>>,
    next_id: AtomicU64,
}

impl Default for TimelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineRegistry {
    pub fn new() -> Self {
        Self {
            timelines: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create the single root timeline. Not itself a "fork" in the registry's bookkeeping sense -
    /// it has no parent and is the only timeline ever created with `capital_mode = real`.
    pub fn genesis(&self, now: DateTime<Utc>) -> TimelineId {
        let id = TimelineId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let timeline = Timeline {
            id,
            parent_id: None,
            fork_point_state_hash: [0u8; 32],
            created_ts: now,
            expiry_ts: None,
            visibility: Visibility::GlobalOnChain,
            status: TimelineStatus::Active,
            capital_mode: CapitalMode::Real,
            creator: OwnerRef::Wallet("genesis".into()),
            stability: 1.0,
            logic_gap: 0.0,
        };
        self.timelines.write().insert(
            id,
            TimelineEntry {
                timeline,
                invite_list: None,
                leaderboard_enabled: false,
                realized_pnl: HashMap::new(),
            },
        );
        id
    }

    /// Fork the global timeline, seeding deterministically from `(parent.fork_point_state_hash,
    /// vrf_randomness)` (spec.md §4.4).
    pub fn fork_global(
        &self,
        source_timeline: TimelineId,
        vrf_randomness: [u8; 32],
        duration_s: i64,
        now: DateTime<Utc>,
    ) -> EchelonResult<TimelineId> {
        let parent_hash = {
            let timelines = self.timelines.read();
            let parent = timelines.get(&source_timeline).ok_or_else(|| EchelonError::NotFound {
                reason: "source timeline not found".into(),
                context: ErrorContext::timeline(source_timeline),
            })?;
            parent.timeline.fork_point_state_hash
        };

        let fork_point_state_hash = derive_fork_hash(&parent_hash, &vrf_randomness);
        let id = TimelineId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let timeline = Timeline {
            id,
            parent_id: Some(source_timeline),
            fork_point_state_hash,
            created_ts: now,
            expiry_ts: Some(now + chrono::Duration::seconds(duration_s)),
            visibility: Visibility::GlobalOnChain,
            status: TimelineStatus::Active,
            capital_mode: CapitalMode::Real,
            creator: OwnerRef::Wallet("orchestrator".into()),
            stability: 1.0,
            logic_gap: 0.0,
        };
        self.timelines.write().insert(
            id,
            TimelineEntry {
                timeline,
                invite_list: None,
                leaderboard_enabled: false,
                realized_pnl: HashMap::new(),
            },
        );
        Ok(id)
    }

    /// Fork an off-chain, simulated-capital timeline (spec.md §4.4).
    pub fn fork_user(
        &self,
        owner: OwnerRef,
        source_timeline: TimelineId,
        config: ForkUserConfig,
        now: DateTime<Utc>,
    ) -> EchelonResult<TimelineId> {
        let parent_hash = {
            let timelines = self.timelines.read();
            let parent = timelines.get(&source_timeline).ok_or_else(|| EchelonError::NotFound {
                reason: "source timeline not found".into(),
                context: ErrorContext::timeline(source_timeline),
            })?;
            parent.timeline.fork_point_state_hash
        };

        let visibility = match config.visibility {
            UserVisibility::Private => Visibility::UserPrivate,
            UserVisibility::Public => Visibility::UserPublic,
        };

        let id = TimelineId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let timeline = Timeline {
            id,
            parent_id: Some(source_timeline),
            fork_point_state_hash: derive_fork_hash(&parent_hash, &[0u8; 32]),
            created_ts: now,
            expiry_ts: None,
            visibility,
            status: TimelineStatus::Active,
            capital_mode: CapitalMode::Simulated,
            creator: owner,
            stability: 1.0,
            logic_gap: 0.0,
        };
        self.timelines.write().insert(
            id,
            TimelineEntry {
                timeline,
                invite_list: config.invite_list,
                leaderboard_enabled: config.leaderboard_enabled,
                realized_pnl: HashMap::new(),
            },
        );
        Ok(id)
    }

    /// Whether `owner` may trade on `timeline_id` (spec.md §8 property P7): true for
    /// `global_on_chain`/`user_public`; for `user_private`, true iff `owner` is the creator or on
    /// the invite list.
    pub fn can_participate(&self, owner: &OwnerRef, timeline_id: TimelineId) -> EchelonResult<bool> {
        let timelines = self.timelines.read();
        let entry = timelines.get(&timeline_id).ok_or_else(|| EchelonError::NotFound {
            reason: "timeline not found".into(),
            context: ErrorContext::timeline(timeline_id),
        })?;
        Ok(match entry.timeline.visibility {
            Visibility::GlobalOnChain | Visibility::UserPublic => true,
            Visibility::UserPrivate | Visibility::AgentSandbox => {
                owner == &entry.timeline.creator
                    || entry.invite_list.as_ref().is_some_and(|list| list.contains(owner))
            }
        })
    }

    pub fn record_realized_pnl(&self, timeline_id: TimelineId, owner: OwnerRef, pnl: Decimal) -> EchelonResult<()> {
        let mut timelines = self.timelines.write();
        let entry = timelines.get_mut(&timeline_id).ok_or_else(|| EchelonError::NotFound {
            reason: "timeline not found".into(),
            context: ErrorContext::timeline(timeline_id),
        })?;
        *entry.realized_pnl.entry(owner).or_insert(Decimal::ZERO) += pnl;
        Ok(())
    }

    /// Participants ranked by realized P&L, richest first.
    pub fn leaderboard(&self, timeline_id: TimelineId) -> EchelonResult<Vec<(OwnerRef, Decimal)>> {
        let timelines = self.timelines.read();
        let entry = timelines.get(&timeline_id).ok_or_else(|| EchelonError::NotFound {
            reason: "timeline not found".into(),
            context: ErrorContext::timeline(timeline_id),
        })?;
        let mut ranked: Vec<(OwnerRef, Decimal)> =
            entry.realized_pnl.iter().map(|(owner, pnl)| (owner.clone(), *pnl)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }

    /// Mark a timeline reaped; its markets move to `voided` in `echelon-market` separately - the
    /// registry only owns the timeline's own lifecycle bit.
    pub fn reap(&self, timeline_id: TimelineId, _reason: &str) -> EchelonResult<()> {
        let mut timelines = self.timelines.write();
        let entry = timelines.get_mut(&timeline_id).ok_or_else(|| EchelonError::NotFound {
            reason: "timeline not found".into(),
            context: ErrorContext::timeline(timeline_id),
        })?;
        entry.timeline.status = TimelineStatus::Reaped;
        Ok(())
    }

    pub fn get(&self, timeline_id: TimelineId) -> EchelonResult<Timeline> {
        self.timelines
            .read()
            .get(&timeline_id)
            .map(|entry| entry.timeline.clone())
            .ok_or_else(|| EchelonError::NotFound {
                reason: "timeline not found".into(),
                context: ErrorContext::timeline(timeline_id),
            })
    }
}

fn derive_fork_hash(parent_hash: &[u8; 32], vrf_randomness: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(parent_hash);
    hasher.update(vrf_randomness);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_property_p7_visibility() {
        let registry = TimelineRegistry::new();
        let now = Utc::now();
        let root = registry.genesis(now);
        let alice = OwnerRef::Wallet("alice".into());
        let bob = OwnerRef::Wallet("bob".into());
        let mut invite_list = HashSet::new();
        invite_list.insert(bob.clone());

        let fork = registry
            .fork_user(
                alice.clone(),
                root,
                ForkUserConfig {
                    visibility: UserVisibility::Private,
                    simulated_capital: dec!(1000),
                    invite_list: Some(invite_list),
                    leaderboard_enabled: true,
                },
                now,
            )
            .unwrap();

        assert!(registry.can_participate(&alice, fork).unwrap());
        assert!(registry.can_participate(&bob, fork).unwrap());
        let carol = OwnerRef::Wallet("carol".into());
        assert!(!registry.can_participate(&carol, fork).unwrap());
    }

    #[test]
    fn test_global_fork_is_real_capital() {
        let registry = TimelineRegistry::new();
        let now = Utc::now();
        let root = registry.genesis(now);
        let fork = registry.fork_global(root, [7u8; 32], 3600, now).unwrap();
        let timeline = registry.get(fork).unwrap();
        assert!(timeline.is_real_capital());
    }

    #[test]
    fn test_leaderboard_ranks_by_pnl_descending() {
        let registry = TimelineRegistry::new();
        let now = Utc::now();
        let root = registry.genesis(now);
        let alice = OwnerRef::Wallet("alice".into());
        let bob = OwnerRef::Wallet("bob".into());
        let fork = registry
            .fork_user(
                alice.clone(),
                root,
                ForkUserConfig {
                    visibility: UserVisibility::Public,
                    simulated_capital: dec!(1000),
                    invite_list: None,
                    leaderboard_enabled: true,
                },
                now,
            )
            .unwrap();
        registry.record_realized_pnl(fork, alice.clone(), dec!(10)).unwrap();
        registry.record_realized_pnl(fork, bob.clone(), dec!(50)).unwrap();

        let board = registry.leaderboard(fork).unwrap();
        assert_eq!(board[0].0, bob);
        assert_eq!(board[1].0, alice);
    }

    #[test]
    fn test_reap_marks_status() {
        let registry = TimelineRegistry::new();
        let now = Utc::now();
        let root = registry.genesis(now);
        registry.reap(root, "impossible").unwrap();
        assert_eq!(registry.get(root).unwrap().status, TimelineStatus::Reaped);
    }
}
