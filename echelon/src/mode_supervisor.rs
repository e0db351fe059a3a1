//! Mode Supervisor (spec.md §4.7): recomputes `aggregate_confidence` from `FeedStatus` rows every
//! `MODE_CHECK_INTERVAL_S` and drives `ModeState` through the dwell-gated transition rules in
//! `echelon_risk::confidence`. Publishes `ModeChanged` onto the [`crate::event::EventBus`] on
//! every committed transition.

use crate::event::{Event, EventBus};
use chrono::{DateTime, Utc};
use echelon_domain::{FeedStatus, ModeState, Restrictions, SourceTier};
use echelon_risk::confidence::{aggregate_confidence, next_tier, HealthSample};
use std::sync::Arc;
use tokio::sync::watch;

/// A feed's source tier alongside its live status, as read from the Signal Store's feed registry.
pub type FeedSample = (SourceTier, FeedStatus);

/// Inputs the caller assembles once per health tick; kept separate from `HealthSample` because
/// `aggregate_confidence` still needs the raw per-feed rows, while `next_tier` only needs the
/// folded scalar plus dwell/category bookkeeping.
pub struct HealthTick {
    pub feeds: Vec<FeedSample>,
    pub unavailable_feed_categories: u32,
    pub critical_feed_down_for: Option<chrono::Duration>,
    pub stale_after: chrono::Duration,
}

/// Shared, broadcastable view of the live tier's [`Restrictions`] - the `Orchestrator` reads it
/// synchronously via [`ModeGate::restrictions`], and each spawned agent worker holds its own
/// [`watch::Receiver`] via [`ModeGate::subscribe`], so neither needs a direct handle to the
/// `ModeSupervisor` itself (spec.md §4.7's "Mode-2 restrictions enforced by the orchestrator").
pub struct ModeGate {
    tx: watch::Sender<Restrictions>,
}

impl Default for ModeGate {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(Restrictions::NONE);
        Self { tx }
    }
}

impl ModeGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restrictions(&self) -> Restrictions {
        *self.tx.borrow()
    }

    /// A live feed of restriction changes, for agent workers that need to react without polling.
    pub fn subscribe(&self) -> watch::Receiver<Restrictions> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, restrictions: Restrictions) {
        let _ = self.tx.send(restrictions);
    }
}

/// Owns the live [`ModeState`] and commits transitions onto the [`EventBus`] (spec.md §4.7).
pub struct ModeSupervisor {
    state: ModeState,
    bus: Arc<EventBus>,
    gate: Arc<ModeGate>,
}

impl ModeSupervisor {
    pub fn new(bus: Arc<EventBus>, gate: Arc<ModeGate>, now: DateTime<Utc>) -> Self {
        Self { state: ModeState::normal(now), bus, gate }
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    /// One health-check tick (spec.md §4.7): fold `tick.feeds` into `aggregate_confidence`,
    /// compute whether any single feed is individually stale, evaluate the dwell-gated
    /// transition rule, and commit + publish if a transition is due.
    pub fn tick(&mut self, tick: HealthTick, now: DateTime<Utc>) {
        let confidence = aggregate_confidence(&tick.feeds, now, tick.stale_after);
        let any_feed_stale = tick.feeds.iter().any(|(_, status)| status.is_stale(now, tick.stale_after));
        let dwell = now - self.state.entered_ts;

        let sample = HealthSample {
            aggregate_confidence: confidence,
            dwell,
            unavailable_feed_categories: tick.unavailable_feed_categories,
            critical_feed_down_for: tick.critical_feed_down_for,
            any_feed_stale,
        };

        self.state.aggregate_confidence = confidence;

        if let Some(next) = next_tier(self.state.tier, sample) {
            let from = self.state.tier;
            self.state.transition(next, now);
            self.gate.set(self.state.restrictions);
            self.bus.publish(Event::ModeChanged { from, to: next, ts: now });
        }
    }
}
