//! Event Orchestrator (spec.md §4.7, §6): the single handle the CLI/edge surface calls into.
//! Consumes from the Signal Store and Platform Adapter, drives the Market Engine, Timeline
//! Registry, and Agent Scheduler, and publishes every state change onto the [`EventBus`]. No HTTP
//! framework dependency lives here - the edge-facing operations are plain async methods, matching
//! spec.md §6's "the core exposes the edge-facing operations as plain async functions".

use crate::event::{Event, EventBus};
use crate::mode_supervisor::ModeGate;
use chrono::{DateTime, Utc};
use echelon_agents::{spawn_agent_worker, AgentWorkerHandle, AgentWorkerSpec, FairnessScheduler};
use echelon_domain::{
    Agent, AgentId, EchelonError, EchelonResult, ErrorContext, IdempotencyKey, MarketId, OwnerRef, Restrictions,
    Side, TimelineId,
};
use echelon_market::{MarketEngine, SettlementMode};
use echelon_risk::SabotageCapTracker;
use echelon_signals::SignalStore;
use echelon_timeline::TimelineRegistry;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The Event Orchestration Core's top-level handle. Each field is an `Arc` so the CLI, the Agent
/// Scheduler's tick loop, and the Mode Supervisor can all hold a cheap clone (spec.md §5: workers
/// share state via `Arc` handles, coordinated over bounded channels).
#[derive(Clone)]
pub struct Orchestrator {
    pub market: Arc<MarketEngine>,
    pub timelines: Arc<TimelineRegistry>,
    pub signals: Arc<SignalStore>,
    pub bus: Arc<EventBus>,
    pub mode_gate: Arc<ModeGate>,
    pub fairness: Arc<FairnessScheduler>,
    /// Shared across every spawned worker so the hourly sabotage cap is enforced per agent across
    /// the whole population, not per-worker (spec.md §3, §4.6).
    pub sabotage_tracker: Arc<SabotageCapTracker>,
    agents: Arc<Mutex<HashMap<AgentId, AgentWorkerHandle>>>,
}

impl Orchestrator {
    pub fn new(
        market: Arc<MarketEngine>,
        timelines: Arc<TimelineRegistry>,
        signals: Arc<SignalStore>,
        bus: Arc<EventBus>,
        mode_gate: Arc<ModeGate>,
    ) -> Self {
        Self::with_fairness(market, timelines, signals, bus, mode_gate, default_fairness_scheduler())
    }

    pub fn with_fairness(
        market: Arc<MarketEngine>,
        timelines: Arc<TimelineRegistry>,
        signals: Arc<SignalStore>,
        bus: Arc<EventBus>,
        mode_gate: Arc<ModeGate>,
        fairness: Arc<FairnessScheduler>,
    ) -> Self {
        Self {
            market,
            timelines,
            signals,
            bus,
            mode_gate,
            fairness,
            sabotage_tracker: Arc::new(SabotageCapTracker::new()),
            agents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawn an independent worker task for `spec.agent` (spec.md §4.6: "one logical worker per
    /// live agent"). The worker reads Mode restrictions live off the [`ModeGate`] and is gated by
    /// the shared fairness budget; call [`Orchestrator::cancel_agent`] to stop it explicitly.
    pub fn spawn_agent(&self, mut spec: AgentWorkerSpec, tick_interval: Duration) -> AgentId {
        spec.risk.sabotage_tracker = self.sabotage_tracker.clone();
        let id = spec.agent.id;
        let handle = spawn_agent_worker(
            spec,
            self.market.clone(),
            self.signals.clone(),
            self.fairness.clone(),
            self.mode_gate.subscribe(),
            tick_interval,
        );
        self.agents.lock().unwrap().insert(id, handle);
        id
    }

    /// Stop `agent_id`'s worker and return its final state, or `None` if no such agent is running.
    pub async fn cancel_agent(&self, agent_id: AgentId) -> Option<Agent> {
        let handle = self.agents.lock().unwrap().remove(&agent_id)?;
        Some(handle.cancel().await)
    }

    fn require_unrestricted(&self, flag: Restrictions, reason: &str) -> EchelonResult<()> {
        if self.mode_gate.restrictions().contains(flag) {
            return Err(EchelonError::InvalidTransition { reason: reason.to_string(), context: ErrorContext::default() });
        }
        Ok(())
    }

    /// `POST /timelines/fork` (Global variant, spec.md §6): fork the global on-chain timeline and
    /// publish `TimelineForked`. Suspended in Mode 2 (spec.md §4.7: "suspend fork-market creation").
    pub fn fork_global_timeline(
        &self,
        source_timeline: TimelineId,
        vrf_randomness: [u8; 32],
        duration_s: i64,
        now: DateTime<Utc>,
    ) -> EchelonResult<TimelineId> {
        self.require_unrestricted(Restrictions::NO_NEW_TIMELINES, "timeline forking suspended under Mode 2")?;
        let forked = self.timelines.fork_global(source_timeline, vrf_randomness, duration_s, now)?;
        self.bus.publish(Event::TimelineForked { timeline_id: forked, parent_id: Some(source_timeline), ts: now });
        Ok(forked)
    }

    /// `POST /markets/{id}/quote`: advisory pricing, no state mutation or event.
    pub async fn quote(&self, market_id: MarketId, outcome_idx: usize, quote_amount: Decimal, side: Side) -> EchelonResult<echelon_market::Quote> {
        self.market.quote(market_id, outcome_idx, quote_amount, side).await
    }

    /// Create a market on `timeline_id` and publish `MarketCreated`. Suspended in Mode 2
    /// (spec.md §4.7: "suspend new-timeline creation, suspend fork-market creation").
    pub fn create_market(&self, timeline_id: TimelineId, outcomes: Vec<String>, seed_liquidity: Decimal, now: DateTime<Utc>) -> EchelonResult<MarketId> {
        self.require_unrestricted(Restrictions::NO_NEW_MARKETS, "market creation suspended under Mode 2")?;
        let market_id = self.market.create_market(timeline_id, outcomes, seed_liquidity, now)?;
        self.bus.publish(Event::MarketCreated { market_id, timeline_id, ts: now });
        Ok(market_id)
    }

    /// `POST /markets/{id}/bet`: execute a trade and publish `TradeExecuted`.
    #[allow(clippy::too_many_arguments)]
    pub async fn bet(
        &self,
        market_id: MarketId,
        outcome_idx: usize,
        amount: Decimal,
        side: Side,
        owner: OwnerRef,
        idempotency_key: IdempotencyKey,
        now: DateTime<Utc>,
    ) -> EchelonResult<echelon_market::ExecuteResult> {
        let result = match self.market.execute(market_id, outcome_idx, amount, side, owner, idempotency_key, now).await {
            Ok(result) => result,
            Err(err) => {
                if err.is_fatal() {
                    self.bus.publish(Event::EmergencyHalt { market_id, reason: err.to_string(), ts: now });
                }
                return Err(err);
            }
        };
        if !result.replay {
            self.bus.publish(Event::TradeExecuted {
                trade_id: result.trade_id,
                market_id,
                realized_price: result.realized_price,
                shares: result.shares,
                ts: now,
            });
        }
        Ok(result)
    }

    /// Ingest one OSINT signal and publish `SignalIngested` on a fresh ingest (dedup replays are
    /// silent, matching the Signal Store's idempotent-by-content-hash contract).
    pub fn ingest_signal(&self, signal: echelon_domain::Signal, now: DateTime<Utc>) -> EchelonResult<()> {
        let signal_id = signal.id;
        let topic = signal.topic.to_string();
        if matches!(self.signals.ingest(signal)?, echelon_signals::IngestOutcome::Inserted) {
            self.bus.publish(Event::SignalIngested { signal_id, topic, ts: now });
        }
        Ok(())
    }

    /// Reap a timeline (spec.md §4.4): void every still-open market on it, refunding positions at
    /// cost basis for simulated-capital timelines or against last spot for the real on-chain
    /// timeline, then mark the timeline itself reaped. Publishes `PositionUpdated` per refunded
    /// position and `TimelineReaped` last.
    pub async fn reap_timeline(&self, timeline_id: TimelineId, reason: &str, now: DateTime<Utc>) -> EchelonResult<()> {
        let timeline = self.timelines.get(timeline_id)?;
        let settlement = if timeline.is_real_capital() { SettlementMode::LastSpot } else { SettlementMode::CostBasis };

        let voided = self.market.void_timeline(timeline_id, settlement, now).await;
        for (market_id, refunds) in voided {
            for refund in refunds {
                self.bus.publish(Event::PositionUpdated { market_id, outcome_idx: refund.outcome_idx, ts: now });
            }
        }

        self.timelines.reap(timeline_id, reason)?;
        self.bus.publish(Event::TimelineReaped { timeline_id, reason: reason.to_string(), ts: now });
        Ok(())
    }

    /// Record a feed error and publish `FeedDegraded` once `feed_tag` has accumulated
    /// `degraded_after` consecutive errors (spec.md §4.7).
    pub fn report_feed_error(&self, feed_tag: &str, degraded_after: u32, now: DateTime<Utc>) -> EchelonResult<()> {
        self.signals.touch_err(feed_tag);
        let status = self.signals.feed_status(feed_tag)?;
        if status.consecutive_errors >= degraded_after {
            self.bus.publish(Event::FeedDegraded {
                feed_tag: feed_tag.to_string(),
                consecutive_errors: status.consecutive_errors,
                ts: now,
            });
        }
        Ok(())
    }
}

/// A `FairnessScheduler` with the documented defaults (spec.md §6's `AGENT_TICK_MS = 1000`, no
/// archetype may consume more than 40% of a 60-second window) - callers wiring a real `AGENT_TICK_MS`
/// from [`crate::config::EchelonConfig`] should build their own via `FairnessScheduler::new`.
fn default_fairness_scheduler() -> Arc<FairnessScheduler> {
    Arc::new(FairnessScheduler::new(Duration::from_secs(60), 1000, 0.4))
}
