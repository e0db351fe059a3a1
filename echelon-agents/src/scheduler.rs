//! Spawns one logical worker per live agent as an independent `tokio` task with a bounded,
//! explicit cancellation handle, matching spec.md §9's "coroutine-like agent loops... independent
//! long-running workers with bounded inboxes; cancellation is explicit". Each worker reads live
//! Mode restrictions off a `watch` channel rather than holding a direct handle to the Mode
//! Supervisor, the same decoupling `ModeGate` provides to the Orchestrator.

use crate::fairness::FairnessScheduler;
use crate::worker::{tick, RiskConfig, TickContext, TickOutcome};
use chrono::{Duration as ChronoDuration, Utc};
use echelon_domain::{Agent, MarketId, OwnerRef, Restrictions};
use echelon_market::MarketEngine;
use echelon_risk::{DEFAULT_MAX_INACTIVITY, DEFAULT_PNL_FLOOR, SabotageCapTracker};
use echelon_signals::SignalStore;
use echelon_strategy::ArchetypePolicy;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owned death-rule and sabotage-cap configuration for one worker (spec.md §9, §3). The tracker
/// is an `Arc` so a single hourly sabotage budget can be shared across every worker the
/// Orchestrator spawns for the same agent population.
pub struct AgentRiskSpec {
    pub sabotage_tracker: Arc<SabotageCapTracker>,
    pub sabotage_cap_per_hour: u32,
    pub pnl_floor: Decimal,
    pub max_inactivity: ChronoDuration,
}

impl Default for AgentRiskSpec {
    fn default() -> Self {
        Self {
            sabotage_tracker: Arc::new(SabotageCapTracker::new()),
            sabotage_cap_per_hour: 5,
            pnl_floor: Decimal::from(DEFAULT_PNL_FLOOR),
            max_inactivity: DEFAULT_MAX_INACTIVITY,
        }
    }
}

/// Everything one spawned worker needs to own for the lifetime of its task - no borrowed data
/// crosses the `tokio::spawn` boundary.
pub struct AgentWorkerSpec {
    pub agent: Agent,
    pub policy: Box<dyn ArchetypePolicy + Send>,
    pub market_id: MarketId,
    pub topics: Vec<String>,
    pub lookback: ChronoDuration,
    pub signal_limit: usize,
    pub timeline_prior: HashMap<usize, f64>,
    pub base_size: Decimal,
    pub cooldown: ChronoDuration,
    pub owner: OwnerRef,
    pub risk: AgentRiskSpec,
}

/// Handle to a spawned agent worker.
pub struct AgentWorkerHandle {
    cancel: watch::Sender<bool>,
    join: JoinHandle<Agent>,
}

impl AgentWorkerHandle {
    /// Signal the worker to stop after its in-flight tick (if any) and return the agent's final
    /// state. Matches spec.md §9's "cancellation is explicit" - no task is ever aborted mid-tick.
    pub async fn cancel(self) -> Agent {
        let _ = self.cancel.send(true);
        self.join.await.expect("agent worker task panicked")
    }
}

/// Spawn one worker ticking `spec.agent` every `tick_interval` against `market`/`signals`, gated
/// by the shared `fairness` budget and the live `restrictions` watch (spec.md §4.6).
pub fn spawn_agent_worker(
    mut spec: AgentWorkerSpec,
    market: Arc<MarketEngine>,
    signals: Arc<SignalStore>,
    fairness: Arc<FairnessScheduler>,
    mut restrictions: watch::Receiver<Restrictions>,
    tick_interval: Duration,
) -> AgentWorkerHandle {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let archetype = spec.agent.archetype;
                    let cost_ms = tick_interval.as_millis() as u64;
                    if fairness.try_consume(archetype, cost_ms, Instant::now()) {
                        let now = Utc::now();
                        let topics: Vec<&str> = spec.topics.iter().map(String::as_str).collect();
                        let ctx = TickContext {
                            market_id: spec.market_id,
                            topics: &topics,
                            since_ts: now - spec.lookback,
                            signal_limit: spec.signal_limit,
                            timeline_prior: &spec.timeline_prior,
                            base_size: spec.base_size,
                            cooldown: spec.cooldown,
                            owner: spec.owner.clone(),
                            restrictions: *restrictions.borrow(),
                            risk: RiskConfig {
                                sabotage_tracker: &spec.risk.sabotage_tracker,
                                sabotage_cap_per_hour: spec.risk.sabotage_cap_per_hour,
                                pnl_floor: spec.risk.pnl_floor,
                                max_inactivity: spec.risk.max_inactivity,
                                failed_paradox_extraction: false,
                            },
                        };
                        match tick(&mut spec.agent, spec.policy.as_mut(), &signals, &market, &ctx, now).await {
                            Ok(TickOutcome::Dead(reason)) => {
                                tracing::info!(agent_id = %spec.agent.id, %reason, "agent terminated, worker stopping");
                                break;
                            }
                            Ok(_) => {}
                            Err(err) => {
                                tracing::debug!(agent_id = %spec.agent.id, %err, "agent tick rejected");
                            }
                        }
                    }
                }
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        break;
                    }
                }
            }
        }
        spec.agent
    });

    AgentWorkerHandle { cancel: cancel_tx, join }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echelon_domain::{AgentId, Archetype, SourceTier, Signal, TimelineId};
    use echelon_strategy::SpyPolicy;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn worker_ticks_until_cancelled_and_returns_final_agent_state() {
        let market = Arc::new(MarketEngine::default());
        let market_id = market
            .create_market(TimelineId(1), vec!["YES".into(), "NO".into()], dec!(2000), Utc::now())
            .unwrap();
        let signals = Arc::new(SignalStore::new());
        signals.ingest(Signal::new("src", Utc::now(), "t", 0.9, vec![], SourceTier::Premium)).unwrap();

        let fairness = Arc::new(FairnessScheduler::new(Duration::from_secs(60), 1000, 1.0));
        let (_restrictions_tx, restrictions_rx) = watch::channel(Restrictions::NONE);

        let spec = AgentWorkerSpec {
            agent: Agent::spawn(AgentId(1), Archetype::Spy, dec!(1000), 0, vec![]),
            policy: Box::new(SpyPolicy::new(300)),
            market_id,
            topics: vec!["t".into()],
            lookback: ChronoDuration::hours(1),
            signal_limit: 10,
            timeline_prior: HashMap::new(),
            base_size: dec!(10),
            cooldown: ChronoDuration::seconds(0),
            owner: OwnerRef::Wallet("alice".into()),
            risk: AgentRiskSpec::default(),
        };

        let handle = spawn_agent_worker(spec, market, signals, fairness, restrictions_rx, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        let agent = handle.cancel().await;

        assert!(agent.last_action_ts.is_some());
        assert!(agent.budget_remaining < dec!(1000));
    }

    #[tokio::test]
    async fn worker_respects_a_live_restriction_update() {
        let market = Arc::new(MarketEngine::default());
        let market_id = market
            .create_market(TimelineId(1), vec!["YES".into(), "NO".into()], dec!(2000), Utc::now())
            .unwrap();
        let signals = Arc::new(SignalStore::new());
        let fairness = Arc::new(FairnessScheduler::new(Duration::from_secs(60), 1000, 1.0));
        let (restrictions_tx, restrictions_rx) = watch::channel(Restrictions::NONE);
        restrictions_tx.send(Restrictions::NO_NEW_SABOTEURS).unwrap();

        let spec = AgentWorkerSpec {
            agent: Agent::spawn(AgentId(2), Archetype::Saboteur, dec!(1000), 0, vec![]),
            policy: Box::new(echelon_strategy::SaboteurPolicy),
            market_id,
            topics: vec!["t".into()],
            lookback: ChronoDuration::hours(1),
            signal_limit: 10,
            timeline_prior: HashMap::new(),
            base_size: dec!(10),
            cooldown: ChronoDuration::seconds(0),
            owner: OwnerRef::Wallet("alice".into()),
            risk: AgentRiskSpec::default(),
        };

        let handle = spawn_agent_worker(spec, market, signals, fairness, restrictions_rx, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let agent = handle.cancel().await;

        // Sabotage stayed disabled for the worker's whole lifetime, so it never committed a trade.
        assert_eq!(agent.budget_remaining, dec!(1000));
        assert!(agent.last_action_ts.is_none());
    }

    #[tokio::test]
    async fn worker_stops_rescheduling_a_dead_agent() {
        let market = Arc::new(MarketEngine::default());
        let market_id = market
            .create_market(TimelineId(1), vec!["YES".into(), "NO".into()], dec!(2000), Utc::now())
            .unwrap();
        let signals = Arc::new(SignalStore::new());
        let fairness = Arc::new(FairnessScheduler::new(Duration::from_secs(60), 1000, 1.0));
        let (_restrictions_tx, restrictions_rx) = watch::channel(Restrictions::NONE);

        let mut agent = Agent::spawn(AgentId(3), Archetype::Shark, dec!(1000), 0, vec![]);
        agent.budget_remaining = dec!(0);
        let spec = AgentWorkerSpec {
            agent,
            policy: Box::new(SpyPolicy::new(300)),
            market_id,
            topics: vec!["t".into()],
            lookback: ChronoDuration::hours(1),
            signal_limit: 10,
            timeline_prior: HashMap::new(),
            base_size: dec!(10),
            cooldown: ChronoDuration::seconds(0),
            owner: OwnerRef::Wallet("alice".into()),
            risk: AgentRiskSpec { pnl_floor: dec!(-500), ..AgentRiskSpec::default() },
        };

        let handle = spawn_agent_worker(spec, market, signals, fairness, restrictions_rx, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        let agent = handle.cancel().await;

        // The loop broke on the first Dead tick rather than spinning forever on a dead agent.
        assert!(agent.last_action_ts.is_none());
    }
}
