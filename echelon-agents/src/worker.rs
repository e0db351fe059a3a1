use chrono::{DateTime, Duration, Utc};
use echelon_domain::{Agent, Archetype, EchelonError, EchelonResult, ErrorContext, IdempotencyKey, MarketId, OwnerRef, Restrictions};
use echelon_market::{ExecuteResult, MarketEngine};
use echelon_risk::{check_death, DeathReason, SabotageCapTracker};
use echelon_signals::SignalStore;
use echelon_strategy::{ArchetypePolicy, Decision, PolicyInput};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Bounded, symmetric sanity adjustment applied per tick (spec.md §4.6 step 6: "adjust sanity by
/// a bounded delta").
pub const SANITY_DELTA_ACT: f64 = -1.0;
pub const SANITY_DELTA_NOOP: f64 = -0.1;

/// What one scheduler tick produced for an agent (spec.md §4.6's six steps, folded into a single
/// result the caller logs/publishes).
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Step 1: `sanity <= 0` or `budget_remaining <= 0`.
    Dormant,
    /// Terminated outright this tick (spec.md §9 death mechanics) - the caller must not
    /// reschedule this agent again.
    Dead(DeathReason),
    /// Step 2: `last_action_ts + archetype_cooldown > now`.
    CooldownNotElapsed,
    /// Step 4 decided `NO_OP`.
    NoOp,
    /// Steps 5-6 committed a trade.
    Acted { decision: Decision, result: ExecuteResult },
}

/// Death-rule and sabotage-cap inputs for one tick (spec.md §9, §3's `K_sabotage/h/agent`
/// invariant). Kept separate from the rest of [`TickContext`] since it's the one group of fields
/// a caller typically holds behind a shared `Arc` rather than owning outright.
pub struct RiskConfig<'a> {
    pub sabotage_tracker: &'a SabotageCapTracker,
    pub sabotage_cap_per_hour: u32,
    pub pnl_floor: Decimal,
    pub max_inactivity: Duration,
    /// Set by a paradox-extraction subsystem; always `false` until one exists.
    pub failed_paradox_extraction: bool,
}

/// Everything one tick needs to fetch Signal Store state and drive the Market Engine, beyond the
/// policy itself.
pub struct TickContext<'a> {
    pub market_id: MarketId,
    pub topics: &'a [&'a str],
    pub since_ts: DateTime<Utc>,
    pub signal_limit: usize,
    pub timeline_prior: &'a HashMap<usize, f64>,
    pub base_size: Decimal,
    pub cooldown: Duration,
    pub owner: OwnerRef,
    /// Restrictions the live Mode tier currently imposes (spec.md §4.7: "Mode-2 restrictions
    /// enforced by the orchestrator: disable sabotage actions...").
    pub restrictions: Restrictions,
    pub risk: RiskConfig<'a>,
}

/// Run one Agent Scheduler tick for `agent` against `signals`/`market` (spec.md §4.6).
pub async fn tick(
    agent: &mut Agent,
    policy: &mut dyn ArchetypePolicy,
    signals: &SignalStore,
    market: &MarketEngine,
    ctx: &TickContext<'_>,
    now: DateTime<Utc>,
) -> EchelonResult<TickOutcome> {
    if let Some(reason) = check_death(
        agent,
        agent.realized_pnl(),
        now,
        ctx.risk.pnl_floor,
        ctx.risk.max_inactivity,
        ctx.risk.failed_paradox_extraction,
    ) {
        return Ok(TickOutcome::Dead(reason));
    }
    if !agent.is_alive() {
        return Ok(TickOutcome::Dormant);
    }
    if !agent.cooldown_elapsed(now, ctx.cooldown) {
        return Ok(TickOutcome::CooldownNotElapsed);
    }
    if agent.archetype == Archetype::Saboteur {
        if ctx.restrictions.contains(Restrictions::NO_NEW_SABOTEURS) {
            return Err(EchelonError::InvalidTransition {
                reason: "sabotage actions disabled under the current Mode tier".into(),
                context: ErrorContext::market(ctx.market_id),
            });
        }
        if ctx.risk.sabotage_tracker.would_exceed(agent.id, now, ctx.risk.sabotage_cap_per_hour) {
            return Err(EchelonError::InvalidTransition {
                reason: "per-hour sabotage cap reached for this agent".into(),
                context: ErrorContext::market(ctx.market_id),
            });
        }
    }

    let mut recent_signals = Vec::new();
    for topic in ctx.topics {
        recent_signals.extend(signals.query(topic, ctx.since_ts, ctx.signal_limit)?);
    }

    let snapshot = market.snapshot(ctx.market_id).await?;
    let odds = snapshot.outcome_odds();
    let outcome_odds: HashMap<usize, f64> = odds
        .iter()
        .enumerate()
        .map(|(idx, odds)| (idx, odds.to_string().parse::<f64>().unwrap_or(0.0)))
        .collect();

    let input = PolicyInput {
        market_id: ctx.market_id,
        recent_signals: &recent_signals,
        outcome_odds: &outcome_odds,
        timeline_prior: ctx.timeline_prior,
        base_size: ctx.base_size,
    };

    let decision = match policy.decide(agent, &input) {
        Some(decision) => decision,
        None => {
            apply_bookkeeping(agent, None, now);
            return Ok(TickOutcome::NoOp);
        }
    };

    let idempotency_key = IdempotencyKey::from(format!("agent-{}-{}", agent.id, now.timestamp_nanos_opt().unwrap_or(0)));
    let result = market
        .execute(
            decision.market_id,
            decision.outcome_idx,
            decision.size,
            decision.side,
            ctx.owner.clone(),
            idempotency_key,
            now,
        )
        .await?;

    if agent.archetype == Archetype::Saboteur {
        ctx.risk.sabotage_tracker.record(agent.id, now);
    }
    apply_bookkeeping(agent, Some(decision.size), now);
    Ok(TickOutcome::Acted { decision, result })
}

fn apply_bookkeeping(agent: &mut Agent, spent: Option<Decimal>, now: DateTime<Utc>) {
    if let Some(spent) = spent {
        agent.budget_remaining -= spent;
        agent.sanity = (agent.sanity + SANITY_DELTA_ACT).max(0.0);
    } else {
        agent.sanity = (agent.sanity + SANITY_DELTA_NOOP).max(0.0);
    }
    agent.last_action_ts = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use echelon_domain::{AgentId, Archetype, OwnerRef, SourceTier, Signal, TimelineId};
    use echelon_risk::{DEFAULT_MAX_INACTIVITY, DEFAULT_PNL_FLOOR};
    use echelon_strategy::SpyPolicy;
    use rust_decimal_macros::dec;

    async fn seeded_market() -> (MarketEngine, MarketId) {
        let engine = MarketEngine::default();
        let market_id = engine
            .create_market(TimelineId(1), vec!["YES".into(), "NO".into()], dec!(2000), Utc::now())
            .unwrap();
        (engine, market_id)
    }

    fn risk_config(tracker: &SabotageCapTracker) -> RiskConfig<'_> {
        RiskConfig {
            sabotage_tracker: tracker,
            sabotage_cap_per_hour: 5,
            pnl_floor: Decimal::from(DEFAULT_PNL_FLOOR),
            max_inactivity: DEFAULT_MAX_INACTIVITY,
            failed_paradox_extraction: false,
        }
    }

    #[tokio::test]
    async fn test_dormant_agent_skips_tick() {
        let (engine, market_id) = seeded_market().await;
        let store = SignalStore::new();
        let mut agent = Agent::spawn(AgentId(1), Archetype::Spy, dec!(0), 0, vec![]);
        let mut policy = SpyPolicy::new(300);
        let tracker = SabotageCapTracker::new();
        let ctx = TickContext {
            market_id,
            topics: &["t"],
            since_ts: Utc::now() - Duration::hours(1),
            signal_limit: 10,
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
            cooldown: Duration::seconds(0),
            owner: OwnerRef::Wallet("alice".into()),
            restrictions: echelon_domain::Restrictions::NONE,
            risk: risk_config(&tracker),
        };
        let outcome = tick(&mut agent, &mut policy, &store, &engine, &ctx, Utc::now()).await.unwrap();
        assert_eq!(outcome, TickOutcome::Dormant);
    }

    #[tokio::test]
    async fn test_fresh_signal_drives_spy_to_act() {
        let (engine, market_id) = seeded_market().await;
        let store = SignalStore::new();
        let signal = Signal::new("src", Utc::now(), "t", 0.9, vec![], SourceTier::Premium);
        store.ingest(signal).unwrap();

        let mut agent = Agent::spawn(AgentId(1), Archetype::Spy, dec!(1000), 0, vec![]);
        let mut policy = SpyPolicy::new(300);
        let tracker = SabotageCapTracker::new();
        let ctx = TickContext {
            market_id,
            topics: &["t"],
            since_ts: Utc::now() - Duration::hours(1),
            signal_limit: 10,
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
            cooldown: Duration::seconds(0),
            owner: OwnerRef::Wallet("alice".into()),
            restrictions: echelon_domain::Restrictions::NONE,
            risk: risk_config(&tracker),
        };
        let outcome = tick(&mut agent, &mut policy, &store, &engine, &ctx, Utc::now()).await.unwrap();
        assert!(matches!(outcome, TickOutcome::Acted { .. }));
        assert!(agent.budget_remaining < dec!(1000));
        assert!(agent.last_action_ts.is_some());
    }

    #[tokio::test]
    async fn saboteur_tick_is_rejected_when_sabotage_is_disabled() {
        let (engine, market_id) = seeded_market().await;
        let store = SignalStore::new();
        let mut agent = Agent::spawn(AgentId(1), Archetype::Saboteur, dec!(1000), 0, vec![]);
        let mut policy = echelon_strategy::SaboteurPolicy;
        let tracker = SabotageCapTracker::new();
        let ctx = TickContext {
            market_id,
            topics: &["t"],
            since_ts: Utc::now() - Duration::hours(1),
            signal_limit: 10,
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
            cooldown: Duration::seconds(0),
            owner: OwnerRef::Wallet("alice".into()),
            restrictions: echelon_domain::Restrictions::NO_NEW_SABOTEURS,
            risk: risk_config(&tracker),
        };
        let err = tick(&mut agent, &mut policy, &store, &engine, &ctx, Utc::now()).await.unwrap_err();
        assert!(matches!(err, EchelonError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn saboteur_tick_is_rejected_once_the_hourly_cap_is_reached() {
        let (engine, market_id) = seeded_market().await;
        let store = SignalStore::new();
        let mut agent = Agent::spawn(AgentId(1), Archetype::Saboteur, dec!(1000), 0, vec![]);
        let mut policy = echelon_strategy::SaboteurPolicy;
        let tracker = SabotageCapTracker::new();
        let now = Utc::now();
        tracker.record(agent.id, now);
        let ctx = TickContext {
            market_id,
            topics: &["t"],
            since_ts: now - Duration::hours(1),
            signal_limit: 10,
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
            cooldown: Duration::seconds(0),
            owner: OwnerRef::Wallet("alice".into()),
            restrictions: echelon_domain::Restrictions::NONE,
            risk: RiskConfig { sabotage_cap_per_hour: 1, ..risk_config(&tracker) },
        };
        let err = tick(&mut agent, &mut policy, &store, &engine, &ctx, now).await.unwrap_err();
        assert!(matches!(err, EchelonError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn agent_past_the_pnl_floor_is_reported_dead_instead_of_ticking() {
        let (engine, market_id) = seeded_market().await;
        let store = SignalStore::new();
        let mut agent = Agent::spawn(AgentId(1), Archetype::Shark, dec!(1000), 0, vec![]);
        agent.budget_remaining = dec!(0);
        let mut policy = SpyPolicy::new(300);
        let tracker = SabotageCapTracker::new();
        let ctx = TickContext {
            market_id,
            topics: &["t"],
            since_ts: Utc::now() - Duration::hours(1),
            signal_limit: 10,
            timeline_prior: &HashMap::new(),
            base_size: dec!(10),
            cooldown: Duration::seconds(0),
            owner: OwnerRef::Wallet("alice".into()),
            restrictions: echelon_domain::Restrictions::NONE,
            risk: RiskConfig { pnl_floor: dec!(-500), ..risk_config(&tracker) },
        };
        let outcome = tick(&mut agent, &mut policy, &store, &engine, &ctx, Utc::now()).await.unwrap();
        assert_eq!(outcome, TickOutcome::Dead(echelon_risk::DeathReason::PnlFloor));
    }
}
