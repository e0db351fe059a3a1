use crate::cpmm::{self, TradeEffect};
use crate::idempotency::{ExecuteReceipt, IdempotencyCache};
use chrono::{DateTime, Utc};
use echelon_domain::{
    EchelonError, EchelonResult, ErrorContext, IdempotencyKey, Market, MarketId, MarketStatus,
    OwnerRef, Position, Side, TimelineId, TradeId,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Default floor for idempotency-key retention (spec.md §4.3: "at least T_idem_s, >= 15 minutes").
pub const DEFAULT_IDEMPOTENCY_TTL_S: i64 = 15 * 60;

/// Maximum relative drift the CPMM invariant `reserves[0] * reserves[1]` may show across one
/// trade before it is treated as `CONSERVATION_VIOLATED` (spec.md §7) - wide enough to absorb
/// `Decimal` division rounding, tight enough to catch a genuinely broken pricing path.
const CONSERVATION_TOLERANCE: Decimal = Decimal::new(1, 6);

/// How a voided market refunds its open positions (spec.md §4.4 `reap`): simulated-capital
/// timelines refund at cost basis, the real on-chain timeline settles against last spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementMode {
    CostBasis,
    LastSpot,
}

/// One position's payout from a voided market.
#[derive(Debug, Clone, PartialEq)]
pub struct Refund {
    pub owner: OwnerRef,
    pub outcome_idx: usize,
    pub amount: Decimal,
}

/// What `quote` returns - advisory only, never locks the market (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub shares: Decimal,
    pub expected_fill_price: Decimal,
    /// Price impact in basis points relative to the pre-trade marginal odds.
    pub price_impact_bps: Decimal,
    pub post_trade_reserves: [Decimal; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecuteResult {
    pub trade_id: TradeId,
    pub realized_price: Decimal,
    pub shares: Decimal,
    pub replay: bool,
}

struct MarketEntry {
    market: Market,
    positions: HashMap<(OwnerRef, usize), Position>,
    idempotency: IdempotencyCache,
}

/// Serialized, transactional mutation of each market's CPMM state (spec.md §4.3). Each market
/// owns a logical async lock; `execute` holds it across quote-recompute, reserve-update,
/// position-update, and volume-increment. Only binary markets (`outcomes.len() == 2`) are
/// currently accepted.
pub struct MarketEngine {
    markets: RwLock<HashMap<MarketId, Arc<AsyncMutex<MarketEntry>>>>,
    next_market_id: AtomicU64,
    next_trade_id: AtomicU64,
    idempotency_ttl: chrono::Duration,
    /// Set once `execute` observes a `CONSERVATION_VIOLATED` post-condition failure; once
    /// poisoned, every market refuses further trades (spec.md §7) until the process restarts.
    poisoned: AtomicBool,
}

impl Default for MarketEngine {
    fn default() -> Self {
        Self::new(chrono::Duration::seconds(DEFAULT_IDEMPOTENCY_TTL_S))
    }
}

impl MarketEngine {
    pub fn new(idempotency_ttl: chrono::Duration) -> Self {
        Self {
            markets: RwLock::new(HashMap::new()),
            next_market_id: AtomicU64::new(1),
            next_trade_id: AtomicU64::new(1),
            idempotency_ttl,
            poisoned: AtomicBool::new(false),
        }
    }

    /// Whether the engine has halted all trading after a conservation violation.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    pub fn create_market(
        &self,
        timeline_id: TimelineId,
        outcomes: Vec<String>,
        seed_liquidity: Decimal,
        now: DateTime<Utc>,
    ) -> EchelonResult<MarketId> {
        if outcomes.len() != 2 {
            return Err(EchelonError::InvalidArg {
                reason: "only binary markets (2 outcomes) are currently supported".into(),
                context: ErrorContext::timeline(timeline_id),
            });
        }
        if seed_liquidity <= Decimal::ZERO {
            return Err(EchelonError::InvalidArg {
                reason: "seed_liquidity must be positive".into(),
                context: ErrorContext::timeline(timeline_id),
            });
        }

        let market_id = MarketId(self.next_market_id.fetch_add(1, Ordering::Relaxed));
        let per_outcome = seed_liquidity / Decimal::from(outcomes.len() as u64);
        let market = Market {
            id: market_id,
            timeline_id,
            outcomes: outcomes.clone(),
            reserves: vec![per_outcome; outcomes.len()],
            total_volume: Decimal::ZERO,
            status: MarketStatus::Open,
            created_ts: now,
            resolution_ts: None,
            winning_idx: None,
        };

        let entry = MarketEntry {
            market,
            positions: HashMap::new(),
            idempotency: IdempotencyCache::new(self.idempotency_ttl),
        };
        self.markets.write().insert(market_id, Arc::new(AsyncMutex::new(entry)));
        Ok(market_id)
    }

    fn entry(&self, market_id: MarketId) -> EchelonResult<Arc<AsyncMutex<MarketEntry>>> {
        self.markets
            .read()
            .get(&market_id)
            .cloned()
            .ok_or_else(|| EchelonError::NotFound {
                reason: "market not found".into(),
                context: ErrorContext::market(market_id),
            })
    }

    /// Advisory pricing snapshot - does not lock the market or mutate any state.
    pub async fn quote(
        &self,
        market_id: MarketId,
        outcome_idx: usize,
        quote_amount: Decimal,
        side: Side,
    ) -> EchelonResult<Quote> {
        let entry = self.entry(market_id)?;
        let guard = entry.lock().await;
        if guard.market.status != MarketStatus::Open {
            return Err(EchelonError::MarketClosed {
                context: ErrorContext::market(market_id),
            });
        }
        let reserves = reserves_pair(market_id, &guard.market)?;
        let pre_odds = guard.market.outcome_odds();
        let effect = cpmm::apply_trade(market_id, reserves, outcome_idx, quote_amount, side)?;
        drop(guard);

        let impact = price_impact_bps(pre_odds[outcome_idx], effect.realized_price);
        Ok(Quote {
            shares: effect.shares,
            expected_fill_price: effect.realized_price,
            price_impact_bps: impact,
            post_trade_reserves: effect.new_reserves,
        })
    }

    /// Execute a trade, holding the market's lock across recompute, reserve-update,
    /// position-update, and volume-increment (spec.md §4.3).
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        market_id: MarketId,
        outcome_idx: usize,
        quote_amount: Decimal,
        side: Side,
        owner: OwnerRef,
        idempotency_key: IdempotencyKey,
        now: DateTime<Utc>,
    ) -> EchelonResult<ExecuteResult> {
        if self.is_poisoned() {
            return Err(EchelonError::ConservationViolated {
                market_id,
                reason: "engine halted after a prior conservation violation".into(),
            });
        }

        let entry = self.entry(market_id)?;
        let mut guard = entry.lock().await;

        if let Some(receipt) = guard.idempotency.get(&idempotency_key, now) {
            return Ok(ExecuteResult {
                trade_id: receipt.trade_id,
                realized_price: receipt.realized_price,
                shares: receipt.shares,
                replay: true,
            });
        }

        if guard.market.status != MarketStatus::Open {
            return Err(EchelonError::MarketClosed {
                context: ErrorContext::market(market_id),
            });
        }

        let reserves = reserves_pair(market_id, &guard.market)?;
        let pre_invariant = reserves[0] * reserves[1];
        let effect: TradeEffect = cpmm::apply_trade(market_id, reserves, outcome_idx, quote_amount, side)?;

        let post_invariant = effect.new_reserves[0] * effect.new_reserves[1];
        if !invariant_preserved(pre_invariant, post_invariant) {
            self.poisoned.store(true, Ordering::SeqCst);
            return Err(EchelonError::ConservationViolated {
                market_id,
                reason: format!("invariant drifted from {pre_invariant} to {post_invariant}"),
            });
        }

        guard.market.reserves[0] = effect.new_reserves[0];
        guard.market.reserves[1] = effect.new_reserves[1];
        guard.market.total_volume += quote_amount;

        let position_key = (owner.clone(), outcome_idx);
        match side {
            Side::Buy => {
                guard
                    .positions
                    .entry(position_key)
                    .and_modify(|p| p.merge(effect.shares, quote_amount, now))
                    .or_insert_with(|| Position::open(owner, market_id, outcome_idx, effect.shares, quote_amount, now));
            }
            Side::Sell => {
                let position = guard.positions.get_mut(&position_key).ok_or_else(|| {
                    EchelonError::InsufficientFunds {
                        needed: effect.shares,
                        available: Decimal::ZERO,
                    }
                })?;
                if position.shares < effect.shares {
                    return Err(EchelonError::InsufficientFunds {
                        needed: effect.shares,
                        available: position.shares,
                    });
                }
                position.shares -= effect.shares;
                position.updated_ts = now;
            }
        }

        let trade_id = TradeId(self.next_trade_id.fetch_add(1, Ordering::Relaxed));
        let receipt = ExecuteReceipt {
            trade_id,
            realized_price: effect.realized_price,
            shares: effect.shares,
        };
        guard.idempotency.insert(idempotency_key, receipt, now);

        Ok(ExecuteResult {
            trade_id,
            realized_price: effect.realized_price,
            shares: effect.shares,
            replay: false,
        })
    }

    pub async fn close(&self, market_id: MarketId) -> EchelonResult<MarketStatus> {
        let entry = self.entry(market_id)?;
        let mut guard = entry.lock().await;
        transition(&mut guard.market, MarketStatus::Closed)?;
        Ok(guard.market.status)
    }

    pub async fn resolve(&self, market_id: MarketId, winning_idx: usize, now: DateTime<Utc>) -> EchelonResult<MarketStatus> {
        let entry = self.entry(market_id)?;
        let mut guard = entry.lock().await;
        transition(&mut guard.market, MarketStatus::Resolving)?;
        transition(&mut guard.market, MarketStatus::Resolved)?;
        guard.market.winning_idx = Some(winning_idx);
        guard.market.resolution_ts = Some(now);
        Ok(guard.market.status)
    }

    pub async fn snapshot(&self, market_id: MarketId) -> EchelonResult<Market> {
        let entry = self.entry(market_id)?;
        Ok(entry.lock().await.market.clone())
    }

    /// Void `market_id` (spec.md §4.4 `reap`): transitions `open -> voided` and refunds every
    /// open position, at cost basis or against last spot depending on `settlement`.
    pub async fn void(&self, market_id: MarketId, settlement: SettlementMode, now: DateTime<Utc>) -> EchelonResult<Vec<Refund>> {
        let entry = self.entry(market_id)?;
        let mut guard = entry.lock().await;
        transition(&mut guard.market, MarketStatus::Voided)?;
        Ok(void_locked(&mut guard, settlement, now))
    }

    /// Void every still-open market on `timeline_id` (spec.md §4.4 `reap`), refunding their
    /// positions. Markets already closed/resolving/resolved/voided are left untouched.
    pub async fn void_timeline(
        &self,
        timeline_id: TimelineId,
        settlement: SettlementMode,
        now: DateTime<Utc>,
    ) -> Vec<(MarketId, Vec<Refund>)> {
        let entries: Vec<(MarketId, Arc<AsyncMutex<MarketEntry>>)> =
            self.markets.read().iter().map(|(id, entry)| (*id, entry.clone())).collect();

        let mut voided = Vec::new();
        for (market_id, entry) in entries {
            let mut guard = entry.lock().await;
            if guard.market.timeline_id != timeline_id || guard.market.status != MarketStatus::Open {
                continue;
            }
            guard.market.status = MarketStatus::Voided;
            voided.push((market_id, void_locked(&mut guard, settlement, now)));
        }
        voided
    }
}

/// Zero every open position in an already-voided `entry`, returning what each owner is owed.
/// Callers must have already transitioned `entry.market.status` to `Voided`.
fn void_locked(entry: &mut MarketEntry, settlement: SettlementMode, now: DateTime<Utc>) -> Vec<Refund> {
    let odds = entry.market.outcome_odds();
    entry
        .positions
        .iter_mut()
        .filter(|(_, position)| !position.is_empty())
        .map(|((owner, outcome_idx), position)| {
            let amount = match settlement {
                SettlementMode::CostBasis => position.shares * position.cost_basis,
                SettlementMode::LastSpot => position.shares * odds[*outcome_idx],
            };
            position.zero(now);
            Refund { owner: owner.clone(), outcome_idx: *outcome_idx, amount }
        })
        .collect()
}

fn invariant_preserved(pre: Decimal, post: Decimal) -> bool {
    if pre.is_zero() {
        return post.is_zero();
    }
    ((post - pre) / pre).abs() <= CONSERVATION_TOLERANCE
}

fn transition(market: &mut Market, next: MarketStatus) -> EchelonResult<()> {
    if !market.status.can_transition_to(next) {
        return Err(EchelonError::InvalidTransition {
            reason: format!("{} -> {next} is not a legal transition", market.status),
            context: ErrorContext::market(market.id),
        });
    }
    market.status = next;
    Ok(())
}

fn reserves_pair(market_id: MarketId, market: &Market) -> EchelonResult<[Decimal; 2]> {
    if market.reserves.len() != 2 {
        return Err(EchelonError::InvalidArg {
            reason: "only binary markets are currently supported".into(),
            context: ErrorContext::market(market_id),
        });
    }
    Ok([market.reserves[0], market.reserves[1]])
}

fn price_impact_bps(pre_price: Decimal, realized_price: Decimal) -> Decimal {
    if pre_price.is_zero() {
        return Decimal::ZERO;
    }
    ((realized_price - pre_price) / pre_price) * Decimal::from(10_000)
}
