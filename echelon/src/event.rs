//! The Event Bus (spec.md §4.7): fan-out of [`Event`]s to N subscribers over bounded `mpsc`
//! channels. Grounded in `examples/barter-rs-barter-rs/src/event.rs`'s `EventTx`/
//! `MessageTransmitter` idiom - generalized here from "one external sink" to N subscribers, each
//! with its own bounded queue, matching spec.md §5's backpressure contract: a slow subscriber is
//! dropped, publishers are never blocked.

use chrono::{DateTime, Utc};
use echelon_domain::{AgentId, MarketId, SignalId, TimelineId, TradeId};
use echelon_export::ExportReady;
use rust_decimal::Decimal;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

/// Full event taxonomy of the Event Orchestration Core (spec.md §4.7).
#[derive(Debug, Clone)]
pub enum Event {
    MarketCreated { market_id: MarketId, timeline_id: TimelineId, ts: DateTime<Utc> },
    MarketQuoted { market_id: MarketId, outcome_idx: usize, expected_fill_price: Decimal, ts: DateTime<Utc> },
    TradeExecuted { trade_id: TradeId, market_id: MarketId, realized_price: Decimal, shares: Decimal, ts: DateTime<Utc> },
    PositionUpdated { market_id: MarketId, outcome_idx: usize, ts: DateTime<Utc> },
    TimelineForked { timeline_id: TimelineId, parent_id: Option<TimelineId>, ts: DateTime<Utc> },
    TimelineReaped { timeline_id: TimelineId, reason: String, ts: DateTime<Utc> },
    SignalIngested { signal_id: SignalId, topic: String, ts: DateTime<Utc> },
    FeedDegraded { feed_tag: String, consecutive_errors: u32, ts: DateTime<Utc> },
    ModeChanged { from: echelon_domain::ModeTier, to: echelon_domain::ModeTier, ts: DateTime<Utc> },
    AgentActed { agent_id: AgentId, market_id: MarketId, ts: DateTime<Utc> },
    AgentDormant { agent_id: AgentId, reason: String, ts: DateTime<Utc> },
    ParadoxOpened { timeline_id: TimelineId, logic_gap: f64, ts: DateTime<Utc> },
    ParadoxResolved { timeline_id: TimelineId, ts: DateTime<Utc> },
    /// A fatal integrity error (spec.md §7: `CONSERVATION_VIOLATED`) halted the Market Engine.
    EmergencyHalt { market_id: MarketId, reason: String, ts: DateTime<Utc> },
    ExportReady(ExportReady),
}

struct Subscriber {
    tx: mpsc::Sender<Event>,
    /// When the queue first refused a send; cleared on the next successful send. A subscriber
    /// whose queue stays full across `t_pub` is dropped (spec.md §4.7).
    full_since: Option<Instant>,
}

/// Fan-out broadcaster with per-subscriber bounded queues (spec.md §4.7, §5). `publish` never
/// blocks: a full queue is tolerated for up to `t_pub`, after which that subscriber is evicted.
pub struct EventBus {
    subscribers: std::sync::Mutex<Vec<Subscriber>>,
    queue_capacity: usize,
    t_pub: Duration,
}

impl EventBus {
    pub fn new(queue_capacity: usize, t_pub: Duration) -> Self {
        Self { subscribers: std::sync::Mutex::new(Vec::new()), queue_capacity, t_pub }
    }

    /// Register a new subscriber, returning the receiving half of its bounded queue.
    pub fn subscribe(&self) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.subscribers.lock().unwrap().push(Subscriber { tx, full_since: None });
        rx
    }

    /// Publish `event` to every live subscriber. Never awaits and never blocks the caller; a
    /// subscriber whose channel has been full for longer than `t_pub` is dropped and a
    /// `tracing::warn!` emitted, matching `EventTx`'s `receiver_dropped` flag pattern.
    pub fn publish(&self, event: Event) {
        let now = Instant::now();
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain_mut(|subscriber| match subscriber.tx.try_send(event.clone()) {
            Ok(()) => {
                subscriber.full_since = None;
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let started = *subscriber.full_since.get_or_insert(now);
                if now.duration_since(started) > self.t_pub {
                    warn!(t_pub_ms = self.t_pub.as_millis() as u64, "dropping slow Event Bus subscriber");
                    false
                } else {
                    true
                }
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}
