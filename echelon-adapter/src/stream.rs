use crate::venue::VenueStreamEvent;
use echelon_integration::channel::{Channel, UnboundedRx, UnboundedTx};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Multiplexes one venue's WebSocket-shaped stream to per-symbol subscriber channels
/// (spec.md §4.5: "subscriber callbacks keyed by symbol"), grounded in
/// `echelon_integration::channel`'s `UnboundedTx`/`UnboundedRx` pair.
pub struct StreamMultiplexer {
    subscribers: RwLock<HashMap<String, Vec<UnboundedTx<VenueStreamEvent>>>>,
}

impl Default for StreamMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamMultiplexer {
    pub fn new() -> Self {
        Self { subscribers: RwLock::new(HashMap::new()) }
    }

    /// Subscribe to events for `venue_market_id`, returning the receiving half.
    pub fn subscribe(&self, venue_market_id: &str) -> UnboundedRx<VenueStreamEvent> {
        let channel = Channel::new();
        self.subscribers.write().entry(venue_market_id.to_string()).or_default().push(channel.tx);
        channel.rx
    }

    /// Fan an inbound venue event out to every subscriber registered for its symbol. Sends that
    /// fail (receiver dropped) are pruned lazily on the next dispatch.
    pub fn dispatch(&self, event: VenueStreamEvent) {
        let mut subscribers = self.subscribers.write();
        if let Some(txs) = subscribers.get_mut(event.venue_market_id.as_str()) {
            txs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}
