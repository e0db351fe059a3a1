#![warn(unused_crate_dependencies)]

//! External Platform Adapter: Polymarket/Kalshi `VenueClient` implementations, shared rate
//! limiting, retry, builder attribution, and stream multiplexing (spec.md §4.5). Never calls
//! `echelon-market` directly - it only emits events onto the `echelon` Event Bus.

pub mod attribution;
pub mod clients;
pub mod retry;
pub mod stream;
pub mod venue;

pub use attribution::{BuilderAttributionSink, InMemoryAttributionSink};
pub use clients::{default_kalshi_limiter, default_polymarket_limiter, KalshiClient, PolymarketClient};
pub use stream::StreamMultiplexer;
pub use venue::{OrderAck, OrderBook, OrderRequest, VenueClient, VenueError, VenueMarket, VenuePosition};
