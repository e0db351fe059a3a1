use thiserror::Error;

/// Transport-level error surfaced by the REST/WebSocket plumbing in [`crate::protocol`].
///
/// Kept distinct from `echelon_domain::error::EchelonError` (the domain-level §7 taxonomy) -
/// this is the lower-level error the adapter layer converts *into* a domain error once it knows
/// which venue call failed.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("http request build failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to deserialise payload: {error}")]
    DeserialiseBinary {
        error: serde_json::Error,
        payload: Vec<u8>,
    },

    #[error("failed to deserialise query parameters: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),

    #[error("websocket transport error: {0}")]
    WebSocket(String),

    #[error("connection unexpectedly closed")]
    ConnectionClosed,
}

/// Implemented by errors that can never be retried - used by [`crate::channel::Tx`] to decide
/// whether a disconnected receiver should disable the channel outright.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}

impl Unrecoverable for SocketError {
    fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }
}
