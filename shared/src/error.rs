use thiserror::Error;

/// Failures reported by the local transport. None of them are fatal to the
/// caller except `Closed` on receive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("peer {0} already registered")]
    AlreadyRegistered(String),

    #[error("peer {0} not found")]
    UnknownPeer(String),

    #[error("queue for peer {0} is full")]
    QueueFull(String),

    #[error("authority inbound queue is full")]
    AuthorityQueueFull,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode packet: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode packet: {0}")]
    Decode(#[source] bincode::Error),
}
