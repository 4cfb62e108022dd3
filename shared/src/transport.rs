//! In-memory message transport connecting one authority to many observers
//!
//! Every observer owns a bounded inbound queue; all observers share one
//! bounded queue towards the authority. Sends never block: a full queue is
//! reported to the sender (or silently skipped when broadcasting) and the
//! frame is dropped. Frames are opaque bytes, decoded by whoever consumes them.

use crate::error::TransportError;
use crate::ObserverId;
use log::{debug, info};
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Encoded packet bytes
pub type Frame = Vec<u8>;

struct Peers {
    queues: HashMap<ObserverId, mpsc::Sender<Frame>>,
    /// Dropped on close so the authority's receive loop terminates
    authority: Option<mpsc::Sender<(ObserverId, Frame)>>,
    closed: bool,
}

pub struct LocalTransport {
    peers: RwLock<Peers>,
    inbound: Mutex<mpsc::Receiver<(ObserverId, Frame)>>,
    capacity: usize,
}

impl LocalTransport {
    /// Creates a transport whose queues each hold up to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        let (authority_tx, authority_rx) = mpsc::channel(capacity);

        Self {
            peers: RwLock::new(Peers {
                queues: HashMap::new(),
                authority: Some(authority_tx),
                closed: false,
            }),
            inbound: Mutex::new(authority_rx),
            capacity,
        }
    }

    /// Creates the inbound queue for `id` and hands back its receiving end.
    pub async fn register(&self, id: &str) -> Result<mpsc::Receiver<Frame>, TransportError> {
        let mut peers = self.peers.write().await;

        if peers.closed {
            return Err(TransportError::Closed);
        }
        if peers.queues.contains_key(id) {
            return Err(TransportError::AlreadyRegistered(id.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        peers.queues.insert(id.to_string(), tx);
        debug!("Registered peer {}", id);
        Ok(rx)
    }

    /// Drops the inbound queue for `id`. Unknown ids are ignored.
    pub async fn unregister(&self, id: &str) -> Result<(), TransportError> {
        let mut peers = self.peers.write().await;

        if peers.closed {
            return Err(TransportError::Closed);
        }
        if peers.queues.remove(id).is_some() {
            debug!("Unregistered peer {}", id);
        }
        Ok(())
    }

    /// Queues a frame for one observer without waiting.
    pub async fn send(&self, id: &str, frame: Frame) -> Result<(), TransportError> {
        let peers = self.peers.read().await;

        if peers.closed {
            return Err(TransportError::Closed);
        }
        let queue = peers
            .queues
            .get(id)
            .ok_or_else(|| TransportError::UnknownPeer(id.to_string()))?;

        queue.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull(id.to_string()),
            TrySendError::Closed(_) => TransportError::UnknownPeer(id.to_string()),
        })
    }

    /// Queues a frame for every observer except `exclude`.
    ///
    /// Recipients whose queue is full or gone are skipped. Returns how many
    /// observers the frame actually reached.
    pub async fn broadcast(&self, frame: Frame, exclude: Option<&str>) -> Result<usize, TransportError> {
        let peers = self.peers.read().await;

        if peers.closed {
            return Err(TransportError::Closed);
        }

        let mut delivered = 0;
        for (id, queue) in &peers.queues {
            if Some(id.as_str()) == exclude {
                continue;
            }
            match queue.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => debug!("Skipping broadcast to {}: queue unavailable", id),
            }
        }
        Ok(delivered)
    }

    /// Queues a frame from observer `from` towards the authority.
    pub async fn send_to_authority(&self, from: &str, frame: Frame) -> Result<(), TransportError> {
        let peers = self.peers.read().await;

        if peers.closed {
            return Err(TransportError::Closed);
        }
        let authority = peers.authority.as_ref().ok_or(TransportError::Closed)?;

        authority
            .try_send((from.to_string(), frame))
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::AuthorityQueueFull,
                TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    /// Waits for the next frame addressed to the authority.
    ///
    /// Fails only once the transport has been closed and the queue drained.
    pub async fn receive(&self) -> Result<(ObserverId, Frame), TransportError> {
        let mut inbound = self.inbound.lock().await;
        inbound.recv().await.ok_or(TransportError::Closed)
    }

    /// Terminates every queue. Calling it again does nothing.
    pub async fn close(&self) {
        let mut peers = self.peers.write().await;

        if peers.closed {
            return;
        }
        peers.closed = true;
        peers.queues.clear();
        peers.authority = None;
        info!("Transport closed");
    }

    pub async fn is_closed(&self) -> bool {
        self.peers.read().await.closed
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.queues.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_register_twice_fails() {
        let transport = LocalTransport::new(4);
        assert_ok!(transport.register("client_0").await);

        let err = transport.register("client_0").await.unwrap_err();
        assert_eq!(err, TransportError::AlreadyRegistered("client_0".to_string()));
        assert_eq!(transport.peer_count().await, 1);
    }

    #[tokio::test]
    async fn test_send_reaches_registered_peer() {
        let transport = LocalTransport::new(4);
        let mut rx = transport.register("client_0").await.unwrap();

        assert_ok!(transport.send("client_0", vec![1, 2, 3]).await);
        assert_eq!(rx.recv().await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_send_to_unknown_peer_fails() {
        let transport = LocalTransport::new(4);
        let err = transport.send("nobody", vec![0]).await.unwrap_err();
        assert_eq!(err, TransportError::UnknownPeer("nobody".to_string()));
    }

    #[tokio::test]
    async fn test_send_to_full_queue_fails() {
        let transport = LocalTransport::new(1);
        let _rx = transport.register("client_0").await.unwrap();

        assert_ok!(transport.send("client_0", vec![1]).await);
        let err = transport.send("client_0", vec![2]).await.unwrap_err();
        assert_eq!(err, TransportError::QueueFull("client_0".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_skips_excluded_and_full() {
        let transport = LocalTransport::new(1);
        let mut a = transport.register("a").await.unwrap();
        let mut b = transport.register("b").await.unwrap();
        let mut c = transport.register("c").await.unwrap();

        // Fill c's queue so the broadcast has to skip it
        transport.send("c", vec![0]).await.unwrap();

        let delivered = transport.broadcast(vec![9], Some("a")).await.unwrap();
        assert_eq!(delivered, 1);

        assert!(a.try_recv().is_err());
        assert_eq!(b.try_recv().ok(), Some(vec![9]));
        assert_eq!(c.try_recv().ok(), Some(vec![0]));
        assert!(c.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_authority_receives_with_sender_id() {
        let transport = LocalTransport::new(4);
        assert_ok!(transport.send_to_authority("client_3", vec![7]).await);

        let (from, frame) = transport.receive().await.unwrap();
        assert_eq!(from, "client_3");
        assert_eq!(frame, vec![7]);
    }

    #[tokio::test]
    async fn test_authority_queue_full() {
        let transport = LocalTransport::new(1);
        assert_ok!(transport.send_to_authority("a", vec![1]).await);
        let err = transport.send_to_authority("a", vec![2]).await.unwrap_err();
        assert_eq!(err, TransportError::AuthorityQueueFull);
    }

    #[tokio::test]
    async fn test_close_terminates_everything() {
        let transport = LocalTransport::new(4);
        let mut rx = transport.register("client_0").await.unwrap();

        transport.close().await;
        transport.close().await;

        assert!(transport.is_closed().await);
        assert_eq!(rx.recv().await, None);
        assert_eq!(transport.receive().await.unwrap_err(), TransportError::Closed);
        assert_err!(transport.register("client_1").await);
        assert_err!(transport.unregister("client_0").await);
        assert_err!(transport.send("client_0", vec![1]).await);
        assert_err!(transport.broadcast(vec![1], None).await);
        assert_err!(transport.send_to_authority("client_0", vec![1]).await);
    }

    #[tokio::test]
    async fn test_unregister_closes_peer_queue() {
        let transport = LocalTransport::new(4);
        let mut rx = transport.register("client_0").await.unwrap();

        assert_ok!(transport.unregister("client_0").await);
        assert_ok!(transport.unregister("client_0").await);
        assert_eq!(rx.recv().await, None);
        assert_eq!(transport.peer_count().await, 0);
    }
}
