use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;

use crate::realtime::events::ServerEvent;

pub type ConnId = u64;

/// Registry of live socket connections and their outbound channels.
///
/// Each connection owns a writer task draining its receiver; sends to a
/// connection that is going away are silently dropped.
#[derive(Default)]
pub struct Connections {
    senders: RwLock<HashMap<ConnId, UnboundedSender<ServerEvent>>>,
    next_id: AtomicU64,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self) -> (ConnId, UnboundedReceiver<ServerEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.write().await.insert(id, tx);
        (id, rx)
    }

    pub async fn unregister(&self, id: ConnId) {
        self.senders.write().await.remove(&id);
    }

    /// Send to one connection.
    pub async fn send(&self, id: ConnId, event: ServerEvent) {
        if let Some(tx) = self.senders.read().await.get(&id) {
            let _ = tx.send(event);
        }
    }

    /// Deliver to every connection, the initiator included.
    pub async fn broadcast(&self, event: ServerEvent) {
        for tx in self.senders.read().await.values() {
            let _ = tx.send(event.clone());
        }
    }

    /// Deliver to every connection except `skip`.
    pub async fn broadcast_except(&self, skip: ConnId, event: ServerEvent) {
        for (id, tx) in self.senders.read().await.iter() {
            if *id != skip {
                let _ = tx.send(event.clone());
            }
        }
    }

    pub async fn count(&self) -> usize {
        self.senders.read().await.len()
    }
}
