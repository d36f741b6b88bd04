use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::*;
use tokio::sync::broadcast;

use crate::db_types::ReceiptEvent;

/// The shared receipt-stream connection hub.
///
/// The pool does not implement a network transport; the surrounding application bridges its
/// stream client into [`RelayPool::publish`]. Every open listener shares the one broadcast
/// channel, so there is a single fan-out point per process rather than one connection per
/// in-flight invoice.
#[derive(Clone)]
pub struct RelayPool {
    inner: Arc<RelayPoolInner>,
}

struct RelayPoolInner {
    sender: broadcast::Sender<ReceiptEvent>,
    connected: AtomicBool,
}

impl RelayPool {
    /// A new pool in the disconnected state. `capacity` bounds how many undelivered events
    /// each listener may lag behind by before it starts missing events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { inner: Arc::new(RelayPoolInner { sender, connected: AtomicBool::new(false) }) }
    }

    pub fn connect(&self) {
        self.inner.connected.store(true, Ordering::SeqCst);
        info!("📡️ Relay pool connected");
    }

    pub fn teardown(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        info!("📡️ Relay pool torn down");
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Injects a receipt event from the underlying stream. Returns the number of listeners the
    /// event was fanned out to.
    pub fn publish(&self, event: ReceiptEvent) -> usize {
        match self.inner.sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                trace!("📡️ Receipt event dropped: no listeners are open");
                0
            },
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ReceiptEvent> {
        self.inner.sender.subscribe()
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn receipt(reference: &str) -> ReceiptEvent {
        ReceiptEvent {
            event_id: "ev1".to_string(),
            reference: reference.to_string(),
            preimage: None,
            author: "merchant".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lifecycle_flags() {
        let pool = RelayPool::new(16);
        assert!(!pool.is_connected());
        pool.connect();
        assert!(pool.is_connected());
        pool.teardown();
        assert!(!pool.is_connected());
    }

    #[tokio::test]
    async fn publish_fans_out_to_every_subscriber() {
        let pool = RelayPool::new(16);
        pool.connect();
        let mut rx1 = pool.subscribe();
        let mut rx2 = pool.subscribe();
        assert_eq!(pool.publish(receipt("lnbc1")), 2);
        assert_eq!(rx1.recv().await.unwrap().reference, "lnbc1");
        assert_eq!(rx2.recv().await.unwrap().reference, "lnbc1");
    }

    #[tokio::test]
    async fn publish_without_listeners_is_harmless() {
        let pool = RelayPool::new(16);
        pool.connect();
        assert_eq!(pool.publish(receipt("lnbc1")), 0);
    }
}
