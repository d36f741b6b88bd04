//! Simple stateless pub-sub event handler.
//!
//! Settlement emits events (invoice paid, order settled) that surrounding application layers
//! want to react to: refreshing an order-detail view, sending a notification, and so on. The
//! handler is stateless: subscribers receive the event itself and nothing else, but their hooks
//! can be async.

use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs the dispatch loop until every producer has been dropped, then waits for any hook
    /// invocations still in flight before returning.
    pub async fn start_handler(mut self) {
        debug!("📨️ Event handler running");
        // Drop our own sender so the loop ends once the last subscriber is gone.
        drop(self.sender);
        let mut in_flight = JoinSet::new();
        while let Some(event) = self.listener.recv().await {
            trace!("📨️ Dispatching event");
            let handler = Arc::clone(&self.handler);
            in_flight.spawn(async move {
                (handler)(event).await;
            });
        }
        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                warn!("📨️ An event hook panicked or was cancelled: {e}");
            }
        }
        debug!("📨️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📨️ Failed to publish event: {e}");
        }
    }
}
