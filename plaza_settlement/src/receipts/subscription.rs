use chrono::{Duration, Utc};
use log::*;
use tokio::{
    sync::{broadcast::error::RecvError, oneshot},
    task::JoinHandle,
};

use crate::{db_types::ReceiptEvent, receipts::RelayPool};

/// Receipts older than this are ignored. The window exists to tolerate stream reconnects and
/// replay without scanning unbounded history.
pub const RECEIPT_LOOKBACK_SECS: i64 = 60;

/// Opens single-shot receipt listeners against a [`RelayPool`].
#[derive(Clone)]
pub struct ReceiptSubscriptions {
    pool: RelayPool,
}

impl ReceiptSubscriptions {
    pub fn new(pool: RelayPool) -> Self {
        Self { pool }
    }

    /// Opens a listener for the first receipt referencing `reference` within the lookback
    /// window. Exactly one delivery occurs per listener; after the first match the matcher task
    /// ends, so later duplicates are never delivered.
    ///
    /// If the pool is disconnected the listener never matches. That is deliberate: callers
    /// bound their wait with a timeout anyway, and "never matches" must be indistinguishable
    /// from "timed out".
    pub fn open(&self, reference: &str) -> ReceiptListener {
        if !self.pool.is_connected() {
            debug!("📡️ Receipt stream unavailable; listener for {reference} will never match");
            return ReceiptListener::never();
        }
        let (tx, rx) = oneshot::channel();
        let mut stream = self.pool.subscribe();
        let reference = reference.to_string();
        let matcher = tokio::spawn(async move {
            loop {
                match stream.recv().await {
                    Ok(event) => {
                        if event.reference != reference {
                            continue;
                        }
                        let age = Utc::now() - event.created_at;
                        if age > Duration::seconds(RECEIPT_LOOKBACK_SECS) {
                            trace!("📡️ Stale receipt for {reference} ignored ({}s old)", age.num_seconds());
                            continue;
                        }
                        debug!("📡️ Receipt matched for {reference}");
                        let _ = tx.send(event);
                        break;
                    },
                    Err(RecvError::Lagged(n)) => {
                        warn!("📡️ Receipt listener for {reference} lagged by {n} event(s)");
                        continue;
                    },
                    Err(RecvError::Closed) => break,
                }
            }
        });
        ReceiptListener { rx: Some(rx), _keepalive: None, matcher: Some(matcher) }
    }
}

/// One pending receipt delivery. Await it with [`ReceiptListener::recv`]; tear it down early
/// with [`ReceiptListener::cancel`]. Dropping the listener cancels it too, so an abandoned
/// checkout flow frees its stream subscription without further ceremony.
pub struct ReceiptListener {
    rx: Option<oneshot::Receiver<ReceiptEvent>>,
    // Held so that the never-matching listener pends forever instead of erroring out.
    _keepalive: Option<oneshot::Sender<ReceiptEvent>>,
    matcher: Option<JoinHandle<()>>,
}

impl ReceiptListener {
    fn never() -> Self {
        let (tx, rx) = oneshot::channel();
        Self { rx: Some(rx), _keepalive: Some(tx), matcher: None }
    }

    /// Resolves with the first matching receipt, or `None` if the listener was cancelled or has
    /// already delivered. A never-matching listener pends indefinitely on its first call;
    /// callers must wrap this in a timeout.
    pub async fn recv(&mut self) -> Option<ReceiptEvent> {
        match self.rx.take() {
            Some(rx) => rx.await.ok(),
            None => None,
        }
    }

    /// Tears the listener down with no delivery. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if let Some(matcher) = self.matcher.take() {
            matcher.abort();
        }
    }
}

impl Drop for ReceiptListener {
    fn drop(&mut self) {
        self.cancel();
    }
}
