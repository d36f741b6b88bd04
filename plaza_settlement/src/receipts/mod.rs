//! # Receipt subscriptions
//!
//! Payment receipts are published by merchants and value-share participants on a public event
//! stream. This module owns the client side of that stream:
//!
//! * [`RelayPool`] is the explicitly-owned connection hub. One underlying stream connection
//!   fans receipt events out to any number of concurrently open listeners. Lifecycle is
//!   `new → connect → (many listeners) → teardown`; there is no ambient global connection.
//! * [`ReceiptSubscriptions`] opens one single-shot listener per payable reference. The first
//!   matching receipt inside the lookback window is delivered and the listener tears itself
//!   down; duplicates for the same reference are never delivered. Cancellation is explicit and
//!   idempotent, and a disconnected pool degrades to a listener that never matches, so callers
//!   treat that exactly like a timeout.

mod relay;
mod subscription;

pub use relay::RelayPool;
pub use subscription::{ReceiptListener, ReceiptSubscriptions, RECEIPT_LOOKBACK_SECS};
