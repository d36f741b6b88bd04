use std::future::Future;

use crate::traits::SettlementDatabaseError;

/// Durable storage for the cart blob, keyed by the active buyer session.
///
/// The blob is opaque to the backend; it must round-trip exactly. The futures carry a `Send`
/// bound (rather than plain `async fn`) so the cart store can hand saves to `tokio::spawn`
/// without blocking any cart operation.
pub trait CartPersistence: Clone + Send + Sync + 'static {
    /// Inserts or replaces the stored blob for the buyer.
    fn save_cart(&self, buyer_id: &str, blob: &str) -> impl Future<Output = Result<(), SettlementDatabaseError>> + Send;

    /// Fetches the stored blob, or `None` if this buyer has never saved a cart.
    fn load_cart(&self, buyer_id: &str) -> impl Future<Output = Result<Option<String>, SettlementDatabaseError>> + Send;

    /// Removes the stored blob. Removing an absent blob is not an error.
    fn delete_cart(&self, buyer_id: &str) -> impl Future<Output = Result<(), SettlementDatabaseError>> + Send;
}
