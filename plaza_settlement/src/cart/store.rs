use log::*;
use plaza_common::Sats;

use crate::{
    cart::Cart,
    db_types::{ProductRef, ShippingSelection},
    traits::CartPersistence,
};

/// A buyer session's cart, backed by durable storage.
///
/// Every mutation updates the in-memory cart synchronously and then fires the full serialized
/// cart off to the backend on a background task. Save failures are logged and swallowed: the
/// in-memory cart stays authoritative for the current session, and a crash before the next
/// successful save loses only the unsaved delta.
///
/// Mutations must run inside a tokio runtime, since the save is a spawned task.
pub struct CartStore<B> {
    buyer_id: String,
    cart: Cart,
    db: B,
}

impl<B: CartPersistence> CartStore<B> {
    /// A fresh, empty cart for the buyer. Nothing is persisted until the first mutation.
    pub fn new(buyer_id: &str, db: B) -> Self {
        Self { buyer_id: buyer_id.to_string(), cart: Cart::new(), db }
    }

    /// Rehydrates the buyer's cart from storage. A missing blob yields an empty cart; a blob
    /// that no longer parses is logged and discarded rather than wedging the session.
    pub async fn load(buyer_id: &str, db: B) -> Self {
        let cart = match db.load_cart(buyer_id).await {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(cart) => cart,
                Err(e) => {
                    error!("🛒️ Stored cart for {buyer_id} is corrupt and will be discarded: {e}");
                    Cart::new()
                },
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                error!("🛒️ Could not load cart for {buyer_id}: {e}. Starting with an empty cart.");
                Cart::new()
            },
        };
        debug!("🛒️ Cart for {buyer_id} rehydrated with {} item(s)", cart.total_items());
        Self { buyer_id: buyer_id.to_string(), cart, db }
    }

    /// A read-only snapshot of the grouped cart. Consumers must not (and cannot) mutate it.
    pub fn read(&self) -> &Cart {
        &self.cart
    }

    pub fn buyer_id(&self) -> &str {
        &self.buyer_id
    }

    pub fn add_item(&mut self, seller_id: &str, product_ref: ProductRef, quantity: u32, unit_price: Sats, currency: &str) {
        self.cart.add_item(seller_id, product_ref, quantity, unit_price, currency);
        self.persist();
    }

    pub fn set_quantity(&mut self, seller_id: &str, product_ref: &ProductRef, quantity: u32) {
        self.cart.set_quantity(seller_id, product_ref, quantity);
        self.persist();
    }

    pub fn remove_item(&mut self, seller_id: &str, product_ref: &ProductRef) -> bool {
        let removed = self.cart.remove_item(seller_id, product_ref);
        if removed {
            self.persist();
        }
        removed
    }

    pub fn set_shipping_method(&mut self, seller_id: &str, selection: &ShippingSelection) {
        self.cart.set_shipping_method(seller_id, selection);
        self.persist();
    }

    /// Empties the cart and deletes the stored blob. Used on logout and explicit clear.
    pub fn clear(&mut self) {
        self.cart.clear();
        let db = self.db.clone();
        let buyer_id = self.buyer_id.clone();
        tokio::spawn(async move {
            if let Err(e) = db.delete_cart(&buyer_id).await {
                error!("🛒️ Failed to delete stored cart for {buyer_id}: {e}");
            }
        });
    }

    fn persist(&self) {
        let blob = match serde_json::to_string(&self.cart) {
            Ok(blob) => blob,
            Err(e) => {
                error!("🛒️ Cart for {} could not be serialized: {e}", self.buyer_id);
                return;
            },
        };
        let db = self.db.clone();
        let buyer_id = self.buyer_id.clone();
        tokio::spawn(async move {
            if let Err(e) = db.save_cart(&buyer_id, &blob).await {
                error!("🛒️ Failed to persist cart for {buyer_id}: {e}");
            }
        });
    }
}
