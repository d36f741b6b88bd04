//! # Cart store
//!
//! The cart is the only persistently-shared mutable resource in the settlement core. It groups
//! line items per seller and enforces two invariants at all times:
//!
//! * an item always sits under the group keyed by its own `seller_id`, and removing the last
//!   item of a seller removes that seller's group entirely; empty groups never persist;
//! * quantity is always ≥ 1. Decrementing below 1 is a no-op; removal is an explicit, distinct
//!   operation.
//!
//! [`Cart`] is the pure in-memory model (fully testable without a runtime or database).
//! [`store::CartStore`] pairs a cart with a durable backend and a buyer session key: every
//! mutation updates memory synchronously and then fires off a background save. Persistence
//! failures are logged, never surfaced, and the in-memory cart stays authoritative for the session.

mod store;

use std::collections::BTreeMap;

use plaza_common::Sats;
use serde::{Deserialize, Serialize};

pub use store::CartStore;

use crate::db_types::{CartLineItem, ProductRef, ShippingSelection};

/// Per-seller grouped line items. Seller iteration order is the lexical order of seller ids,
/// which keeps checkout output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    groups: BTreeMap<String, Vec<CartLineItem>>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn seller_count(&self) -> usize {
        self.groups.len()
    }

    pub fn sellers(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// The items grouped under one seller, in insertion order. `None` if the seller has no group.
    pub fn group(&self, seller_id: &str) -> Option<&[CartLineItem]> {
        self.groups.get(seller_id).map(Vec::as_slice)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[CartLineItem])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Adds `quantity` of the product to the seller's group. If the `(seller, product)` line
    /// already exists its quantity is incremented; repeated calls accumulate and never error.
    pub fn add_item(
        &mut self,
        seller_id: &str,
        product_ref: ProductRef,
        quantity: u32,
        unit_price: Sats,
        currency: &str,
    ) {
        let group = self.groups.entry(seller_id.to_string()).or_default();
        match group.iter_mut().find(|item| item.product_ref == product_ref) {
            Some(item) => item.quantity += quantity.max(1),
            None => group.push(CartLineItem::new(seller_id, product_ref, quantity, unit_price, currency)),
        }
    }

    /// Sets the quantity of an existing line, clamped to ≥ 1. A missing line is a no-op, not an
    /// error.
    pub fn set_quantity(&mut self, seller_id: &str, product_ref: &ProductRef, quantity: u32) {
        if let Some(item) =
            self.groups.get_mut(seller_id).and_then(|g| g.iter_mut().find(|i| &i.product_ref == product_ref))
        {
            item.quantity = quantity.max(1);
        }
    }

    /// Removes the line entirely. If it was the seller's last item, the seller group goes with
    /// it. Returns whether anything was removed.
    pub fn remove_item(&mut self, seller_id: &str, product_ref: &ProductRef) -> bool {
        let Some(group) = self.groups.get_mut(seller_id) else {
            return false;
        };
        let before = group.len();
        group.retain(|item| &item.product_ref != product_ref);
        let removed = group.len() < before;
        if group.is_empty() {
            self.groups.remove(seller_id);
        }
        removed
    }

    /// Applies a shipping selection uniformly to every line in the seller's group, overwriting
    /// any prior selection.
    pub fn set_shipping_method(&mut self, seller_id: &str, selection: &ShippingSelection) {
        if let Some(group) = self.groups.get_mut(seller_id) {
            for item in group.iter_mut() {
                item.shipping_method_id = Some(selection.method_id.clone());
                item.shipping_cost = selection.cost;
                item.shipping_currency = selection.currency.clone();
            }
        }
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Sum of item subtotals for one seller's group, excluding shipping.
    pub fn seller_subtotal(&self, seller_id: &str) -> Sats {
        self.groups.get(seller_id).map(|g| g.iter().map(CartLineItem::subtotal).sum()).unwrap_or_default()
    }

    pub fn total_items(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cart_with_one_item() -> Cart {
        let mut cart = Cart::new();
        cart.add_item("seller-a", "prod-1".into(), 2, Sats::from(1_000), "SAT");
        cart
    }

    #[test]
    fn add_accumulates_quantity() {
        let mut cart = cart_with_one_item();
        cart.add_item("seller-a", "prod-1".into(), 3, Sats::from(1_000), "SAT");
        let group = cart.group("seller-a").unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].quantity, 5);
    }

    #[test]
    fn items_never_land_under_the_wrong_seller() {
        let mut cart = cart_with_one_item();
        cart.add_item("seller-b", "prod-2".into(), 1, Sats::from(4_000), "SAT");
        for (seller, items) in cart.groups() {
            for item in items {
                assert_eq!(item.seller_id, seller);
            }
        }
    }

    #[test]
    fn set_quantity_clamps_to_one() {
        let mut cart = cart_with_one_item();
        cart.set_quantity("seller-a", &"prod-1".into(), 0);
        assert_eq!(cart.group("seller-a").unwrap()[0].quantity, 1);
    }

    #[test]
    fn set_quantity_on_missing_item_is_a_noop() {
        let mut cart = cart_with_one_item();
        cart.set_quantity("seller-a", &"prod-nope".into(), 7);
        cart.set_quantity("seller-z", &"prod-1".into(), 7);
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.seller_count(), 1);
    }

    #[test]
    fn removing_last_item_prunes_the_group() {
        let mut cart = cart_with_one_item();
        assert!(cart.remove_item("seller-a", &"prod-1".into()));
        assert!(cart.group("seller-a").is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn group_is_recreated_after_full_removal() {
        let mut cart = cart_with_one_item();
        cart.remove_item("seller-a", &"prod-1".into());
        cart.add_item("seller-a", "prod-9".into(), 1, Sats::from(250), "SAT");
        let group = cart.group("seller-a").unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].product_ref, "prod-9".into());
    }

    #[test]
    fn removing_one_seller_leaves_others_untouched() {
        let mut cart = Cart::new();
        cart.add_item("seller-a", "prod-1".into(), 1, Sats::from(2_500), "SAT");
        cart.add_item("seller-b", "prod-2".into(), 1, Sats::from(4_000), "SAT");
        cart.remove_item("seller-a", &"prod-1".into());
        assert_eq!(cart.seller_count(), 1);
        assert_eq!(cart.seller_subtotal("seller-b"), Sats::from(4_000));
    }

    #[test]
    fn shipping_applies_to_the_whole_group_and_overwrites() {
        let mut cart = Cart::new();
        cart.add_item("seller-a", "prod-1".into(), 1, Sats::from(1_000), "SAT");
        cart.add_item("seller-a", "prod-2".into(), 1, Sats::from(2_000), "SAT");
        cart.set_shipping_method("seller-a", &ShippingSelection::new("standard", Sats::from(500), "SAT"));
        cart.set_shipping_method("seller-a", &ShippingSelection::new("express", Sats::from(900), "SAT"));
        for item in cart.group("seller-a").unwrap() {
            assert_eq!(item.shipping_method_id.as_deref(), Some("express"));
            assert_eq!(item.shipping_cost, Sats::from(900));
        }
    }

    #[test]
    fn serde_round_trip_reproduces_grouping() {
        let mut cart = Cart::new();
        cart.add_item("seller-a", "prod-1".into(), 2, Sats::from(1_000), "SAT");
        cart.add_item("seller-a", "prod-2".into(), 1, Sats::from(750), "SAT");
        cart.add_item("seller-b", "prod-3".into(), 4, Sats::from(50), "SAT");
        cart.set_shipping_method("seller-a", &ShippingSelection::new("standard", Sats::from(500), "SAT"));
        let blob = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&blob).unwrap();
        assert_eq!(back, cart);
    }
}
