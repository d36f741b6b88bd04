//! Cart persistence across restarts: mutations survive a reload from SQLite, and a damaged
//! blob degrades to an empty cart instead of poisoning the session.

mod support;

use std::time::Duration;

use plaza_common::Sats;
use plaza_settlement::{cart::CartStore, db_types::ShippingSelection};
use support::prepare_env::create_database;
use tokio::time::sleep;

// Saves run in the background; give the writer a moment before reloading.
async fn settle_writes() {
    sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn cart_survives_a_restart() {
    let db = create_database().await;
    let mut store = CartStore::new("buyer-roundtrip", db.clone());
    store.add_item("seller-a", "prod-1".into(), 3, Sats::from(10_000), "SAT");
    store.add_item("seller-a", "prod-2".into(), 1, Sats::from(2_500), "SAT");
    store.add_item("seller-b", "prod-9".into(), 2, Sats::from(800), "SAT");
    store.set_shipping_method("seller-a", &ShippingSelection::new("express", Sats::from(1_200), "SAT"));
    store.set_quantity("seller-b", &"prod-9".into(), 5);
    settle_writes().await;

    let reloaded = CartStore::load("buyer-roundtrip", db).await;
    assert_eq!(reloaded.read(), store.read());
    assert_eq!(reloaded.read().seller_count(), 2);
    assert_eq!(reloaded.read().group("seller-b").unwrap()[0].quantity, 5);
    let group_a = reloaded.read().group("seller-a").unwrap();
    assert!(group_a.iter().all(|i| i.shipping_method_id.as_deref() == Some("express")));
}

#[tokio::test]
async fn removal_and_clear_persist() {
    let db = create_database().await;
    let mut store = CartStore::new("buyer-removal", db.clone());
    store.add_item("seller-a", "prod-1".into(), 1, Sats::from(1_000), "SAT");
    store.add_item("seller-b", "prod-2".into(), 1, Sats::from(2_000), "SAT");
    assert!(store.remove_item("seller-a", &"prod-1".into()));
    settle_writes().await;

    let reloaded = CartStore::load("buyer-removal", db.clone()).await;
    assert_eq!(reloaded.read().seller_count(), 1);
    assert!(reloaded.read().group("seller-a").is_none());

    store.clear();
    settle_writes().await;
    let reloaded = CartStore::load("buyer-removal", db).await;
    assert!(reloaded.read().is_empty());
}

#[tokio::test]
async fn separate_buyers_have_separate_carts() {
    let db = create_database().await;
    let mut alice = CartStore::new("alice", db.clone());
    let mut bob = CartStore::new("bob", db.clone());
    alice.add_item("seller-a", "prod-1".into(), 2, Sats::from(500), "SAT");
    bob.add_item("seller-a", "prod-2".into(), 1, Sats::from(900), "SAT");
    settle_writes().await;

    let alice_again = CartStore::load("alice", db.clone()).await;
    let bob_again = CartStore::load("bob", db).await;
    assert_eq!(alice_again.read().total_items(), 1);
    assert_eq!(bob_again.read().total_items(), 1);
    assert_ne!(alice_again.read(), bob_again.read());
}

#[tokio::test]
async fn damaged_blob_loads_as_an_empty_cart() {
    let db = create_database().await;
    sqlx::query("INSERT INTO carts (buyer_id, blob, updated_at) VALUES ($1, $2, CURRENT_TIMESTAMP)")
        .bind("buyer-damaged")
        .bind("{not json")
        .execute(db.pool())
        .await
        .unwrap();
    let store = CartStore::load("buyer-damaged", db).await;
    assert!(store.read().is_empty());
}

#[tokio::test]
async fn missing_cart_loads_as_an_empty_cart() {
    let db = create_database().await;
    let store = CartStore::load("buyer-unknown", db).await;
    assert!(store.read().is_empty());
}
