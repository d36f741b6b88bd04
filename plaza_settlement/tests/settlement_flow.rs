//! End-to-end settlement flows against a throwaway SQLite database: checkout, payment-request
//! acceptance, receipt-driven resolution, terminal transitions and event hooks.

mod support;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use log::*;
use plaza_common::Sats;
use plaza_settlement::{
    cart::Cart,
    db_types::{
        InvoiceStatus,
        PaymentMethod,
        PaymentProof,
        PaymentRequest,
        ReceiptEvent,
        ShippingSelection,
        ValueShareRecipient,
        WalletAcknowledgement,
    },
    events::{EventHandlers, EventHooks},
    receipts::{RelayPool, ReceiptSubscriptions},
    settlement::{CheckoutEntry, OrderSettlementStatus, SettlementApi, SettlementError},
    SettlementDatabase,
    SettlementDatabaseError,
    SqliteDatabase,
};
use support::prepare_env::create_database;
use tokio::time::sleep;

// SHA-256("abc"); the matching preimage is the hex of "abc".
const PAYMENT_HASH: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
const PREIMAGE: &str = "616263";

fn two_seller_cart() -> Cart {
    let mut cart = Cart::new();
    cart.add_item("seller-a", "prod-1".into(), 2, Sats::from(10_000), "SAT");
    cart.add_item("seller-b", "prod-2".into(), 1, Sats::from(5_000), "SAT");
    cart
}

fn payment_request(amount: Sats, reference: &str) -> PaymentRequest {
    PaymentRequest {
        amount,
        method: PaymentMethod::Lightning,
        reference: reference.to_string(),
        payment_hash: PAYMENT_HASH.to_string(),
        proof: None,
    }
}

fn receipt_for(reference: &str, preimage: Option<&str>) -> ReceiptEvent {
    ReceiptEvent {
        event_id: format!("ev-{reference}"),
        reference: reference.to_string(),
        preimage: preimage.map(str::to_string),
        author: "merchant".to_string(),
        created_at: Utc::now(),
    }
}

async fn new_api(hooks: EventHooks) -> (SettlementApi<SqliteDatabase>, RelayPool) {
    let db = create_database().await;
    let pool = RelayPool::new(16);
    pool.connect();
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let api = SettlementApi::new(db, ReceiptSubscriptions::new(pool.clone()), producers);
    (api, pool)
}

/// Settles one invoice while a receipt for its payable reference lands on the stream.
async fn settle_with_receipt(
    api: &SettlementApi<SqliteDatabase>,
    pool: &RelayPool,
    entry: &CheckoutEntry,
    seq: usize,
    receipt: ReceiptEvent,
) -> plaza_settlement::db_types::PaymentInvoice {
    let invoice_id = &entry.invoices[seq].id;
    let wallet = WalletAcknowledgement::new(PaymentMethod::Lightning);
    let (settled, _) = tokio::join!(api.settle_invoice(invoice_id, &wallet, true), async {
        sleep(Duration::from_millis(100)).await;
        let delivered = pool.publish(receipt);
        debug!("Receipt delivered to {delivered} listener(s)");
    });
    settled.expect("settlement attempt failed").expect("expected a definitive proof")
}

#[tokio::test]
async fn full_checkout_and_settlement_flow() {
    let invoices_paid = Arc::new(AtomicI32::new(0));
    let orders_settled = Arc::new(AtomicI32::new(0));
    let (paid_count, settled_count) = (Arc::clone(&invoices_paid), Arc::clone(&orders_settled));
    let mut hooks = EventHooks::default();
    hooks.on_invoice_paid(move |ev| {
        let count = Arc::clone(&paid_count);
        Box::pin(async move {
            info!("Invoice {} paid", ev.invoice.id);
            count.fetch_add(1, Ordering::SeqCst);
        })
    });
    hooks.on_order_settled(move |ev| {
        let count = Arc::clone(&settled_count);
        Box::pin(async move {
            info!("Order {} settled: {}", ev.order_id, ev.status);
            count.fetch_add(1, Ordering::SeqCst);
        })
    });
    let (api, pool) = new_api(hooks).await;

    let mut cart = two_seller_cart();
    cart.set_shipping_method("seller-a", &ShippingSelection::new("standard", Sats::from(1_500), "SAT"));
    let shares = HashMap::from([("seller-a".to_string(), vec![ValueShareRecipient::new("curator", 10)])]);
    let entries = api.checkout("buyer-1", &cart, &HashMap::new(), &shares).await.unwrap();

    // Lexical seller order, merchant-first invoices, exact fan-out.
    assert_eq!(entries.len(), 2);
    let seller_a = &entries[0];
    assert_eq!(seller_a.order.seller_id, "seller-a");
    assert_eq!(seller_a.order.total, Sats::from(21_500));
    assert_eq!(seller_a.invoices.len(), 2);
    assert_eq!(seller_a.invoices[0].amount, Sats::from(19_350));
    assert_eq!(seller_a.invoices[1].amount, Sats::from(2_150));
    let seller_b = &entries[1];
    assert_eq!(seller_b.order.total, Sats::from(5_000));
    assert_eq!(seller_b.invoices.len(), 1);

    // Merchant invoice: verified receipt preimage is the winning proof.
    api.accept_payment_request(&seller_a.invoices[0].id, &payment_request(Sats::from(19_350), "lnbc-merchant-a"))
        .await
        .unwrap();
    let paid = settle_with_receipt(&api, &pool, seller_a, 0, receipt_for("lnbc-merchant-a", Some(PREIMAGE))).await;
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert!(matches!(paid.proof, Some(PaymentProof::Preimage { .. })));
    assert_eq!(api.order_status(&seller_a.order.id).await.unwrap(), OrderSettlementStatus::InProgress);

    // A paid invoice never settles twice.
    let wallet = WalletAcknowledgement::new(PaymentMethod::Lightning);
    let err = api.settle_invoice(&seller_a.invoices[0].id, &wallet, false).await.unwrap_err();
    assert!(matches!(
        err,
        SettlementError::DatabaseError(SettlementDatabaseError::InvoiceAlreadyFinal(_))
    ));

    // Value-share invoice: a receipt without a preimage is still proof, by reference.
    api.accept_payment_request(&seller_a.invoices[1].id, &payment_request(Sats::from(2_150), "lnbc-share-a"))
        .await
        .unwrap();
    let paid = settle_with_receipt(&api, &pool, seller_a, 1, receipt_for("lnbc-share-a", None)).await;
    assert!(matches!(paid.proof, Some(PaymentProof::ReceiptReference { .. })));
    assert_eq!(api.order_status(&seller_a.order.id).await.unwrap(), OrderSettlementStatus::Complete);

    // Seller B's buyer gives up; one failed invoice fails the whole order.
    let failed = api.fail_invoice(&seller_b.invoices[0].id).await.unwrap();
    assert_eq!(failed.status, InvoiceStatus::Failed);
    assert!(failed.proof.is_none());
    assert_eq!(api.order_status(&seller_b.order.id).await.unwrap(), OrderSettlementStatus::Failed);

    sleep(Duration::from_millis(250)).await;
    assert_eq!(invoices_paid.load(Ordering::SeqCst), 2);
    // Seller A completing and seller B failing each fire the order-settled hook exactly once.
    assert_eq!(orders_settled.load(Ordering::SeqCst), 2);
    pool.teardown();
}

#[tokio::test]
async fn payment_request_amount_must_match_the_invoice() {
    let (api, _pool) = new_api(EventHooks::default()).await;
    let entries = api.checkout("buyer-2", &two_seller_cart(), &HashMap::new(), &HashMap::new()).await.unwrap();
    let invoice = &entries[0].invoices[0];
    let err = api.accept_payment_request(&invoice.id, &payment_request(Sats::from(1), "lnbc-short")).await.unwrap_err();
    assert!(matches!(err, SettlementError::AmountMismatch { .. }));
    // The invoice is untouched.
    let unchanged = api.fetch_invoices(&entries[0].order.id).await.unwrap();
    assert!(unchanged[0].payable.is_none());
}

#[tokio::test]
async fn malformed_commitment_is_rejected_at_acceptance() {
    let (api, _pool) = new_api(EventHooks::default()).await;
    let entries = api.checkout("buyer-3", &two_seller_cart(), &HashMap::new(), &HashMap::new()).await.unwrap();
    let invoice = &entries[0].invoices[0];
    let request = PaymentRequest {
        payment_hash: "not-hex".to_string(),
        ..payment_request(invoice.amount, "lnbc-bad")
    };
    let err = api.accept_payment_request(&invoice.id, &request).await.unwrap_err();
    assert!(matches!(err, SettlementError::PayableReference(_)));
}

#[tokio::test]
async fn settling_without_a_payment_request_is_an_error() {
    let (api, _pool) = new_api(EventHooks::default()).await;
    let entries = api.checkout("buyer-4", &two_seller_cart(), &HashMap::new(), &HashMap::new()).await.unwrap();
    let wallet = WalletAcknowledgement::new(PaymentMethod::Lightning);
    let err = api.settle_invoice(&entries[0].invoices[0].id, &wallet, false).await.unwrap_err();
    assert!(matches!(err, SettlementError::MissingPayableReference(_)));
}

#[tokio::test]
async fn expired_invoice_fails_the_order_and_stays_expired() {
    let (api, _pool) = new_api(EventHooks::default()).await;
    let entries = api.checkout("buyer-5", &two_seller_cart(), &HashMap::new(), &HashMap::new()).await.unwrap();
    let invoice = &entries[1].invoices[0];
    api.accept_payment_request(&invoice.id, &payment_request(invoice.amount, "lnbc-expiring")).await.unwrap();

    let expired = api.expire_invoice(&invoice.id).await.unwrap();
    assert_eq!(expired.status, InvoiceStatus::Expired);
    assert_eq!(api.order_status(&entries[1].order.id).await.unwrap(), OrderSettlementStatus::Failed);

    // Terminal is terminal: neither settlement nor failure can move it again.
    let wallet = WalletAcknowledgement::new(PaymentMethod::Lightning);
    let err = api.settle_invoice(&invoice.id, &wallet, false).await.unwrap_err();
    assert!(matches!(
        err,
        SettlementError::DatabaseError(SettlementDatabaseError::InvoiceAlreadyFinal(_))
    ));
    let err = api.fail_invoice(&invoice.id).await.unwrap_err();
    assert!(matches!(
        err,
        SettlementError::DatabaseError(SettlementDatabaseError::InvoiceAlreadyFinal(_))
    ));
}

#[tokio::test]
async fn zero_total_order_settles_trivially() {
    let (api, _pool) = new_api(EventHooks::default()).await;
    let mut cart = Cart::new();
    cart.add_item("seller-free", "prod-gift".into(), 1, Sats::from(0), "SAT");
    let entries = api.checkout("buyer-6", &cart, &HashMap::new(), &HashMap::new()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].invoices.is_empty());
    assert_eq!(api.order_status(&entries[0].order.id).await.unwrap(), OrderSettlementStatus::Complete);
}

#[tokio::test]
async fn checkout_persists_orders_and_invoices() {
    let (api, _pool) = new_api(EventHooks::default()).await;
    let mut cart = two_seller_cart();
    cart.set_shipping_method("seller-b", &ShippingSelection::new("pickup", Sats::from(0), "SAT"));
    let entries = api.checkout("buyer-7", &cart, &HashMap::new(), &HashMap::new()).await.unwrap();

    for entry in &entries {
        let stored = api.db().fetch_order(&entry.order.id).await.unwrap().expect("order not persisted");
        assert_eq!(stored.seller_id, entry.order.seller_id);
        assert_eq!(stored.total, entry.order.total);
        assert_eq!(stored.items.len(), entry.order.items.len());
        let invoices = api.fetch_invoices(&entry.order.id).await.unwrap();
        assert_eq!(invoices.len(), entry.invoices.len());
        let invoiced: Sats = invoices.iter().map(|i| i.amount).sum();
        assert_eq!(invoiced, entry.order.total);
        assert!(invoices.iter().all(|i| i.status == InvoiceStatus::Pending));
    }
}
