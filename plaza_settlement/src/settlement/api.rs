use std::{collections::HashMap, fmt::Debug};

use log::*;

use crate::{
    cart::Cart,
    db_types::{
        InvoiceId,
        Order,
        OrderId,
        PaymentInvoice,
        PaymentRequest,
        ShippingSelection,
        ValueShareRecipient,
        WalletAcknowledgement,
    },
    events::{EventProducers, InvoicePaidEvent, OrderSettledEvent},
    helpers::PayableReference,
    receipts::ReceiptSubscriptions,
    resolution::{resolve_payment, Resolution},
    settlement::{aggregate_status, OrderSettlementStatus, SettlementError},
    splitter::{checkout_order, split_order},
    traits::SettlementDatabase,
};

/// One seller's checkout result: the frozen order plus its invoices in splitter order.
#[derive(Debug, Clone)]
pub struct CheckoutEntry {
    pub order: Order,
    pub invoices: Vec<PaymentInvoice>,
}

/// `SettlementApi` is the primary API for driving orders and invoices through settlement in
/// response to checkout, payment requests and wallet payment results.
pub struct SettlementApi<B> {
    db: B,
    subscriptions: ReceiptSubscriptions,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, subscriptions: ReceiptSubscriptions, producers: EventProducers) -> Self {
        Self { db, subscriptions, producers }
    }
}

impl<B> SettlementApi<B>
where B: SettlementDatabase
{
    /// Partitions the cart into one order per seller, splits each order into invoices, and
    /// persists everything. Seller order is the cart's (lexical) grouping order, so repeated
    /// checkouts of the same cart derive orders in the same sequence.
    ///
    /// `shipping` and `value_shares` are keyed by seller id. A seller absent from the shipping
    /// map falls back to the selection stored on its cart group; absent from the value-share
    /// map means no value-share recipients. A zero-total seller still produces an order, but
    /// with no invoices; it is trivially settled.
    pub async fn checkout(
        &self,
        buyer_id: &str,
        cart: &Cart,
        shipping: &HashMap<String, ShippingSelection>,
        value_shares: &HashMap<String, Vec<ValueShareRecipient>>,
    ) -> Result<Vec<CheckoutEntry>, SettlementError> {
        let mut entries = Vec::with_capacity(cart.seller_count());
        for (seller_id, items) in cart.groups() {
            let selection = shipping.get(seller_id).cloned().or_else(|| {
                items.first().and_then(|i| {
                    i.shipping_method_id
                        .as_ref()
                        .map(|m| ShippingSelection::new(m, i.shipping_cost, &i.shipping_currency))
                })
            });
            let order = checkout_order(buyer_id, seller_id, items, selection);
            let recipients = value_shares.get(seller_id).map(Vec::as_slice).unwrap_or_default();
            let invoices = split_order(&order, recipients)?;
            self.db.insert_order(&order).await?;
            self.db.insert_invoices(&invoices).await?;
            debug!("🔄️📦️ Order {} checked out with {} invoice(s) for seller {seller_id}", order.id, invoices.len());
            entries.push(CheckoutEntry { order, invoices });
        }
        Ok(entries)
    }

    /// Accepts the payment-request record a recipient sent for one invoice, validating the
    /// amount and the embedded commitment before attaching the payable reference. Overwriting
    /// the reference on a still-pending invoice is allowed (a recipient may reissue).
    pub async fn accept_payment_request(
        &self,
        invoice_id: &InvoiceId,
        request: &PaymentRequest,
    ) -> Result<PaymentInvoice, SettlementError> {
        let invoice = self
            .db
            .fetch_invoice(invoice_id)
            .await?
            .ok_or_else(|| crate::traits::SettlementDatabaseError::InvoiceNotFound(invoice_id.clone()))?;
        if request.amount != invoice.amount {
            return Err(SettlementError::AmountMismatch {
                invoice_id: invoice_id.clone(),
                expected: invoice.amount,
                requested: request.amount,
            });
        }
        let payable = PayableReference::new(&request.reference, &request.payment_hash)?;
        let updated = self.db.set_payable_reference(invoice_id, &payable).await?;
        debug!("🔄️🧾️ Payment request accepted for {invoice_id} over {}", request.method);
        Ok(updated)
    }

    /// Runs one settlement attempt for the invoice against the wallet-call result.
    ///
    /// A definitive proof transitions the invoice `Pending → Paid` and attaches the proof
    /// exactly once; `StillWaiting` leaves the invoice pending and the caller should offer a
    /// retry, which re-enters resolution fresh. Attempting to settle an invoice already in a
    /// terminal state is an error.
    pub async fn settle_invoice(
        &self,
        invoice_id: &InvoiceId,
        wallet: &WalletAcknowledgement,
        require_receipt: bool,
    ) -> Result<Option<PaymentInvoice>, SettlementError> {
        let invoice = self
            .db
            .fetch_invoice(invoice_id)
            .await?
            .ok_or_else(|| crate::traits::SettlementDatabaseError::InvoiceNotFound(invoice_id.clone()))?;
        if invoice.status.is_terminal() {
            return Err(crate::traits::SettlementDatabaseError::InvoiceAlreadyFinal(invoice_id.clone()).into());
        }
        let payable = invoice.payable.ok_or_else(|| SettlementError::MissingPayableReference(invoice_id.clone()))?;

        match resolve_payment(&self.subscriptions, &payable, wallet, require_receipt).await {
            Resolution::Proven(proof) => {
                let paid = self.db.mark_invoice_paid(invoice_id, &proof).await?;
                info!("🔄️💰️ Invoice {invoice_id} paid with {} proof", proof.kind());
                self.call_invoice_paid_hook(&paid).await;
                self.call_order_settled_hook(&paid.order_id).await?;
                Ok(Some(paid))
            },
            Resolution::StillWaiting => {
                debug!("🔄️⏳️ Invoice {invoice_id} is still waiting for receipt confirmation");
                Ok(None)
            },
        }
    }

    /// `Pending → Failed`: the wallet call was rejected, or the buyer abandoned resolution.
    pub async fn fail_invoice(&self, invoice_id: &InvoiceId) -> Result<PaymentInvoice, SettlementError> {
        let failed = self.db.mark_invoice_failed(invoice_id).await?;
        info!("🔄️❌️ Invoice {invoice_id} marked as failed");
        self.call_order_settled_hook(&failed.order_id).await?;
        Ok(failed)
    }

    /// `Pending → Expired`: the payable reference aged past its own expiry. The expiry signal
    /// comes from outside the core.
    pub async fn expire_invoice(&self, invoice_id: &InvoiceId) -> Result<PaymentInvoice, SettlementError> {
        let expired = self.db.mark_invoice_expired(invoice_id).await?;
        info!("🔄️⌛️ Invoice {invoice_id} marked as expired");
        self.call_order_settled_hook(&expired.order_id).await?;
        Ok(expired)
    }

    /// The order's aggregate settlement status, computed from its invoices on every call.
    pub async fn order_status(&self, order_id: &OrderId) -> Result<OrderSettlementStatus, SettlementError> {
        let invoices = self.db.fetch_invoices_for_order(order_id).await?;
        Ok(aggregate_status(&invoices))
    }

    pub async fn fetch_invoices(&self, order_id: &OrderId) -> Result<Vec<PaymentInvoice>, SettlementError> {
        Ok(self.db.fetch_invoices_for_order(order_id).await?)
    }

    async fn call_invoice_paid_hook(&self, invoice: &PaymentInvoice) {
        for emitter in &self.producers.invoice_paid_producer {
            debug!("🔄️📨️ Notifying invoice-paid hook subscribers");
            emitter.publish_event(InvoicePaidEvent::new(invoice.clone())).await;
        }
    }

    /// Emits an order-settled event when, and only when, the order's aggregate status has just
    /// become terminal.
    async fn call_order_settled_hook(&self, order_id: &OrderId) -> Result<(), SettlementError> {
        if self.producers.order_settled_producer.is_empty() {
            return Ok(());
        }
        let invoices = self.db.fetch_invoices_for_order(order_id).await?;
        let status = aggregate_status(&invoices);
        if status == OrderSettlementStatus::InProgress {
            return Ok(());
        }
        for emitter in &self.producers.order_settled_producer {
            debug!("🔄️📨️ Notifying order-settled hook subscribers for {order_id}");
            emitter.publish_event(OrderSettledEvent::new(order_id.clone(), status)).await;
        }
        Ok(())
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
