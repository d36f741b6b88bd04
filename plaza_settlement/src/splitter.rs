//! # Order derivation and invoice splitting
//!
//! Checkout partitions the cart into one order per seller, then fans each order's total out
//! into one payable invoice per payment recipient: the merchant plus zero or more value-share
//! recipients.
//!
//! The rounding rule keeps every amount an integer satoshi while summing exactly to the order
//! total: each value-share amount is `floor(total × share / 100)`, and the merchant invoice is
//! assigned whatever remains. Share configurations summing to more than 100% are a caller
//! configuration error and are rejected outright; the splitter never clamps and never emits a
//! negative merchant amount.

use chrono::Utc;
use log::*;
use plaza_common::Sats;
use rand::Rng;
use thiserror::Error;

use crate::db_types::{
    CartLineItem,
    InvoiceId,
    InvoiceStatus,
    Order,
    OrderId,
    PaymentInvoice,
    RecipientRole,
    ShippingSelection,
    ValueShareRecipient,
};

#[derive(Debug, Clone, Error)]
pub enum SplitError {
    #[error("Value-share percentages for {recipient} must be in 1..=100, got {percent}")]
    InvalidShare { recipient: String, percent: u8 },
    #[error("Value-share percentages sum to {0}%, which exceeds 100%")]
    SharesExceedTotal(u32),
}

/// Freezes one seller's cart group into an immutable order. The total is the sum of item
/// subtotals plus the agreed shipping cost.
pub fn checkout_order(
    buyer_id: &str,
    seller_id: &str,
    items: &[CartLineItem],
    shipping: Option<ShippingSelection>,
) -> Order {
    let subtotal: Sats = items.iter().map(CartLineItem::subtotal).sum();
    let total = subtotal + shipping.as_ref().map(|s| s.cost).unwrap_or_default();
    let nonce: u32 = rand::thread_rng().gen();
    let id = OrderId(format!("{seller_id}-{nonce:08x}"));
    debug!("🧾️ Order {id} derived for seller {seller_id}: {total}");
    Order {
        id,
        seller_id: seller_id.to_string(),
        buyer_id: buyer_id.to_string(),
        items: items.to_vec(),
        shipping,
        total,
        created_at: Utc::now(),
    }
}

/// Fans an order's total out into payable invoices: merchant first, then value-share
/// recipients in configured order. Zero-amount invoices are never created, so an order with a
/// zero total yields no invoices at all; it is trivially settled.
pub fn split_order(order: &Order, recipients: &[ValueShareRecipient]) -> Result<Vec<PaymentInvoice>, SplitError> {
    for r in recipients {
        if r.share_percent == 0 || r.share_percent > 100 {
            return Err(SplitError::InvalidShare { recipient: r.recipient_id.clone(), percent: r.share_percent });
        }
    }
    let share_sum: u32 = recipients.iter().map(|r| u32::from(r.share_percent)).sum();
    if share_sum > 100 {
        return Err(SplitError::SharesExceedTotal(share_sum));
    }

    if order.total.is_zero() {
        debug!("🧾️ Order {} has a zero total; no invoices to create", order.id);
        return Ok(Vec::new());
    }

    let total = order.total.value();
    let mut shared = 0i64;
    let mut share_amounts = Vec::with_capacity(recipients.len());
    for r in recipients {
        let amount = total * i64::from(r.share_percent) / 100;
        shared += amount;
        share_amounts.push((r, amount));
    }
    let merchant_amount = total - shared;

    let now = Utc::now();
    let mut invoices = Vec::with_capacity(recipients.len() + 1);
    let mut push = |recipient_id: &str, role: RecipientRole, amount: i64| {
        let seq = invoices.len();
        invoices.push(PaymentInvoice {
            id: InvoiceId(format!("{}-{seq}", order.id.as_str())),
            order_id: order.id.clone(),
            recipient_id: recipient_id.to_string(),
            role,
            amount: Sats::from(amount),
            payable: None,
            status: InvoiceStatus::Pending,
            proof: None,
            created_at: now,
            updated_at: now,
        });
    };
    if merchant_amount > 0 {
        push(&order.seller_id, RecipientRole::Merchant, merchant_amount);
    }
    for (r, amount) in share_amounts {
        if amount > 0 {
            push(&r.recipient_id, RecipientRole::ValueShare, amount);
        }
    }
    debug!("🧾️ Order {} split into {} invoice(s)", order.id, invoices.len());
    Ok(invoices)
}
