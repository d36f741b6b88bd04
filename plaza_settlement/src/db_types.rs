//! Core data types for the settlement engine.
//!
//! These types are shared between the cart store, the invoice splitter, the resolution engine and
//! the database backends. Status enums carry `Display`/`FromStr` impls so that they can be stored
//! as plain text by any backend.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use plaza_common::{Sats, Secret};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------    ProductRef     -----------------------------------------------------------
/// An opaque catalog identifier. The settlement core never interprets it; it only travels with
/// line items and order announcements.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ProductRef(pub String);

impl From<&str> for ProductRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProductRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for ProductRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ProductRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderId      -----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     InvoiceId     -----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct InvoiceId(pub String);

impl From<String> for InvoiceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inv:{}", self.0)
    }
}

impl InvoiceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    CartLineItem   -----------------------------------------------------------
/// A single line in the buyer's cart. Owned exclusively by the cart store and mutated only
/// through its operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product_ref: ProductRef,
    pub seller_id: String,
    pub quantity: u32,
    pub unit_price: Sats,
    pub currency: String,
    pub shipping_method_id: Option<String>,
    pub shipping_cost: Sats,
    pub shipping_currency: String,
}

impl CartLineItem {
    pub fn new(seller_id: &str, product_ref: ProductRef, quantity: u32, unit_price: Sats, currency: &str) -> Self {
        Self {
            product_ref,
            seller_id: seller_id.to_string(),
            quantity: quantity.max(1),
            unit_price,
            currency: currency.to_string(),
            shipping_method_id: None,
            shipping_cost: Sats::default(),
            shipping_currency: currency.to_string(),
        }
    }

    /// The item subtotal, `unit_price × quantity`. Shipping is accounted per seller group, not here.
    pub fn subtotal(&self) -> Sats {
        self.unit_price * i64::from(self.quantity)
    }
}

//--------------------------------------  ShippingSelection ----------------------------------------------------------
/// The shipping method agreed for one seller's group. Applies uniformly to every line item in
/// that group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingSelection {
    pub method_id: String,
    pub cost: Sats,
    pub currency: String,
}

impl ShippingSelection {
    pub fn new(method_id: &str, cost: Sats, currency: &str) -> Self {
        Self { method_id: method_id.to_string(), cost, currency: currency.to_string() }
    }
}

//--------------------------------------       Order       -----------------------------------------------------------
/// One buyer's order against a single seller, derived from the cart at checkout time.
///
/// Orders are immutable once created. Re-running checkout after the cart changes creates a new
/// order; it never mutates an old one.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub seller_id: String,
    pub buyer_id: String,
    pub items: Vec<CartLineItem>,
    pub shipping: Option<ShippingSelection>,
    pub total: Sats,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// The record announced to the seller when the order is created.
    pub fn announcement(&self) -> OrderAnnouncement {
        let items = self.items.iter().map(|i| (i.product_ref.clone(), i.quantity)).collect();
        OrderAnnouncement {
            buyer_id: self.buyer_id.clone(),
            order_id: self.id.clone(),
            total: self.total,
            items,
        }
    }
}

/// The order-creation record sent to a seller: who is buying, a stable order id, the total, and
/// the `(catalog reference, quantity)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnouncement {
    pub buyer_id: String,
    pub order_id: OrderId,
    pub total: Sats,
    pub items: Vec<(ProductRef, u32)>,
}

//--------------------------------------   RecipientRole   -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RecipientRole {
    /// The seller themselves.
    Merchant,
    /// A third party entitled to a percentage of the seller's proceeds.
    ValueShare,
}

impl Display for RecipientRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipientRole::Merchant => write!(f, "Merchant"),
            RecipientRole::ValueShare => write!(f, "ValueShare"),
        }
    }
}

impl FromStr for RecipientRole {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Merchant" => Ok(Self::Merchant),
            "ValueShare" => Ok(Self::ValueShare),
            s => Err(ConversionError(format!("Invalid recipient role: {s}"))),
        }
    }
}

//--------------------------------------   PaymentMethod   -----------------------------------------------------------
/// The payment rails the marketplace settles over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    Lightning,
    OnChain,
    Ecash,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Lightning => write!(f, "Lightning"),
            PaymentMethod::OnChain => write!(f, "OnChain"),
            PaymentMethod::Ecash => write!(f, "Ecash"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Lightning" => Ok(Self::Lightning),
            "OnChain" => Ok(Self::OnChain),
            "Ecash" => Ok(Self::Ecash),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------   InvoiceStatus   -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum InvoiceStatus {
    /// The invoice has been created and no definitive proof of payment exists yet.
    Pending,
    /// A payment proof has been attached. Terminal.
    Paid,
    /// The wallet call was rejected, or the buyer abandoned resolution. Terminal.
    Failed,
    /// The payable reference aged past its own expiry. Terminal.
    Expired,
}

impl InvoiceStatus {
    /// Terminal states are sinks; no transition ever leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvoiceStatus::Pending)
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "Pending"),
            InvoiceStatus::Paid => write!(f, "Paid"),
            InvoiceStatus::Failed => write!(f, "Failed"),
            InvoiceStatus::Expired => write!(f, "Expired"),
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError(format!("Invalid invoice status: {s}"))),
        }
    }
}

impl From<String> for InvoiceStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid invoice status: {value}. But this conversion cannot fail. Defaulting to Pending");
            InvoiceStatus::Pending
        })
    }
}

//--------------------------------------   PaymentProof    -----------------------------------------------------------
/// A definitive proof that an invoice was paid, attached to exactly one invoice and never
/// mutated after creation.
///
/// The three kinds form a strict strength ordering. A revealed preimage that hashes to the
/// commitment in the payable reference is protocol-level evidence. A receipt reference is
/// third-party evidence without the secret. A wallet acknowledgement is only the paying wallet's
/// own claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentProof {
    Preimage { value: Secret<String> },
    ReceiptReference { event_id: String },
    WalletAck { method: PaymentMethod, at: DateTime<Utc> },
}

impl PaymentProof {
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentProof::Preimage { .. } => "preimage",
            PaymentProof::ReceiptReference { .. } => "receipt_reference",
            PaymentProof::WalletAck { .. } => "wallet_acknowledgement",
        }
    }
}

//--------------------------------------  PaymentInvoice   -----------------------------------------------------------
/// One payable request for a specific amount to a specific recipient, distinct from the
/// buyer-facing order. Created by the invoice splitter at checkout; mutated only by the
/// settlement orchestrator; never deleted, only superseded by a new order's invoices.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInvoice {
    pub id: InvoiceId,
    pub order_id: OrderId,
    pub recipient_id: String,
    pub role: RecipientRole,
    pub amount: Sats,
    /// The raw payable reference (e.g. a Lightning invoice string) and its embedded preimage
    /// commitment. `None` until a payment request for this invoice has been accepted.
    pub payable: Option<crate::helpers::PayableReference>,
    pub status: InvoiceStatus,
    /// Set exactly once, if and only if `status == Paid`.
    pub proof: Option<PaymentProof>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//------------------------------------ ValueShareRecipient -----------------------------------------------------------
/// A third party entitled to a percentage of a seller's proceeds. Supplied by seller
/// configuration; read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueShareRecipient {
    pub recipient_id: String,
    /// Whole-number percentage, 1..=100. Shares across one seller's recipients sum to at most 100.
    pub share_percent: u8,
}

impl ValueShareRecipient {
    pub fn new(recipient_id: &str, share_percent: u8) -> Self {
        Self { recipient_id: recipient_id.to_string(), share_percent }
    }
}

//--------------------------------------  PaymentRequest   -----------------------------------------------------------
/// The payment-request record received from a seller or value-share recipient: how much to pay,
/// over which rail, against which payable reference. The commitment hex travels with the
/// reference so the core never needs to decode the reference format itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Sats,
    pub method: PaymentMethod,
    pub reference: String,
    pub payment_hash: String,
    pub proof: Option<String>,
}

//--------------------------------------   ReceiptEvent    -----------------------------------------------------------
/// A payment-receipt record observed on the public event stream. Published by a third party
/// (the merchant or a value-share participant), not the payer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptEvent {
    pub event_id: String,
    /// The payable reference this receipt asserts was paid.
    pub reference: String,
    /// The revealed payment secret, if the receipt author knew it. Hex-encoded.
    pub preimage: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

//---------------------------------- WalletAcknowledgement -----------------------------------------------------------
/// The successful result of an external wallet-pay call. The core consumes this; it never
/// implements the wallet transport itself.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletAcknowledgement {
    pub method: PaymentMethod,
    /// The payment secret, if the wallet learned it (Lightning wallets usually do).
    pub preimage: Option<Secret<String>>,
    pub at: DateTime<Utc>,
}

impl WalletAcknowledgement {
    pub fn new(method: PaymentMethod) -> Self {
        Self { method, preimage: None, at: Utc::now() }
    }

    pub fn with_preimage(mut self, preimage: &str) -> Self {
        self.preimage = Some(Secret::new(preimage.to_string()));
        self
    }
}
