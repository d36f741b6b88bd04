use thiserror::Error;

use crate::db_types::{InvoiceId, Order, OrderId, PaymentInvoice, PaymentProof};
use crate::helpers::{PayableReference, PayableReferenceError};

/// The backend contract for the settlement orchestrator.
///
/// Implementations must make the three `mark_invoice_*` transitions atomic with respect to the
/// current status: a transition only succeeds from `Pending`, so duplicate proofs and
/// out-of-order transitions are rejected by the storage layer itself, not by callers
/// remembering to check first.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    async fn close(&mut self) -> Result<(), SettlementDatabaseError>;

    /// Stores a freshly checked-out order along with its frozen line items. Orders are
    /// immutable; inserting an existing order id is an error.
    async fn insert_order(&self, order: &Order) -> Result<(), SettlementDatabaseError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, SettlementDatabaseError>;

    /// Stores the invoices derived for one order, in splitter order.
    async fn insert_invoices(&self, invoices: &[PaymentInvoice]) -> Result<(), SettlementDatabaseError>;

    async fn fetch_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<PaymentInvoice>, SettlementDatabaseError>;

    /// All invoices for the order, in the order the splitter emitted them (merchant first, then
    /// value-share recipients as configured).
    async fn fetch_invoices_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentInvoice>, SettlementDatabaseError>;

    /// Attaches (or replaces) the payable reference on a still-pending invoice.
    async fn set_payable_reference(
        &self,
        invoice_id: &InvoiceId,
        payable: &PayableReference,
    ) -> Result<PaymentInvoice, SettlementDatabaseError>;

    /// `Pending → Paid`, attaching the proof. The proof is set exactly once; a second call for
    /// the same invoice returns [`SettlementDatabaseError::InvoiceAlreadyFinal`].
    async fn mark_invoice_paid(
        &self,
        invoice_id: &InvoiceId,
        proof: &PaymentProof,
    ) -> Result<PaymentInvoice, SettlementDatabaseError>;

    /// `Pending → Failed`.
    async fn mark_invoice_failed(&self, invoice_id: &InvoiceId) -> Result<PaymentInvoice, SettlementDatabaseError>;

    /// `Pending → Expired`.
    async fn mark_invoice_expired(&self, invoice_id: &InvoiceId) -> Result<PaymentInvoice, SettlementDatabaseError>;
}

#[derive(Debug, Error)]
pub enum SettlementDatabaseError {
    #[error("Database backend error: {0}")]
    DatabaseError(String),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Invoice {0} does not exist")]
    InvoiceNotFound(InvoiceId),
    #[error("Invoice {0} is already in a terminal state; its status and proof can never change")]
    InvoiceAlreadyFinal(InvoiceId),
    #[error("Stored payable reference is unusable: {0}")]
    PayableReference(#[from] PayableReferenceError),
}

impl From<sqlx::Error> for SettlementDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        SettlementDatabaseError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for SettlementDatabaseError {
    fn from(e: serde_json::Error) -> Self {
        SettlementDatabaseError::DatabaseError(format!("Stored record failed to (de)serialize: {e}"))
    }
}
