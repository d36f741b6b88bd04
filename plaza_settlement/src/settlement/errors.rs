use plaza_common::Sats;
use thiserror::Error;

use crate::{
    db_types::InvoiceId,
    helpers::PayableReferenceError,
    splitter::SplitError,
    traits::SettlementDatabaseError,
};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SettlementDatabaseError),
    #[error("Invoice splitting failed: {0}")]
    SplitError(#[from] SplitError),
    #[error("Payable reference rejected: {0}")]
    PayableReference(#[from] PayableReferenceError),
    #[error("Invoice {0} has no payable reference attached yet")]
    MissingPayableReference(InvoiceId),
    #[error("Payment request for invoice {invoice_id} asks for {requested}, but the invoice amount is {expected}")]
    AmountMismatch { invoice_id: InvoiceId, expected: Sats, requested: Sats },
}
