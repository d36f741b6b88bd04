//! # Settlement orchestration
//!
//! The orchestrator drives invoices through their status state machine using results from the
//! resolution engine, and surfaces the aggregate settlement status of an order. Invoice status
//! is monotonic: `Pending` is initial, and `Paid`, `Failed` and `Expired` are sinks. An
//! invoice's proof is set if and only if it is `Paid`, exactly once. Re-settlement after a
//! failure requires a new order and a new invoice set, never a resurrection of the old one.

mod api;
mod errors;

use std::fmt::Display;

pub use api::{CheckoutEntry, SettlementApi};
pub use errors::SettlementError;

use crate::db_types::{InvoiceStatus, PaymentInvoice};

/// An order's aggregate settlement status. Computed from its invoices, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSettlementStatus {
    /// Every invoice is paid. An order with no invoices (zero total) is trivially complete.
    Complete,
    /// At least one invoice failed or expired and none are still pending.
    Failed,
    /// At least one invoice is still pending.
    InProgress,
}

impl Display for OrderSettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSettlementStatus::Complete => write!(f, "Complete"),
            OrderSettlementStatus::Failed => write!(f, "Failed"),
            OrderSettlementStatus::InProgress => write!(f, "InProgress"),
        }
    }
}

/// Folds an order's invoices into the aggregate status.
pub fn aggregate_status(invoices: &[PaymentInvoice]) -> OrderSettlementStatus {
    if invoices.iter().any(|i| i.status == InvoiceStatus::Pending) {
        OrderSettlementStatus::InProgress
    } else if invoices.iter().all(|i| i.status == InvoiceStatus::Paid) {
        OrderSettlementStatus::Complete
    } else {
        OrderSettlementStatus::Failed
    }
}
