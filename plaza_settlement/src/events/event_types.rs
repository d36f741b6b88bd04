use crate::{
    db_types::{OrderId, PaymentInvoice},
    settlement::OrderSettlementStatus,
};

/// Fired whenever an invoice transitions to `Paid`. Carries the full invoice, proof included.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoicePaidEvent {
    pub invoice: PaymentInvoice,
}

impl InvoicePaidEvent {
    pub fn new(invoice: PaymentInvoice) -> Self {
        Self { invoice }
    }
}

/// Fired when an order's aggregate status reaches a terminal value: every invoice paid
/// (`Complete`) or at least one failed/expired with none pending (`Failed`).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSettledEvent {
    pub order_id: OrderId,
    pub status: OrderSettlementStatus,
}

impl OrderSettledEvent {
    pub fn new(order_id: OrderId, status: OrderSettlementStatus) -> Self {
        Self { order_id, status }
    }
}
