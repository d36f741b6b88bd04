//! # Payment resolution
//!
//! Given one invoice's payable reference and the result of the external wallet-pay call, the
//! resolution engine races the receipt stream against a fixed timeout and then classifies
//! whatever it has into a single definitive proof, or a "still waiting" signal.
//!
//! The classification is a strict priority cascade. A receipt whose embedded secret verifies
//! against the payable reference always wins: wallets can report false-positive success, but a
//! verified preimage is protocol-level evidence. A receipt without a verifying secret still
//! outranks the wallet's own claim, because the receipt author is a protocol-verified merchant
//! or value-share participant, not the payer. The wallet acknowledgement is accepted only when
//! nothing stronger exists and the caller has not demanded receipt confirmation.
//!
//! [`classify`] is pure, so the cascade's ordering is testable without a listener or a runtime;
//! [`resolve_payment`] wires it to a [`ReceiptSubscriptions`] window and the timeout.

use std::time::Duration;

use log::*;
use plaza_common::Secret;

use crate::{
    db_types::{PaymentProof, ReceiptEvent, WalletAcknowledgement},
    helpers::PayableReference,
    receipts::ReceiptSubscriptions,
};

/// How long one settlement attempt waits for a receipt before falling through the cascade.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(20);

/// The outcome of one settlement attempt for one invoice.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A definitive proof. The caller may mark the invoice paid.
    Proven(PaymentProof),
    /// No receipt arrived and policy demands one. Not an error: the invoice stays pending and
    /// the caller should offer retry or polling. A retry re-enters resolution fresh, with a new
    /// timeout window and a new listener.
    StillWaiting,
}

/// Runs one settlement attempt: open a receipt window on the payable reference, wait at most
/// [`RECEIPT_TIMEOUT`], and classify the result. This is the only suspension point in the
/// protocol and it is always bounded.
pub async fn resolve_payment(
    subscriptions: &ReceiptSubscriptions,
    payable: &PayableReference,
    wallet: &WalletAcknowledgement,
    require_receipt: bool,
) -> Resolution {
    resolve_with_timeout(subscriptions, payable, wallet, require_receipt, RECEIPT_TIMEOUT).await
}

async fn resolve_with_timeout(
    subscriptions: &ReceiptSubscriptions,
    payable: &PayableReference,
    wallet: &WalletAcknowledgement,
    require_receipt: bool,
    wait: Duration,
) -> Resolution {
    let mut listener = subscriptions.open(payable.raw());
    let receipt = match tokio::time::timeout(wait, listener.recv()).await {
        Ok(receipt) => receipt,
        Err(_) => {
            listener.cancel();
            debug!("⏱️ No receipt for {payable} within {}s", wait.as_secs());
            None
        },
    };
    classify(payable, receipt.as_ref(), wallet, require_receipt)
}

/// The proof-priority cascade. Each arm is evaluated only if the one above produced nothing.
pub fn classify(
    payable: &PayableReference,
    receipt: Option<&ReceiptEvent>,
    wallet: &WalletAcknowledgement,
    require_receipt: bool,
) -> Resolution {
    if let Some(receipt) = receipt {
        if let Some(preimage) = &receipt.preimage {
            if payable.verify_preimage(preimage) {
                debug!("🔎️ Receipt {} carries a verifying preimage", receipt.event_id);
                return Resolution::Proven(PaymentProof::Preimage { value: Secret::new(preimage.clone()) });
            }
        }
        debug!("🔎️ Receipt {} accepted as proof by reference", receipt.event_id);
        return Resolution::Proven(PaymentProof::ReceiptReference { event_id: receipt.event_id.clone() });
    }
    if require_receipt {
        debug!("🔎️ No receipt and receipt confirmation is mandatory; still waiting");
        return Resolution::StillWaiting;
    }
    if let Some(preimage) = &wallet.preimage {
        debug!("🔎️ Accepting the preimage returned by the wallet");
        return Resolution::Proven(PaymentProof::Preimage { value: preimage.clone() });
    }
    debug!("🔎️ Falling back to the wallet's own acknowledgement");
    Resolution::Proven(PaymentProof::WalletAck { method: wallet.method, at: wallet.at })
}
