use chrono::{DateTime, Utc};
use log::debug;
use plaza_common::Sats;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use crate::{
    db_types::{InvoiceId, InvoiceStatus, OrderId, PaymentInvoice, PaymentProof},
    helpers::PayableReference,
    traits::SettlementDatabaseError,
};

/// Stores the invoices derived for one order, preserving splitter order via `seq`.
pub async fn insert_invoices(
    invoices: &[PaymentInvoice],
    conn: &mut SqliteConnection,
) -> Result<(), SettlementDatabaseError> {
    for (seq, invoice) in invoices.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoices (invoice_id, order_id, seq, recipient_id, role, amount, payable_reference,
                payment_hash, status, proof, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12);
            "#,
        )
        .bind(invoice.id.as_str())
        .bind(invoice.order_id.as_str())
        .bind(seq as i64)
        .bind(&invoice.recipient_id)
        .bind(invoice.role.to_string())
        .bind(invoice.amount.value())
        .bind(invoice.payable.as_ref().map(PayableReference::raw))
        .bind(invoice.payable.as_ref().map(PayableReference::payment_hash_hex))
        .bind(invoice.status.to_string())
        .bind(invoice.proof.as_ref().map(serde_json::to_string).transpose()?)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ {} invoice(s) stored", invoices.len());
    Ok(())
}

pub async fn fetch_invoice(
    invoice_id: &InvoiceId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentInvoice>, SettlementDatabaseError> {
    sqlx::query("SELECT * FROM invoices WHERE invoice_id = $1")
        .bind(invoice_id.as_str())
        .fetch_optional(conn)
        .await?
        .map(|row| invoice_from_row(&row))
        .transpose()
}

pub async fn fetch_invoices_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentInvoice>, SettlementDatabaseError> {
    sqlx::query("SELECT * FROM invoices WHERE order_id = $1 ORDER BY seq")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?
        .iter()
        .map(invoice_from_row)
        .collect()
}

/// Attaches (or replaces) the payable reference. Only a pending invoice can be retargeted.
pub async fn set_payable_reference(
    invoice_id: &InvoiceId,
    payable: &PayableReference,
    conn: &mut SqliteConnection,
) -> Result<PaymentInvoice, SettlementDatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE invoices SET payable_reference = $2, payment_hash = $3, updated_at = $4
        WHERE invoice_id = $1 AND status = 'Pending';
        "#,
    )
    .bind(invoice_id.as_str())
    .bind(payable.raw())
    .bind(payable.payment_hash_hex())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    reread_after_guarded_update(invoice_id, result.rows_affected(), conn).await
}

/// `Pending → Paid`, attaching the proof. The status guard in the WHERE clause is what makes
/// the proof single-assignment: a second transition matches zero rows.
pub async fn mark_invoice_paid(
    invoice_id: &InvoiceId,
    proof: &PaymentProof,
    conn: &mut SqliteConnection,
) -> Result<PaymentInvoice, SettlementDatabaseError> {
    let proof_json = serde_json::to_string(proof)?;
    let result = sqlx::query(
        r#"
        UPDATE invoices SET status = 'Paid', proof = $2, updated_at = $3
        WHERE invoice_id = $1 AND status = 'Pending';
        "#,
    )
    .bind(invoice_id.as_str())
    .bind(proof_json)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    reread_after_guarded_update(invoice_id, result.rows_affected(), conn).await
}

pub async fn mark_invoice_terminal(
    invoice_id: &InvoiceId,
    new_status: InvoiceStatus,
    conn: &mut SqliteConnection,
) -> Result<PaymentInvoice, SettlementDatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE invoices SET status = $2, updated_at = $3
        WHERE invoice_id = $1 AND status = 'Pending';
        "#,
    )
    .bind(invoice_id.as_str())
    .bind(new_status.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    reread_after_guarded_update(invoice_id, result.rows_affected(), conn).await
}

/// Distinguishes "no such invoice" from "already terminal" when a status-guarded UPDATE
/// matched nothing, and returns the fresh record otherwise.
async fn reread_after_guarded_update(
    invoice_id: &InvoiceId,
    rows_affected: u64,
    conn: &mut SqliteConnection,
) -> Result<PaymentInvoice, SettlementDatabaseError> {
    let invoice = fetch_invoice(invoice_id, conn)
        .await?
        .ok_or_else(|| SettlementDatabaseError::InvoiceNotFound(invoice_id.clone()))?;
    if rows_affected == 0 {
        return Err(SettlementDatabaseError::InvoiceAlreadyFinal(invoice_id.clone()));
    }
    Ok(invoice)
}

fn invoice_from_row(row: &SqliteRow) -> Result<PaymentInvoice, SettlementDatabaseError> {
    let payable = match (
        row.get::<Option<String>, _>("payable_reference"),
        row.get::<Option<String>, _>("payment_hash"),
    ) {
        (Some(raw), Some(hash)) => Some(PayableReference::new(&raw, &hash)?),
        _ => None,
    };
    let proof = row
        .get::<Option<String>, _>("proof")
        .map(|p| serde_json::from_str::<PaymentProof>(&p))
        .transpose()?;
    let role = row
        .get::<String, _>("role")
        .parse()
        .map_err(|e| SettlementDatabaseError::DatabaseError(format!("{e}")))?;
    Ok(PaymentInvoice {
        id: InvoiceId(row.get("invoice_id")),
        order_id: OrderId(row.get("order_id")),
        recipient_id: row.get("recipient_id"),
        role,
        amount: Sats::from(row.get::<i64, _>("amount")),
        payable,
        status: InvoiceStatus::from(row.get::<String, _>("status")),
        proof,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    })
}
