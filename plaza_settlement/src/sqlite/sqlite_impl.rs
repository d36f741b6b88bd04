//! `SqliteDatabase` is the concrete SQLite-backed settlement store.
//!
//! It implements both [`SettlementDatabase`] (orders and invoices for the orchestrator) and
//! [`CartPersistence`] (the cart blob), so one pool serves the whole settlement core.

use std::{fmt::Debug, future::Future};

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};

use super::db::{carts, create_schema, db_url, invoices, new_pool, orders};
use crate::{
    db_types::{InvoiceId, InvoiceStatus, Order, OrderId, PaymentInvoice, PaymentProof},
    helpers::PayableReference,
    traits::{CartPersistence, SettlementDatabase, SettlementDatabaseError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Connects using `PLAZA_DATABASE_URL` (or the default path), creating the database file
    /// and schema if needed.
    pub async fn new(max_connections: u32) -> Result<Self, SettlementDatabaseError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SettlementDatabaseError> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("Creating database at {url}");
            Sqlite::create_database(url).await?;
        }
        let pool = new_pool(url, max_connections).await?;
        let mut conn = pool.acquire().await?;
        create_schema(&mut conn).await?;
        drop(conn);
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        &self.url
    }

    async fn close(&mut self) -> Result<(), SettlementDatabaseError> {
        self.pool.close().await;
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn insert_invoices(&self, list: &[PaymentInvoice]) -> Result<(), SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        invoices::insert_invoices(list, &mut conn).await
    }

    async fn fetch_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<PaymentInvoice>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_invoice(invoice_id, &mut conn).await
    }

    async fn fetch_invoices_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<PaymentInvoice>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        invoices::fetch_invoices_for_order(order_id, &mut conn).await
    }

    async fn set_payable_reference(
        &self,
        invoice_id: &InvoiceId,
        payable: &PayableReference,
    ) -> Result<PaymentInvoice, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        invoices::set_payable_reference(invoice_id, payable, &mut conn).await
    }

    async fn mark_invoice_paid(
        &self,
        invoice_id: &InvoiceId,
        proof: &PaymentProof,
    ) -> Result<PaymentInvoice, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        invoices::mark_invoice_paid(invoice_id, proof, &mut conn).await
    }

    async fn mark_invoice_failed(&self, invoice_id: &InvoiceId) -> Result<PaymentInvoice, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        invoices::mark_invoice_terminal(invoice_id, InvoiceStatus::Failed, &mut conn).await
    }

    async fn mark_invoice_expired(&self, invoice_id: &InvoiceId) -> Result<PaymentInvoice, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        invoices::mark_invoice_terminal(invoice_id, InvoiceStatus::Expired, &mut conn).await
    }
}

impl CartPersistence for SqliteDatabase {
    fn save_cart(&self, buyer_id: &str, blob: &str) -> impl Future<Output = Result<(), SettlementDatabaseError>> + Send {
        let pool = self.pool.clone();
        let buyer_id = buyer_id.to_string();
        let blob = blob.to_string();
        async move {
            let mut conn = pool.acquire().await?;
            carts::save_cart(&buyer_id, &blob, &mut conn).await
        }
    }

    fn load_cart(&self, buyer_id: &str) -> impl Future<Output = Result<Option<String>, SettlementDatabaseError>> + Send {
        let pool = self.pool.clone();
        let buyer_id = buyer_id.to_string();
        async move {
            let mut conn = pool.acquire().await?;
            carts::load_cart(&buyer_id, &mut conn).await
        }
    }

    fn delete_cart(&self, buyer_id: &str) -> impl Future<Output = Result<(), SettlementDatabaseError>> + Send {
        let pool = self.pool.clone();
        let buyer_id = buyer_id.to_string();
        async move {
            let mut conn = pool.acquire().await?;
            carts::delete_cart(&buyer_id, &mut conn).await
        }
    }
}
