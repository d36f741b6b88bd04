//! # Low-level SQLite database interactions.
//!
//! All interactions are plain functions that accept a `&mut SqliteConnection`. Callers obtain a
//! connection from a pool, or open a transaction and pass `&mut *tx`, without any changes here.

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqliteConnection, SqlitePool};

pub mod carts;
pub mod invoices;
pub mod orders;

const SQLITE_DB_URL: &str = "sqlite://data/plaza_store.db";

pub fn db_url() -> String {
    let result = env::var("PLAZA_DATABASE_URL").unwrap_or_else(|_| {
        info!("PLAZA_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Bootstraps the schema. Every statement is idempotent, so this runs on every connection
/// setup.
pub async fn create_schema(conn: &mut SqliteConnection) -> Result<(), SqlxError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS carts (
            buyer_id   TEXT PRIMARY KEY,
            blob       TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            order_id           TEXT PRIMARY KEY,
            seller_id          TEXT NOT NULL,
            buyer_id           TEXT NOT NULL,
            shipping_method_id TEXT,
            shipping_cost      INTEGER,
            shipping_currency  TEXT,
            total              INTEGER NOT NULL,
            created_at         TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_items (
            order_id           TEXT NOT NULL,
            seq                INTEGER NOT NULL,
            product_ref        TEXT NOT NULL,
            seller_id          TEXT NOT NULL,
            quantity           INTEGER NOT NULL,
            unit_price         INTEGER NOT NULL,
            currency           TEXT NOT NULL,
            shipping_method_id TEXT,
            shipping_cost      INTEGER NOT NULL,
            shipping_currency  TEXT NOT NULL,
            PRIMARY KEY (order_id, seq)
        );
        "#,
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            invoice_id        TEXT PRIMARY KEY,
            order_id          TEXT NOT NULL,
            seq               INTEGER NOT NULL,
            recipient_id      TEXT NOT NULL,
            role              TEXT NOT NULL,
            amount            INTEGER NOT NULL,
            payable_reference TEXT,
            payment_hash      TEXT,
            status            TEXT NOT NULL,
            proof             TEXT,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}
