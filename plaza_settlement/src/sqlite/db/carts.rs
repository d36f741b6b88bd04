use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::traits::SettlementDatabaseError;

/// Inserts or replaces the cart blob for the buyer. The blob is opaque here; the cart store
/// owns its format.
pub async fn save_cart(buyer_id: &str, blob: &str, conn: &mut SqliteConnection) -> Result<(), SettlementDatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO carts (buyer_id, blob, updated_at) VALUES ($1, $2, $3)
        ON CONFLICT (buyer_id) DO UPDATE SET blob = excluded.blob, updated_at = excluded.updated_at;
        "#,
    )
    .bind(buyer_id)
    .bind(blob)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    trace!("🛒️ Cart blob stored for {buyer_id}");
    Ok(())
}

pub async fn load_cart(buyer_id: &str, conn: &mut SqliteConnection) -> Result<Option<String>, SettlementDatabaseError> {
    let blob = sqlx::query_scalar("SELECT blob FROM carts WHERE buyer_id = $1")
        .bind(buyer_id)
        .fetch_optional(conn)
        .await?;
    Ok(blob)
}

pub async fn delete_cart(buyer_id: &str, conn: &mut SqliteConnection) -> Result<(), SettlementDatabaseError> {
    sqlx::query("DELETE FROM carts WHERE buyer_id = $1").bind(buyer_id).execute(conn).await?;
    trace!("🛒️ Cart blob deleted for {buyer_id}");
    Ok(())
}
