use chrono::{DateTime, Utc};
use log::debug;
use plaza_common::Sats;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use crate::{
    db_types::{CartLineItem, Order, OrderId, ProductRef, ShippingSelection},
    traits::SettlementDatabaseError,
};

/// Inserts a freshly checked-out order with its frozen line items. Orders are immutable, so a
/// duplicate order id is an error, never an update.
pub async fn insert_order(order: &Order, conn: &mut SqliteConnection) -> Result<(), SettlementDatabaseError> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (order_id, seller_id, buyer_id, shipping_method_id, shipping_cost, shipping_currency,
            total, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
        "#,
    )
    .bind(order.id.as_str())
    .bind(&order.seller_id)
    .bind(&order.buyer_id)
    .bind(order.shipping.as_ref().map(|s| s.method_id.as_str()))
    .bind(order.shipping.as_ref().map(|s| s.cost.value()))
    .bind(order.shipping.as_ref().map(|s| s.currency.as_str()))
    .bind(order.total.value())
    .bind(order.created_at)
    .execute(&mut *conn)
    .await;
    if let Err(e) = result {
        if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) {
            return Err(SettlementDatabaseError::OrderAlreadyExists(order.id.clone()));
        }
        return Err(e.into());
    }
    for (seq, item) in order.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, seq, product_ref, seller_id, quantity, unit_price, currency,
                shipping_method_id, shipping_cost, shipping_currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10);
            "#,
        )
        .bind(order.id.as_str())
        .bind(seq as i64)
        .bind(item.product_ref.as_str())
        .bind(&item.seller_id)
        .bind(i64::from(item.quantity))
        .bind(item.unit_price.value())
        .bind(&item.currency)
        .bind(item.shipping_method_id.as_deref())
        .bind(item.shipping_cost.value())
        .bind(&item.shipping_currency)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order {} stored with {} line item(s)", order.id, order.items.len());
    Ok(())
}

pub async fn fetch_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SettlementDatabaseError> {
    let Some(row) =
        sqlx::query("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(&mut *conn).await?
    else {
        return Ok(None);
    };
    let items = sqlx::query("SELECT * FROM order_items WHERE order_id = $1 ORDER BY seq")
        .bind(order_id.as_str())
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(item_from_row)
        .collect::<Vec<_>>();
    Ok(Some(order_from_row(&row, items)))
}

fn order_from_row(row: &SqliteRow, items: Vec<CartLineItem>) -> Order {
    let shipping = row.get::<Option<String>, _>("shipping_method_id").map(|method_id| ShippingSelection {
        method_id,
        cost: Sats::from(row.get::<Option<i64>, _>("shipping_cost").unwrap_or_default()),
        currency: row.get::<Option<String>, _>("shipping_currency").unwrap_or_default(),
    });
    Order {
        id: OrderId(row.get("order_id")),
        seller_id: row.get("seller_id"),
        buyer_id: row.get("buyer_id"),
        items,
        shipping,
        total: Sats::from(row.get::<i64, _>("total")),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn item_from_row(row: &SqliteRow) -> CartLineItem {
    CartLineItem {
        product_ref: ProductRef(row.get("product_ref")),
        seller_id: row.get("seller_id"),
        quantity: row.get::<i64, _>("quantity") as u32,
        unit_price: Sats::from(row.get::<i64, _>("unit_price")),
        currency: row.get("currency"),
        shipping_method_id: row.get("shipping_method_id"),
        shipping_cost: Sats::from(row.get::<i64, _>("shipping_cost")),
        shipping_currency: row.get("shipping_currency"),
    }
}
