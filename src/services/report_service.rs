//! Aggregations behind the admin dashboard.
use chrono::Duration;
use sqlx::SqlitePool;

use crate::db::now;
use crate::error::AppResult;
use crate::models::report::{DailySales, StatusCount, Summary, TopItem};

pub const DEFAULT_SALES_DAYS: i64 = 30;
pub const DEFAULT_TOP_ITEMS: i64 = 10;

async fn count(pool: &SqlitePool, sql: &str) -> AppResult<i64> {
    Ok(sqlx::query_scalar(sql).fetch_one(pool).await?)
}

pub async fn summary(pool: &SqlitePool) -> AppResult<Summary> {
    let (total_orders, total_revenue): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(total), 0) FROM orders WHERE status != 'cancelled'",
    )
    .fetch_one(pool)
    .await?;

    let orders_by_status = sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY count DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(Summary {
        total_orders,
        total_revenue,
        average_order_value: if total_orders > 0 { total_revenue / total_orders } else { 0 },
        orders_by_status,
        customers: count(pool, "SELECT COUNT(*) FROM users WHERE role = 'customer' AND status = 'active'").await?,
        menu_items: count(pool, "SELECT COUNT(*) FROM catalog_items WHERE kind = 'menu-item'").await?,
        products: count(pool, "SELECT COUNT(*) FROM catalog_items WHERE kind = 'product'").await?,
        active_subscribers: count(pool, "SELECT COUNT(*) FROM newsletter_subscribers WHERE is_active = 1").await?,
        new_messages: count(pool, "SELECT COUNT(*) FROM contact_messages WHERE status = 'new'").await?,
    })
}

/// Per-day order count and revenue over the last `days` days.
pub async fn sales(pool: &SqlitePool, days: Option<i64>) -> AppResult<Vec<DailySales>> {
    let days = days.unwrap_or(DEFAULT_SALES_DAYS).clamp(1, 365);
    let since = now() - Duration::days(days);
    Ok(sqlx::query_as::<_, DailySales>(
        "SELECT substr(created_at, 1, 10) AS day, COUNT(*) AS orders, COALESCE(SUM(total), 0) AS revenue \
         FROM orders WHERE status != 'cancelled' AND created_at >= ? GROUP BY day ORDER BY day",
    )
    .bind(since)
    .fetch_all(pool)
    .await?)
}

/// Best sellers by quantity across non-cancelled orders.
pub async fn top_items(pool: &SqlitePool, limit: Option<i64>) -> AppResult<Vec<TopItem>> {
    let limit = limit.unwrap_or(DEFAULT_TOP_ITEMS).clamp(1, 50);
    Ok(sqlx::query_as::<_, TopItem>(
        "SELECT oi.item_id AS item_id, MAX(oi.name) AS name, SUM(oi.quantity) AS quantity, \
         SUM(oi.item_total) AS revenue FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE o.status != 'cancelled' GROUP BY oi.item_id ORDER BY quantity DESC, revenue DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?)
}
