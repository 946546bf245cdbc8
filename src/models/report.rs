use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::order::OrderStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Dashboard headline numbers. Revenue excludes cancelled orders.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_orders: i64,
    pub total_revenue: i64,
    pub average_order_value: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub customers: i64,
    pub menu_items: i64,
    pub products: i64,
    pub active_subscribers: i64,
    pub new_messages: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailySales {
    /// `YYYY-MM-DD` (UTC)
    pub day: String,
    pub orders: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopItem {
    pub item_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalesQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopItemsQuery {
    pub limit: Option<i64>,
}
