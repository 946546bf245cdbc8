//! Checkout and the order lifecycle.
//!
//! Checkout snapshots the cart into `orders` + `order_items` inside one
//! transaction, decrements stock (clamped at zero, no re-validation) and
//! empties the cart. Each order line records how many units it actually took
//! so cancelling never pushes stock above its pre-order level. Every status
//! change appends to `order_status_history`.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::config::Config;
use crate::db::{new_id, now};
use crate::error::{AppError, AppResult};
use crate::models::cart::{CartLine, CartRow};
use crate::models::common::{order_clause, search_pattern, PageWindow, Paginated};
use crate::models::order::{
    DeliveryAddress, Order, OrderDetail, OrderLine, OrderQuery, OrderStatus, PaymentMethod, PaymentStatus,
    StatusChange,
};
use crate::pricing;
use crate::services::cart_service;
use crate::services::mailer::{self, Mailer};

const ORDER_COLUMNS: &str = "id, order_number, user_id, is_guest, customer_name, customer_email, customer_phone, \
                             delivery_address, subtotal, discount, delivery_fee, total, coupon_code, payment_method, \
                             payment_status, status, notes, created_at, updated_at";

const SORTABLE: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("created_at", "created_at"),
    ("total", "total"),
    ("status", "status"),
    ("orderNumber", "order_number"),
];

const EXPORT_LIMIT: i64 = 10_000;

/// Everything checkout needs besides the cart itself.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub owner_id: String,
    pub is_guest: bool,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub delivery_address: DeliveryAddress,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// `ORD-YYYYMMDD-XXXXXX`
pub fn order_number(at: DateTime<Utc>) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("ORD-{}-{suffix}", at.format("%Y%m%d"))
}

async fn append_history(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: OrderStatus,
    note: Option<&str>,
    changed_by: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO order_status_history (order_id, status, note, changed_by, changed_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(order_id)
    .bind(status)
    .bind(note)
    .bind(changed_by)
    .bind(now())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn checkout(
    pool: &SqlitePool,
    config: &Config,
    mailer: &Arc<dyn Mailer>,
    input: CheckoutInput,
) -> AppResult<OrderDetail> {
    let cart = cart_service::cart_for(pool, &input.owner_id).await?;

    let mut tx = pool.begin().await?;
    let lines_sql = "SELECT id, item_id, name, image_url, size, addons, addon_key, quantity, price_at_time, \
                     item_total, added_at FROM cart_items WHERE cart_id = ? ORDER BY added_at, id";
    let lines = sqlx::query_as::<_, CartLine>(lines_sql)
        .bind(&cart.id)
        .fetch_all(&mut *tx)
        .await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Your cart is empty".into()));
    }
    let coupon_code = sqlx::query_as::<_, CartRow>("SELECT id, user_id, coupon_code FROM carts WHERE id = ?")
        .bind(&cart.id)
        .fetch_one(&mut *tx)
        .await?
        .coupon_code;
    let coupon = coupon_code.as_deref().and_then(pricing::find_coupon);
    let totals = pricing::compute_totals(&lines, coupon);
    // a coupon whose minimum is no longer met is dropped from the order
    let applied_code = coupon.filter(|_| totals.discount > 0).map(|c| c.code);
    let delivery_fee = config.delivery_fee_for(totals.total);

    let order_id = new_id();
    let ts = now();
    let number = order_number(ts);
    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, is_guest, customer_name, customer_email, customer_phone, \
         delivery_address, subtotal, discount, delivery_fee, total, coupon_code, payment_method, payment_status, \
         status, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order_id)
    .bind(&number)
    .bind(&input.owner_id)
    .bind(input.is_guest)
    .bind(&input.customer_name)
    .bind(&input.customer_email)
    .bind(&input.customer_phone)
    .bind(Json(&input.delivery_address))
    .bind(totals.subtotal)
    .bind(totals.discount)
    .bind(delivery_fee)
    .bind(totals.total + delivery_fee)
    .bind(applied_code)
    .bind(input.payment_method)
    .bind(PaymentStatus::Pending)
    .bind(OrderStatus::Pending)
    .bind(&input.notes)
    .bind(ts)
    .bind(ts)
    .execute(&mut *tx)
    .await?;

    for line in &lines {
        let in_stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM catalog_items WHERE id = ?")
            .bind(&line.item_id)
            .fetch_optional(&mut *tx)
            .await?;
        let taken = in_stock.unwrap_or(0).min(line.quantity).max(0);

        sqlx::query(
            "INSERT INTO order_items (id, order_id, item_id, name, size, addons, quantity, price_at_time, \
             item_total, stock_taken) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(&order_id)
        .bind(&line.item_id)
        .bind(&line.name)
        .bind(&line.size)
        .bind(Json(&line.addons.0))
        .bind(line.quantity)
        .bind(line.price_at_time)
        .bind(line.item_total)
        .bind(taken)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE catalog_items SET stock = stock - ?, updated_at = ? WHERE id = ?")
            .bind(taken)
            .bind(ts)
            .bind(&line.item_id)
            .execute(&mut *tx)
            .await?;
    }

    append_history(&mut tx, &order_id, OrderStatus::Pending, Some("Order placed"), Some(&input.owner_id)).await?;

    sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
        .bind(&cart.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE carts SET coupon_code = NULL, updated_at = ? WHERE id = ?")
        .bind(ts)
        .bind(&cart.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        order_number = %number,
        total = totals.total + delivery_fee,
        guest = input.is_guest,
        "order placed"
    );

    let detail = detail(pool, &order_id).await?;
    if let Some(email) = detail.order.customer_email.as_deref() {
        mailer::send_in_background(mailer.clone(), mailer::order_confirmation(&detail.order, email));
    }
    Ok(detail)
}

async fn find(pool: &SqlitePool, id: &str) -> AppResult<Order> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
    sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".into()))
}

pub async fn detail(pool: &SqlitePool, id: &str) -> AppResult<OrderDetail> {
    let order = find(pool, id).await?;
    let items = sqlx::query_as::<_, OrderLine>(
        "SELECT id, item_id, name, size, addons, quantity, price_at_time, item_total FROM order_items \
         WHERE order_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    let status_history = sqlx::query_as::<_, StatusChange>(
        "SELECT status, note, changed_by, changed_at FROM order_status_history WHERE order_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(OrderDetail {
        order,
        items,
        status_history,
    })
}

pub async fn detail_for_user(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<OrderDetail> {
    let detail = detail(pool, id).await?;
    if detail.order.user_id != user_id {
        return Err(AppError::NotFound("Order".into()));
    }
    Ok(detail)
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, user_id: Option<&str>, q: &OrderQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(user_id) = user_id {
        qb.push(" AND user_id = ").push_bind(user_id.to_string());
    }
    if let Some(status) = q.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = q.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = q.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(pattern) = search_pattern(q.search.as_deref()) {
        qb.push(" AND (order_number LIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer_name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer_email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list(pool: &SqlitePool, user_id: Option<&str>, q: &OrderQuery) -> AppResult<Paginated<Order>> {
    let window = PageWindow::new(q.page, q.limit);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders");
    push_filters(&mut count, user_id, q);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
    push_filters(&mut page, user_id, q);
    page.push(" ORDER BY ")
        .push(order_clause(q.sort.as_deref(), SORTABLE, "created_at DESC"))
        .push(" LIMIT ")
        .push_bind(i64::from(window.limit))
        .push(" OFFSET ")
        .push_bind(window.offset());
    let orders = page.build_query_as::<Order>().fetch_all(pool).await?;

    Ok(window.paginate(orders, total))
}

pub async fn export(pool: &SqlitePool, q: &OrderQuery) -> AppResult<Vec<Order>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
    push_filters(&mut qb, None, q);
    qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(EXPORT_LIMIT);
    Ok(qb.build_query_as::<Order>().fetch_all(pool).await?)
}

/// Moves an order along the transition table. Cancelling puts the units the
/// order took back into stock; delivering a cash order marks it paid.
pub async fn update_status(
    pool: &SqlitePool,
    id: &str,
    next: OrderStatus,
    note: Option<&str>,
    changed_by: &str,
) -> AppResult<OrderDetail> {
    let order = find(pool, id).await?;
    if !order.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {} to {}",
            order.status.as_str(),
            next.as_str()
        )));
    }
    apply_transition(pool, &order, next, note, changed_by).await
}

/// Writes a transition checked against `order` as it was read. The update is
/// guarded on that status, so a concurrent change makes this call fail
/// instead of applying side effects twice.
async fn apply_transition(
    pool: &SqlitePool,
    order: &Order,
    next: OrderStatus,
    note: Option<&str>,
    changed_by: &str,
) -> AppResult<OrderDetail> {
    let payment_status = match (next, order.payment_method, order.payment_status) {
        (OrderStatus::Delivered, PaymentMethod::Cod, _) => PaymentStatus::Paid,
        (OrderStatus::Cancelled, _, PaymentStatus::Paid) => PaymentStatus::Refunded,
        (_, _, current) => current,
    };

    let mut tx = pool.begin().await?;
    let ts = now();
    let changed = sqlx::query(
        "UPDATE orders SET status = ?, payment_status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(next)
    .bind(payment_status)
    .bind(ts)
    .bind(&order.id)
    .bind(order.status)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if changed != 1 {
        tracing::warn!(order_id = %order.id, to = next.as_str(), "order status changed concurrently");
        return Err(AppError::Conflict("Order status was changed by another request".into()));
    }

    if next == OrderStatus::Cancelled {
        let lines: Vec<(String, i64)> =
            sqlx::query_as("SELECT item_id, stock_taken FROM order_items WHERE order_id = ?")
                .bind(&order.id)
                .fetch_all(&mut *tx)
                .await?;
        for (item_id, taken) in lines {
            sqlx::query("UPDATE catalog_items SET stock = stock + ?, updated_at = ? WHERE id = ?")
                .bind(taken)
                .bind(ts)
                .bind(&item_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    append_history(&mut tx, &order.id, next, note, Some(changed_by)).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        from = order.status.as_str(),
        to = next.as_str(),
        by = %changed_by,
        "order status changed"
    );
    detail(pool, &order.id).await
}

/// Customers may only withdraw an order nobody has confirmed yet.
pub async fn cancel_by_customer(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<OrderDetail> {
    let order = detail_for_user(pool, user_id, id).await?.order;
    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest("Only pending orders can be cancelled".into()));
    }
    apply_transition(pool, &order, OrderStatus::Cancelled, Some("Cancelled by customer"), user_id).await
}
