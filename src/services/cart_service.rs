//! Carts keyed by owning user. Guests own a cart through their guest user.
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::db::{new_id, now};
use crate::error::{AppError, AppResult};
use crate::models::cart::{AddToCartReq, CartLine, CartRow, CartView};
use crate::pricing::{self, AddPlan};

const LINE_COLUMNS: &str =
    "id, item_id, name, image_url, size, addons, addon_key, quantity, price_at_time, item_total, added_at";

pub async fn cart_for(pool: &SqlitePool, user_id: &str) -> AppResult<CartRow> {
    let ts = now();
    sqlx::query(
        "INSERT INTO carts (id, user_id, coupon_code, created_at, updated_at) VALUES (?, ?, NULL, ?, ?) \
         ON CONFLICT(user_id) DO NOTHING",
    )
    .bind(new_id())
    .bind(user_id)
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await?;

    Ok(sqlx::query_as::<_, CartRow>("SELECT id, user_id, coupon_code FROM carts WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?)
}

pub async fn lines(pool: &SqlitePool, cart_id: &str) -> AppResult<Vec<CartLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM cart_items WHERE cart_id = ? ORDER BY added_at, id");
    Ok(sqlx::query_as::<_, CartLine>(&sql).bind(cart_id).fetch_all(pool).await?)
}

async fn line_in_cart(pool: &SqlitePool, cart_id: &str, line_id: &str) -> AppResult<CartLine> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM cart_items WHERE cart_id = ? AND id = ?");
    sqlx::query_as::<_, CartLine>(&sql)
        .bind(cart_id)
        .bind(line_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart item".into()))
}

pub fn build_view(cart: CartRow, lines: Vec<CartLine>) -> CartView {
    let coupon = cart.coupon_code.as_deref().and_then(pricing::find_coupon);
    CartView {
        totals: pricing::compute_totals(&lines, coupon),
        id: cart.id,
        items: lines,
        coupon_code: cart.coupon_code,
    }
}

pub async fn view(pool: &SqlitePool, user_id: &str) -> AppResult<CartView> {
    let cart = cart_for(pool, user_id).await?;
    let lines = lines(pool, &cart.id).await?;
    Ok(build_view(cart, lines))
}

async fn touch(pool: &SqlitePool, cart_id: &str) -> AppResult<()> {
    sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
        .bind(now())
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn add_item(pool: &SqlitePool, user_id: &str, req: &AddToCartReq) -> AppResult<CartView> {
    let item = crate::services::catalog_service::find_for_cart(pool, &req.item_id).await?;
    let price_at_time = item.unit_price(req.size.as_deref())?;
    // canonical size name as stored in the catalog
    let size = req
        .size
        .as_deref()
        .and_then(|s| item.sizes.iter().find(|o| o.name.eq_ignore_ascii_case(s)))
        .map(|o| o.name.clone());
    let addons = item.resolve_addons(&req.addons)?;
    let key = pricing::addon_key(&addons);

    let cart = cart_for(pool, user_id).await?;
    let current = lines(pool, &cart.id).await?;
    let plan = pricing::plan_add(&current, &item.id, size.as_deref(), &key, req.quantity, item.stock)?;

    match plan {
        AddPlan::Increment { index, quantity } => {
            let line = &current[index];
            sqlx::query("UPDATE cart_items SET quantity = ?, item_total = ? WHERE id = ?")
                .bind(quantity)
                .bind(pricing::line_total(line.price_at_time, &line.addons, quantity))
                .bind(&line.id)
                .execute(pool)
                .await?;
            tracing::debug!(cart_id = %cart.id, line_id = %line.id, quantity, "cart line incremented");
        }
        AddPlan::Insert { quantity } => {
            let line_id = new_id();
            sqlx::query(
                "INSERT INTO cart_items (id, cart_id, item_id, name, image_url, size, addons, addon_key, quantity, \
                 price_at_time, item_total, added_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&line_id)
            .bind(&cart.id)
            .bind(&item.id)
            .bind(&item.name)
            .bind(item.images.first().map(|i| i.url.clone()))
            .bind(&size)
            .bind(Json(&addons))
            .bind(&key)
            .bind(quantity)
            .bind(price_at_time)
            .bind(pricing::line_total(price_at_time, &addons, quantity))
            .bind(now())
            .execute(pool)
            .await?;
            tracing::debug!(cart_id = %cart.id, line_id = %line_id, item_id = %item.id, "cart line added");
        }
    }

    touch(pool, &cart.id).await?;
    view(pool, user_id).await
}

/// Sets a line's quantity against live stock; zero removes the line. The
/// frozen unit price is kept.
pub async fn update_quantity(pool: &SqlitePool, user_id: &str, line_id: &str, quantity: i64) -> AppResult<CartView> {
    let cart = cart_for(pool, user_id).await?;
    let line = line_in_cart(pool, &cart.id, line_id).await?;
    if quantity == 0 {
        return remove_line(pool, user_id, line_id).await;
    }

    let item = crate::services::catalog_service::find_for_cart(pool, &line.item_id)
        .await
        .map_err(|_| AppError::BadRequest(format!("{} is no longer available", line.name)))?;
    pricing::ensure_stock(quantity, item.stock)?;

    sqlx::query("UPDATE cart_items SET quantity = ?, item_total = ? WHERE id = ?")
        .bind(quantity)
        .bind(pricing::line_total(line.price_at_time, &line.addons, quantity))
        .bind(&line.id)
        .execute(pool)
        .await?;
    touch(pool, &cart.id).await?;
    view(pool, user_id).await
}

pub async fn remove_line(pool: &SqlitePool, user_id: &str, line_id: &str) -> AppResult<CartView> {
    let cart = cart_for(pool, user_id).await?;
    let removed = sqlx::query("DELETE FROM cart_items WHERE cart_id = ? AND id = ?")
        .bind(&cart.id)
        .bind(line_id)
        .execute(pool)
        .await?;
    if removed.rows_affected() == 0 {
        return Err(AppError::NotFound("Cart item".into()));
    }
    touch(pool, &cart.id).await?;
    view(pool, user_id).await
}

pub async fn clear(pool: &SqlitePool, user_id: &str) -> AppResult<CartView> {
    let cart = cart_for(pool, user_id).await?;
    sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
        .bind(&cart.id)
        .execute(pool)
        .await?;
    sqlx::query("UPDATE carts SET coupon_code = NULL, updated_at = ? WHERE id = ?")
        .bind(now())
        .bind(&cart.id)
        .execute(pool)
        .await?;
    view(pool, user_id).await
}

pub async fn apply_coupon(pool: &SqlitePool, user_id: &str, code: &str) -> AppResult<CartView> {
    let coupon = pricing::coupon_or_reject(code)?;
    let cart = cart_for(pool, user_id).await?;
    let current = lines(pool, &cart.id).await?;
    if current.is_empty() {
        return Err(AppError::BadRequest("Add items to your cart before applying a coupon".into()));
    }
    let subtotal = pricing::compute_totals(&current, None).subtotal;
    if subtotal < coupon.min_order {
        return Err(AppError::BadRequest(format!(
            "Coupon {} requires a minimum order of {}",
            coupon.code,
            crate::export::format_amount(coupon.min_order)
        )));
    }

    sqlx::query("UPDATE carts SET coupon_code = ?, updated_at = ? WHERE id = ?")
        .bind(coupon.code)
        .bind(now())
        .bind(&cart.id)
        .execute(pool)
        .await?;
    tracing::debug!(cart_id = %cart.id, coupon = coupon.code, "coupon applied");
    view(pool, user_id).await
}

pub async fn remove_coupon(pool: &SqlitePool, user_id: &str) -> AppResult<CartView> {
    let cart = cart_for(pool, user_id).await?;
    sqlx::query("UPDATE carts SET coupon_code = NULL, updated_at = ? WHERE id = ?")
        .bind(now())
        .bind(&cart.id)
        .execute(pool)
        .await?;
    view(pool, user_id).await
}
