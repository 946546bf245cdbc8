//! Guest shopping sessions.
//!
//! Starting a session creates a `guest` user plus an opaque token; the token
//! is the only credential the guest ever holds. Expired sessions are purged
//! by the maintenance task together with any guest user left without
//! sessions or orders.
use std::sync::Arc;

use chrono::Duration;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::{new_id, now};
use crate::error::{AppError, AppResult};
use crate::models::guest::GuestSession;
use crate::models::order::{GuestCheckoutReq, OrderDetail};
use crate::models::user::AuthProvider;
use crate::rbac::Role;
use crate::services::mailer::Mailer;
use crate::services::order_service::{self, CheckoutInput};
use crate::services::user_service::{self, NewUser};
use crate::validation::{clean_opt, clean_text, normalize_email};

fn new_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

pub async fn start(pool: &SqlitePool, ttl_hours: i64) -> AppResult<GuestSession> {
    let user = user_service::insert(
        pool,
        NewUser {
            name: "Guest",
            email: None,
            phone: None,
            password_hash: None,
            role: Role::Guest,
            auth_provider: AuthProvider::Guest,
        },
    )
    .await?;

    let session = GuestSession {
        id: new_id(),
        token: new_token(),
        user_id: user.id,
        created_at: now(),
        expires_at: now() + Duration::hours(ttl_hours),
    };
    sqlx::query("INSERT INTO guest_sessions (id, token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&session.id)
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(pool)
        .await?;
    tracing::debug!(session_id = %session.id, user_id = %session.user_id, "guest session started");
    Ok(session)
}

pub async fn resolve(pool: &SqlitePool, token: &str) -> AppResult<GuestSession> {
    let session = sqlx::query_as::<_, GuestSession>(
        "SELECT id, token, user_id, created_at, expires_at FROM guest_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Guest session not found".into()))?;

    if session.is_expired(now()) {
        return Err(AppError::Unauthorized("Guest session expired, please start a new one".into()));
    }
    Ok(session)
}

/// Records the guest's contact details on their user and places the order.
pub async fn checkout(
    pool: &SqlitePool,
    config: &Config,
    mailer: &Arc<dyn Mailer>,
    user_id: &str,
    req: &GuestCheckoutReq,
) -> AppResult<OrderDetail> {
    let name = clean_text(&req.name);
    let email = req.email.as_deref().map(normalize_email).filter(|e| !e.is_empty());
    let phone = clean_text(&req.phone);

    // the email only goes on the order; guests never claim an account email
    sqlx::query("UPDATE users SET name = ?, phone = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(&phone)
        .bind(now())
        .bind(user_id)
        .execute(pool)
        .await?;

    order_service::checkout(
        pool,
        config,
        mailer,
        CheckoutInput {
            owner_id: user_id.to_string(),
            is_guest: true,
            customer_name: name,
            customer_email: email,
            customer_phone: phone,
            delivery_address: req.delivery_address.clone(),
            payment_method: req.payment_method,
            notes: clean_opt(req.notes.as_deref()),
        },
    )
    .await
}

/// Deletes expired sessions, then carts and users of guests with nothing
/// left pointing at them. Returns the number of sessions removed.
pub async fn purge_expired(pool: &SqlitePool) -> AppResult<u64> {
    let mut tx = pool.begin().await?;
    let sessions = sqlx::query("DELETE FROM guest_sessions WHERE expires_at <= ?")
        .bind(now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let orphans = "SELECT id FROM users WHERE role = 'guest' \
                   AND id NOT IN (SELECT user_id FROM guest_sessions)";
    sqlx::query(&format!("DELETE FROM carts WHERE user_id IN ({orphans})"))
        .execute(&mut *tx)
        .await?;
    let users = sqlx::query(&format!(
        "DELETE FROM users WHERE id IN ({orphans}) AND id NOT IN (SELECT user_id FROM orders)"
    ))
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    if sessions > 0 {
        tracing::info!(sessions, users, "expired guest sessions purged");
    }
    Ok(sessions)
}
