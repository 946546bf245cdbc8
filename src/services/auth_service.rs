use sqlx::SqlitePool;

use crate::auth::{hash_password, verify_password};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::user::{AuthProvider, LoginReq, RegisterReq, User};
use crate::oauth::GoogleProfile;
use crate::rbac::Role;
use crate::services::user_service::{self, NewUser};
use crate::validation::{clean_opt, clean_text, normalize_email};

/// Self-service sign-up always yields a customer.
pub async fn register(pool: &SqlitePool, bcrypt_cost: u32, req: &RegisterReq) -> AppResult<User> {
    let email = normalize_email(&req.email);
    if user_service::find_active_by_email(pool, &email).await?.is_some() {
        return Err(AppError::Conflict("An account with this email already exists".into()));
    }

    let hash = hash_password(&req.password, bcrypt_cost)?;
    let name = clean_text(&req.name);
    let phone = clean_opt(req.phone.as_deref());
    let user = user_service::insert(
        pool,
        NewUser {
            name: &name,
            email: Some(&email),
            phone: phone.as_deref(),
            password_hash: Some(&hash),
            role: Role::Customer,
            auth_provider: AuthProvider::Local,
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, "customer registered");
    Ok(user)
}

pub async fn login(pool: &SqlitePool, req: &LoginReq) -> AppResult<User> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let user = user_service::find_active_by_email(pool, &normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&req.password, hash) {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(invalid());
    }
    Ok(user)
}

/// Signs in the active account owning the Google email, creating a customer
/// account on first login.
pub async fn upsert_oauth_user(pool: &SqlitePool, profile: &GoogleProfile) -> AppResult<User> {
    let email = normalize_email(&profile.email);
    if let Some(user) = user_service::find_active_by_email(pool, &email).await? {
        return Ok(user);
    }

    let name = profile
        .name
        .as_deref()
        .map(clean_text)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or("Customer").to_string());
    let user = user_service::insert(
        pool,
        NewUser {
            name: &name,
            email: Some(&email),
            phone: None,
            password_hash: None,
            role: Role::Customer,
            auth_provider: AuthProvider::Google,
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, "customer registered via google");
    Ok(user)
}

/// Creates the configured super-admin once. An existing account with that
/// email is left untouched.
pub async fn seed_super_admin(pool: &SqlitePool, config: &Config) -> anyhow::Result<()> {
    let Some((email, password)) = &config.super_admin else {
        return Ok(());
    };
    let email = normalize_email(email);
    if user_service::find_active_by_email(pool, &email).await?.is_some() {
        tracing::debug!(email = %email, "super-admin already present");
        return Ok(());
    }

    let hash = hash_password(password, config.bcrypt_cost)?;
    let user = user_service::insert(
        pool,
        NewUser {
            name: "Super Admin",
            email: Some(&email),
            phone: None,
            password_hash: Some(&hash),
            role: Role::SuperAdmin,
            auth_provider: AuthProvider::Local,
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, email = %email, "super-admin seeded");
    Ok(())
}
