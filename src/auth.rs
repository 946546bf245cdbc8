//! JWT issuing/verification, password hashing and the request extractors
//! that gate handlers by role.
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::AppError;
use crate::models::user::User;
use crate::rbac::Role;
use crate::services::{guest_service, user_service};

pub const TOKEN_COOKIE: &str = "token";
pub const GUEST_HEADER: &str = "x-guest-session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("jwt encode: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired, please log in again".into()),
                _ => AppError::Unauthorized("Invalid authentication token".into()),
            })
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(password, cost).map_err(|e| AppError::Internal(anyhow::anyhow!("bcrypt: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

pub fn clear_cookie() -> String {
    format!("{TOKEN_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Bearer header first, then the `token` cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let bearer = bearer.trim();
        if !bearer.is_empty() {
            return Some(bearer.to_string());
        }
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Any authenticated, active account.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
        let claims = state.jwt.verify(&token)?;

        let user = user_service::find_by_id(&state.pool, &claims.sub)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| AppError::Unauthorized("Account is no longer active".into()))?;

        Ok(AuthUser {
            id: user.id.clone(),
            role: user.role,
            user,
        })
    }
}

/// Any of the three admin roles.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        if auth_user.role.is_admin() {
            Ok(AdminUser(auth_user))
        } else {
            Err(AppError::Forbidden("Admin rights required".into()))
        }
    }
}

pub struct SuperAdmin(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for SuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        if auth_user.role == Role::SuperAdmin {
            Ok(SuperAdmin(auth_user))
        } else {
            Err(AppError::Forbidden("Super-admin rights required".into()))
        }
    }
}

/// A guest identified by the `X-Guest-Session` header.
#[derive(Debug, Clone)]
pub struct GuestUser {
    pub user_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
impl FromRequestParts<AppState> for GuestUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(GUEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Guest session required".into()))?;
        let session = guest_service::resolve(&state.pool, token).await?;
        Ok(GuestUser {
            user_id: session.user_id,
            token: session.token,
            expires_at: session.expires_at,
        })
    }
}

/// Whoever owns a cart: a signed-in customer or a guest session.
#[derive(Debug, Clone)]
pub struct Shopper {
    pub user_id: String,
    pub is_guest: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for Shopper {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if token_from_headers(&parts.headers).is_some() {
            let auth_user = AuthUser::from_request_parts(parts, state).await?;
            return match auth_user.role {
                Role::Customer | Role::Guest => Ok(Shopper {
                    user_id: auth_user.id,
                    is_guest: auth_user.role == Role::Guest,
                }),
                _ => Err(AppError::Forbidden("Carts are only available to customers".into())),
            };
        }
        let guest = GuestUser::from_request_parts(parts, state).await?;
        Ok(Shopper {
            user_id: guest.user_id,
            is_guest: true,
        })
    }
}
