use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Copy)]
pub struct LimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
    pub api_rate_limit: LimitConfig,
    pub auth_rate_limit: LimitConfig,
    pub guest_session_ttl_hours: i64,
    pub maintenance_interval_secs: u64,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    /// Flat delivery fee in cents, waived at or above the threshold.
    pub delivery_fee: i64,
    pub free_delivery_threshold: i64,
    pub cloudinary: Option<CloudinaryConfig>,
    pub smtp: Option<SmtpConfig>,
    pub google: Option<GoogleConfig>,
    pub super_admin: Option<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            database_url: "sqlite://foodhub.db".into(),
            jwt_secret: "change-me".into(),
            jwt_ttl_hours: 24 * 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            cors_origins: vec!["http://localhost:5173".into(), "http://localhost:3000".into()],
            api_rate_limit: LimitConfig {
                max_requests: 300,
                window_secs: 15 * 60,
            },
            auth_rate_limit: LimitConfig {
                max_requests: 20,
                window_secs: 15 * 60,
            },
            guest_session_ttl_hours: 24,
            maintenance_interval_secs: 15 * 60,
            upload_dir: PathBuf::from("uploads"),
            public_base_url: "http://localhost:5000".into(),
            delivery_fee: 4_000,
            free_delivery_threshold: 50_000,
            cloudinary: None,
            smtp: None,
            google: None,
            super_admin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let d = Config::default();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                tracing::warn!("JWT_SECRET not set, using an insecure development secret");
                d.jwt_secret.clone()
            }
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or(d.cors_origins);

        let cloudinary = match (
            env::var("CLOUDINARY_CLOUD_NAME"),
            env::var("CLOUDINARY_UPLOAD_PRESET"),
            env::var("CLOUDINARY_API_KEY"),
            env::var("CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(upload_preset), Ok(api_key), Ok(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                upload_preset,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: try_load("SMTP_PORT", 587)?,
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                from: env::var("SMTP_FROM").unwrap_or_else(|_| "FoodHub <no-reply@foodhub.local>".into()),
            }),
            Err(_) => None,
        };

        let google = match (env::var("GOOGLE_CLIENT_ID"), env::var("GOOGLE_CLIENT_SECRET")) {
            (Ok(client_id), Ok(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|_| "http://localhost:5000/api/auth/google/callback".into()),
            }),
            _ => None,
        };

        let super_admin = match (env::var("SUPER_ADMIN_EMAIL"), env::var("SUPER_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            port: try_load("PORT", d.port)?,
            database_url: env::var("DATABASE_URL").unwrap_or(d.database_url),
            jwt_secret,
            jwt_ttl_hours: try_load("JWT_TTL_HOURS", d.jwt_ttl_hours)?,
            bcrypt_cost: try_load("BCRYPT_COST", d.bcrypt_cost)?,
            cors_origins,
            api_rate_limit: LimitConfig {
                max_requests: try_load("RATE_LIMIT_MAX", d.api_rate_limit.max_requests)?,
                window_secs: try_load("RATE_LIMIT_WINDOW_SECS", d.api_rate_limit.window_secs)?,
            },
            auth_rate_limit: LimitConfig {
                max_requests: try_load("AUTH_RATE_LIMIT_MAX", d.auth_rate_limit.max_requests)?,
                window_secs: try_load("RATE_LIMIT_WINDOW_SECS", d.auth_rate_limit.window_secs)?,
            },
            guest_session_ttl_hours: try_load("GUEST_SESSION_TTL_HOURS", d.guest_session_ttl_hours)?,
            maintenance_interval_secs: try_load("MAINTENANCE_INTERVAL_SECS", d.maintenance_interval_secs)?,
            upload_dir: env::var("UPLOAD_DIR").map(PathBuf::from).unwrap_or(d.upload_dir),
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or(d.public_base_url),
            delivery_fee: try_load("DELIVERY_FEE", d.delivery_fee)?,
            free_delivery_threshold: try_load("FREE_DELIVERY_THRESHOLD", d.free_delivery_threshold)?,
            cloudinary,
            smtp,
            google,
            super_admin,
        })
    }

    /// Delivery fee charged on an order of `subtotal_after_discount` cents.
    pub fn delivery_fee_for(&self, subtotal_after_discount: i64) -> i64 {
        if subtotal_after_discount >= self.free_delivery_threshold {
            0
        } else {
            self.delivery_fee
        }
    }
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => {
            tracing::debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_fee_waived_at_threshold() {
        let cfg = Config::default();
        assert_eq!(cfg.delivery_fee_for(49_999), 4_000);
        assert_eq!(cfg.delivery_fee_for(50_000), 0);
    }
}
