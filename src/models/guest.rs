use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Anonymous shopping identity. The token travels in the `X-Guest-Session`
/// header and resolves to a `guest` user that owns the cart.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GuestSession {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl GuestSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
