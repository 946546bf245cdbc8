use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::validation::{Checks, Validate};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscriber {
    pub id: String,
    pub email: String,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeReq {
    pub email: String,
}

impl Validate for SubscribeReq {
    fn validate(&self) -> Result<(), AppError> {
        Checks::new().email("email", &self.email).finish()
    }
}
