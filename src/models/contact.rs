use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::validation::{Checks, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContactStatus {
    New,
    Read,
    Replied,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactReq {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

impl Validate for ContactReq {
    fn validate(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        checks
            .required("name", &self.name)
            .max_len("name", &self.name, 80)
            .email("email", &self.email)
            .required("subject", &self.subject)
            .max_len("subject", &self.subject, 150)
            .required("message", &self.message)
            .max_len("message", &self.message, 2000);
        if let Some(phone) = &self.phone {
            checks.phone("phone", phone);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactStatusReq {
    pub status: ContactStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub status: Option<ContactStatus>,
}
