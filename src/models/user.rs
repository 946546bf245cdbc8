use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::rbac::Role;
use crate::validation::{Checks, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Deactivated,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deactivated => "deactivated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
    Guest,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip)] // never serialize password hash
    pub password_hash: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub auth_provider: AuthProvider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterReq {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

impl Validate for RegisterReq {
    fn validate(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        checks
            .required("name", &self.name)
            .max_len("name", &self.name, 80)
            .email("email", &self.email)
            .check(
                self.password.chars().count() >= 8,
                "password",
                "must be at least 8 characters",
            );
        if let Some(phone) = &self.phone {
            checks.phone("phone", phone);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

impl Validate for LoginReq {
    fn validate(&self) -> Result<(), AppError> {
        Checks::new()
            .required("email", &self.email)
            .required("password", &self.password)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleReq {
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}
