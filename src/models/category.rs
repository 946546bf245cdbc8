//! Category model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::validation::{Checks, Validate};

/// Parent categories split the catalog into vegetarian and non-vegetarian
/// groups; menu categories hang off a parent and inherit its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CategoryType {
    Parent,
    Menu,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_type: CategoryType,
    pub parent_id: Option<String>,
    /// For menu categories this is always a copy of the parent's flag.
    pub is_vegetarian: bool,
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub image_public_id: Option<String>,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryReq {
    pub name: String,
    pub description: Option<String>,
    pub category_type: CategoryType,
    /// Required for menu categories, rejected for parents.
    pub parent_id: Option<String>,
    /// Required for parent categories; menu categories take the parent's.
    pub is_vegetarian: Option<bool>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

impl Validate for CreateCategoryReq {
    fn validate(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        checks
            .required("name", &self.name)
            .max_len("name", &self.name, 80);
        match self.category_type {
            CategoryType::Parent => {
                checks
                    .check(self.parent_id.is_none(), "parent_id", "is not allowed for parent categories")
                    .check(self.is_vegetarian.is_some(), "is_vegetarian", "is required for parent categories");
            }
            CategoryType::Menu => {
                checks.check(
                    self.parent_id.as_deref().is_some_and(|p| !p.trim().is_empty()),
                    "parent_id",
                    "is required for menu categories",
                );
            }
        }
        if let Some(desc) = &self.description {
            checks.max_len("description", desc, 500);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryReq {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Menu categories only: move under another parent.
    pub parent_id: Option<String>,
    /// Parent categories only: flipping it re-propagates to children.
    pub is_vegetarian: Option<bool>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

impl Validate for UpdateCategoryReq {
    fn validate(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        if let Some(name) = &self.name {
            checks.required("name", name).max_len("name", name, 80);
        }
        if let Some(desc) = &self.description {
            checks.max_len("description", desc, 500);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub is_active: Option<bool>,
    pub category_type: Option<CategoryType>,
    pub parent_id: Option<String>,
}
