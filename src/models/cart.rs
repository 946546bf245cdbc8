use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::catalog::PricedOption;
use crate::pricing::CartTotals;
use crate::validation::{Checks, Validate};

/// One cart row. `price_at_time` and `item_total` are frozen when the line is
/// added or its quantity changes; later catalog edits do not touch them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartLine {
    pub id: String,
    pub item_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub size: Option<String>,
    pub addons: Json<Vec<PricedOption>>,
    #[serde(skip)]
    pub addon_key: String,
    pub quantity: i64,
    pub price_at_time: i64,
    pub item_total: i64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CartRow {
    pub id: String,
    pub user_id: String,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: String,
    pub items: Vec<CartLine>,
    pub coupon_code: Option<String>,
    #[serde(flatten)]
    pub totals: CartTotals,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartReq {
    pub item_id: String,
    pub quantity: i64,
    pub size: Option<String>,
    #[serde(default)]
    pub addons: Vec<String>,
}

impl Validate for AddToCartReq {
    fn validate(&self) -> Result<(), AppError> {
        Checks::new()
            .required("item_id", &self.item_id)
            .check(self.quantity >= 1, "quantity", "must be at least 1")
            .check(self.quantity <= 50, "quantity", "must be at most 50")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateQuantityReq {
    /// Zero removes the line.
    pub quantity: i64,
}

impl Validate for UpdateQuantityReq {
    fn validate(&self) -> Result<(), AppError> {
        Checks::new()
            .check(self.quantity >= 0, "quantity", "must not be negative")
            .check(self.quantity <= 50, "quantity", "must be at most 50")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyCouponReq {
    pub code: String,
}
