//! Menu items and products share one catalog table, told apart by `kind`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::common::nullable;
use crate::validation::{Checks, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum CatalogKind {
    MenuItem,
    Product,
}

impl CatalogKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MenuItem => "menu item",
            Self::Product => "product",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum SpicyLevel {
    Mild,
    Medium,
    Hot,
    ExtraHot,
}

/// A named price option: a size variant or an add-on. Prices in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedOption {
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CatalogItem {
    pub id: String,
    pub kind: CatalogKind,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: String,
    pub is_vegetarian: bool,
    /// MRP in cents.
    pub price: i64,
    pub discounted_price: Option<i64>,
    pub stock: i64,
    pub sizes: Json<Vec<PricedOption>>,
    pub addons: Json<Vec<PricedOption>>,
    pub images: Json<Vec<ImageRef>>,
    pub tags: Json<Vec<String>>,
    pub spicy_level: Option<SpicyLevel>,
    pub preparation_time: Option<i64>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Price a customer pays for one unit before add-ons.
    pub fn unit_price(&self, size: Option<&str>) -> Result<i64, AppError> {
        match size {
            Some(size) => self
                .sizes
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(size))
                .map(|s| s.price)
                .ok_or_else(|| AppError::BadRequest(format!("Size '{size}' is not available for {}", self.name))),
            None => Ok(self.discounted_price.unwrap_or(self.price)),
        }
    }

    /// Resolves requested add-on names to the catalog's priced add-ons.
    pub fn resolve_addons(&self, names: &[String]) -> Result<Vec<PricedOption>, AppError> {
        names
            .iter()
            .map(|name| {
                self.addons
                    .iter()
                    .find(|a| a.name.eq_ignore_ascii_case(name.trim()))
                    .cloned()
                    .ok_or_else(|| AppError::BadRequest(format!("Add-on '{name}' is not available for {}", self.name)))
            })
            .collect()
    }
}

fn check_options(checks: &mut Checks, field: &str, options: &[PricedOption]) {
    for (i, opt) in options.iter().enumerate() {
        if opt.name.trim().is_empty() {
            checks.fail(&format!("{field}[{i}].name"), "is required");
        }
        if opt.price < 0 {
            checks.fail(&format!("{field}[{i}].price"), "must not be negative");
        }
    }
}

fn check_prices(checks: &mut Checks, price: Option<i64>, discounted: Option<i64>) {
    if let Some(price) = price {
        checks.check(price > 0, "price", "must be greater than zero");
    }
    if let (Some(price), Some(discounted)) = (price, discounted) {
        checks
            .non_negative("discounted_price", discounted)
            .check(discounted <= price, "discounted_price", "cannot exceed the MRP");
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemReq {
    pub name: String,
    pub description: Option<String>,
    pub category_id: String,
    pub is_vegetarian: bool,
    pub price: i64,
    pub discounted_price: Option<i64>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sizes: Vec<PricedOption>,
    #[serde(default)]
    pub addons: Vec<PricedOption>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub spicy_level: Option<SpicyLevel>,
    pub preparation_time: Option<i64>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl Validate for CreateItemReq {
    fn validate(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        checks
            .required("name", &self.name)
            .max_len("name", &self.name, 120)
            .required("category_id", &self.category_id)
            .non_negative("stock", self.stock);
        check_prices(&mut checks, Some(self.price), self.discounted_price);
        check_options(&mut checks, "sizes", &self.sizes);
        check_options(&mut checks, "addons", &self.addons);
        if let Some(minutes) = self.preparation_time {
            checks.check(minutes > 0, "preparation_time", "must be positive");
        }
        if let Some(desc) = &self.description {
            checks.max_len("description", desc, 1000);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemReq {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub is_vegetarian: Option<bool>,
    pub price: Option<i64>,
    /// Absent keeps the stored discount, `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub discounted_price: Option<Option<i64>>,
    pub stock: Option<i64>,
    pub sizes: Option<Vec<PricedOption>>,
    pub addons: Option<Vec<PricedOption>>,
    pub tags: Option<Vec<String>>,
    pub spicy_level: Option<SpicyLevel>,
    pub preparation_time: Option<i64>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl UpdateItemReq {
    pub fn merged_discount(&self, current: &CatalogItem) -> Option<i64> {
        self.discounted_price.unwrap_or(current.discounted_price)
    }

    /// Price rules checked against the merged (stored + requested) values.
    pub fn validate_against(&self, current: &CatalogItem) -> Result<(), AppError> {
        let mut checks = Checks::new();
        if let Some(name) = &self.name {
            checks.required("name", name).max_len("name", name, 120);
        }
        if let Some(stock) = self.stock {
            checks.non_negative("stock", stock);
        }
        let price = self.price.unwrap_or(current.price);
        let discounted = self.merged_discount(current);
        check_prices(&mut checks, Some(price), discounted);
        if let Some(sizes) = &self.sizes {
            check_options(&mut checks, "sizes", sizes);
        }
        if let Some(addons) = &self.addons {
            check_options(&mut checks, "addons", addons);
        }
        if let Some(minutes) = self.preparation_time {
            checks.check(minutes > 0, "preparation_time", "must be positive");
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockUpdateReq {
    pub stock: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub is_active: Option<bool>,
    pub category: Option<String>,
    pub vegetarian: Option<bool>,
    pub featured: Option<bool>,
}
