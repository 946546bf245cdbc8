use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::catalog::PricedOption;
use crate::validation::{Checks, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::OutForDelivery => "out-for-delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Preparing)
                | (Confirmed, Cancelled)
                | (Preparing, OutForDelivery)
                | (Preparing, Cancelled)
                | (OutForDelivery, Delivered)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Card,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Card => "card",
            Self::Upi => "upi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub landmark: Option<String>,
}

impl DeliveryAddress {
    fn check(&self, checks: &mut Checks) {
        checks
            .required("delivery_address.line1", &self.line1)
            .max_len("delivery_address.line1", &self.line1, 200)
            .required("delivery_address.city", &self.city)
            .check(
                !self.postal_code.trim().is_empty()
                    && self.postal_code.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-'),
                "delivery_address.postal_code",
                "must be a valid postal code",
            );
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub is_guest: bool,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub delivery_address: Json<DeliveryAddress>,
    pub subtotal: i64,
    pub discount: i64,
    pub delivery_fee: i64,
    pub total: i64,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderLine {
    pub id: String,
    pub item_id: String,
    pub name: String,
    pub size: Option<String>,
    pub addons: Json<Vec<PricedOption>>,
    pub quantity: i64,
    pub price_at_time: i64,
    pub item_total: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub status_history: Vec<StatusChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutReq {
    pub delivery_address: DeliveryAddress,
    pub payment_method: PaymentMethod,
    /// Falls back to the phone stored on the account.
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl Validate for CheckoutReq {
    fn validate(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        self.delivery_address.check(&mut checks);
        if let Some(phone) = &self.phone {
            checks.phone("phone", phone);
        }
        if let Some(notes) = &self.notes {
            checks.max_len("notes", notes, 500);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuestCheckoutReq {
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub delivery_address: DeliveryAddress,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl Validate for GuestCheckoutReq {
    fn validate(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        checks
            .required("name", &self.name)
            .max_len("name", &self.name, 80)
            .phone("phone", &self.phone);
        if let Some(email) = &self.email {
            checks.email("email", email);
        }
        self.delivery_address.check(&mut checks);
        if let Some(notes) = &self.notes {
            checks.max_len("notes", notes, 500);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusReq {
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn forward_transitions_only() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Preparing.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn cancellation_window_closes_on_dispatch() {
        for s in [Pending, Confirmed, Preparing] {
            assert!(s.can_transition_to(Cancelled));
        }
        assert!(!OutForDelivery.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }
}
