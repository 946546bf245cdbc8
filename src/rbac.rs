//! Role-based access to vegetarian / non-vegetarian catalog partitions.
//!
//! Every admin role owns one partition of the catalog, decided by the
//! `is_vegetarian` flag of the resource (or of its parent category). The
//! predicates here are pure; handlers turn a denial into a 403.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    VegAdmin,
    NonVegAdmin,
    Customer,
    Guest,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::VegAdmin,
        Role::NonVegAdmin,
        Role::Customer,
        Role::Guest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super-admin",
            Self::VegAdmin => "veg-admin",
            Self::NonVegAdmin => "non-veg-admin",
            Self::Customer => "customer",
            Self::Guest => "guest",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::VegAdmin | Self::NonVegAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown role: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Decides whether `role` may perform `action` on a resource whose
/// vegetarian flag is `is_vegetarian`.
///
/// Super-admins have full read and write access. Partition admins only touch
/// their own side of the catalog, and shop roles never pass.
pub fn can_perform_action(role: Role, _action: Action, is_vegetarian: bool) -> bool {
    match role {
        Role::SuperAdmin => true,
        Role::VegAdmin => is_vegetarian,
        Role::NonVegAdmin => !is_vegetarian,
        Role::Customer | Role::Guest => false,
    }
}

/// Same as [`can_perform_action`] but produces the 403 handlers return.
pub fn ensure_can(role: Role, action: Action, is_vegetarian: bool, resource: &str) -> Result<(), AppError> {
    if can_perform_action(role, action, is_vegetarian) {
        return Ok(());
    }
    let side = if is_vegetarian { "vegetarian" } else { "non-vegetarian" };
    tracing::debug!(role = %role, action = action.verb(), resource, side, "access denied");
    Err(AppError::Forbidden(format!(
        "Role {role} is not allowed to {} {side} {resource}",
        action.verb()
    )))
}

/// Query-filter fragment restricting list endpoints to the caller's partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFilter {
    pub is_vegetarian: Option<bool>,
}

impl RoleFilter {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn allows(&self, is_vegetarian: bool) -> bool {
        self.is_vegetarian.map_or(true, |v| v == is_vegetarian)
    }
}

pub fn role_filter(role: Role) -> RoleFilter {
    match role {
        Role::VegAdmin => RoleFilter { is_vegetarian: Some(true) },
        Role::NonVegAdmin => RoleFilter { is_vegetarian: Some(false) },
        Role::SuperAdmin | Role::Customer | Role::Guest => RoleFilter::unrestricted(),
    }
}
