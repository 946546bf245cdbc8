//! Cart pricing: frozen line totals, coupon discounts and the add-to-cart
//! merge rule. Every amount is an integer number of cents.
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::AppError;
use crate::models::cart::CartLine;
use crate::models::catalog::PricedOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coupon {
    pub code: &'static str,
    pub kind: CouponKind,
    /// Percent for percentage coupons, cents for fixed ones.
    pub value: i64,
    pub min_order: i64,
    pub max_discount: i64,
}

static COUPONS: Lazy<Vec<Coupon>> = Lazy::new(|| {
    vec![
        Coupon {
            code: "SAVE10",
            kind: CouponKind::Percentage,
            value: 10,
            min_order: 3_000,
            max_discount: 5_000,
        },
        Coupon {
            code: "FLAT50",
            kind: CouponKind::Fixed,
            value: 500,
            min_order: 2_500,
            max_discount: 500,
        },
        Coupon {
            code: "WELCOME20",
            kind: CouponKind::Percentage,
            value: 20,
            min_order: 5_000,
            max_discount: 1_500,
        },
    ]
});

pub fn find_coupon(code: &str) -> Option<&'static Coupon> {
    let code = code.trim();
    COUPONS.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

pub fn coupon_or_reject(code: &str) -> Result<&'static Coupon, AppError> {
    find_coupon(code).ok_or_else(|| AppError::BadRequest(format!("Invalid coupon code: {}", code.trim())))
}

/// `(price_at_time + Σ addon.price) × quantity`
pub fn line_total(price_at_time: i64, addons: &[PricedOption], quantity: i64) -> i64 {
    let addon_sum: i64 = addons.iter().map(|a| a.price).sum();
    (price_at_time + addon_sum) * quantity
}

/// Canonical form of an add-on set: sorted, de-duplicated, case-folded names.
pub fn addon_key(addons: &[PricedOption]) -> String {
    addons
        .iter()
        .map(|a| a.name.trim().to_lowercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join("|")
}

/// Discount earned by `subtotal`; zero when the minimum order is not met.
pub fn discount_for(subtotal: i64, coupon: Option<&Coupon>) -> i64 {
    let Some(coupon) = coupon else { return 0 };
    if subtotal < coupon.min_order {
        return 0;
    }
    let raw = match coupon.kind {
        // rounded to the nearest cent, half up
        CouponKind::Percentage => (subtotal * coupon.value + 50) / 100,
        CouponKind::Fixed => coupon.value,
    };
    raw.min(coupon.max_discount).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub item_count: i64,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
}

pub fn compute_totals(lines: &[CartLine], coupon: Option<&Coupon>) -> CartTotals {
    let subtotal: i64 = lines.iter().map(|l| l.item_total).sum();
    let discount = discount_for(subtotal, coupon);
    CartTotals {
        item_count: lines.iter().map(|l| l.quantity).sum(),
        subtotal,
        discount,
        total: (subtotal - discount).max(0),
    }
}

/// What adding an item to a cart should do to the stored lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddPlan {
    /// Bump an existing line to `quantity` (index into the given lines).
    Increment { index: usize, quantity: i64 },
    /// Insert a fresh line with `quantity`.
    Insert { quantity: i64 },
}

/// Applies the merge rule: a matching (item, size, add-on set) line grows in
/// place, anything else becomes a new line. The resulting quantity of the
/// item across the touched line is capped by `stock`.
pub fn plan_add(
    lines: &[CartLine],
    item_id: &str,
    size: Option<&str>,
    addon_key: &str,
    quantity: i64,
    stock: i64,
) -> Result<AddPlan, AppError> {
    let existing = lines.iter().position(|l| {
        l.item_id == item_id
            && l.size.as_deref().map(str::to_lowercase) == size.map(str::to_lowercase)
            && l.addon_key == addon_key
    });

    let (plan, wanted) = match existing {
        Some(index) => {
            let wanted = lines[index].quantity + quantity;
            (AddPlan::Increment { index, quantity: wanted }, wanted)
        }
        None => (AddPlan::Insert { quantity }, quantity),
    };

    ensure_stock(wanted, stock)?;
    Ok(plan)
}

pub fn ensure_stock(wanted: i64, stock: i64) -> Result<(), AppError> {
    if wanted > stock {
        return Err(AppError::BadRequest(format!(
            "Only {} left in stock",
            stock.max(0)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;

    fn addon(name: &str, price: i64) -> PricedOption {
        PricedOption { name: name.into(), price }
    }

    fn line(item_id: &str, size: Option<&str>, addons: Vec<PricedOption>, quantity: i64, price: i64) -> CartLine {
        CartLine {
            id: format!("l-{item_id}"),
            item_id: item_id.into(),
            name: item_id.into(),
            image_url: None,
            size: size.map(Into::into),
            addon_key: addon_key(&addons),
            item_total: line_total(price, &addons, quantity),
            addons: Json(addons),
            quantity,
            price_at_time: price,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn worked_example_with_save10() {
        let l = line("thali", None, vec![addon("raita", 200)], 3, 1_000);
        assert_eq!(l.item_total, 3_600);

        let totals = compute_totals(&[l], find_coupon("save10"));
        assert_eq!(totals.subtotal, 3_600);
        assert_eq!(totals.discount, 360);
        assert_eq!(totals.total, 3_240);
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn subtotal_is_sum_of_frozen_totals() {
        let lines = vec![
            line("a", None, vec![], 2, 450),
            line("b", Some("Large"), vec![addon("cheese", 100), addon("olives", 50)], 1, 900),
        ];
        let totals = compute_totals(&lines, None);
        assert_eq!(totals.subtotal, 900 + 1_050);
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn below_min_order_gets_no_discount() {
        assert_eq!(discount_for(2_999, find_coupon("SAVE10")), 0);
        assert_eq!(discount_for(3_000, find_coupon("SAVE10")), 300);
    }

    #[test]
    fn percentage_discount_is_capped() {
        for subtotal in [3_000, 49_999, 50_000, 120_000, 10_000_000] {
            let d = discount_for(subtotal, find_coupon("SAVE10"));
            assert!(d <= 5_000, "subtotal {subtotal} gave {d}");
        }
        assert_eq!(discount_for(100_000, find_coupon("WELCOME20")), 1_500);
    }

    #[test]
    fn total_never_negative() {
        let coupon = Coupon {
            code: "BIG",
            kind: CouponKind::Fixed,
            value: 10_000,
            min_order: 0,
            max_discount: 10_000,
        };
        let totals = compute_totals(&[line("a", None, vec![], 1, 300)], Some(&coupon));
        assert_eq!(totals.discount, 10_000);
        assert_eq!(totals.total, 0);
    }

    #[test]
    fn addon_key_ignores_order_and_case() {
        let a = addon_key(&[addon("Cheese", 1), addon("olives", 1)]);
        let b = addon_key(&[addon("olives", 1), addon("cheese", 1), addon("CHEESE", 1)]);
        assert_eq!(a, b);
        assert_eq!(addon_key(&[]), "");
    }

    #[test]
    fn same_tuple_increments_existing_line() {
        let lines = vec![line("a", Some("Large"), vec![addon("cheese", 100)], 2, 900)];
        let key = addon_key(&[addon("cheese", 100)]);
        let plan = plan_add(&lines, "a", Some("large"), &key, 1, 10).unwrap();
        assert_eq!(plan, AddPlan::Increment { index: 0, quantity: 3 });
    }

    #[test]
    fn different_size_or_addons_inserts() {
        let lines = vec![line("a", Some("Large"), vec![addon("cheese", 100)], 2, 900)];
        let plan = plan_add(&lines, "a", Some("Small"), &addon_key(&[addon("cheese", 100)]), 1, 10).unwrap();
        assert_eq!(plan, AddPlan::Insert { quantity: 1 });
        let plan = plan_add(&lines, "a", Some("Large"), "", 1, 10).unwrap();
        assert_eq!(plan, AddPlan::Insert { quantity: 1 });
    }

    #[test]
    fn merge_is_capped_by_stock() {
        let lines = vec![line("a", None, vec![], 4, 100)];
        assert!(plan_add(&lines, "a", None, "", 2, 5).is_err());
        assert!(plan_add(&lines, "a", None, "", 1, 5).is_ok());
        assert!(plan_add(&[], "b", None, "", 3, 2).is_err());
    }
}
