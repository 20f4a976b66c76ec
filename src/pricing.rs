//! Price arithmetic for cart lines and orders.
//!
//! All amounts are integer minor units (paise). Discounts are whole
//! percentages; the per-unit cut is rounded half up to the nearest minor unit
//! before it is multiplied out, so a line total is always `unit * quantity`.

use serde::Serialize;
use utoipa::ToSchema;

/// Anything that can be priced as a cart or order line.
pub trait PricedLine {
    /// Undiscounted catalog price of one unit.
    fn base_price(&self) -> i64;
    fn discount_percentage(&self) -> i32;
    fn quantity(&self) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LinePrice {
    pub price: i64,
    pub discount_percentage: i32,
    pub quantity: i32,
}

impl PricedLine for LinePrice {
    fn base_price(&self) -> i64 {
        self.price
    }

    fn discount_percentage(&self) -> i32 {
        self.discount_percentage
    }

    fn quantity(&self) -> i32 {
        self.quantity
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartTotals {
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
}

/// `base - base * discount_percent / 100`, unclamped.
///
/// Percentages outside `0..=100` produce negative or above-base prices; callers
/// keep catalog data in range.
pub fn discounted_unit_price(base_price: i64, discount_percent: i32) -> i64 {
    let cut = (i128::from(base_price) * i128::from(discount_percent) + 50).div_euclid(100);
    (i128::from(base_price) - cut) as i64
}

pub fn line_total<L: PricedLine + ?Sized>(line: &L) -> i64 {
    discounted_unit_price(line.base_price(), line.discount_percentage())
        * i64::from(line.quantity())
}

pub fn cart_totals<'a, L, I>(lines: I) -> CartTotals
where
    L: PricedLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let mut totals = CartTotals::default();
    for line in lines {
        let quantity = i64::from(line.quantity());
        let unit = discounted_unit_price(line.base_price(), line.discount_percentage());
        totals.subtotal += line.base_price() * quantity;
        totals.discount += (line.base_price() - unit) * quantity;
    }
    totals.total = totals.subtotal - totals.discount;
    totals
}

/// Two-decimal rendering of a minor-unit amount, e.g. `23000` -> `"230.00"`.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
