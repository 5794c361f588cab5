//! Cart pricing.
//!
//! [`quote`] is the only place subtotal, shipping, discount, tax and total are
//! derived. Cart display, checkout display and order creation all call it.
//!
//! ```text
//! subtotal = Σ price × quantity
//! shipping = 0 if subtotal ≥ 100 else 10
//! discount = subtotal × promo% (rounded to cents)
//! tax      = (subtotal − discount) × 8% (rounded to cents)
//! total    = subtotal − discount + shipping + tax
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::ONE_HUNDRED;
pub const FLAT_SHIPPING_COST: Decimal = Decimal::TEN;
/// Tax rate in percent, applied after discount and before shipping.
pub const TAX_RATE_PERCENT: u32 = 8;

/// A redeemable code worth a fixed percentage off the subtotal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromoCode {
    pub code: &'static str,
    pub percent_off: u32,
}

pub const PROMO_CODES: &[PromoCode] = &[PromoCode { code: "TRAILBLAZER", percent_off: 20 }];

/// Case-insensitive lookup.
pub fn find_promo(code: &str) -> Option<PromoCode> {
    let code = code.trim();
    PROMO_CODES.iter().copied().find(|p| p.code.eq_ignore_ascii_case(code))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PromoOutcome {
    NotRequested,
    Applied { code: String, percent_off: u32 },
    Rejected { code: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub promo: PromoOutcome,
}

impl PriceQuote {
    pub fn is_free_shipping(&self) -> bool { self.shipping_cost.is_zero() }

    pub fn applied_promo_code(&self) -> Option<&str> {
        match &self.promo {
            PromoOutcome::Applied { code, .. } => Some(code),
            _ => None,
        }
    }
}

fn cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percent_of(amount: Decimal, percent: u32) -> Decimal {
    amount * Decimal::from(percent) / Decimal::ONE_HUNDRED
}

/// Price a set of `(unit price, quantity)` lines with an optional promo code.
///
/// An unknown code never fails the quote; it prices as if no code was given
/// and reports [`PromoOutcome::Rejected`] so the caller can surface it. Blank
/// codes count as not requested.
pub fn quote<I>(lines: I, promo_code: Option<&str>) -> PriceQuote
where
    I: IntoIterator<Item = (Decimal, u32)>,
{
    let subtotal: Decimal = lines.into_iter().map(|(price, qty)| price * Decimal::from(qty)).sum();

    let requested = promo_code.map(str::trim).filter(|c| !c.is_empty());
    let (discount, promo) = match requested {
        None => (Decimal::ZERO, PromoOutcome::NotRequested),
        Some(code) => match find_promo(code) {
            Some(p) => (
                cents(percent_of(subtotal, p.percent_off)),
                PromoOutcome::Applied { code: p.code.to_string(), percent_off: p.percent_off },
            ),
            None => (Decimal::ZERO, PromoOutcome::Rejected { code: code.to_string() }),
        },
    };

    let shipping_cost = if subtotal >= FREE_SHIPPING_THRESHOLD { Decimal::ZERO } else { FLAT_SHIPPING_COST };
    let tax = cents(percent_of(subtotal - discount, TAX_RATE_PERCENT));
    let total = subtotal - discount + shipping_cost + tax;

    PriceQuote { subtotal, discount, shipping_cost, tax, total, promo }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal { s.parse().unwrap() }

    #[test]
    fn test_free_shipping_at_threshold() {
        let q = quote([(dec("100"), 1)], None);
        assert_eq!(q.shipping_cost, Decimal::ZERO);
        assert!(q.is_free_shipping());
    }

    #[test]
    fn test_flat_shipping_below_threshold() {
        let q = quote([(dec("99.99"), 1)], None);
        assert_eq!(q.shipping_cost, dec("10"));
        assert_eq!(q.tax, dec("8.00"));
        assert_eq!(q.total, dec("117.99"));
    }

    #[test]
    fn test_trailblazer_on_200() {
        let q = quote([(dec("50"), 4)], Some("trailBlazer"));
        assert_eq!(q.subtotal, dec("200"));
        assert_eq!(q.discount, dec("40"));
        assert_eq!(q.tax, dec("12.8"));
        assert_eq!(q.shipping_cost, Decimal::ZERO);
        assert_eq!(q.total, dec("172.8"));
        assert_eq!(q.applied_promo_code(), Some("TRAILBLAZER"));
    }

    #[test]
    fn test_discount_does_not_move_shipping_threshold() {
        // 120 - 24 = 96 after discount, but shipping keys off the subtotal.
        let q = quote([(dec("120"), 1)], Some("TRAILBLAZER"));
        assert_eq!(q.discount, dec("24"));
        assert_eq!(q.shipping_cost, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_promo_is_reported_not_applied() {
        let q = quote([(dec("200"), 1)], Some("FREEBIKE"));
        assert_eq!(q.discount, Decimal::ZERO);
        assert_eq!(q.promo, PromoOutcome::Rejected { code: "FREEBIKE".into() });
        assert_eq!(q.total, dec("216"));
    }

    #[test]
    fn test_blank_promo_is_not_requested() {
        let q = quote([(dec("10"), 1)], Some("   "));
        assert_eq!(q.promo, PromoOutcome::NotRequested);
    }

    #[test]
    fn test_rounds_to_cents() {
        let q = quote([(dec("33.33"), 1)], Some("TRAILBLAZER"));
        assert_eq!(q.discount, dec("6.67"));
        assert_eq!(q.tax, dec("2.13"));
        assert_eq!(q.total, dec("38.79"));
    }
}
