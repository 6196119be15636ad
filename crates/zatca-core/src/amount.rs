//! # Decimal Amounts
//!
//! Rounding and rendering rules for monetary values, quantities and VAT
//! rates. All arithmetic uses [`rust_decimal::Decimal`]; binary floats never
//! touch an invoice figure.
//!
//! - Currency amounts: 2 decimal places, midpoint rounded away from zero.
//! - Quantities: 6 decimal places.
//! - Percentages: 2 decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ValidationError;

/// Decimal places of a rendered currency amount.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places of a rendered quantity.
pub const QUANTITY_SCALE: u32 = 6;

/// Round a value to currency precision.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn render(value: Decimal, scale: u32) -> String {
    let mut v = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    v.rescale(scale);
    v.to_string()
}

/// Render a currency amount with exactly 2 decimal places.
pub fn format_amount(value: Decimal) -> String {
    render(value, MONEY_SCALE)
}

/// Render a quantity with exactly 6 decimal places.
pub fn format_quantity(value: Decimal) -> String {
    render(value, QUANTITY_SCALE)
}

/// Render a VAT percentage with exactly 2 decimal places.
pub fn format_percent(value: Decimal) -> String {
    render(value, MONEY_SCALE)
}

/// VAT due on `taxable` at `rate` percent, rounded to currency precision.
pub fn vat_for(taxable: Decimal, rate: Decimal, field: &str) -> Result<Decimal, ValidationError> {
    let gross = taxable
        .checked_mul(rate)
        .ok_or_else(|| ValidationError::Overflow(field.to_string()))?;
    Ok(round_money(gross / Decimal::ONE_HUNDRED))
}

/// `a + b`, reporting overflow against `field`.
pub fn add_amounts(field: &str, a: Decimal, b: Decimal) -> Result<Decimal, ValidationError> {
    a.checked_add(b)
        .ok_or_else(|| ValidationError::Overflow(field.to_string()))
}

/// Sum of `values`, reporting overflow against `field`.
pub fn sum_amounts(
    field: &str,
    values: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, ValidationError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| add_amounts(field, acc, v))
}

/// Reject negative values.
pub fn ensure_non_negative(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativeAmount {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Check that `value` is a non-negative decimal written with exactly 2
/// decimal places, e.g. `"115.00"`.
///
/// The text is not rounded or normalised. A caller holding `"115"` or
/// `"114.999"` must round upstream with [`format_amount`].
pub fn check_two_place_amount(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if let Some(rest) = value.strip_prefix('-') {
        if is_two_place(rest) {
            return Err(ValidationError::NegativeAmount {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }
    if !is_two_place(value) {
        return Err(ValidationError::InvalidAmountFormat {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn is_two_place(value: &str) -> bool {
    match value.split_once('.') {
        Some((whole, frac)) => {
            !whole.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && frac.len() == 2
                && frac.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn format_amount_pads_and_rounds() {
        assert_eq!(format_amount(d("15")), "15.00");
        assert_eq!(format_amount(d("115.5")), "115.50");
        assert_eq!(format_amount(d("0.005")), "0.01");
        assert_eq!(format_amount(d("2.344")), "2.34");
    }

    #[test]
    fn format_quantity_uses_six_places() {
        assert_eq!(format_quantity(d("2")), "2.000000");
        assert_eq!(format_quantity(d("1.25")), "1.250000");
    }

    #[test]
    fn format_percent_uses_two_places() {
        assert_eq!(format_percent(d("15")), "15.00");
        assert_eq!(format_percent(d("0")), "0.00");
    }

    #[test]
    fn vat_for_standard_rate() {
        assert_eq!(vat_for(d("100"), d("15"), "vat").unwrap(), d("15.00"));
        assert_eq!(vat_for(d("33.33"), d("15"), "vat").unwrap(), d("5.00"));
    }

    #[test]
    fn vat_for_rounds_midpoint_away_from_zero() {
        // 0.10 * 5% = 0.005
        assert_eq!(vat_for(d("0.10"), d("5"), "vat").unwrap(), d("0.01"));
    }

    #[test]
    fn vat_for_reports_overflow() {
        let err = vat_for(Decimal::MAX, d("15"), "line[1].vat_amount").unwrap_err();
        assert_eq!(err, ValidationError::Overflow("line[1].vat_amount".into()));
    }

    #[test]
    fn addition_reports_overflow() {
        assert_eq!(add_amounts("total", d("100.00"), d("15.00")).unwrap(), d("115.00"));
        let err = add_amounts("line[1].total", Decimal::MAX, d("0.01")).unwrap_err();
        assert_eq!(err, ValidationError::Overflow("line[1].total".into()));
    }

    #[test]
    fn sum_reports_overflow() {
        assert_eq!(sum_amounts("subtotal", Vec::new()).unwrap(), Decimal::ZERO);
        assert_eq!(
            sum_amounts("subtotal", [d("1.10"), d("2.20"), d("3.30")]).unwrap(),
            d("6.60")
        );
        let half = Decimal::MAX / d("2") + Decimal::ONE;
        let err = sum_amounts("subtotal", [half, half]).unwrap_err();
        assert_eq!(err, ValidationError::Overflow("subtotal".into()));
    }

    #[test]
    fn two_place_check_accepts_canonical_amounts() {
        assert!(check_two_place_amount("total", "115.00").is_ok());
        assert!(check_two_place_amount("total", "0.00").is_ok());
    }

    #[test]
    fn two_place_check_rejects_unrounded_text() {
        for bad in ["115", "115.0", "115.000", ".50", "1e2", "", "11 5.00", "115.00 "] {
            assert!(
                matches!(
                    check_two_place_amount("total", bad),
                    Err(ValidationError::InvalidAmountFormat { .. })
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn two_place_check_rejects_negative() {
        assert!(matches!(
            check_two_place_amount("vat_amount", "-15.00"),
            Err(ValidationError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn non_negative_allows_zero() {
        assert!(ensure_non_negative("subtotal", d("0")).is_ok());
        assert!(ensure_non_negative("subtotal", d("-0.01")).is_err());
    }
}
