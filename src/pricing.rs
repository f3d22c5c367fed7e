//! Pricing
//!
//! Unit prices are exact decimals so a halved price such as `4.995` still
//! totals correctly; totals are rounded to the currency's minor units.

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

/// Errors that can occur while calculating total price.
#[derive(Debug, Error, PartialEq)]
pub enum TotalPriceError {
    /// A line's currency differs from the cart currency (line currency, cart currency).
    #[error("line has currency {0}, but cart has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),
}

/// Half of `price`, without rounding.
pub fn half_price<'a>(price: Money<'a, Currency>) -> Money<'a, Currency> {
    Money::from_decimal(*price.amount() / Decimal::TWO, price.currency())
}

/// Whether `price` is strictly greater than zero.
pub fn is_positive(price: &Money<'_, Currency>) -> bool {
    *price.amount() > Decimal::ZERO
}

/// Round an amount to the currency's minor units, midpoint away from zero.
pub fn round_to_currency(amount: Decimal, currency: &Currency) -> Decimal {
    amount.round_dp_with_strategy(currency.exponent, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount as a plain decimal at the currency's precision, e.g. `"10.00"`.
pub fn format_decimal(price: &Money<'_, Currency>) -> String {
    let currency = price.currency();
    let mut amount = round_to_currency(*price.amount(), currency);

    amount.rescale(currency.exponent);

    amount.to_string()
}

/// Total for `quantity` units at `unit_price`, rounded to the currency's minor units.
pub fn line_total<'a>(unit_price: Money<'a, Currency>, quantity: u32) -> Money<'a, Currency> {
    let currency = unit_price.currency();
    let amount = *unit_price.amount() * Decimal::from(quantity);

    Money::from_decimal(round_to_currency(amount, currency), currency)
}

/// Sum of line totals in `currency`.
///
/// # Errors
///
/// - [`TotalPriceError::CurrencyMismatch`]: a total is in a different currency.
pub fn total_price<'a>(
    totals: impl IntoIterator<Item = Money<'a, Currency>>,
    currency: &'a Currency,
) -> Result<Money<'a, Currency>, TotalPriceError> {
    let amount = totals.into_iter().try_fold(Decimal::ZERO, |acc, total| {
        if total.currency() == currency {
            Ok(acc + *total.amount())
        } else {
            Err(TotalPriceError::CurrencyMismatch(
                total.currency().iso_alpha_code,
                currency.iso_alpha_code,
            ))
        }
    })?;

    Ok(Money::from_decimal(amount, currency))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, JPY, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn half_price_is_exact() {
        let half = half_price(Money::from_minor(999, GBP));

        assert_eq!(*half.amount(), Decimal::new(4995, 3));
    }

    #[test]
    fn halved_line_totals_charge_the_paid_units() {
        let unit = half_price(Money::from_minor(999, GBP));

        assert_eq!(line_total(unit, 6), Money::from_minor(2997, GBP));
        assert_eq!(line_total(unit, 2), Money::from_minor(999, GBP));
    }

    #[test]
    fn line_total_rounds_midpoint_away_from_zero() {
        let unit = half_price(Money::from_minor(333, USD));

        // 1.665 -> 1.67
        assert_eq!(line_total(unit, 1), Money::from_minor(167, USD));
    }

    #[test]
    fn format_decimal_uses_currency_precision() {
        assert_eq!(format_decimal(&Money::from_minor(1000, GBP)), "10.00");
        assert_eq!(format_decimal(&half_price(Money::from_minor(999, GBP))), "5.00");
        assert_eq!(format_decimal(&Money::from_minor(500, JPY)), "500");
    }

    #[test]
    fn is_positive_excludes_zero() {
        assert!(is_positive(&Money::from_minor(1, GBP)));
        assert!(!is_positive(&Money::from_minor(0, GBP)));
        assert!(!is_positive(&Money::from_minor(-1, GBP)));
    }

    #[test]
    fn total_price_sums_lines() -> TestResult {
        let total = total_price(
            [Money::from_minor(100, GBP), Money::from_minor(250, GBP)],
            GBP,
        )?;

        assert_eq!(total, Money::from_minor(350, GBP));

        Ok(())
    }

    #[test]
    fn total_price_of_nothing_is_zero() -> TestResult {
        assert_eq!(total_price([], GBP)?, Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn total_price_rejects_mixed_currencies() {
        let result = total_price(
            [Money::from_minor(100, GBP), Money::from_minor(100, USD)],
            GBP,
        );

        assert_eq!(result, Err(TotalPriceError::CurrencyMismatch("USD", "GBP")));
    }
}
