//! Product Fixtures

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, JPY, USD},
};
use serde::Deserialize;

use crate::{
    fixtures::FixtureError,
    products::{Product, ProductId, ProductKind},
};

/// Wrapper for products in YAML
#[derive(Debug, Deserialize)]
pub struct ProductsFixture {
    /// Map of product ID -> product fixture, in ID order
    pub products: BTreeMap<u64, ProductFixture>,
}

/// Product Fixture
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    /// Product name
    pub name: String,

    /// Product type
    #[serde(default)]
    pub kind: ProductKind,

    /// Parent product ID, for variations
    #[serde(default)]
    pub parent: Option<u64>,

    /// Regular price (e.g., "12.00 GBP")
    pub price: String,

    /// Sale price (e.g., "10.00 GBP")
    #[serde(default)]
    pub sale_price: Option<String>,
}

impl TryFrom<ProductFixture> for Product<'static> {
    type Error = FixtureError;

    fn try_from(fixture: ProductFixture) -> Result<Self, Self::Error> {
        let regular_price = parse_price(&fixture.price)?;

        let sale_price = fixture
            .sale_price
            .as_deref()
            .map(parse_price)
            .transpose()?;

        if let Some(sale) = sale_price
            && sale.currency() != regular_price.currency()
        {
            return Err(FixtureError::CurrencyMismatch(
                regular_price.currency().iso_alpha_code.to_string(),
                sale.currency().iso_alpha_code.to_string(),
            ));
        }

        let parent = match fixture.parent {
            Some(raw) => Some(ProductId::new(raw).ok_or(FixtureError::InvalidProductId(raw))?),
            None => None,
        };

        if fixture.kind == ProductKind::Variation && parent.is_none() {
            return Err(FixtureError::MissingParent(fixture.name));
        }

        Ok(Product {
            name: fixture.name,
            kind: fixture.kind,
            parent,
            regular_price,
            sale_price,
        })
    }
}

/// Parse price string (e.g., "2.99 GBP") into money
///
/// The amount is kept at the currency's precision.
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<Money<'static, Currency>, FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    }

    let amount = parts
        .first()
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let currency_code = parts
        .get(1)
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency = parse_currency(currency_code)?;

    Ok(Money::from_decimal(
        amount.round_dp(currency.exponent),
        currency,
    ))
}

/// Resolve a currency code supported by fixtures
///
/// # Errors
///
/// Returns [`FixtureError::UnknownCurrency`] for any other code.
pub fn parse_currency(code: &str) -> Result<&'static Currency, FixtureError> {
    match code {
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        "JPY" => Ok(JPY),
        other => Err(FixtureError::UnknownCurrency(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_price_rejects_invalid_format() {
        let result = parse_price("2.99GBP");

        assert!(matches!(result, Err(FixtureError::InvalidPrice(_))));
    }

    #[test]
    fn parse_price_rejects_unknown_currency() {
        let result = parse_price("2.99 ABC");

        assert!(matches!(result, Err(FixtureError::UnknownCurrency(code)) if code == "ABC"));
    }

    #[test]
    fn parse_price_accepts_usd_and_jpy() -> Result<(), FixtureError> {
        let usd = parse_price("1.00 USD")?;
        let jpy = parse_price("500 JPY")?;

        assert_eq!(usd, Money::from_minor(100, USD));
        assert_eq!(jpy, Money::from_minor(500, JPY));

        Ok(())
    }

    #[test]
    fn parse_price_rounds_to_currency_precision() -> Result<(), FixtureError> {
        let price = parse_price("9.999 GBP")?;

        assert_eq!(price, Money::from_minor(1000, GBP));

        Ok(())
    }

    #[test]
    fn variations_need_a_parent() {
        let fixture = ProductFixture {
            name: "Large".to_string(),
            kind: ProductKind::Variation,
            parent: None,
            price: "5.00 GBP".to_string(),
            sale_price: None,
        };

        let result = Product::try_from(fixture);

        assert!(matches!(result, Err(FixtureError::MissingParent(name)) if name == "Large"));
    }

    #[test]
    fn sale_price_must_share_the_currency() {
        let fixture = ProductFixture {
            name: "Coffee".to_string(),
            kind: ProductKind::Simple,
            parent: None,
            price: "12.00 GBP".to_string(),
            sale_price: Some("10.00 USD".to_string()),
        };

        let result = Product::try_from(fixture);

        assert!(matches!(result, Err(FixtureError::CurrencyMismatch(_, _))));
    }
}
