//! Cart
//!
//! The cart is owned by the host platform. The rule engine only ever sees it
//! through [`CartSession`]; [`Cart`] is the in-memory implementation.

use rusty_money::{Money, iso::Currency};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use crate::{
    pricing::{TotalPriceError, line_total, total_price},
    products::ProductId,
};

pub mod snapshot;

pub use snapshot::{CartSnapshot, LineSnapshot};

new_key_type! {
    /// Cart line key
    pub struct LineKey;
}

/// Errors related to cart lines.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// A line's currency differs from the cart currency (line currency, cart currency).
    #[error("Line has currency {0}, but cart has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// The line is not in the cart.
    #[error("Line {0:?} not found")]
    LineNotFound(LineKey),

    /// Totals could not be calculated.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),
}

/// Offer state carried by a cart line for as long as the line exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BogoMeta<'a> {
    /// Units the shopper pays for; the line holds twice as many.
    pub paid_qty: u32,

    /// Effective unit price captured when the offer was first applied.
    pub original_price: Money<'a, Currency>,
}

impl BogoMeta<'_> {
    /// Units given away for free.
    pub fn free_qty(&self) -> u32 {
        self.paid_qty
    }
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine<'a> {
    product_id: ProductId,
    variation_id: Option<ProductId>,
    name: String,
    quantity: u32,
    base_price: Money<'a, Currency>,
    unit_price: Money<'a, Currency>,
    bogo: Option<BogoMeta<'a>>,
}

impl<'a> CartLine<'a> {
    /// Creates a line charged at `price` per unit.
    pub fn new(
        product_id: ProductId,
        variation_id: Option<ProductId>,
        name: impl Into<String>,
        quantity: u32,
        price: Money<'a, Currency>,
    ) -> Self {
        Self {
            product_id,
            variation_id,
            name: name.into(),
            quantity,
            base_price: price,
            unit_price: price,
            bogo: None,
        }
    }

    /// Product ID
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Variation ID
    pub fn variation_id(&self) -> Option<ProductId> {
        self.variation_id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Visible quantity, paid and free units together.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Catalog price captured when the line was created.
    pub fn base_price(&self) -> Money<'a, Currency> {
        self.base_price
    }

    /// Current effective unit price.
    pub fn unit_price(&self) -> Money<'a, Currency> {
        self.unit_price
    }

    /// Override the unit price for the current totals pass.
    pub fn set_unit_price(&mut self, price: Money<'a, Currency>) {
        self.unit_price = price;
    }

    /// Reset the unit price to the catalog price.
    pub fn restore_unit_price(&mut self) {
        self.unit_price = self.base_price;
    }

    /// Offer state, if the offer has been applied.
    pub fn bogo(&self) -> Option<&BogoMeta<'a>> {
        self.bogo.as_ref()
    }

    /// Mutable offer state.
    pub fn bogo_mut(&mut self) -> Option<&mut BogoMeta<'a>> {
        self.bogo.as_mut()
    }

    /// Record the offer on this line.
    pub fn set_bogo(&mut self, meta: BogoMeta<'a>) {
        self.bogo = Some(meta);
    }

    /// Whether the offer has been applied.
    pub fn is_bogo(&self) -> bool {
        self.bogo.is_some()
    }

    /// Line total at the current unit price.
    pub fn total(&self) -> Money<'a, Currency> {
        line_total(self.unit_price, self.quantity)
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

/// Host-owned cart as seen by the rule engine.
pub trait CartSession<'a> {
    /// Look up a line.
    fn line(&self, key: LineKey) -> Option<&CartLine<'a>>;

    /// Look up a line mutably.
    fn line_mut(&mut self, key: LineKey) -> Option<&mut CartLine<'a>>;

    /// Keys of every line, in cart order.
    fn line_keys(&self) -> Vec<LineKey>;

    /// Change a line's quantity; `0` removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the line is not in the cart.
    fn set_quantity(&mut self, key: LineKey, quantity: u32) -> Result<(), CartError>;

    /// Save the cart to the shopper's session.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the cart cannot be saved.
    fn persist(&mut self) -> Result<(), CartError>;
}

/// In-memory cart.
#[derive(Debug)]
pub struct Cart<'a> {
    lines: SlotMap<LineKey, CartLine<'a>>,
    order: Vec<LineKey>,
    currency: &'a Currency,
    saved: Option<CartSnapshot>,
    save_count: usize,
}

impl<'a> Cart<'a> {
    /// Create an empty cart.
    #[must_use]
    pub fn new(currency: &'a Currency) -> Self {
        Self {
            lines: SlotMap::with_key(),
            order: Vec::new(),
            currency,
            saved: None,
            save_count: 0,
        }
    }

    /// Add a line to the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CurrencyMismatch`] if the line is priced in another currency.
    pub fn add_line(&mut self, line: CartLine<'a>) -> Result<LineKey, CartError> {
        let line_currency = line.unit_price().currency();

        if line_currency != self.currency {
            return Err(CartError::CurrencyMismatch(
                line_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        let key = self.lines.insert(line);
        self.order.push(key);

        Ok(key)
    }

    /// Find the line holding a product/variation pair.
    pub fn find_line(&self, product: ProductId, variation: Option<ProductId>) -> Option<LineKey> {
        self.iter()
            .find(|(_, line)| line.product_id() == product && line.variation_id() == variation)
            .map(|(key, _)| key)
    }

    /// Remove a line, dropping any offer state with it.
    pub fn remove(&mut self, key: LineKey) -> Option<CartLine<'a>> {
        let line = self.lines.remove(key)?;
        self.order.retain(|k| *k != key);

        Some(line)
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.order.clear();
    }

    /// Iterate over lines in cart order.
    pub fn iter(&self) -> impl Iterator<Item = (LineKey, &CartLine<'a>)> {
        self.order
            .iter()
            .filter_map(|&key| self.lines.get(key).map(|line| (key, line)))
    }

    /// Iterate mutably over lines.
    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut CartLine<'a>> {
        self.lines.values_mut()
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.lines.values().map(CartLine::quantity).sum()
    }

    /// Cart currency
    pub fn currency(&self) -> &'a Currency {
        self.currency
    }

    /// Sum of line totals at the current unit prices.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::TotalPrice`] if a line is in a different currency.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, CartError> {
        Ok(total_price(
            self.iter().map(|(_, line)| line.total()),
            self.currency,
        )?)
    }

    /// The last state saved to the session.
    pub fn saved(&self) -> Option<&CartSnapshot> {
        self.saved.as_ref()
    }

    /// Number of times the cart has been saved.
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl<'a> CartSession<'a> for Cart<'a> {
    fn line(&self, key: LineKey) -> Option<&CartLine<'a>> {
        self.lines.get(key)
    }

    fn line_mut(&mut self, key: LineKey) -> Option<&mut CartLine<'a>> {
        self.lines.get_mut(key)
    }

    fn line_keys(&self) -> Vec<LineKey> {
        self.order.clone()
    }

    fn set_quantity(&mut self, key: LineKey, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self
                .remove(key)
                .map(|_| ())
                .ok_or(CartError::LineNotFound(key));
        }

        let line = self.lines.get_mut(key).ok_or(CartError::LineNotFound(key))?;
        line.set_quantity(quantity);

        Ok(())
    }

    fn persist(&mut self) -> Result<(), CartError> {
        self.saved = Some(CartSnapshot::from(&*self));
        self.save_count += 1;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, USD};
    use testresult::TestResult;

    use crate::{pricing::half_price, test_support::id};

    use super::*;

    fn line(product: u64, quantity: u32, minor: i64) -> CartLine<'static> {
        CartLine::new(
            id(product),
            None,
            format!("Product {product}"),
            quantity,
            Money::from_minor(minor, GBP),
        )
    }

    #[test]
    fn add_line_rejects_other_currencies() {
        let mut cart = Cart::new(GBP);
        let line = CartLine::new(id(1), None, "Dollar thing", 1, Money::from_minor(100, USD));

        assert_eq!(
            cart.add_line(line),
            Err(CartError::CurrencyMismatch("USD", "GBP"))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn lines_keep_insertion_order() -> TestResult {
        let mut cart = Cart::new(GBP);
        let first = cart.add_line(line(3, 1, 100))?;
        let second = cart.add_line(line(1, 1, 100))?;

        assert_eq!(cart.line_keys(), vec![first, second]);

        Ok(())
    }

    #[test]
    fn find_line_matches_product_and_variation() -> TestResult {
        let mut cart = Cart::new(GBP);
        let key = cart.add_line(line(42, 1, 100))?;

        assert_eq!(cart.find_line(id(42), None), Some(key));
        assert_eq!(cart.find_line(id(42), Some(id(1))), None);

        Ok(())
    }

    #[test]
    fn set_quantity_zero_removes_line() -> TestResult {
        let mut cart = Cart::new(GBP);
        let key = cart.add_line(line(42, 2, 100))?;

        cart.set_quantity(key, 0)?;

        assert!(cart.line(key).is_none());
        assert!(cart.line_keys().is_empty());
        assert_eq!(cart.set_quantity(key, 1), Err(CartError::LineNotFound(key)));

        Ok(())
    }

    #[test]
    fn subtotal_uses_current_unit_prices() -> TestResult {
        let mut cart = Cart::new(GBP);
        let key = cart.add_line(line(42, 6, 999))?;
        cart.add_line(line(7, 1, 250))?;

        assert_eq!(cart.subtotal()?, Money::from_minor(6244, GBP));

        if let Some(line) = cart.line_mut(key) {
            line.set_unit_price(half_price(line.base_price()));
        }

        assert_eq!(cart.subtotal()?, Money::from_minor(3247, GBP));
        assert_eq!(cart.item_count(), 7);

        Ok(())
    }

    #[test]
    fn restore_unit_price_resets_to_base() {
        let mut line = line(42, 1, 1000);
        line.set_unit_price(Money::from_minor(1, GBP));
        line.restore_unit_price();

        assert_eq!(line.unit_price(), Money::from_minor(1000, GBP));
    }

    #[test]
    fn persist_saves_a_snapshot() -> TestResult {
        let mut cart = Cart::new(GBP);
        cart.add_line(line(42, 2, 100))?;

        cart.persist()?;

        assert_eq!(cart.save_count(), 1);
        assert_eq!(cart.saved().map(|s| s.lines.len()), Some(1));

        Ok(())
    }
}
