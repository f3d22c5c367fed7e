//! Storefront
//!
//! A minimal host platform: it owns a shopper's cart, creates lines from the
//! catalog and fires the [`CartHooks`] at the points a real shop would.

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    cart::{Cart, CartError, CartLine, CartSession, LineKey},
    display::OrderMeta,
    engine::{CartHooks, RequestContext},
    products::{Catalog, ProductId},
};

/// Errors raised by storefront actions.
#[derive(Debug, Error, PartialEq)]
pub enum StorefrontError {
    /// The product is not in the catalog.
    #[error("Product {0} not found")]
    UnknownProduct(ProductId),

    /// Zero units were requested.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// Wrapped cart error.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// A cart whose quantity changes fire the quantity update hook, as host
/// platforms do for every quantity change including the engine's own.
pub struct HookedCart<'s, 'a> {
    cart: &'s mut Cart<'a>,
    hooks: &'s dyn CartHooks<'a>,
}

impl std::fmt::Debug for HookedCart<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookedCart")
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl<'s, 'a> HookedCart<'s, 'a> {
    /// Wrap `cart` so quantity changes are reported to `hooks`.
    pub fn new(cart: &'s mut Cart<'a>, hooks: &'s dyn CartHooks<'a>) -> Self {
        Self { cart, hooks }
    }
}

impl<'a> CartSession<'a> for HookedCart<'_, 'a> {
    fn line(&self, key: LineKey) -> Option<&CartLine<'a>> {
        self.cart.line(key)
    }

    fn line_mut(&mut self, key: LineKey) -> Option<&mut CartLine<'a>> {
        self.cart.line_mut(key)
    }

    fn line_keys(&self) -> Vec<LineKey> {
        self.cart.line_keys()
    }

    fn set_quantity(&mut self, key: LineKey, quantity: u32) -> Result<(), CartError> {
        let old_quantity = self
            .cart
            .line(key)
            .map(CartLine::quantity)
            .ok_or(CartError::LineNotFound(key))?;

        self.cart.set_quantity(key, quantity)?;

        // Removing a line is not a quantity update.
        if quantity > 0 {
            let hooks = self.hooks;
            hooks.after_quantity_update(self, key, quantity, old_quantity);
        }

        Ok(())
    }

    fn persist(&mut self) -> Result<(), CartError> {
        self.cart.persist()
    }
}

/// Totals of a recalculated cart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartTotals<'a> {
    /// Units in the cart, free ones included
    pub item_count: u32,

    /// Amount charged
    pub subtotal: Money<'a, Currency>,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine<'a> {
    /// Product ID
    pub product_id: ProductId,

    /// Variation ID
    pub variation_id: Option<ProductId>,

    /// Product name as shown on the order
    pub name: String,

    /// Units on the order
    pub quantity: u32,

    /// Unit price before any offer
    pub base_price: Money<'a, Currency>,

    /// Charged unit price
    pub unit_price: Money<'a, Currency>,

    /// Charged line total
    pub total: Money<'a, Currency>,

    /// Metadata copied from the cart line
    pub meta: SmallVec<[OrderMeta; 3]>,
}

impl OrderLine<'_> {
    /// Look up a metadata value by key.
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|meta| meta.key == key)
            .map(|meta| meta.value.as_str())
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order<'a> {
    /// Order lines in cart order
    pub lines: Vec<OrderLine<'a>>,

    /// Amount charged
    pub total: Money<'a, Currency>,
}

/// One shopper's storefront session.
pub struct Storefront<'s, 'a> {
    cart: Cart<'a>,
    catalog: &'s dyn Catalog<'a>,
    hooks: &'s dyn CartHooks<'a>,
    context: RequestContext,
}

impl std::fmt::Debug for Storefront<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("cart", &self.cart)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl<'s, 'a> Storefront<'s, 'a> {
    /// Create a storefront with an empty cart.
    pub fn new(
        currency: &'a Currency,
        catalog: &'s dyn Catalog<'a>,
        hooks: &'s dyn CartHooks<'a>,
    ) -> Self {
        Self::with_cart(Cart::new(currency), catalog, hooks)
    }

    /// Resume a session with a cart saved by an earlier request.
    pub fn with_cart(
        cart: Cart<'a>,
        catalog: &'s dyn Catalog<'a>,
        hooks: &'s dyn CartHooks<'a>,
    ) -> Self {
        Self {
            cart,
            catalog,
            hooks,
            context: RequestContext::Storefront,
        }
    }

    /// End the request, handing back the cart.
    pub fn into_cart(self) -> Cart<'a> {
        self.cart
    }

    /// Set the request context used for totals.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// The shopper's cart.
    pub fn cart(&self) -> &Cart<'a> {
        &self.cart
    }

    /// Add `quantity` units of a product (or one of its variations) to the cart.
    ///
    /// Adding a product already in the cart increases that line's quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`StorefrontError`] if the quantity is zero, the product is
    /// unknown, or the cart rejects the line.
    pub fn add_to_cart(
        &mut self,
        product: ProductId,
        variation: Option<ProductId>,
        quantity: u32,
    ) -> Result<LineKey, StorefrontError> {
        if quantity == 0 {
            return Err(StorefrontError::InvalidQuantity);
        }

        let purchasable = variation.unwrap_or(product);
        let item = self
            .catalog
            .product(purchasable)
            .ok_or(StorefrontError::UnknownProduct(purchasable))?;

        let hooks = self.hooks;
        let existing = self.cart.find_line(product, variation);
        let mut session = HookedCart::new(&mut self.cart, hooks);

        let key = match existing {
            Some(key) => {
                let current = session.line(key).map_or(0, CartLine::quantity);
                let merged = current
                    .checked_add(quantity)
                    .ok_or(StorefrontError::InvalidQuantity)?;

                session.set_quantity(key, merged)?;

                key
            }
            None => session.cart.add_line(CartLine::new(
                product,
                variation,
                item.name.clone(),
                quantity,
                item.effective_price(),
            ))?,
        };

        debug!(?key, %product, quantity, "added to cart");

        hooks.after_add_to_cart(&mut session, key, product, variation, quantity);

        Ok(key)
    }

    /// Set the visible quantity of a line; `0` removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the line is not in the cart.
    pub fn update_quantity(&mut self, key: LineKey, quantity: u32) -> Result<(), StorefrontError> {
        let hooks = self.hooks;
        let mut session = HookedCart::new(&mut self.cart, hooks);

        session.set_quantity(key, quantity)?;

        Ok(())
    }

    /// Remove a line from the cart.
    pub fn remove(&mut self, key: LineKey) -> Option<CartLine<'a>> {
        self.cart.remove(key)
    }

    /// Recalculate unit prices and totals.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the subtotal cannot be calculated.
    pub fn calculate_totals(&mut self) -> Result<CartTotals<'a>, StorefrontError> {
        for line in self.cart.lines_mut() {
            line.restore_unit_price();
        }

        self.hooks
            .before_calculate_totals(&mut self.cart, self.context);

        Ok(CartTotals {
            item_count: self.cart.item_count(),
            subtotal: self.cart.subtotal()?,
        })
    }

    /// Display name of a line, including any offer label.
    pub fn line_name(&self, key: LineKey) -> Option<String> {
        self.cart
            .line(key)
            .map(|line| self.hooks.line_name(line.name(), line))
    }

    /// Place an order from the cart, emptying it.
    ///
    /// # Errors
    ///
    /// Returns a [`StorefrontError`] if totals cannot be calculated.
    pub fn checkout(&mut self) -> Result<Order<'a>, StorefrontError> {
        let totals = self.calculate_totals()?;

        let lines = self
            .cart
            .iter()
            .map(|(_, line)| OrderLine {
                product_id: line.product_id(),
                variation_id: line.variation_id(),
                name: line.name().to_string(),
                quantity: line.quantity(),
                base_price: line.base_price(),
                unit_price: line.unit_price(),
                total: line.total(),
                meta: self.hooks.order_line_meta(line),
            })
            .collect();

        self.cart.clear();

        Ok(Order {
            lines,
            total: totals.subtotal,
        })
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{
        config::BogoConfig,
        display::PAID_QTY_META_KEY,
        engine::BogoEngine,
        products::{MemoryCatalog, Product},
        test_support::id,
    };

    use super::*;

    fn catalog() -> MemoryCatalog<'static> {
        let mut catalog = MemoryCatalog::new();
        catalog.insert(
            id(42),
            Product::simple("Coffee", Money::from_minor(1200, GBP))
                .on_sale(Money::from_minor(1000, GBP)),
        );
        catalog.insert(id(7), Product::simple("Tea", Money::from_minor(300, GBP)));
        catalog
    }

    #[test]
    fn add_doubles_through_the_quantity_hook() -> TestResult {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::all_products(), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine);

        let key = shop.add_to_cart(id(42), None, 3)?;

        let line = shop.cart().line(key).ok_or("missing line")?;
        assert_eq!(line.quantity(), 6);
        assert_eq!(line.bogo().map(|m| m.paid_qty), Some(3));
        assert_eq!(
            line.bogo().map(|m| m.original_price),
            Some(Money::from_minor(1000, GBP))
        );

        Ok(())
    }

    #[test]
    fn adding_again_merges_and_rounds() -> TestResult {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::all_products(), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine);

        let key = shop.add_to_cart(id(42), None, 3)?;
        let again = shop.add_to_cart(id(42), None, 1)?;

        assert_eq!(key, again);
        assert_eq!(shop.cart().len(), 1);

        let line = shop.cart().line(key).ok_or("missing line")?;
        assert_eq!(line.quantity(), 8);
        assert_eq!(line.bogo().map(|m| m.paid_qty), Some(4));

        Ok(())
    }

    #[test]
    fn update_quantity_corrects_odd_totals() -> TestResult {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::all_products(), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine);

        let key = shop.add_to_cart(id(42), None, 1)?;
        shop.update_quantity(key, 5)?;

        let line = shop.cart().line(key).ok_or("missing line")?;
        assert_eq!(line.quantity(), 6);
        assert_eq!(line.bogo().map(|m| m.paid_qty), Some(3));

        Ok(())
    }

    #[test]
    fn update_quantity_to_zero_removes_line() -> TestResult {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::all_products(), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine);

        let key = shop.add_to_cart(id(42), None, 1)?;
        shop.update_quantity(key, 0)?;

        assert!(shop.cart().is_empty());
        assert_eq!(
            shop.update_quantity(key, 2),
            Err(StorefrontError::Cart(CartError::LineNotFound(key)))
        );

        Ok(())
    }

    #[test]
    fn add_rejects_unknown_products_and_zero_quantities() {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::all_products(), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine);

        assert_eq!(
            shop.add_to_cart(id(99), None, 1),
            Err(StorefrontError::UnknownProduct(id(99)))
        );
        assert_eq!(
            shop.add_to_cart(id(42), None, 0),
            Err(StorefrontError::InvalidQuantity)
        );
    }

    #[test]
    fn totals_charge_only_paid_units() -> TestResult {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::selected([id(42)]), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine);

        shop.add_to_cart(id(42), None, 2)?;
        shop.add_to_cart(id(7), None, 1)?;

        let totals = shop.calculate_totals()?;

        assert_eq!(totals.item_count, 5);
        assert_eq!(totals.subtotal, Money::from_minor(2300, GBP));

        // A second pass must not halve again.
        assert_eq!(shop.calculate_totals()?, totals);

        Ok(())
    }

    #[test]
    fn admin_context_charges_full_price() -> TestResult {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::all_products(), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine).with_context(RequestContext::Admin);

        shop.add_to_cart(id(7), None, 1)?;

        assert_eq!(shop.calculate_totals()?.subtotal, Money::from_minor(600, GBP));

        Ok(())
    }

    #[test]
    fn line_name_includes_offer_label() -> TestResult {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::selected([id(42)]), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine);

        let coffee = shop.add_to_cart(id(42), None, 2)?;
        let tea = shop.add_to_cart(id(7), None, 1)?;

        assert!(
            shop.line_name(coffee)
                .is_some_and(|name| name.contains("you pay for 2 and get 2 free"))
        );
        assert_eq!(shop.line_name(tea).as_deref(), Some("Tea"));

        Ok(())
    }

    #[test]
    fn checkout_copies_meta_and_empties_cart() -> TestResult {
        let catalog = catalog();
        let engine = BogoEngine::new(BogoConfig::all_products(), &catalog);
        let mut shop = Storefront::new(GBP, &catalog, &engine);

        shop.add_to_cart(id(42), None, 3)?;

        let order = shop.checkout()?;
        let line = order.lines.first().ok_or("missing order line")?;

        assert_eq!(line.quantity, 6);
        assert_eq!(line.meta_value(PAID_QTY_META_KEY), Some("3"));
        assert_eq!(line.unit_price, Money::from_minor(500, GBP));
        assert_eq!(order.total, Money::from_minor(3000, GBP));
        assert!(shop.cart().is_empty());

        Ok(())
    }
}
