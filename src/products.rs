//! Products

use std::{fmt, num::NonZeroU64};

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};

/// Catalog identifier of a product or variation.
///
/// Identifiers are always positive; hosts that use `0` for "no variation"
/// map that to `None` through [`ProductId::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(NonZeroU64);

impl ProductId {
    /// Creates a product ID, returning `None` for `0`.
    pub const fn new(id: u64) -> Option<Self> {
        match NonZeroU64::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product type as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    /// A standalone product.
    #[default]
    Simple,

    /// A parent product whose purchasable units are variations.
    Variable,

    /// A purchasable variation of a variable product.
    Variation,
}

/// Product
#[derive(Debug, Clone)]
pub struct Product<'a> {
    /// Product name
    pub name: String,

    /// Product type
    pub kind: ProductKind,

    /// Parent product, set for variations
    pub parent: Option<ProductId>,

    /// Regular price
    pub regular_price: Money<'a, Currency>,

    /// Sale price, if the product is on sale
    pub sale_price: Option<Money<'a, Currency>>,
}

impl<'a> Product<'a> {
    /// Creates a simple product with the given price.
    pub fn simple(name: impl Into<String>, price: Money<'a, Currency>) -> Self {
        Self {
            name: name.into(),
            kind: ProductKind::Simple,
            parent: None,
            regular_price: price,
            sale_price: None,
        }
    }

    /// Creates a variation of `parent` with the given price.
    pub fn variation(
        name: impl Into<String>,
        parent: ProductId,
        price: Money<'a, Currency>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ProductKind::Variation,
            parent: Some(parent),
            regular_price: price,
            sale_price: None,
        }
    }

    /// Sets the sale price.
    #[must_use]
    pub fn on_sale(mut self, sale_price: Money<'a, Currency>) -> Self {
        self.sale_price = Some(sale_price);
        self
    }

    /// The price the shopper is charged: the sale price when set, otherwise the regular price.
    pub fn effective_price(&self) -> Money<'a, Currency> {
        self.sale_price.unwrap_or(self.regular_price)
    }

    /// Whether this product is a variation of another product.
    pub fn is_variation(&self) -> bool {
        self.kind == ProductKind::Variation
    }
}

/// Read-only product lookup owned by the host platform.
pub trait Catalog<'a> {
    /// Look up a product or variation by ID.
    fn product(&self, id: ProductId) -> Option<&Product<'a>>;
}

/// In-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog<'a> {
    products: FxHashMap<ProductId, Product<'a>>,
}

impl<'a> MemoryCatalog<'a> {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product.
    pub fn insert(&mut self, id: ProductId, product: Product<'a>) -> Option<Product<'a>> {
        self.products.insert(id, product)
    }

    /// Number of products in the catalog.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl<'a> Catalog<'a> for MemoryCatalog<'a> {
    fn product(&self, id: ProductId) -> Option<&Product<'a>> {
        self.products.get(&id)
    }
}
