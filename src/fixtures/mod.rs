//! Fixtures
//!
//! A fixture set is three YAML files sharing a name: a catalog under
//! `products/`, saved settings under `settings/` and a scripted shopping
//! session under `carts/`.

use std::{fs, path::PathBuf};

use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::debug;

use crate::{
    cart::{Cart, CartSnapshot},
    engine::{BogoEngine, RequestContext},
    fixtures::carts::{CartFixture, RequestFixture},
    products::{MemoryCatalog, Product, ProductId},
    settings::{MemorySettings, SettingsError, SettingsStore},
    storefront::{CartTotals, Order, Storefront, StorefrontError},
};

pub mod carts;
pub mod products;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Settings fixture error
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between products
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Product IDs must be positive
    #[error("Invalid product ID: {0}")]
    InvalidProductId(u64),

    /// Variation without a parent product
    #[error("Variation {0} has no parent product")]
    MissingParent(String),

    /// No products loaded yet
    #[error("No products loaded yet; currency unknown")]
    NoCurrency,

    /// A request refers to a line that is not in the cart
    #[error("No cart line for product {product} (variation {variation:?})")]
    LineNotFound {
        /// Product ID
        product: ProductId,
        /// Variation ID
        variation: Option<ProductId>,
    },

    /// Storefront request error
    #[error("Storefront request failed: {0}")]
    Storefront(#[from] StorefrontError),
}

/// Result of replaying a fixture session and checking out.
#[derive(Debug)]
pub struct Simulation {
    /// Line names as the shopper saw them before checkout
    pub display_names: Vec<String>,

    /// Totals of the final recalculation
    pub totals: CartTotals<'static>,

    /// Last cart state saved to the session
    pub snapshot: Option<CartSnapshot>,

    /// The placed order
    pub order: Order<'static>,
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Catalog built from the products file
    catalog: MemoryCatalog<'static>,

    /// Settings as saved before the session starts
    settings: MemorySettings,

    /// Context requests run in
    context: RequestContext,

    /// Scripted requests
    requests: Vec<RequestFixture>,

    /// Currency for the fixture set
    currency: Option<&'static Currency>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            catalog: MemoryCatalog::new(),
            settings: MemorySettings::new(),
            context: RequestContext::default(),
            requests: Vec::new(),
            currency: None,
        }
    }

    /// Load products from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or if there are currency mismatches.
    pub fn load_products(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("products").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: products::ProductsFixture = serde_norway::from_str(&contents)?;

        for (raw_id, product_fixture) in fixture.products {
            let id = ProductId::new(raw_id).ok_or(FixtureError::InvalidProductId(raw_id))?;
            let product: Product<'static> = product_fixture.try_into()?;
            let currency = product.regular_price.currency();

            if let Some(existing_currency) = self.currency {
                if existing_currency != currency {
                    return Err(FixtureError::CurrencyMismatch(
                        existing_currency.iso_alpha_code.to_string(),
                        currency.iso_alpha_code.to_string(),
                    ));
                }
            } else {
                self.currency = Some(currency);
            }

            self.catalog.insert(id, product);
        }

        Ok(self)
    }

    /// Load saved settings from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_settings(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("settings").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        self.settings = MemorySettings::from_yaml(&contents)?;

        Ok(self)
    }

    /// Load a scripted session from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("carts").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: CartFixture = serde_norway::from_str(&contents)?;

        self.context = fixture.context;
        self.requests = fixture.requests;

        Ok(self)
    }

    /// Load a complete fixture set (products, settings, and cart with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        Self::from_set_in("./fixtures", name)
    }

    /// Load a complete fixture set from a custom base path
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set_in(base_path: impl Into<PathBuf>, name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::with_base_path(base_path);

        fixture
            .load_products(name)?
            .load_settings(name)?
            .load_cart(name)?;

        Ok(fixture)
    }

    /// The loaded catalog
    pub fn catalog(&self) -> &MemoryCatalog<'static> {
        &self.catalog
    }

    /// Settings as saved before the session starts
    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Get the currency of the loaded products
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoCurrency`] if no products have been loaded.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        self.currency.ok_or(FixtureError::NoCurrency)
    }

    /// Replay the scripted session and check out.
    ///
    /// Every request builds its own engine from the settings as they stand
    /// at that point, so settings changes take effect on the next request.
    ///
    /// # Errors
    ///
    /// Returns an error if no products are loaded or a request fails.
    pub fn run(&self) -> Result<Simulation, FixtureError> {
        let mut settings = self.settings.clone();
        let mut cart = Cart::new(self.currency()?);

        for request in &self.requests {
            if let RequestFixture::Settings(patch) = request {
                settings.apply(patch);

                debug!(status = ?settings.status(), "settings saved");

                continue;
            }

            let engine = BogoEngine::new(settings.load_config(), &self.catalog);
            let mut shop =
                Storefront::with_cart(cart, &self.catalog, &engine).with_context(self.context);

            let result = perform(&mut shop, request);

            cart = shop.into_cart();

            result?;
        }

        let engine = BogoEngine::new(settings.load_config(), &self.catalog);
        let mut shop =
            Storefront::with_cart(cart, &self.catalog, &engine).with_context(self.context);

        let totals = shop.calculate_totals()?;

        let display_names = shop
            .cart()
            .iter()
            .filter_map(|(key, _line)| shop.line_name(key))
            .collect();

        let snapshot = shop.cart().saved().cloned();
        let order = shop.checkout()?;

        Ok(Simulation {
            display_names,
            totals,
            snapshot,
            order,
        })
    }
}

fn perform(
    shop: &mut Storefront<'_, 'static>,
    request: &RequestFixture,
) -> Result<(), FixtureError> {
    match *request {
        RequestFixture::Add {
            product,
            variation,
            quantity,
        } => {
            shop.add_to_cart(product, variation, quantity)?;
        }
        RequestFixture::Update {
            product,
            variation,
            quantity,
        } => {
            let key = shop
                .cart()
                .find_line(product, variation)
                .ok_or(FixtureError::LineNotFound { product, variation })?;

            shop.update_quantity(key, quantity)?;
        }
        RequestFixture::Remove { product, variation } => {
            let key = shop
                .cart()
                .find_line(product, variation)
                .ok_or(FixtureError::LineNotFound { product, variation })?;

            shop.remove(key);
        }
        RequestFixture::Settings(_) => {}
    }

    Ok(())
}
