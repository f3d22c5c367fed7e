//! BOGO Rule Engine
//!
//! The engine reacts to four cart lifecycle events:
//!
//! - **add to cart**: double the added quantity and record the paid quantity
//!   and original unit price on the line.
//! - **quantity update**: treat the edited quantity as paid + free units,
//!   rounding odd totals up to the next even number.
//! - **before totals**: charge every offer line at half its original price.
//! - **display / order creation**: label offer lines and copy their state
//!   onto order lines.
//!
//! None of the handlers fail. Anything unexpected is logged and the cart is
//! left as it was.

use std::{cell::Cell, fmt};

use serde::Deserialize;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::{
    cart::{BogoMeta, CartLine, CartSession, LineKey},
    config::BogoConfig,
    display::{self, OrderMeta},
    eligibility,
    pricing::{half_price, is_positive},
    products::{Catalog, ProductId},
};

/// Where a totals recalculation was triggered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestContext {
    /// A shopper-facing page.
    #[default]
    Storefront,

    /// A background request from a shopper-facing page.
    Ajax,

    /// A plain admin page load; prices are never touched here.
    Admin,
}

/// Why a handler left the cart unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The line does not qualify under the current configuration.
    NotEligible,

    /// The quantity was zero or too large to double.
    InvalidQuantity,

    /// The line is no longer in the cart.
    LineMissing,

    /// The offer is already applied to this line.
    AlreadyApplied,

    /// Triggered by the engine's own quantity correction.
    Reentrant,

    /// The cart refused the quantity change.
    CartRejected,
}

/// Result of the add-to-cart handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The offer was applied and the quantity doubled.
    Applied {
        /// Units paid for
        paid_qty: u32,
        /// Units in the cart
        total_qty: u32,
    },

    /// Nothing changed.
    Skipped(SkipReason),
}

/// Result of the quantity update handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOutcome {
    /// An odd quantity was rounded up and written back to the cart.
    Corrected {
        /// Units paid for
        paid_qty: u32,
        /// Units in the cart
        total_qty: u32,
    },

    /// The quantity was already even; only the paid quantity was recorded.
    Recorded {
        /// Units paid for
        paid_qty: u32,
    },

    /// Nothing changed.
    Skipped(SkipReason),
}

/// Result of the before-totals handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalculationOutcome {
    /// Admin page load; no line was touched.
    SkippedAdminContext,

    /// Offer lines were repriced.
    Adjusted {
        /// Lines charged at half price
        repriced: usize,
        /// Offer lines left at full price because they no longer qualify
        ineligible: usize,
    },
}

/// Cart lifecycle hooks fired by the host platform.
pub trait CartHooks<'a> {
    /// A quantity of a product was added to the line `key`.
    fn after_add_to_cart(
        &self,
        cart: &mut dyn CartSession<'a>,
        key: LineKey,
        product: ProductId,
        variation: Option<ProductId>,
        quantity: u32,
    ) -> AddOutcome;

    /// The shopper changed the visible quantity of the line `key`.
    fn after_quantity_update(
        &self,
        cart: &mut dyn CartSession<'a>,
        key: LineKey,
        quantity: u32,
        old_quantity: u32,
    ) -> QuantityOutcome;

    /// Line and cart totals are about to be calculated.
    fn before_calculate_totals(
        &self,
        cart: &mut dyn CartSession<'a>,
        context: RequestContext,
    ) -> RecalculationOutcome;

    /// Display name for a cart line.
    fn line_name(&self, name: &str, line: &CartLine<'a>) -> String;

    /// Metadata to copy onto the order line created from a cart line.
    fn order_line_meta(&self, line: &CartLine<'a>) -> SmallVec<[OrderMeta; 3]>;
}

/// Suppresses the quantity handler while it is applying its own correction.
#[derive(Debug, Default)]
pub struct QuantityGuard {
    active: Cell<bool>,
}

impl QuantityGuard {
    /// Mark the guard active until the returned token is dropped.
    ///
    /// Returns `None` if the guard is already active.
    pub fn enter(&self) -> Option<QuantityGuardToken<'_>> {
        if self.active.replace(true) {
            None
        } else {
            Some(QuantityGuardToken { guard: self })
        }
    }

    /// Whether a correction is in progress.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// Keeps a [`QuantityGuard`] active while alive.
#[derive(Debug)]
pub struct QuantityGuardToken<'g> {
    guard: &'g QuantityGuard,
}

impl Drop for QuantityGuardToken<'_> {
    fn drop(&mut self) {
        self.guard.active.set(false);
    }
}

/// The BOGO rule engine for one request.
///
/// Build a new engine for every request from freshly loaded settings; the
/// quantity guard lives on the engine and must not outlive the request.
pub struct BogoEngine<'c, 'a> {
    config: BogoConfig,
    catalog: &'c dyn Catalog<'a>,
    guard: QuantityGuard,
}

impl fmt::Debug for BogoEngine<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BogoEngine")
            .field("config", &self.config)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl<'c, 'a> BogoEngine<'c, 'a> {
    /// Create an engine for the given configuration and catalog.
    pub fn new(config: BogoConfig, catalog: &'c dyn Catalog<'a>) -> Self {
        Self {
            config,
            catalog,
            guard: QuantityGuard::default(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &BogoConfig {
        &self.config
    }

    /// Whether the product/variation pair qualifies for the offer.
    pub fn is_eligible(&self, product: Option<ProductId>, variation: Option<ProductId>) -> bool {
        eligibility::is_eligible(&self.config, self.catalog, product, variation)
    }

    fn line_is_eligible(&self, line: &CartLine<'a>) -> bool {
        self.is_eligible(Some(line.product_id()), line.variation_id())
    }

    fn persist(cart: &mut dyn CartSession<'a>) {
        if let Err(err) = cart.persist() {
            warn!(error = %err, "failed to save cart");
        }
    }
}

impl<'a> CartHooks<'a> for BogoEngine<'_, 'a> {
    #[tracing::instrument(skip(self, cart))]
    fn after_add_to_cart(
        &self,
        cart: &mut dyn CartSession<'a>,
        key: LineKey,
        product: ProductId,
        variation: Option<ProductId>,
        quantity: u32,
    ) -> AddOutcome {
        if !self.is_eligible(Some(product), variation) {
            debug!("product not eligible");
            return AddOutcome::Skipped(SkipReason::NotEligible);
        }

        let paid_qty = quantity;
        let Some(total_qty) = paid_qty.checked_mul(2).filter(|&total| total > 0) else {
            debug!("invalid quantity");
            return AddOutcome::Skipped(SkipReason::InvalidQuantity);
        };

        let Some(line) = cart.line(key) else {
            debug!("line missing");
            return AddOutcome::Skipped(SkipReason::LineMissing);
        };

        if line.is_bogo() {
            debug!("offer already applied");
            return AddOutcome::Skipped(SkipReason::AlreadyApplied);
        }

        let original_price = line.unit_price();

        if let Err(err) = cart.set_quantity(key, total_qty) {
            warn!(error = %err, "cart rejected doubled quantity");
            return AddOutcome::Skipped(SkipReason::CartRejected);
        }

        let Some(line) = cart.line_mut(key) else {
            debug!("line removed while doubling quantity");
            return AddOutcome::Skipped(SkipReason::LineMissing);
        };

        line.set_bogo(BogoMeta {
            paid_qty,
            original_price,
        });

        Self::persist(cart);

        info!(paid_qty, total_qty, %original_price, "applied buy one get one free");

        AddOutcome::Applied {
            paid_qty,
            total_qty,
        }
    }

    #[tracing::instrument(skip(self, cart))]
    fn after_quantity_update(
        &self,
        cart: &mut dyn CartSession<'a>,
        key: LineKey,
        quantity: u32,
        old_quantity: u32,
    ) -> QuantityOutcome {
        if self.guard.is_active() {
            return QuantityOutcome::Skipped(SkipReason::Reentrant);
        }

        let Some(line) = cart.line(key) else {
            debug!("line missing");
            return QuantityOutcome::Skipped(SkipReason::LineMissing);
        };

        if !self.line_is_eligible(line) {
            debug!("line not eligible");
            return QuantityOutcome::Skipped(SkipReason::NotEligible);
        }

        let visible_qty = quantity;
        let paid_qty = visible_qty.div_ceil(2);
        let Some(total_qty) = paid_qty.checked_mul(2) else {
            debug!("invalid quantity");
            return QuantityOutcome::Skipped(SkipReason::InvalidQuantity);
        };

        let current_price = line.unit_price();

        let Some(line) = cart.line_mut(key) else {
            return QuantityOutcome::Skipped(SkipReason::LineMissing);
        };

        match line.bogo_mut() {
            Some(meta) => meta.paid_qty = paid_qty,
            None => line.set_bogo(BogoMeta {
                paid_qty,
                original_price: current_price,
            }),
        }

        if total_qty == visible_qty {
            Self::persist(cart);

            return QuantityOutcome::Recorded { paid_qty };
        }

        let result = {
            let _token = self.guard.enter();
            cart.set_quantity(key, total_qty)
        };

        if let Err(err) = result {
            warn!(error = %err, "cart rejected corrected quantity");
            return QuantityOutcome::Skipped(SkipReason::CartRejected);
        }

        info!(paid_qty, total_qty, "rounded odd quantity up");

        QuantityOutcome::Corrected {
            paid_qty,
            total_qty,
        }
    }

    #[tracing::instrument(skip(self, cart))]
    fn before_calculate_totals(
        &self,
        cart: &mut dyn CartSession<'a>,
        context: RequestContext,
    ) -> RecalculationOutcome {
        if context == RequestContext::Admin {
            debug!("admin request, prices untouched");
            return RecalculationOutcome::SkippedAdminContext;
        }

        let mut repriced = 0;
        let mut ineligible = 0;

        for key in cart.line_keys() {
            let Some(line) = cart.line_mut(key) else {
                continue;
            };

            let Some(meta) = line.bogo().copied() else {
                continue;
            };

            if !self.line_is_eligible(line) {
                ineligible += 1;
                continue;
            }

            let mut original_price = meta.original_price;

            if !is_positive(&original_price) {
                original_price = line.unit_price();

                if let Some(meta) = line.bogo_mut() {
                    meta.original_price = original_price;
                }
            }

            if is_positive(&original_price) {
                line.set_unit_price(half_price(original_price));
                repriced += 1;
            }
        }

        Self::persist(cart);

        debug!(repriced, ineligible, "repriced offer lines");

        RecalculationOutcome::Adjusted {
            repriced,
            ineligible,
        }
    }

    fn line_name(&self, name: &str, line: &CartLine<'a>) -> String {
        display::display_name(name, line)
    }

    fn order_line_meta(&self, line: &CartLine<'a>) -> SmallVec<[OrderMeta; 3]> {
        display::order_line_meta(line)
    }
}
