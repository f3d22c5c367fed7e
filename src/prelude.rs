//! BOGO prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{BogoMeta, Cart, CartError, CartLine, CartSession, CartSnapshot, LineKey},
    config::{BogoConfig, Scope},
    display::{OrderMeta, display_name, offer_label, order_line_meta},
    eligibility::is_eligible,
    engine::{
        AddOutcome, BogoEngine, CartHooks, QuantityOutcome, RecalculationOutcome, RequestContext,
        SkipReason,
    },
    products::{Catalog, MemoryCatalog, Product, ProductId, ProductKind},
    settings::{MemorySettings, SettingsStore, StatusSummary},
    storefront::{CartTotals, Order, OrderLine, Storefront, StorefrontError},
};
