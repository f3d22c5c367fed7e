//! Eligibility
//!
//! Decides whether a product/variation pair qualifies for the offer under a
//! configuration. With a selected scope, a line qualifies when the product,
//! the variation, or the parent of either is in the selection.

use smallvec::SmallVec;

use crate::{
    config::{BogoConfig, Scope},
    products::{Catalog, ProductId},
};

/// Returns whether the product/variation pair is eligible for the offer.
///
/// Catalog lookups that fail contribute no parent candidate, so unknown
/// products can only match on their own IDs.
pub fn is_eligible<'a, C>(
    config: &BogoConfig,
    catalog: &C,
    product: Option<ProductId>,
    variation: Option<ProductId>,
) -> bool
where
    C: Catalog<'a> + ?Sized,
{
    if !config.enabled() {
        return false;
    }

    if config.scope() == Scope::All {
        return true;
    }

    if config.selected_ids().is_empty() {
        return false;
    }

    candidates(catalog, product, variation)
        .into_iter()
        .any(|id| config.is_selected(id))
}

/// Every ID under which a product/variation pair can be selected.
pub fn candidates<'a, C>(
    catalog: &C,
    product: Option<ProductId>,
    variation: Option<ProductId>,
) -> SmallVec<[ProductId; 4]>
where
    C: Catalog<'a> + ?Sized,
{
    let mut ids = SmallVec::<[ProductId; 4]>::new();

    let variation_parent = variation
        .and_then(|id| catalog.product(id))
        .and_then(|p| p.parent);

    let product_parent = product
        .and_then(|id| catalog.product(id))
        .filter(|p| p.is_variation())
        .and_then(|p| p.parent);

    for id in [product, variation, variation_parent, product_parent]
        .into_iter()
        .flatten()
    {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    ids
}
