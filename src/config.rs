//! BOGO Configuration

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::products::ProductId;

/// Which products the offer applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Every product in the store.
    #[default]
    All,

    /// Only the selected products and variations.
    Selected,
}

impl Scope {
    /// Coerce a raw stored value; anything other than `"selected"` means [`Scope::All`].
    pub fn sanitize(raw: &str) -> Self {
        if raw == "selected" {
            Scope::Selected
        } else {
            Scope::All
        }
    }

    /// Stored representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::Selected => "selected",
        }
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Scope::All => "All products",
            Scope::Selected => "Selected products only",
        }
    }
}

/// Configuration snapshot threaded into the rule engine for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BogoConfig {
    enabled: bool,
    scope: Scope,
    selected: FxHashSet<ProductId>,
}

impl BogoConfig {
    /// Create a configuration.
    pub fn new(enabled: bool, scope: Scope, selected: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            enabled,
            scope,
            selected: selected.into_iter().collect(),
        }
    }

    /// The offer is switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Enabled for every product.
    #[must_use]
    pub fn all_products() -> Self {
        Self::new(true, Scope::All, [])
    }

    /// Enabled for the given products and variations only.
    pub fn selected(ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self::new(true, Scope::Selected, ids)
    }

    /// Whether the offer is switched on.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Offer scope.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Selected product and variation IDs.
    pub fn selected_ids(&self) -> &FxHashSet<ProductId> {
        &self.selected
    }

    /// Whether `id` is in the selection.
    pub fn is_selected(&self, id: ProductId) -> bool {
        self.selected.contains(&id)
    }

    /// Returns a copy with the enabled flag changed.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
