//! Session snapshot of a cart.

use serde::{Deserialize, Serialize};

use crate::{
    cart::{Cart, CartLine},
    pricing::format_decimal,
};

/// Serialisable cart state as saved to the shopper's session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Currency code
    pub currency: String,

    /// Lines in cart order
    pub lines: Vec<LineSnapshot>,
}

/// Saved state of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    /// Product ID
    pub product_id: u64,

    /// Variation ID, `0` when the line is not a variation
    pub variation_id: u64,

    /// Visible quantity
    pub quantity: u32,

    /// Whether the offer has been applied
    pub bogo_applied: bool,

    /// Units paid for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bogo_paid_qty: Option<u32>,

    /// Original unit price at currency precision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bogo_original_price: Option<String>,
}

impl From<&CartLine<'_>> for LineSnapshot {
    fn from(line: &CartLine<'_>) -> Self {
        let meta = line.bogo();

        Self {
            product_id: line.product_id().get(),
            variation_id: line.variation_id().map_or(0, |id| id.get()),
            quantity: line.quantity(),
            bogo_applied: meta.is_some(),
            bogo_paid_qty: meta.map(|m| m.paid_qty),
            bogo_original_price: meta.map(|m| format_decimal(&m.original_price)),
        }
    }
}

impl From<&Cart<'_>> for CartSnapshot {
    fn from(cart: &Cart<'_>) -> Self {
        Self {
            currency: cart.currency().iso_alpha_code.to_string(),
            lines: cart.iter().map(|(_, line)| line.into()).collect(),
        }
    }
}
