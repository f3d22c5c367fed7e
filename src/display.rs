//! Display labels and order line metadata.

use smallvec::{SmallVec, smallvec};

use crate::{cart::CartLine, pricing::format_decimal};

/// Order metadata key for the paid quantity.
pub const PAID_QTY_META_KEY: &str = "_bogo_paid_qty";

/// Order metadata key for the human-readable note.
pub const NOTE_META_KEY: &str = "_bogo_note";

/// Order metadata key for the original unit price.
pub const ORIGINAL_PRICE_META_KEY: &str = "_bogo_original_price";

/// A metadata entry copied onto an order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMeta {
    /// Metadata key
    pub key: &'static str,

    /// Metadata value
    pub value: String,
}

/// Label shown under an offer line in the cart.
pub fn offer_label(paid_qty: u32) -> String {
    format!("Buy One Get One Free – you pay for {paid_qty} and get {paid_qty} free")
}

/// The line's display name, with the offer label appended when the offer applies.
pub fn display_name(name: &str, line: &CartLine<'_>) -> String {
    match line.bogo() {
        Some(meta) => format!("{name}\n{}", offer_label(meta.paid_qty)),
        None => name.to_string(),
    }
}

/// Metadata to copy onto the order line created from `line`; empty when the offer does not apply.
pub fn order_line_meta(line: &CartLine<'_>) -> SmallVec<[OrderMeta; 3]> {
    let Some(meta) = line.bogo() else {
        return SmallVec::new();
    };

    let paid = meta.paid_qty;

    smallvec![
        OrderMeta {
            key: PAID_QTY_META_KEY,
            value: paid.to_string(),
        },
        OrderMeta {
            key: NOTE_META_KEY,
            value: format!("BOGO: paid qty = {paid}, free qty = {}", meta.free_qty()),
        },
        OrderMeta {
            key: ORIGINAL_PRICE_META_KEY,
            value: format_decimal(&meta.original_price),
        },
    ]
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::GBP};

    use crate::{cart::BogoMeta, test_support::id};

    use super::*;

    fn offer_line() -> CartLine<'static> {
        let mut line = CartLine::new(id(42), None, "Coffee", 6, Money::from_minor(1000, GBP));
        line.set_bogo(BogoMeta {
            paid_qty: 3,
            original_price: Money::from_minor(1000, GBP),
        });

        line
    }

    #[test]
    fn plain_lines_keep_their_name() {
        let line = CartLine::new(id(1), None, "Tea", 1, Money::from_minor(300, GBP));

        assert_eq!(display_name("Tea", &line), "Tea");
        assert!(order_line_meta(&line).is_empty());
    }

    #[test]
    fn offer_lines_get_a_label() {
        let name = display_name("Coffee", &offer_line());

        assert!(name.starts_with("Coffee\n"));
        assert!(name.ends_with("you pay for 3 and get 3 free"));
    }

    #[test]
    fn order_meta_mirrors_offer_state() {
        let meta = order_line_meta(&offer_line());

        assert_eq!(
            meta.as_slice(),
            &[
                OrderMeta {
                    key: PAID_QTY_META_KEY,
                    value: "3".to_string(),
                },
                OrderMeta {
                    key: NOTE_META_KEY,
                    value: "BOGO: paid qty = 3, free qty = 3".to_string(),
                },
                OrderMeta {
                    key: ORIGINAL_PRICE_META_KEY,
                    value: "10.00".to_string(),
                },
            ]
        );
    }
}
