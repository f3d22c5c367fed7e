//! Helpers shared by unit tests.

use crate::products::ProductId;

/// Product ID from a literal; panics on zero.
pub(crate) fn id(raw: u64) -> ProductId {
    ProductId::new(raw).expect("product IDs in tests are non-zero")
}
