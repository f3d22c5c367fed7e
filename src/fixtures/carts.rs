//! Cart Fixtures

use serde::Deserialize;

use crate::{engine::RequestContext, products::ProductId, settings::SettingsPatch};

/// A scripted shopping session: one storefront request per entry.
#[derive(Debug, Deserialize)]
pub struct CartFixture {
    /// Context every request runs in
    #[serde(default)]
    pub context: RequestContext,

    /// Requests in the order they reach the shop
    pub requests: Vec<RequestFixture>,
}

/// One request of a scripted session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RequestFixture {
    /// Add units of a product or variation to the cart
    Add {
        /// Product ID
        product: ProductId,

        /// Variation ID
        #[serde(default)]
        variation: Option<ProductId>,

        /// Units added
        quantity: u32,
    },

    /// Edit the quantity of an existing line
    Update {
        /// Product ID
        product: ProductId,

        /// Variation ID
        #[serde(default)]
        variation: Option<ProductId>,

        /// New visible quantity
        quantity: u32,
    },

    /// Remove a line
    Remove {
        /// Product ID
        product: ProductId,

        /// Variation ID
        #[serde(default)]
        variation: Option<ProductId>,
    },

    /// An admin saves the settings page between shopper requests
    Settings(SettingsPatch),
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{settings::SelectionInput, test_support::id};

    use super::*;

    #[test]
    fn requests_parse_from_yaml() -> TestResult {
        let fixture: CartFixture = serde_norway::from_str(
            r#"
context: ajax
requests:
  - action: add
    product: 42
    quantity: 3
  - action: update
    product: 7
    variation: 71
    quantity: 5
  - action: settings
    enabled: "no"
    selected_products: "42, 7"
  - action: remove
    product: 42
"#,
        )?;

        assert_eq!(fixture.context, RequestContext::Ajax);
        assert_eq!(
            fixture.requests,
            vec![
                RequestFixture::Add {
                    product: id(42),
                    variation: None,
                    quantity: 3,
                },
                RequestFixture::Update {
                    product: id(7),
                    variation: Some(id(71)),
                    quantity: 5,
                },
                RequestFixture::Settings(SettingsPatch {
                    enabled: Some("no".to_string()),
                    scope: None,
                    selected_products: Some(SelectionInput::Csv("42, 7".to_string())),
                }),
                RequestFixture::Remove {
                    product: id(42),
                    variation: None,
                },
            ]
        );

        Ok(())
    }

    #[test]
    fn zero_product_ids_are_rejected() {
        let result: Result<CartFixture, _> = serde_norway::from_str(
            "requests:\n  - action: add\n    product: 0\n    quantity: 1\n",
        );

        assert!(result.is_err());
    }
}
