//! BOGO
//!
//! A "Buy One Get One Free" rule engine for shopping carts. Eligible lines
//! are doubled when added, kept at an even quantity when edited and charged
//! at half their original unit price, so the shopper pays for half the units.

pub mod cart;
pub mod config;
pub mod display;
pub mod eligibility;
pub mod engine;
pub mod fixtures;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod report;
pub mod settings;
pub mod storefront;

#[cfg(test)]
mod test_support;
