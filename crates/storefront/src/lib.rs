//! Counsel storefront client library.
//!
//! Everything a front end needs to sell templates and services: the cart,
//! checkout with a hosted payment gateway, post-purchase fulfillment and
//! purchase history. The site API is the source of truth for orders and
//! payments; this crate never decides on its own that a payment succeeded.
//!
//! # Flow
//!
//! ```text
//! CartStore -> Checkout (validate, create order, payment session,
//!              hosted gateway, verify) -> Receipt -> FulfillmentResolver
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod fulfillment;
pub mod purchases;
pub mod services;

pub use api::{ApiClient, ApiError};
pub use cart::{CartError, CartStore, CartSummary};
pub use checkout::{Checkout, CheckoutError, CheckoutOutcome, CustomerForm, Receipt};
pub use config::{ConfigError, StorefrontConfig};
pub use fulfillment::{FulfillmentAction, FulfillmentError, FulfillmentResolver, Purchaser};
pub use purchases::{LookupError, Purchases};
