//! Core types for the Counsel storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod customer;
pub mod email;
pub mod id;
mod lenient;
pub mod line_item;
pub mod order;
pub mod payment;
pub mod phone;
pub mod price;
pub mod quantity;
pub mod status;

pub use customer::CustomerInfo;
pub use email::{Email, EmailError};
pub use id::*;
pub use line_item::{
    ContactRoute, FulfillmentContact, FulfillmentRecord, ItemKind, LineItem, LineItemError,
    LineItemRecord,
};
pub use order::{NewOrder, Order, OrderStatusUpdate, OrderTotals};
pub use payment::PaymentAssertion;
pub use phone::{Phone, PhoneError};
pub use price::{CurrencyCode, Price, PriceError};
pub use quantity::Quantity;
pub use status::*;
