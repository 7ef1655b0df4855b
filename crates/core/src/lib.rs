//! Counsel Core - Shared types library.
//!
//! This crate provides common types used across all Counsel components:
//! - `storefront` - Cart, checkout orchestration and fulfillment clients
//! - `cli` - Command-line front end for the storefront flows
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phones,
//!   line items, orders and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
