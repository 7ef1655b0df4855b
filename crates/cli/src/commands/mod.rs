//! Command implementations.

pub mod cart;
pub mod checkout;
pub mod purchases;

use counsel_storefront::{
    ApiClient, ApiError, CartError, CheckoutError, FulfillmentError, LookupError,
    StorefrontConfig,
};
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad command-line input.
    #[error("{0}")]
    Input(String),
}

impl CommandError {
    /// What to print for the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Api { message, .. }) => message.clone(),
            Self::Api(_) => "The server could not be reached.".to_string(),
            Self::Cart(e) => e.user_message(),
            Self::Checkout(e) => e.user_message(),
            Self::Fulfillment(e) => e.user_message(),
            Self::Lookup(e) => e.user_message(),
            Self::Io(e) => format!("Terminal error: {e}"),
            Self::Input(message) => message.clone(),
        }
    }
}

/// Site API client from configuration.
pub fn api_client(config: &StorefrontConfig) -> Result<ApiClient, CommandError> {
    Ok(ApiClient::new(
        config.api_base_url.clone(),
        config.request_timeout,
    )?)
}
