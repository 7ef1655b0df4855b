//! Checkout errors.

use counsel_core::OrderId;
use thiserror::Error;

use super::session::PhaseError;
use super::validation::ValidationReport;
use super::verification::RejectReason;
use crate::api::ApiError;
use crate::cart::CartError;

/// Why a checkout attempt stopped.
///
/// `Display` is diagnostic; show customers [`CheckoutError::user_message`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A previous submission is still in flight.
    #[error("checkout already in progress")]
    AlreadyProcessing,

    /// The form did not validate; nothing was sent.
    #[error("invalid customer details: {0}")]
    Invalid(ValidationReport),

    #[error("cart is empty")]
    EmptyCart,

    #[error("cart unavailable: {0}")]
    Cart(#[from] CartError),

    /// The Order Store rejected the order; `message` is its own text.
    #[error("order rejected: {message}")]
    OrderCreation { message: String },

    /// The order could not be submitted at all.
    #[error("order submission failed: {0}")]
    OrderSubmission(#[source] ApiError),

    /// A gateway session could not be opened. The order stays pending.
    #[error("payment session failed for order {order_id}: {source}")]
    PaymentSession {
        order_id: OrderId,
        #[source]
        source: ApiError,
    },

    /// The gateway reported a failed payment.
    #[error("payment failed for order {order_id}: {reason}")]
    PaymentFailed { order_id: OrderId, reason: String },

    /// The payment could not be confirmed.
    #[error("verification failed for order {order_id}: {}", .reason.describe())]
    VerificationFailed {
        order_id: OrderId,
        reason: RejectReason,
    },

    /// A free order could not be marked completed.
    #[error("order {order_id} could not be completed: {source}")]
    OrderUpdate {
        order_id: OrderId,
        #[source]
        source: ApiError,
    },

    /// `resume_payment` was called with no session waiting.
    #[error("no payment session to resume")]
    NothingToResume,

    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl CheckoutError {
    /// Customer-facing message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyProcessing => "Your order is already being processed.".to_string(),
            Self::Invalid(_) => "Please correct the highlighted fields.".to_string(),
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::Cart(e) => e.user_message(),
            Self::OrderCreation { message } => message.clone(),
            Self::OrderSubmission(_) => {
                "We could not reach the server. Please check your connection and try again."
                    .to_string()
            }
            Self::PaymentSession { .. } => {
                "Payment could not be started. Please try again later.".to_string()
            }
            Self::PaymentFailed { reason, .. } => format!("Payment failed: {reason}"),
            Self::VerificationFailed { order_id, .. } => format!(
                "Payment verification failed. Please contact support with order ID {order_id}."
            ),
            Self::OrderUpdate { .. } => {
                "Your order could not be completed. Please try again.".to_string()
            }
            Self::NothingToResume => "There is no payment waiting to be resumed.".to_string(),
            Self::Phase(_) => "Something went wrong. Please start checkout again.".to_string(),
        }
    }

    /// The order this error concerns, when one was created.
    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        match self {
            Self::PaymentSession { order_id, .. }
            | Self::PaymentFailed { order_id, .. }
            | Self::VerificationFailed { order_id, .. }
            | Self::OrderUpdate { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}

impl From<ApiError> for CheckoutError {
    /// Order-creation failures: server rejections keep their message.
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Api { message, .. } => Self::OrderCreation { message },
            other => Self::OrderSubmission(other),
        }
    }
}
