//! Server-side payment verification.

use std::time::Duration;

use counsel_core::{OrderId, PaymentAssertion};
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, ApiError};

/// Why an assertion was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The server explicitly said the payment is not genuine.
    Declined(Option<String>),
    /// The server answered, but not with an explicit verdict.
    UnexpectedResponse(String),
    /// The request never got an answer.
    Transport(String),
    /// No answer within the configured bound.
    TimedOut(Duration),
}

impl RejectReason {
    /// Whether the server gave an answer about this payment.
    ///
    /// When it did not, the payment may still have succeeded, so the order
    /// must be left for reconciliation rather than marked failed.
    #[must_use]
    pub const fn is_conclusive(&self) -> bool {
        matches!(self, Self::Declined(_) | Self::UnexpectedResponse(_))
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Declined(Some(message)) => format!("declined: {message}"),
            Self::Declined(None) => "declined".to_string(),
            Self::UnexpectedResponse(detail) => format!("unexpected response: {detail}"),
            Self::Transport(detail) => format!("transport error: {detail}"),
            Self::TimedOut(after) => format!("timed out after {}s", after.as_secs()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Rejected(RejectReason),
}

/// Verify a gateway assertion against the server, waiting at most `timeout`.
///
/// Only an explicit `success: true` is [`Verification::Verified`].
#[instrument(skip(api, assertion), fields(order_id = %order_id, payment_id = %assertion.payment_id))]
pub async fn verify(
    api: &ApiClient,
    assertion: &PaymentAssertion,
    order_id: &OrderId,
    timeout: Duration,
) -> Verification {
    let outcome = match tokio::time::timeout(timeout, api.verify_payment(assertion, order_id)).await
    {
        Err(_) => Verification::Rejected(RejectReason::TimedOut(timeout)),
        Ok(Ok(response)) => match response.success {
            Some(true) => Verification::Verified,
            Some(false) => Verification::Rejected(RejectReason::Declined(response.message)),
            None => Verification::Rejected(RejectReason::UnexpectedResponse(
                "response did not state success".to_string(),
            )),
        },
        Ok(Err(e @ ApiError::Http(_))) => {
            Verification::Rejected(RejectReason::Transport(e.to_string()))
        }
        Ok(Err(e)) => Verification::Rejected(RejectReason::UnexpectedResponse(e.to_string())),
    };

    match &outcome {
        Verification::Verified => info!("Payment verified"),
        Verification::Rejected(reason) => warn!(reason = %reason.describe(), "Payment not verified"),
    }
    outcome
}
