//! Payment session state machine and the hosted gateway seam.
//!
//! ```text
//! Idle -> SessionCreated -> GatewayOpen -> Verifying
//!                 ^   |                 -> Cancelled
//!                 |___| (not ready)     -> Failed
//! Idle -> Failed (session creation failed)
//! ```
//!
//! Reaching a terminal phase says nothing about payment success; only an
//! explicit verification result does.

use std::future::Future;

use counsel_core::{CurrencyCode, CustomerInfo, GatewayOrderId, PaymentAssertion};
use thiserror::Error;

use crate::api::GatewaySession;

/// Where a checkout attempt is in the payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentPhase {
    #[default]
    Idle,
    SessionCreated(GatewaySession),
    GatewayOpen(GatewaySession),
    Verifying(PaymentAssertion),
    Cancelled,
    Failed(String),
}

impl PaymentPhase {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SessionCreated(_) => "session_created",
            Self::GatewayOpen(_) => "gateway_open",
            Self::Verifying(_) => "verifying",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Verifying(_) | Self::Cancelled | Self::Failed(_))
    }

    /// The open session, if the phase holds one.
    #[must_use]
    pub const fn session(&self) -> Option<&GatewaySession> {
        match self {
            Self::SessionCreated(s) | Self::GatewayOpen(s) => Some(s),
            _ => None,
        }
    }

    /// Move to `next`, rejecting moves the flow does not allow.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError`] naming both phases for an illegal move.
    pub fn advance(&mut self, next: Self) -> Result<(), PhaseError> {
        let allowed = matches!(
            (&*self, &next),
            (Self::Idle, Self::SessionCreated(_) | Self::Failed(_))
                | (
                    Self::SessionCreated(_),
                    Self::GatewayOpen(_) | Self::SessionCreated(_)
                )
                | (
                    Self::GatewayOpen(_),
                    Self::Verifying(_) | Self::Cancelled | Self::Failed(_)
                )
        );
        if !allowed {
            return Err(PhaseError {
                from: self.name(),
                to: next.name(),
            });
        }
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal payment transition: {from} -> {to}")]
pub struct PhaseError {
    pub from: &'static str,
    pub to: &'static str,
}

/// Details prefilled into the hosted checkout UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

impl From<&CustomerInfo> for Prefill {
    fn from(customer: &CustomerInfo) -> Self {
        Self {
            name: customer.name.clone(),
            email: customer.email.to_string(),
            contact: customer.phone.to_string(),
        }
    }
}

/// Everything the hosted UI needs to take a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedCheckoutRequest {
    pub key_id: String,
    pub gateway_order_id: GatewayOrderId,
    pub amount_minor: i64,
    pub currency: CurrencyCode,
    pub business_name: String,
    pub description: String,
    pub prefill: Prefill,
}

/// How the hosted UI ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Success callback; the assertion still has to be verified.
    Success(PaymentAssertion),
    /// The customer closed the UI without paying.
    Dismissed,
    /// The gateway reported a failed payment.
    Failed { code: Option<String>, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayOpenError {
    /// The gateway client library has not finished loading.
    #[error("payment gateway is not ready")]
    NotReady,
}

/// The gateway's hosted checkout UI.
///
/// In a browser this is the gateway's script; the CLI drives it from the
/// terminal and tests script it.
pub trait HostedCheckout: Send + Sync {
    /// Show the checkout UI and wait for it to close.
    fn open(
        &self,
        request: &HostedCheckoutRequest,
    ) -> impl Future<Output = Result<GatewayEvent, GatewayOpenError>> + Send;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session() -> GatewaySession {
        GatewaySession {
            gateway_order_id: GatewayOrderId::parse("order_1").unwrap(),
            amount_minor: 100_000,
            currency: CurrencyCode::INR,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut phase = PaymentPhase::default();
        phase.advance(PaymentPhase::SessionCreated(session())).unwrap();
        phase.advance(PaymentPhase::GatewayOpen(session())).unwrap();
        phase.advance(PaymentPhase::Cancelled).unwrap();
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_not_ready_stays_in_session_created() {
        let mut phase = PaymentPhase::SessionCreated(session());
        phase.advance(PaymentPhase::SessionCreated(session())).unwrap();
        assert_eq!(phase.session().unwrap().amount_minor, 100_000);
    }

    #[test]
    fn test_illegal_transitions() {
        let mut phase = PaymentPhase::Idle;
        let err = phase.advance(PaymentPhase::GatewayOpen(session())).unwrap_err();
        assert_eq!(err.to_string(), "illegal payment transition: idle -> gateway_open");

        let mut phase = PaymentPhase::Cancelled;
        assert!(phase.advance(PaymentPhase::Idle).is_err());
        assert!(
            phase
                .advance(PaymentPhase::Failed("late".to_string()))
                .is_err()
        );
    }
}
