//! Checkout: form validation, order submission, payment and verification.
//!
//! [`Checkout`] ties the pieces together; the submodules are usable on
//! their own (the validator is pure, the state machine has no I/O).

mod error;
mod orchestrator;
pub mod session;
pub mod validation;
pub mod verification;

pub use error::CheckoutError;
pub use orchestrator::{Checkout, CheckoutOutcome, PlannedFulfillment, Receipt};
pub use session::{
    GatewayEvent, GatewayOpenError, HostedCheckout, HostedCheckoutRequest, PaymentPhase,
    PhaseError, Prefill,
};
pub use validation::{CustomerForm, Field, ValidationReport, validate};
pub use verification::{RejectReason, Verification};
