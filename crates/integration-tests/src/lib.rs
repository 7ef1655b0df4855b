//! Integration tests for the Counsel storefront.
//!
//! Every test runs against a [`wiremock::MockServer`] standing in for the
//! site API, so nothing here needs network access or credentials.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p counsel-integration-tests
//! ```
//!
//! # Helpers
//!
//! - [`ScriptedGateway`] - a hosted checkout UI that plays back a script
//! - [`RecordingLauncher`] - records the links fulfillment tries to open
//! - [`SignatureVerifier`] - a `/payment/verify` responder that checks
//!   HMAC-SHA256 signatures like the real server does

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use counsel_core::{
    CurrencyCode, GatewayOrderId, ItemId, LineItem, PaymentAssertion, PaymentId, Price,
};
use counsel_storefront::checkout::{
    GatewayEvent, GatewayOpenError, HostedCheckout, HostedCheckoutRequest,
};
use counsel_storefront::config::PaymentConfig;
use counsel_storefront::fulfillment::{LaunchError, Launcher};
use counsel_storefront::{ApiClient, CartStore, Checkout};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use url::Url;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// Shared secret between [`ScriptedGateway`] and [`SignatureVerifier`].
pub const GATEWAY_SECRET: &str = "test_gateway_secret";

/// Signature the gateway attaches to a successful payment.
#[must_use]
pub fn sign(secret: &str, gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// One step of a [`ScriptedGateway`] run.
#[derive(Debug, Clone)]
pub enum Step {
    /// Pay and sign with [`GATEWAY_SECRET`].
    Pay { payment_id: String },
    /// Pay with a signature the server will not accept.
    PayForged { payment_id: String },
    Dismiss,
    Fail { reason: String },
    NotReady,
}

/// Hosted checkout that answers each `open` with the next scripted step.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HostedCheckoutRequest>>,
}

impl ScriptedGateway {
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    /// Every request the UI was opened with, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HostedCheckoutRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn event(
        step: Step,
        gateway_order_id: &GatewayOrderId,
    ) -> Result<GatewayEvent, GatewayOpenError> {
        let assertion = |payment_id: &str, signature: String| PaymentAssertion {
            gateway_order_id: gateway_order_id.clone(),
            payment_id: PaymentId::parse(payment_id).unwrap(),
            signature,
        };
        match step {
            Step::Pay { payment_id } => {
                let signature = sign(GATEWAY_SECRET, gateway_order_id.as_str(), &payment_id);
                Ok(GatewayEvent::Success(assertion(&payment_id, signature)))
            }
            Step::PayForged { payment_id } => Ok(GatewayEvent::Success(assertion(
                &payment_id,
                "0".repeat(64),
            ))),
            Step::Dismiss => Ok(GatewayEvent::Dismissed),
            Step::Fail { reason } => Ok(GatewayEvent::Failed {
                code: Some("BAD_REQUEST_ERROR".to_string()),
                reason,
            }),
            Step::NotReady => Err(GatewayOpenError::NotReady),
        }
    }
}

impl HostedCheckout for ScriptedGateway {
    async fn open(
        &self,
        request: &HostedCheckoutRequest,
    ) -> Result<GatewayEvent, GatewayOpenError> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Dismiss);
        Self::event(step, &request.gateway_order_id)
    }
}

/// Launcher that remembers what it was asked to open.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    opened: Mutex<Vec<Url>>,
}

impl RecordingLauncher {
    #[must_use]
    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }
}

impl Launcher for &RecordingLauncher {
    fn open_url(&self, url: &Url) -> Result<(), LaunchError> {
        self.opened.lock().unwrap().push(url.clone());
        Ok(())
    }
}

/// `/payment/verify` responder that recomputes the gateway signature.
///
/// Answers `200 {success: true}` for a good signature and
/// `400 {success: false}` otherwise.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }
}

impl Respond for SignatureVerifier {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let field = |name: &str| body[name].as_str().unwrap_or_default().to_string();

        let expected = sign(
            &self.secret,
            &field("razorpay_order_id"),
            &field("razorpay_payment_id"),
        );
        if !field("orderId").is_empty() && field("razorpay_signature") == expected {
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "Payment verified"
            }))
        } else {
            ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "success": false,
                "message": "Invalid payment signature"
            }))
        }
    }
}

/// API client pointed at the mock server.
#[must_use]
pub fn api_client(server: &MockServer) -> ApiClient {
    ApiClient::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(5)).unwrap()
}

#[must_use]
pub fn payment_config() -> PaymentConfig {
    PaymentConfig {
        key_id: "rzp_test_key".to_string(),
        currency: CurrencyCode::INR,
        business_name: "Counsel".to_string(),
        verify_timeout: Duration::from_secs(2),
    }
}

#[must_use]
pub fn inr(amount: i64) -> Price {
    Price::new(Decimal::from(amount), CurrencyCode::INR).unwrap()
}

/// A standard item priced in rupees.
#[must_use]
pub fn template(id: &str, title: &str, price: i64) -> LineItem {
    LineItem::standard(ItemId::parse(id).unwrap(), title, "Contracts", inr(price))
}

/// Checkout over an in-memory cart holding `items`.
#[must_use]
pub fn checkout_with(
    server: &MockServer,
    items: &[LineItem],
    gateway: ScriptedGateway,
) -> Checkout<ScriptedGateway> {
    let cart = CartStore::in_memory();
    cart.set(items).unwrap();
    Checkout::new(cart, api_client(server), gateway, payment_config())
}
