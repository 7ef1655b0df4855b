//! The checkout flow, from "Place Order" to a receipt.
//!
//! One attempt at a time per [`Checkout`]: the in-flight flag is the
//! disabled "Place Order" button. Every step awaits the previous one, so
//! verification never starts without an order id and fulfillment is never
//! planned without a verified payment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use counsel_core::{
    CustomerInfo, LineItem, NewOrder, OrderId, OrderStatusUpdate, OrderTotals, PaymentAssertion,
    PaymentId, PaymentMethod, Price,
};
use tracing::{info, instrument, warn};

use super::error::CheckoutError;
use super::session::{
    GatewayEvent, GatewayOpenError, HostedCheckout, HostedCheckoutRequest, PaymentPhase, Prefill,
};
use super::validation::{CustomerForm, validate};
use super::verification::{Verification, verify};
use crate::api::{ApiClient, GatewaySession};
use crate::cart::{CartError, CartStore};
use crate::config::PaymentConfig;
use crate::error::{
    add_breadcrumb, clear_sentry_user, report_error, report_message, set_sentry_user,
};
use crate::fulfillment::{FulfillmentAction, Purchaser, plan};

/// A purchased item and what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFulfillment {
    pub item: LineItem,
    pub action: FulfillmentAction,
}

/// Proof of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub order_id: OrderId,
    pub customer: CustomerInfo,
    pub total: Price,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<PaymentId>,
    pub fulfillment: Vec<PlannedFulfillment>,
}

/// Non-error endings of a checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Completed(Receipt),
    /// The customer closed the gateway. The order stays pending and the
    /// cart is kept.
    Cancelled { order_id: OrderId },
    /// The gateway UI could not open yet; call
    /// [`Checkout::resume_payment`] shortly.
    GatewayNotReady { order_id: OrderId },
}

impl CheckoutOutcome {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Completed(receipt) => {
                format!("Payment successful! Order ID: {}", receipt.order_id)
            }
            Self::Cancelled { .. } => {
                "Payment cancelled. Your cart is still here when you're ready.".to_string()
            }
            Self::GatewayNotReady { .. } => {
                "Payment system is still loading. Please try again in a moment.".to_string()
            }
        }
    }
}

/// An order that exists in the Order Store and is waiting for payment.
#[derive(Debug, Clone)]
struct Attempt {
    order_id: OrderId,
    customer: CustomerInfo,
    items: Vec<LineItem>,
    totals: OrderTotals,
    phase: PaymentPhase,
}

/// Clears the in-flight flag when the step ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one customer's checkout against the site API and a gateway UI.
pub struct Checkout<G> {
    cart: CartStore,
    api: ApiClient,
    gateway: G,
    payment: PaymentConfig,
    in_flight: AtomicBool,
    attempt: Mutex<Option<Attempt>>,
}

impl<G> std::fmt::Debug for Checkout<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("processing", &self.is_processing())
            .field("phase", &self.phase().name())
            .finish_non_exhaustive()
    }
}

impl<G> Checkout<G> {
    pub fn new(cart: CartStore, api: ApiClient, gateway: G, payment: PaymentConfig) -> Self {
        Self {
            cart,
            api,
            gateway,
            payment,
            in_flight: AtomicBool::new(false),
            attempt: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Whether a step is in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether "Place Order" should be enabled.
    #[must_use]
    pub fn can_place_order(&self) -> bool {
        !self.is_processing() && !self.cart.get().is_empty()
    }

    /// Payment phase of the latest unfinished attempt, or `Idle`.
    #[must_use]
    pub fn phase(&self) -> PaymentPhase {
        self.lock_attempt()
            .as_ref()
            .map_or(PaymentPhase::Idle, |a| a.phase.clone())
    }

    /// The order of the latest unfinished attempt, if any.
    #[must_use]
    pub fn pending_order(&self) -> Option<OrderId> {
        self.lock_attempt().as_ref().map(|a| a.order_id.clone())
    }

    fn lock_attempt(&self) -> std::sync::MutexGuard<'_, Option<Attempt>> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G: HostedCheckout> Checkout<G> {
    /// Place the order for the current cart.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]; each variant names the step that stopped.
    #[instrument(skip(self, form))]
    pub async fn place_order(&self, form: &CustomerForm) -> Result<CheckoutOutcome, CheckoutError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(CheckoutError::AlreadyProcessing)?;
        // A new order replaces any attempt still waiting to resume
        self.lock_attempt().take();

        let customer = validate(form).map_err(CheckoutError::Invalid)?;
        let items = self.cart.get();
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let totals = OrderTotals::from_items(&items).map_err(CartError::from)?;

        set_sentry_user(customer.email.as_str(), Some(&customer.name));
        add_breadcrumb("checkout", "Submitting order", None);

        let order = NewOrder::new(customer.clone(), items.clone()).map_err(CartError::from)?;
        let created = self.api.create_order(&order).await?;
        let order_id = created.order_id;
        info!(order_id = %order_id, total = %order.total, "Order created");
        add_breadcrumb(
            "checkout",
            "Order created",
            Some(&[("order_id", order_id.as_str())]),
        );

        let attempt = Attempt {
            order_id,
            customer,
            items,
            totals,
            phase: PaymentPhase::Idle,
        };

        if totals.payment_method() == PaymentMethod::Free {
            return self.complete_free(attempt).await;
        }

        self.start_payment(attempt).await
    }

    /// Re-open the gateway for an order whose UI could not open before.
    ///
    /// Uses the existing order and session; nothing new is created.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NothingToResume`] when no session is waiting,
    /// or any error from the rest of the flow.
    #[instrument(skip(self))]
    pub async fn resume_payment(&self) -> Result<CheckoutOutcome, CheckoutError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(CheckoutError::AlreadyProcessing)?;

        let attempt = self
            .lock_attempt()
            .take()
            .filter(|a| matches!(a.phase, PaymentPhase::SessionCreated(_)))
            .ok_or(CheckoutError::NothingToResume)?;

        add_breadcrumb(
            "checkout",
            "Resuming payment",
            Some(&[("order_id", attempt.order_id.as_str())]),
        );
        self.open_gateway(attempt).await
    }

    async fn complete_free(&self, attempt: Attempt) -> Result<CheckoutOutcome, CheckoutError> {
        let update = OrderStatusUpdate::completed(attempt.order_id.clone(), None, None);
        if let Err(source) = self.api.update_order(&update).await {
            return Err(CheckoutError::OrderUpdate {
                order_id: attempt.order_id,
                source,
            });
        }

        add_breadcrumb(
            "checkout",
            "Free order completed",
            Some(&[("order_id", attempt.order_id.as_str())]),
        );
        Ok(self.finish(attempt, None))
    }

    async fn start_payment(&self, mut attempt: Attempt) -> Result<CheckoutOutcome, CheckoutError> {
        let session = match self
            .api
            .create_payment_order(&attempt.order_id, attempt.totals.total)
            .await
        {
            Ok(session) => session,
            Err(source) => {
                attempt.phase.advance(PaymentPhase::Failed(source.to_string()))?;
                warn!(order_id = %attempt.order_id, error = %source, "Payment session failed");
                let order_id = attempt.order_id.clone();
                *self.lock_attempt() = Some(attempt);
                return Err(CheckoutError::PaymentSession { order_id, source });
            }
        };

        attempt
            .phase
            .advance(PaymentPhase::SessionCreated(session.clone()))?;
        add_breadcrumb(
            "checkout",
            "Payment session created",
            Some(&[("gateway_order_id", session.gateway_order_id.as_str())]),
        );

        self.open_gateway(attempt).await
    }

    async fn open_gateway(&self, mut attempt: Attempt) -> Result<CheckoutOutcome, CheckoutError> {
        let Some(session) = attempt.phase.session().cloned() else {
            return Err(CheckoutError::NothingToResume);
        };
        let request = self.hosted_request(&attempt, &session);

        let event = match self.gateway.open(&request).await {
            Ok(event) => event,
            Err(GatewayOpenError::NotReady) => {
                attempt
                    .phase
                    .advance(PaymentPhase::SessionCreated(session))?;
                let order_id = attempt.order_id.clone();
                warn!(order_id = %order_id, "Payment gateway not ready");
                *self.lock_attempt() = Some(attempt);
                return Ok(CheckoutOutcome::GatewayNotReady { order_id });
            }
        };

        attempt.phase.advance(PaymentPhase::GatewayOpen(session))?;

        match event {
            GatewayEvent::Dismissed => {
                attempt.phase.advance(PaymentPhase::Cancelled)?;
                info!(order_id = %attempt.order_id, "Payment dismissed");
                add_breadcrumb(
                    "checkout",
                    "Payment cancelled",
                    Some(&[("order_id", attempt.order_id.as_str())]),
                );
                Ok(CheckoutOutcome::Cancelled {
                    order_id: attempt.order_id,
                })
            }
            GatewayEvent::Failed { code, reason } => {
                attempt.phase.advance(PaymentPhase::Failed(reason.clone()))?;
                warn!(
                    order_id = %attempt.order_id,
                    code = code.as_deref().unwrap_or("unknown"),
                    reason = %reason,
                    "Payment failed at gateway"
                );
                self.mark_failed(&attempt.order_id, &reason).await;
                Err(CheckoutError::PaymentFailed {
                    order_id: attempt.order_id,
                    reason,
                })
            }
            GatewayEvent::Success(assertion) => {
                attempt
                    .phase
                    .advance(PaymentPhase::Verifying(assertion.clone()))?;
                add_breadcrumb(
                    "checkout",
                    "Verifying payment",
                    Some(&[("payment_id", assertion.payment_id.as_str())]),
                );
                self.verify_and_complete(attempt, assertion).await
            }
        }
    }

    async fn verify_and_complete(
        &self,
        attempt: Attempt,
        assertion: PaymentAssertion,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let verdict = verify(
            &self.api,
            &assertion,
            &attempt.order_id,
            self.payment.verify_timeout,
        )
        .await;

        match verdict {
            Verification::Verified => {
                let update = OrderStatusUpdate::completed(
                    attempt.order_id.clone(),
                    Some(assertion.payment_id.clone()),
                    Some(assertion.gateway_order_id.clone()),
                );
                if let Err(e) = self.api.update_order(&update).await {
                    report_error(
                        &e,
                        "Verified payment but order update failed",
                        &[
                            ("order_id", attempt.order_id.as_str()),
                            ("payment_id", assertion.payment_id.as_str()),
                        ],
                    );
                }
                add_breadcrumb(
                    "checkout",
                    "Payment verified",
                    Some(&[("order_id", attempt.order_id.as_str())]),
                );
                Ok(self.finish(attempt, Some(assertion.payment_id)))
            }
            Verification::Rejected(reason) => {
                let detail = reason.describe();
                if reason.is_conclusive() {
                    self.mark_failed(&attempt.order_id, &detail).await;
                }
                report_message(
                    "Payment verification failed",
                    &[
                        ("order_id", attempt.order_id.as_str()),
                        ("payment_id", assertion.payment_id.as_str()),
                        ("reason", detail.as_str()),
                    ],
                );
                Err(CheckoutError::VerificationFailed {
                    order_id: attempt.order_id,
                    reason,
                })
            }
        }
    }

    /// Mark an order failed. A failed update is logged and left for
    /// reconciliation; the customer already has the real outcome.
    async fn mark_failed(&self, order_id: &OrderId, reason: &str) {
        let update = OrderStatusUpdate::failed(order_id.clone(), reason);
        if let Err(e) = self.api.update_order(&update).await {
            warn!(order_id = %order_id, error = %e, "Failed to mark order failed");
        }
    }

    fn finish(&self, attempt: Attempt, payment_id: Option<PaymentId>) -> CheckoutOutcome {
        if let Err(e) = self.cart.clear() {
            warn!(error = %e, "Failed to clear cart after purchase");
        }

        let purchaser = Purchaser::from(&attempt.customer);
        let fulfillment = attempt
            .items
            .into_iter()
            .map(|item| PlannedFulfillment {
                action: plan(&item, &purchaser),
                item,
            })
            .collect();

        info!(order_id = %attempt.order_id, "Checkout completed");
        clear_sentry_user();
        CheckoutOutcome::Completed(Receipt {
            order_id: attempt.order_id,
            customer: attempt.customer,
            total: attempt.totals.total,
            payment_method: attempt.totals.payment_method(),
            payment_id,
            fulfillment,
        })
    }

    fn hosted_request(&self, attempt: &Attempt, session: &GatewaySession) -> HostedCheckoutRequest {
        let description = match attempt.items.as_slice() {
            [only] => only.title().to_string(),
            items => format!("{} items", items.len()),
        };
        HostedCheckoutRequest {
            key_id: self.payment.key_id.clone(),
            gateway_order_id: session.gateway_order_id.clone(),
            amount_minor: session.amount_minor,
            currency: session.currency,
            business_name: self.payment.business_name.clone(),
            description,
            prefill: Prefill::from(&attempt.customer),
        }
    }
}
