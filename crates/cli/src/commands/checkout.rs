//! `counsel checkout` - pay for the cart with the gateway driven from stdin.

use std::time::Duration;

use counsel_core::{GatewayOrderId, PaymentAssertion, PaymentId};
use counsel_storefront::checkout::{
    GatewayEvent, GatewayOpenError, HostedCheckout, HostedCheckoutRequest,
};
use counsel_storefront::{Checkout, CheckoutOutcome, CustomerForm, Receipt, StorefrontConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandError, api_client, cart};

const RESUME_ATTEMPTS: u32 = 3;
const RESUME_DELAY: Duration = Duration::from_secs(1);

/// Stands in for the gateway's hosted UI.
///
/// Prints what the gateway would show and reads the customer's answer:
/// `pay <payment_id> <signature>`, `cancel` or `fail <reason>`.
struct TerminalCheckout;

impl TerminalCheckout {
    fn parse(line: &str, gateway_order_id: &GatewayOrderId) -> Option<GatewayEvent> {
        let mut words = line.split_whitespace();
        match words.next()? {
            "pay" => {
                let payment_id = PaymentId::parse(words.next()?).ok()?;
                let signature = words.next()?.to_string();
                Some(GatewayEvent::Success(PaymentAssertion {
                    gateway_order_id: gateway_order_id.clone(),
                    payment_id,
                    signature,
                }))
            }
            "cancel" => Some(GatewayEvent::Dismissed),
            "fail" => {
                let reason = words.collect::<Vec<_>>().join(" ");
                Some(GatewayEvent::Failed {
                    code: None,
                    reason: if reason.is_empty() {
                        "Payment failed".to_string()
                    } else {
                        reason
                    },
                })
            }
            _ => None,
        }
    }
}

impl HostedCheckout for TerminalCheckout {
    async fn open(
        &self,
        request: &HostedCheckoutRequest,
    ) -> Result<GatewayEvent, GatewayOpenError> {
        println!();
        println!("== {} ==", request.business_name);
        println!("{}", request.description);
        println!(
            "Amount: {} {} (minor units)",
            request.amount_minor, request.currency
        );
        println!("Gateway order: {}", request.gateway_order_id);
        println!(
            "Paying as {} <{}>, {}",
            request.prefill.name, request.prefill.email, request.prefill.contact
        );
        println!("Enter `pay <payment_id> <signature>`, `cancel` or `fail <reason>`:");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = Self::parse(&line, &request.gateway_order_id) {
                        return Ok(event);
                    }
                    println!("Not understood. Try again:");
                }
                // Closing stdin is closing the window.
                Ok(None) => return Ok(GatewayEvent::Dismissed),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not read terminal input");
                    return Err(GatewayOpenError::NotReady);
                }
            }
        }
    }
}

fn print_receipt(receipt: &Receipt) {
    println!("Order:   {}", receipt.order_id);
    println!("Total:   {} ({})", receipt.total, receipt.payment_method);
    if let Some(payment_id) = &receipt.payment_id {
        println!("Payment: {payment_id}");
    }
    println!("Receipt sent to {}", receipt.customer.email);
    if receipt.fulfillment.is_empty() {
        return;
    }
    println!("Next steps:");
    for planned in &receipt.fulfillment {
        println!("  {:<10} {}", planned.action.label(), planned.item.title());
    }
    println!(
        "Run `counsel fulfill --order {} --item <id> --email {}` to get an item.",
        receipt.order_id, receipt.customer.email
    );
}

/// Place an order for the cart and pay for it.
pub async fn run(
    config: &StorefrontConfig,
    name: String,
    email: String,
    phone: String,
) -> Result<(), CommandError> {
    let store = cart::open(config);
    let items = store.get();
    if !items.is_empty() {
        println!("Checking out:");
        cart::print_items(&items);
    }

    let checkout = Checkout::new(
        store,
        api_client(config)?,
        TerminalCheckout,
        config.payment.clone(),
    );

    let form = CustomerForm::new(name, email, phone);
    let mut outcome = checkout.place_order(&form).await?;

    let mut attempts = 0;
    while let CheckoutOutcome::GatewayNotReady { .. } = outcome {
        if attempts == RESUME_ATTEMPTS {
            break;
        }
        attempts += 1;
        println!("{}", outcome.user_message());
        tokio::time::sleep(RESUME_DELAY).await;
        outcome = checkout.resume_payment().await?;
    }

    println!("{}", outcome.user_message());
    match &outcome {
        CheckoutOutcome::Completed(receipt) => print_receipt(receipt),
        CheckoutOutcome::Cancelled { order_id } | CheckoutOutcome::GatewayNotReady { order_id } => {
            println!("Order {order_id} is still pending.");
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gateway_order() -> GatewayOrderId {
        GatewayOrderId::parse("order_abc").unwrap()
    }

    #[test]
    fn test_parse_pay() {
        let event = TerminalCheckout::parse("pay pay_1 sig", &gateway_order()).unwrap();
        let GatewayEvent::Success(assertion) = event else {
            panic!("expected success");
        };
        assert_eq!(assertion.payment_id.as_str(), "pay_1");
        assert_eq!(assertion.signature, "sig");
        assert_eq!(assertion.gateway_order_id, gateway_order());
    }

    #[test]
    fn test_parse_cancel_and_fail() {
        assert_eq!(
            TerminalCheckout::parse("cancel", &gateway_order()),
            Some(GatewayEvent::Dismissed)
        );
        assert_eq!(
            TerminalCheckout::parse("fail card declined", &gateway_order()),
            Some(GatewayEvent::Failed {
                code: None,
                reason: "card declined".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rejects_incomplete_input() {
        assert_eq!(TerminalCheckout::parse("pay pay_1", &gateway_order()), None);
        assert_eq!(TerminalCheckout::parse("", &gateway_order()), None);
        assert_eq!(TerminalCheckout::parse("refund", &gateway_order()), None);
    }
}
