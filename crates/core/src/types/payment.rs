//! Payment gateway assertions.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::{GatewayOrderId, PaymentId};

/// The signed statement the gateway hands back after a successful payment.
///
/// It is produced in an untrusted environment and proves nothing on its own;
/// only the server-side verification endpoint can confirm it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAssertion {
    #[serde(rename = "razorpay_order_id")]
    pub gateway_order_id: GatewayOrderId,
    #[serde(rename = "razorpay_payment_id")]
    pub payment_id: PaymentId,
    #[serde(rename = "razorpay_signature")]
    pub signature: String,
}

// Signatures are kept out of logs.
impl fmt::Debug for PaymentAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentAssertion")
            .field("gateway_order_id", &self.gateway_order_id)
            .field("payment_id", &self.payment_id)
            .field("signature", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_and_redaction() {
        let assertion = PaymentAssertion {
            gateway_order_id: GatewayOrderId::parse("order_1").unwrap(),
            payment_id: PaymentId::parse("pay_1").unwrap(),
            signature: "deadbeef".to_string(),
        };
        let json = serde_json::to_value(&assertion).unwrap();
        assert_eq!(json["razorpay_order_id"], "order_1");
        assert_eq!(json["razorpay_payment_id"], "pay_1");
        assert_eq!(json["razorpay_signature"], "deadbeef");
        assert!(!format!("{assertion:?}").contains("deadbeef"));
    }
}
