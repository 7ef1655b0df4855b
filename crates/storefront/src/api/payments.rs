//! Payment gateway endpoints: session creation and server-side verification.

use counsel_core::{CurrencyCode, GatewayOrderId, OrderId, PaymentAssertion, Price};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ApiClient, ApiError, error_from_response, read_json};

/// A payment session opened with the gateway for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    pub gateway_order_id: GatewayOrderId,
    /// Amount in the currency's minor unit, as the hosted UI expects it.
    pub amount_minor: i64,
    pub currency: CurrencyCode,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    amount: rust_decimal::Decimal,
    currency: &'a str,
    receipt: &'a str,
    notes: SessionNotes<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionNotes<'a> {
    order_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    id: GatewayOrderId,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreateSessionResponse {
    Wrapped { order: SessionBody },
    Bare(SessionBody),
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    #[serde(flatten)]
    assertion: &'a PaymentAssertion,
    #[serde(rename = "orderId")]
    order_id: &'a OrderId,
}

/// Verification endpoint answer.
///
/// Only an explicit `success: true` means the payment is genuine; a missing
/// flag is not the same as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VerifyResponse {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.success == Some(true)
    }
}

impl ApiClient {
    /// Open a gateway payment session for an order.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the server rejects it, or the
    /// response carries an amount that cannot be represented.
    #[instrument(skip(self, order_id, total), fields(order_id = %order_id, total = %total))]
    pub async fn create_payment_order(
        &self,
        order_id: &OrderId,
        total: Price,
    ) -> Result<GatewaySession, ApiError> {
        let url = self.endpoint(&["payment", "create-order"])?;
        let body = CreateSessionRequest {
            amount: total.amount(),
            currency: total.currency_code().code(),
            receipt: order_id.as_str(),
            notes: SessionNotes {
                order_id: order_id.as_str(),
            },
        };

        let response = self.http().post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let session = match read_json::<CreateSessionResponse>(response).await? {
            CreateSessionResponse::Wrapped { order } | CreateSessionResponse::Bare(order) => order,
        };

        let currency = match session.currency.as_deref() {
            Some(code) => code.parse::<CurrencyCode>().map_err(ApiError::Parse)?,
            None => total.currency_code(),
        };
        let amount_minor = match session.amount {
            Some(amount) => amount,
            None => total
                .minor_units()
                .map_err(|e| ApiError::Parse(e.to_string()))?,
        };

        debug!(gateway_order_id = %session.id, amount_minor, "Payment session created");
        Ok(GatewaySession {
            gateway_order_id: session.id,
            amount_minor,
            currency,
        })
    }

    /// Ask the server whether a gateway assertion is genuine.
    ///
    /// A rejection the server explains (`success: false`, any status) is
    /// returned as a normal response, not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server answers with a
    /// status and body that say nothing about the payment.
    #[instrument(
        skip(self, assertion, order_id),
        fields(order_id = %order_id, payment_id = %assertion.payment_id)
    )]
    pub async fn verify_payment(
        &self,
        assertion: &PaymentAssertion,
        order_id: &OrderId,
    ) -> Result<VerifyResponse, ApiError> {
        let url = self.endpoint(&["payment", "verify"])?;
        let body = VerifyRequest {
            assertion,
            order_id,
        };

        let response = self.http().post(url).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            return read_json(response).await;
        }

        let text = response.text().await?;
        match serde_json::from_str::<VerifyResponse>(&text) {
            Ok(verdict) if verdict.success == Some(false) => Ok(verdict),
            _ => Err(ApiError::Api {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            }),
        }
    }
}
