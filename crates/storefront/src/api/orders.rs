//! Order Store endpoints.

use counsel_core::{Email, NewOrder, Order, OrderId, OrderStatusUpdate};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{ApiClient, ApiError, error_from_response, read_json};

/// Acknowledgement of a created order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedOrder {
    pub order_id: OrderId,
}

/// Create response. The store answers either `{ order: {...} }` or a bare
/// `{ orderId }`, with `success: false` plus `message` on logical failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderBody {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    order: Option<OrderIdOnly>,
    #[serde(default, alias = "_id")]
    order_id: Option<OrderId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderIdOnly {
    #[serde(alias = "_id", alias = "id")]
    order_id: OrderId,
}

/// Lookup responses come as a bare array or wrapped in `orders`.
///
/// Records stay raw so one bad record does not hide the rest.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrdersBody {
    Bare(Vec<serde_json::Value>),
    Wrapped { orders: Vec<serde_json::Value> },
}

/// Single-order responses come bare or wrapped in `order`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrderBody {
    Wrapped { order: Order },
    Bare(Order),
}

impl ApiClient {
    /// Create an order in `pending` state.
    ///
    /// Sends a fresh `Idempotency-Key` header. Never retries: a transport
    /// failure is reported to the caller, who decides whether to start over.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] with the server's message verbatim when the
    /// store rejects the order (including `success: false` bodies).
    #[instrument(skip(self, order), fields(items = order.items.len(), total = %order.total))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<CreatedOrder, ApiError> {
        let url = self.endpoint(&["orders"])?;
        let idempotency_key = Uuid::new_v4();

        let response = self
            .http()
            .post(url)
            .header("Idempotency-Key", idempotency_key.to_string())
            .json(order)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        let body: CreateOrderBody = read_json(response).await?;
        if body.success == Some(false) {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: body
                    .message
                    .or(body.error)
                    .unwrap_or_else(|| "Order could not be created".to_string()),
            });
        }

        let order_id = body
            .order
            .map(|o| o.order_id)
            .or(body.order_id)
            .ok_or_else(|| ApiError::Parse("order id missing from create response".to_string()))?;

        debug!(order_id = %order_id, "Order created");
        Ok(CreatedOrder { order_id })
    }

    /// Update an order's payment status.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the store rejects the update.
    #[instrument(skip(self, update), fields(order_id = %update.order_id, status = %update.payment_status))]
    pub async fn update_order(&self, update: &OrderStatusUpdate) -> Result<(), ApiError> {
        let url = self.endpoint(&["orders"])?;
        let response = self.http().put(url).json(update).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// All orders placed with an email address, in any status.
    ///
    /// Records that do not describe a valid order are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not a list of
    /// records.
    #[instrument(skip(self, email), fields(email = %email))]
    pub async fn orders_by_email(&self, email: &Email) -> Result<Vec<Order>, ApiError> {
        let mut url = self.endpoint(&["orders"])?;
        url.query_pairs_mut().append_pair("email", email.as_str());

        let response = self.http().get(url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let records = match read_json::<OrdersBody>(response).await? {
            OrdersBody::Bare(records) | OrdersBody::Wrapped { orders: records } => records,
        };
        Ok(parse_orders(records))
    }

    /// A single order by id, or `None` if the store has no such order.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body cannot be parsed.
    #[instrument(skip(self, order_id), fields(order_id = %order_id))]
    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, ApiError> {
        let mut url = self.endpoint(&["orders"])?;
        url.query_pairs_mut().append_pair("orderId", order_id.as_str());

        let response = self.http().get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(Some(match read_json::<OrderBody>(response).await? {
            OrderBody::Wrapped { order } | OrderBody::Bare(order) => order,
        }))
    }
}

/// Upgrade raw order records, dropping the ones that cannot become an
/// [`Order`].
fn parse_orders(records: Vec<serde_json::Value>) -> Vec<Order> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            serde_json::from_value(record)
                .map_err(|e| warn!(index, error = %e, "Skipping malformed order record"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_body_wrapped() {
        let body: CreateOrderBody =
            serde_json::from_str(r#"{"success":true,"order":{"_id":"665f"}}"#).unwrap();
        assert_eq!(body.order.unwrap().order_id.as_str(), "665f");
    }

    #[test]
    fn test_create_body_bare() {
        let body: CreateOrderBody = serde_json::from_str(r#"{"orderId":"o-1"}"#).unwrap();
        assert_eq!(body.order_id.unwrap().as_str(), "o-1");
    }

    #[test]
    fn test_create_body_failure() {
        let body: CreateOrderBody =
            serde_json::from_str(r#"{"success":false,"message":"Invalid phone"}"#).unwrap();
        assert_eq!(body.success, Some(false));
        assert_eq!(body.message.as_deref(), Some("Invalid phone"));
    }

    #[test]
    fn test_orders_body_shapes() {
        let bare: OrdersBody = serde_json::from_str("[]").unwrap();
        assert!(matches!(bare, OrdersBody::Bare(v) if v.is_empty()));
        let wrapped: OrdersBody = serde_json::from_str(r#"{"orders":[]}"#).unwrap();
        assert!(matches!(wrapped, OrdersBody::Wrapped { orders } if orders.is_empty()));
    }

    #[test]
    fn test_parse_orders_skips_bad_records() {
        let records: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                {"_id":"o-1","customer":{"name":"Asha Rao","email":"asha@example.in","phone":"9876543210"},"subtotal":0,"total":0,"paymentStatus":"completed"},
                {"_id":"o-2","customer":{"name":"Asha Rao","email":"asha@example.in","phone":"9876543210"},"items":[{"id":"t1","unitPrice":500,"quantity":0}],"subtotal":0,"total":0},
                "not an order"
            ]"#,
        )
        .unwrap();
        let orders = parse_orders(records);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id.as_str(), "o-1");
    }
}
