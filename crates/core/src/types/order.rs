//! Orders as created in and returned by the Order Store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::customer::CustomerInfo;
use super::id::{GatewayOrderId, OrderId, PaymentId};
use super::lenient;
use super::line_item::LineItem;
use super::price::{CurrencyCode, Price, PriceError};
use super::status::{PaymentMethod, PaymentStatus};

/// Subtotal and total of a set of line items.
///
/// There is no tax or shipping, so `total == subtotal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Price,
    pub total: Price,
}

impl OrderTotals {
    /// Sum line totals. An empty slice totals zero in the default currency.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::OutOfRange`] if a line or the sum overflows.
    pub fn from_items(items: &[LineItem]) -> Result<Self, PriceError> {
        let currency = items
            .first()
            .map_or_else(CurrencyCode::default, |item| {
                item.unit_price().currency_code()
            });
        let subtotal = items
            .iter()
            .try_fold(Price::zero(currency), |acc, item| {
                acc.checked_add(item.line_total()?)
            })?;
        Ok(Self {
            subtotal,
            total: subtotal,
        })
    }

    /// Zero-total orders skip the gateway.
    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        if self.total.is_zero() {
            PaymentMethod::Free
        } else {
            PaymentMethod::Gateway
        }
    }
}

/// Body of an Order Store create request.
///
/// Carries a snapshot of the items, not a reference to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer: CustomerInfo,
    pub items: Vec<LineItem>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total: Decimal,
    pub payment_method: PaymentMethod,
}

impl NewOrder {
    /// Build a create request from a cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::OutOfRange`] if the totals overflow.
    pub fn new(customer: CustomerInfo, items: Vec<LineItem>) -> Result<Self, PriceError> {
        let totals = OrderTotals::from_items(&items)?;
        Ok(Self {
            customer,
            items,
            subtotal: totals.subtotal.amount(),
            total: totals.total.amount(),
            payment_method: totals.payment_method(),
        })
    }
}

/// An order record owned by the Order Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id", alias = "id")]
    pub order_id: OrderId,
    pub customer: CustomerInfo,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(
        deserialize_with = "lenient::decimal",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub subtotal: Decimal,
    #[serde(
        deserialize_with = "lenient::decimal",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub total: Decimal,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }
}

/// Body of an Order Store status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_id: OrderId,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<GatewayOrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl OrderStatusUpdate {
    /// Mark an order paid with the verified gateway identifiers.
    #[must_use]
    pub const fn completed(
        order_id: OrderId,
        payment_id: Option<PaymentId>,
        gateway_order_id: Option<GatewayOrderId>,
    ) -> Self {
        Self {
            order_id,
            payment_status: PaymentStatus::Completed,
            payment_id,
            gateway_order_id,
            failure_reason: None,
        }
    }

    /// Mark an order failed.
    #[must_use]
    pub fn failed(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            payment_status: PaymentStatus::Failed,
            payment_id: None,
            gateway_order_id: None,
            failure_reason: Some(reason.into()),
        }
    }
}
