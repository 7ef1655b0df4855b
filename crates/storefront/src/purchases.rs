//! Purchase history lookup by email.

use counsel_core::{Email, Order, OrderId};
use thiserror::Error;
use tracing::{info, instrument};

use crate::api::{ApiClient, ApiError};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Order lookup failed: {0}")]
    Api(#[from] ApiError),
}

impl LookupError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) if e.is_transport() => {
                "We could not reach the server. Please try again.".to_string()
            }
            Self::Api(_) => "Your purchases could not be loaded. Please try again later.".to_string(),
        }
    }
}

/// Completed orders for an email. "Nothing bought" is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purchases {
    NoneFound,
    Found(Vec<Order>),
}

impl Purchases {
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        match self {
            Self::NoneFound => &[],
            Self::Found(orders) => orders,
        }
    }

    /// A completed order by id.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders().iter().find(|o| &o.order_id == order_id)
    }
}

/// Completed orders placed with `email`, newest first when dated.
///
/// Pending and failed orders are never purchases.
///
/// # Errors
///
/// Returns [`LookupError`] if the Order Store cannot be queried.
#[instrument(skip(api, email), fields(email = %email))]
pub async fn lookup(api: &ApiClient, email: &Email) -> Result<Purchases, LookupError> {
    let all = api.orders_by_email(email).await?;
    let total = all.len();

    let mut completed: Vec<Order> = all.into_iter().filter(Order::is_completed).collect();
    completed.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    info!(total, completed = completed.len(), "Orders looked up");
    if completed.is_empty() {
        Ok(Purchases::NoneFound)
    } else {
        Ok(Purchases::Found(completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_found_has_no_orders() {
        assert!(Purchases::NoneFound.orders().is_empty());
    }

    #[test]
    fn test_transport_message() {
        let err = LookupError::Api(ApiError::Parse("bad".to_string()));
        assert_eq!(
            err.user_message(),
            "Your purchases could not be loaded. Please try again later."
        );
    }
}
