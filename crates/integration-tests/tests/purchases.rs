//! Purchase history lookups.

#![allow(clippy::unwrap_used)]

use counsel_core::{Email, OrderId};
use counsel_integration_tests::api_client;
use counsel_storefront::{LookupError, Purchases, purchases};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMAIL: &str = "asha@example.in";

fn order(id: &str, status: &str, created_at: &str) -> Value {
    json!({
        "_id": id,
        "customer": { "name": "Asha Rao", "email": EMAIL, "phone": "9876543210" },
        "items": [
            { "id": "t1", "title": "Rental Agreement", "price": "500", "quantity": 1, "isCustom": false }
        ],
        "subtotal": 500,
        "total": "500.00",
        "paymentMethod": "razorpay",
        "paymentStatus": status,
        "createdAt": created_at
    })
}

async fn mount_orders(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("email", EMAIL))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_only_completed_orders_newest_first() {
    let server = MockServer::start().await;
    mount_orders(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([
            order("o-old", "completed", "2026-01-05T09:00:00Z"),
            order("o-pending", "pending", "2026-02-01T09:00:00Z"),
            order("o-new", "completed", "2026-03-10T09:00:00Z"),
            order("o-failed", "failed", "2026-03-11T09:00:00Z"),
        ])),
    )
    .await;

    let result = purchases::lookup(&api_client(&server), &Email::parse(EMAIL).unwrap())
        .await
        .unwrap();

    let ids: Vec<&str> = result.orders().iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, ["o-new", "o-old"]);
    assert!(result.order(&OrderId::parse("o-pending").unwrap()).is_none());
    assert_eq!(result.orders()[0].items[0].title(), "Rental Agreement");
}

#[tokio::test]
async fn test_malformed_record_does_not_hide_purchases() {
    let server = MockServer::start().await;
    let mut broken = order("o-bad", "pending", "2026-02-01T09:00:00Z");
    broken["items"][0]["quantity"] = json!(0);
    broken["customer"]["phone"] = json!("");
    mount_orders(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([
            order("o-good", "completed", "2026-01-05T09:00:00Z"),
            broken,
            json!({ "_id": "o-junk" }),
        ])),
    )
    .await;

    let result = purchases::lookup(&api_client(&server), &Email::parse(EMAIL).unwrap())
        .await
        .unwrap();

    let ids: Vec<&str> = result.orders().iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, ["o-good"]);
}

#[tokio::test]
async fn test_wrapped_response_without_purchases_is_none_found() {
    let server = MockServer::start().await;
    mount_orders(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "orders": [order("o-pending", "pending", "2026-02-01T09:00:00Z")]
        })),
    )
    .await;

    let result = purchases::lookup(&api_client(&server), &Email::parse(EMAIL).unwrap())
        .await
        .unwrap();

    assert_eq!(result, Purchases::NoneFound);
}

#[tokio::test]
async fn test_server_error_is_not_an_empty_history() {
    let server = MockServer::start().await;
    mount_orders(
        &server,
        ResponseTemplate::new(500).set_body_json(json!({ "error": "database unavailable" })),
    )
    .await;

    let err = purchases::lookup(&api_client(&server), &Email::parse(EMAIL).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, LookupError::Api(_)));
    assert_eq!(
        err.user_message(),
        "Your purchases could not be loaded. Please try again later."
    );
}

#[tokio::test]
async fn test_order_by_id_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("orderId", "missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let order = api_client(&server)
        .order_by_id(&OrderId::parse("missing").unwrap())
        .await
        .unwrap();

    assert!(order.is_none());
}
