mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use food_delivery_api::{app::build_app, models::Role};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    build_app(common::lazy_state())
}

async fn send(
    method: &str,
    uri: &str,
    auth: Option<String>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (status, body) = send("GET", "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let (status, _) = send("GET", "/api/user", Some("Bearer not.a.jwt".into()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customer_cannot_create_menu() {
    let payload = json!({
        "restaurant_id": Uuid::new_v4(),
        "name": "Pastilla",
        "price": 4000
    });
    let (status, _) = send(
        "POST",
        "/api/menus",
        Some(common::bearer(Role::Customer)),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn customer_cannot_create_restaurant() {
    let payload = json!({
        "name": "Chez Moi",
        "address": "Rue 1",
        "phone": "0611111111",
        "city": "Rabat"
    });
    let (status, body) = send(
        "POST",
        "/api/restaurants",
        Some(common::bearer(Role::Customer)),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");
}

#[tokio::test]
async fn negative_menu_price_is_unprocessable() {
    let payload = json!({
        "restaurant_id": Uuid::new_v4(),
        "name": "Pastilla",
        "price": -1
    });
    let (status, body) = send(
        "POST",
        "/api/menus",
        Some(common::bearer(Role::Restaurant)),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["data"]["errors"]["price"][0],
        "The price must be at least 0."
    );
}

#[tokio::test]
async fn cart_quantity_below_one_is_unprocessable() {
    let payload = json!({ "menu_id": Uuid::new_v4(), "quantity": 0 });
    let (status, body) = send(
        "POST",
        "/api/cart",
        Some(common::bearer(Role::Customer)),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["data"]["errors"]["quantity"].is_array());
}

#[tokio::test]
async fn restaurant_owner_cannot_use_cart() {
    let (status, _) = send(
        "GET",
        "/api/cart",
        Some(common::bearer(Role::Restaurant)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_order_status_is_unprocessable() {
    let uri = format!("/api/orders/{}", Uuid::new_v4());
    let (status, body) = send(
        "PUT",
        &uri,
        Some(common::bearer(Role::Admin)),
        Some(json!({ "status": "paid" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["data"]["errors"]["status"].is_array());
}

#[tokio::test]
async fn payments_admin_is_admin_only() {
    let (status, _) = send(
        "GET",
        "/api/payments",
        Some(common::bearer(Role::Customer)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn order_items_admin_is_admin_only() {
    let (status, _) = send(
        "DELETE",
        &format!("/api/order-items/{}", Uuid::new_v4()),
        Some(common::bearer(Role::Restaurant)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_route_returns_not_found_envelope() {
    let (status, body) = send("GET", "/api/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["path"], "/api/nothing-here");
}
