use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::order_items::{
        CreateOrderItemRequest, OrderItemList, OrderItemQuery, UpdateOrderItemRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderItem,
    response::ApiResponse,
    services::order_item_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_order_items).post(create_order_item))
        .route(
            "/{id}",
            get(get_order_item)
                .put(update_order_item)
                .delete(delete_order_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/order-items",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("order_id" = Option<Uuid>, Query, description = "Filter by order")
    ),
    responses(
        (status = 200, description = "List order items", body = ApiResponse<OrderItemList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Order Items"
)]
pub async fn list_order_items(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderItemQuery>,
) -> AppResult<Json<ApiResponse<OrderItemList>>> {
    let resp = order_item_service::list_order_items(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/order-items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    responses(
        (status = 200, description = "Order item", body = ApiResponse<OrderItem>),
        (status = 404, description = "Order item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Order Items"
)]
pub async fn get_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let resp = order_item_service::get_order_item(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/order-items",
    request_body = CreateOrderItemRequest,
    responses(
        (status = 201, description = "Order item created", body = ApiResponse<OrderItem>),
        (status = 404, description = "Order or menu item not found"),
        (status = 422, description = "Validation error")
    ),
    security(("bearer_auth" = [])),
    tag = "Order Items"
)]
pub async fn create_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderItem>>)> {
    let resp = order_item_service::create_order_item(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/order-items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    request_body = UpdateOrderItemRequest,
    responses(
        (status = 200, description = "Order item updated", body = ApiResponse<OrderItem>),
        (status = 404, description = "Order item not found"),
        (status = 422, description = "Validation error")
    ),
    security(("bearer_auth" = [])),
    tag = "Order Items"
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let resp = order_item_service::update_order_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/order-items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    responses(
        (status = 200, description = "Order item deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Order item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Order Items"
)]
pub async fn delete_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = order_item_service::delete_order_item(&state, &user, id).await?;
    Ok(Json(resp))
}
