use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::{
        CreatePaymentRequest, InitiatePaymentRequest, InitiatePaymentResponse, PaymentCallbackQuery,
        PaymentCompleted, PaymentList, PaymentQuery, UpdatePaymentRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments).post(create_payment))
        .route("/initiate", post(initiate_payment))
        .route("/success", get(payment_success))
        .route("/cancel", get(payment_cancel))
        .route(
            "/{id}",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
}

#[utoipa::path(
    post,
    path = "/api/payments/initiate",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Remote order created; redirect the buyer to approval_url", body = ApiResponse<InitiatePaymentResponse>),
        (status = 400, description = "Amount must be greater than zero"),
        (status = 404, description = "Order not found"),
        (status = 422, description = "Order already paid"),
        (status = 502, description = "Payment processor error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InitiatePaymentRequest>,
) -> AppResult<Json<ApiResponse<InitiatePaymentResponse>>> {
    let resp = payment_service::initiate_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/success",
    params(
        ("token" = Option<String>, Query, description = "Remote order id"),
        ("orderID" = Option<String>, Query, description = "Alias of token")
    ),
    responses(
        (status = 200, description = "Payment captured", body = ApiResponse<PaymentCompleted>),
        (status = 400, description = "Payment is already completed"),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Capture already in progress or payment cancelled"),
        (status = 502, description = "Payment processor error")
    ),
    tag = "Payments"
)]
pub async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<PaymentCallbackQuery>,
) -> AppResult<Json<ApiResponse<PaymentCompleted>>> {
    let resp = payment_service::payment_success(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/cancel",
    params(("token" = Option<String>, Query, description = "Remote order id")),
    responses(
        (status = 400, description = "Payment was canceled by the user")
    ),
    tag = "Payments"
)]
pub async fn payment_cancel(
    State(state): State<AppState>,
    Query(query): Query<PaymentCallbackQuery>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = payment_service::payment_cancel(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by payment status"),
        ("order_id" = Option<Uuid>, Query, description = "Filter by order")
    ),
    responses(
        (status = 200, description = "List payments", body = ApiResponse<PaymentList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PaymentQuery>,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    let resp = payment_service::list_payments(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::get_payment(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = ApiResponse<Payment>),
        (status = 404, description = "Order not found"),
        (status = 422, description = "Validation error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Payment>>)> {
    let resp = payment_service::create_payment(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment updated", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn update_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::update_payment(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn delete_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = payment_service::delete_payment(&state, &user, id).await?;
    Ok(Json(resp))
}
