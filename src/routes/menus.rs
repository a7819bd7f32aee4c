use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        likes::LikeStatus,
        menus::{CategoryList, CreateMenuRequest, MenuList, MenuListing, MenuQuery, UpdateMenuRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Menu,
    response::ApiResponse,
    services::{like_service, menu_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_menus).post(create_menu))
        .route("/categories", get(list_categories))
        .route("/{id}", get(get_menu).put(update_menu).delete(delete_menu))
        .route("/{id}/like", get(like_status).post(like_menu))
        .route("/{id}/unlike", post(unlike_menu))
}

#[utoipa::path(
    get,
    path = "/api/menus",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10"),
        ("restaurant_id" = Option<Uuid>, Query, description = "Filter by restaurant"),
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("q" = Option<String>, Query, description = "Search by name or description"),
        ("sort_by" = Option<String>, Query, description = "name | price | created_at"),
        ("sort_order" = Option<String>, Query, description = "asc | desc")
    ),
    responses(
        (status = 200, description = "List menu items", body = ApiResponse<MenuList>)
    ),
    tag = "Menus"
)]
pub async fn list_menus(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> AppResult<Json<ApiResponse<MenuList>>> {
    let resp = menu_service::list_menus(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/menus/categories",
    responses(
        (status = 200, description = "Distinct food categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Menus"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = menu_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item", body = ApiResponse<MenuListing>),
        (status = 404, description = "Menu item not found")
    ),
    tag = "Menus"
)]
pub async fn get_menu(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MenuListing>>> {
    let resp = menu_service::get_menu(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/menus",
    request_body = CreateMenuRequest,
    responses(
        (status = 201, description = "Menu item created", body = ApiResponse<Menu>),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Validation error")
    ),
    security(("bearer_auth" = [])),
    tag = "Menus"
)]
pub async fn create_menu(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMenuRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Menu>>)> {
    let resp = menu_service::create_menu(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    request_body = UpdateMenuRequest,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<Menu>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Menu item not found"),
        (status = 422, description = "Validation error")
    ),
    security(("bearer_auth" = [])),
    tag = "Menus"
)]
pub async fn update_menu(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuRequest>,
) -> AppResult<Json<ApiResponse<Menu>>> {
    let resp = menu_service::update_menu(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Menu item not found"),
        (status = 409, description = "Menu item is part of an order")
    ),
    security(("bearer_auth" = [])),
    tag = "Menus"
)]
pub async fn delete_menu(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = menu_service::delete_menu(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/menus/{id}/like",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item liked", body = ApiResponse<LikeStatus>),
        (status = 404, description = "Menu item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Likes"
)]
pub async fn like_menu(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LikeStatus>>> {
    let resp = like_service::like_menu(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/menus/{id}/unlike",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item unliked", body = ApiResponse<LikeStatus>),
        (status = 404, description = "Menu item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Likes"
)]
pub async fn unlike_menu(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LikeStatus>>> {
    let resp = like_service::unlike_menu(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/menus/{id}/like",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Like status for the caller", body = ApiResponse<LikeStatus>),
        (status = 404, description = "Menu item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Likes"
)]
pub async fn like_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LikeStatus>>> {
    let resp = like_service::like_status(&state, &user, id).await?;
    Ok(Json(resp))
}
