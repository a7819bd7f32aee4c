use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{auth::CurrentUser, likes::LikedMenuList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::{auth_service::current_user, like_service::liked_menus},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me))
        .route("/likes", get(my_likes))
}

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Current user with role and permissions", body = ApiResponse<CurrentUser>),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CurrentUser>>> {
    let resp = current_user(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/user/likes",
    responses(
        (status = 200, description = "Menu items liked by the caller", body = ApiResponse<LikedMenuList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Likes"
)]
pub async fn my_likes(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<LikedMenuList>>> {
    let resp = liked_menus(&state, &user).await?;
    Ok(Json(resp))
}
