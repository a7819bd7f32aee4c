use sea_orm::{
    ColumnTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::likes::{LikeStatus, LikedMenuList},
    entity::{
        menu_likes::Column as LikeCol,
        menus::{self, Entity as Menus},
        restaurants::Entity as Restaurants,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::menu_service::{build_listings, find_menu},
    state::AppState,
};

async fn likes_count(state: &AppState, menu_id: Uuid) -> AppResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM menu_likes WHERE menu_id = $1")
        .bind(menu_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(count.0)
}

async fn is_liked(state: &AppState, user_id: Uuid, menu_id: Uuid) -> AppResult<bool> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT menu_id FROM menu_likes WHERE user_id = $1 AND menu_id = $2")
            .bind(user_id)
            .bind(menu_id)
            .fetch_optional(&state.pool)
            .await?;
    Ok(row.is_some())
}

pub async fn like_menu(
    state: &AppState,
    user: &AuthUser,
    menu_id: Uuid,
) -> AppResult<ApiResponse<LikeStatus>> {
    let menu = find_menu(state, menu_id).await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO menu_likes (user_id, menu_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, menu_id) DO NOTHING
        "#,
    )
    .bind(user.user_id)
    .bind(menu.id)
    .execute(&state.pool)
    .await?
    .rows_affected();

    let message = if inserted == 0 {
        "Menu item already liked"
    } else {
        audit::record(
            &state.pool,
            Some(user.user_id),
            "menu_like",
            "menu_likes",
            serde_json::json!({ "menu_id": menu.id }),
        )
        .await;
        "Menu item liked successfully"
    };

    let data = LikeStatus {
        liked: true,
        likes_count: likes_count(state, menu.id).await?,
    };
    Ok(ApiResponse::success(message, data, Some(Meta::empty())))
}

pub async fn unlike_menu(
    state: &AppState,
    user: &AuthUser,
    menu_id: Uuid,
) -> AppResult<ApiResponse<LikeStatus>> {
    let menu = find_menu(state, menu_id).await?;

    let removed = sqlx::query("DELETE FROM menu_likes WHERE user_id = $1 AND menu_id = $2")
        .bind(user.user_id)
        .bind(menu.id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if removed > 0 {
        audit::record(
            &state.pool,
            Some(user.user_id),
            "menu_unlike",
            "menu_likes",
            serde_json::json!({ "menu_id": menu.id }),
        )
        .await;
    }

    let data = LikeStatus {
        liked: false,
        likes_count: likes_count(state, menu.id).await?,
    };
    Ok(ApiResponse::success(
        "Menu item unliked successfully",
        data,
        Some(Meta::empty()),
    ))
}

pub async fn like_status(
    state: &AppState,
    user: &AuthUser,
    menu_id: Uuid,
) -> AppResult<ApiResponse<LikeStatus>> {
    let menu = find_menu(state, menu_id).await?;
    let data = LikeStatus {
        liked: is_liked(state, user.user_id, menu.id).await?,
        likes_count: likes_count(state, menu.id).await?,
    };
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

pub async fn liked_menus(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<LikedMenuList>> {
    let rows = Menus::find()
        .find_also_related(Restaurants)
        .join(JoinType::InnerJoin, menus::Relation::MenuLikes.def())
        .filter(LikeCol::UserId.eq(user.user_id))
        .order_by_desc(LikeCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let items = build_listings(state, rows).await?;
    Ok(ApiResponse::success(
        "Liked menu items",
        LikedMenuList { items },
        Some(Meta::empty()),
    ))
}
