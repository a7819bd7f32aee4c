use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartCount, CartItemDto, CartList, UpdateCartItemRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        menus::Entity as Menus,
    },
    error::{AppError, AppResult, ValidationErrors},
    middleware::auth::{AuthUser, ensure_any_role},
    models::{Menu, Role},
    response::{ApiResponse, Meta},
    services::{menu_service::find_menu, order_service::compute_total},
    state::AppState,
};

const CART_ROLES: &[Role] = &[Role::Admin, Role::Customer];

pub(crate) fn line_subtotal(price: i64, quantity: i32) -> AppResult<i64> {
    compute_total([(price, quantity)])
}

async fn load_cart(state: &AppState, user_id: Uuid) -> AppResult<CartList> {
    let rows = CartItems::find()
        .find_also_related(Menus)
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut lines = Vec::with_capacity(rows.len());
    let mut items = Vec::with_capacity(rows.len());
    for (item, menu) in rows {
        // cart rows cascade with their menu, so a missing menu is a race
        let Some(menu) = menu else { continue };
        lines.push((menu.price, item.quantity));
        items.push(CartItemDto {
            id: item.id,
            subtotal: line_subtotal(menu.price, item.quantity)?,
            menu: Menu::from_entity(menu, &state.config),
            quantity: item.quantity,
        });
    }
    let total = compute_total(lines)?;

    Ok(CartList { items, total })
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    ensure_any_role(user, CART_ROLES)?;
    let cart = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "Cart items retrieved",
        cart,
        Some(Meta::empty()),
    ))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartList>> {
    ensure_any_role(user, CART_ROLES)?;
    if payload.quantity < 1 {
        return Err(AppError::Validation(ValidationErrors::single(
            "quantity",
            "The quantity must be at least 1.",
        )));
    }
    let menu = find_menu(state, payload.menu_id).await?;

    let quantity: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO cart_items (user_id, menu_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, menu_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING quantity
        "#,
    )
    .bind(user.user_id)
    .bind(menu.id)
    .bind(payload.quantity)
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "menu_id": menu.id, "quantity": quantity }),
    )
    .await;

    let cart = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "Item added to cart",
        cart,
        Some(Meta::empty()),
    ))
}

pub async fn cart_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartCount>> {
    ensure_any_role(user, CART_ROLES)?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        CartCount { count },
        Some(Meta::empty()),
    ))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartList>> {
    ensure_any_role(user, CART_ROLES)?;
    if payload.quantity < 0 {
        return Err(AppError::Validation(ValidationErrors::single(
            "quantity",
            "The quantity must be at least 0.",
        )));
    }

    let affected = if payload.quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .execute(&state.pool)
            .await?
            .rows_affected()
    } else {
        sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .bind(payload.quantity)
            .execute(&state.pool)
            .await?
            .rows_affected()
    };
    if affected == 0 {
        return Err(AppError::not_found("Cart item"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "cart_item_id": id, "quantity": payload.quantity }),
    )
    .await;

    let cart = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", cart, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<CartList>> {
    ensure_any_role(user, CART_ROLES)?;
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Cart item"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "cart_item_id": id }),
    )
    .await;

    let cart = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "Item removed from cart",
        cart,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtotal_multiplies_quantity() {
        assert_eq!(line_subtotal(1250, 3).unwrap(), 3750);
        assert_eq!(line_subtotal(0, 10).unwrap(), 0);
        assert!(matches!(
            line_subtotal(i64::MAX / 2, 3),
            Err(AppError::Validation(_))
        ));
    }
}
