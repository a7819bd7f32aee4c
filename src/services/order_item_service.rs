use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::order_items::{
        CreateOrderItemRequest, OrderItemList, OrderItemQuery, UpdateOrderItemRequest,
    },
    entity::{
        menus::Entity as Menus,
        order_items::{ActiveModel, Column, Entity as OrderItems, Model as OrderItemModel},
        orders::Entity as Orders,
    },
    error::{AppError, AppResult, ValidationErrors},
    middleware::auth::{AuthUser, ensure_admin},
    models::OrderItem,
    response::{ApiResponse, Meta},
    services::order_service::recompute_total,
    state::AppState,
};

fn check_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::Validation(ValidationErrors::single(
            "quantity",
            "The quantity must be at least 1.",
        )));
    }
    Ok(())
}

async fn find_item(state: &AppState, id: Uuid) -> AppResult<OrderItemModel> {
    OrderItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order item"))
}

pub async fn list_order_items(
    state: &AppState,
    user: &AuthUser,
    query: OrderItemQuery,
) -> AppResult<ApiResponse<OrderItemList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(order_id) = query.order_id {
        condition = condition.add(Column::OrderId.eq(order_id));
    }

    let finder = OrderItems::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Order items",
        OrderItemList { items },
        Some(meta),
    ))
}

pub async fn get_order_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderItem>> {
    ensure_admin(user)?;
    let item = find_item(state, id).await?;
    Ok(ApiResponse::success("Order item", item.into(), Some(Meta::empty())))
}

pub async fn create_order_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderItemRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    ensure_admin(user)?;
    check_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(payload.order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    let menu = Menus::find_by_id(payload.menu_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))?;

    let item = ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        menu_id: Set(menu.id),
        quantity: Set(payload.quantity),
        price: Set(menu.price),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    let order = recompute_total(&txn, order.id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_item_create",
        "order_items",
        serde_json::json!({
            "order_item_id": item.id,
            "order_id": order.id,
            "total_amount": order.total_amount,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order item created",
        item.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_order_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderItemRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    ensure_admin(user)?;
    check_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let existing = OrderItems::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order item"))?;
    let menu = Menus::find_by_id(existing.menu_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))?;

    let mut active: ActiveModel = existing.into();
    active.quantity = Set(payload.quantity);
    active.price = Set(menu.price);
    let item = active.update(&txn).await?;
    let order = recompute_total(&txn, item.order_id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_item_update",
        "order_items",
        serde_json::json!({
            "order_item_id": item.id,
            "quantity": item.quantity,
            "total_amount": order.total_amount,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order item updated",
        item.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_order_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = OrderItems::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order item"))?;
    OrderItems::delete_by_id(existing.id).exec(&txn).await?;
    let order = recompute_total(&txn, existing.order_id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_item_delete",
        "order_items",
        serde_json::json!({
            "order_item_id": id,
            "order_id": order.id,
            "total_amount": order.total_amount,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order item deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive() {
        assert!(check_quantity(1).is_ok());
        assert!(matches!(check_quantity(0), Err(AppError::Validation(_))));
        assert!(matches!(check_quantity(-3), Err(AppError::Validation(_))));
    }
}
