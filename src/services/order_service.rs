use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, Query, SelectStatement},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderList, OrderListQuery, OrderWithItems, UpdateOrderRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        menus::{Column as MenuCol, Entity as Menus, Model as MenuModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        restaurants::{Column as RestaurantCol, Entity as Restaurants},
        users::Entity as Users,
    },
    error::{AppError, AppResult, ValidationErrors},
    middleware::auth::{AuthUser, ensure_any_role},
    models::{Order, OrderItem, OrderStatus, PaymentStatus, Role},
    response::{ApiResponse, Meta},
    routes::params::SortOrder,
    state::AppState,
};

/// Σ price × quantity over `(price, quantity)` lines. Amounts that do not
/// fit in an `i64` are rejected as a 422 on `total_amount`.
pub fn compute_total<I>(lines: I) -> AppResult<i64>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    lines
        .into_iter()
        .try_fold(0i64, |total, (price, quantity)| {
            price
                .checked_mul(i64::from(quantity))
                .and_then(|line| total.checked_add(line))
        })
        .ok_or_else(|| {
            AppError::Validation(ValidationErrors::single(
                "total_amount",
                "The total amount is too large.",
            ))
        })
}

/// Ids of orders containing a menu of a restaurant owned by `owner_id`.
fn involved_order_ids(owner_id: Uuid) -> SelectStatement {
    Query::select()
        .column((OrderItems, OrderItemCol::OrderId))
        .from(OrderItems)
        .inner_join(
            Menus,
            Expr::col((Menus, MenuCol::Id)).equals((OrderItems, OrderItemCol::MenuId)),
        )
        .inner_join(
            Restaurants,
            Expr::col((Restaurants, RestaurantCol::Id)).equals((Menus, MenuCol::RestaurantId)),
        )
        .and_where(Expr::col((Restaurants, RestaurantCol::UserId)).eq(owner_id))
        .to_owned()
}

/// Orders the caller is allowed to see.
pub fn visible_to(user: &AuthUser) -> Condition {
    match user.role {
        Role::Admin => Condition::all(),
        Role::Customer => Condition::all().add(OrderCol::UserId.eq(user.user_id)),
        Role::Restaurant => {
            Condition::all().add(OrderCol::Id.in_subquery(involved_order_ids(user.user_id)))
        }
    }
}

/// Hidden orders are reported as missing.
pub async fn find_visible_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .filter(visible_to(user))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

fn validate_lines(payload: &CreateOrderRequest) -> AppResult<()> {
    let mut errors = ValidationErrors::new();
    if payload.items.is_empty() {
        errors.add("items", "The items field is required.");
    }
    for (idx, line) in payload.items.iter().enumerate() {
        if line.quantity < 1 {
            errors.add(
                &format!("items.{idx}.quantity"),
                "The quantity must be at least 1.",
            );
        }
    }
    errors.into_result()
}

async fn insert_order(
    txn: &DatabaseTransaction,
    owner_id: Uuid,
    lines: &[(MenuModel, i32)],
) -> AppResult<(OrderModel, Vec<OrderItemModel>)> {
    let total_amount = compute_total(lines.iter().map(|(menu, qty)| (menu.price, *qty)))?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner_id),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending.as_str().into()),
        payment_status: Set(PaymentStatus::Unpaid.as_str().into()),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (menu, quantity) in lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            menu_id: Set(menu.id),
            quantity: Set(*quantity),
            price: Set(menu.price),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;
        items.push(item);
    }

    Ok((order, items))
}

/// Rewrites the stored total from the order's current items.
pub async fn recompute_total(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(txn)
        .await?;

    let mut active: OrderActive = order.into();
    active.total_amount = Set(compute_total(items.iter().map(|i| (i.price, i.quantity)))?);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(txn).await?)
}

async fn load_items(state: &AppState, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect())
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = visible_to(user);
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_any_role(user, &[Role::Admin, Role::Customer])?;
    validate_lines(&payload)?;

    let owner_id = match payload.user_id {
        Some(owner_id) if user.is_admin() => {
            if Users::find_by_id(owner_id).one(&state.orm).await?.is_none() {
                return Err(AppError::Validation(ValidationErrors::single(
                    "user_id",
                    "The selected user_id is invalid.",
                )));
            }
            owner_id
        }
        _ => user.user_id,
    };

    let txn = state.orm.begin().await?;

    let mut lines = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let menu = Menus::find_by_id(line.menu_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Menu item {}", line.menu_id)))?;
        lines.push((menu, line.quantity));
    }

    let (order, items) = insert_order(&txn, owner_id, &lines).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(OrderItem::from).collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_any_role(user, &[Role::Admin, Role::Customer])?;

    let txn = state.orm.begin().await?;

    let lines: Vec<(MenuModel, i32)> = CartItems::find()
        .find_also_related(Menus)
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(&txn)
        .await?
        .into_iter()
        .filter_map(|(item, menu)| menu.map(|m| (m, item.quantity)))
        .collect();

    if lines.is_empty() {
        return Err(AppError::Validation(ValidationErrors::single(
            "cart",
            "Your cart is empty.",
        )));
    }

    let (order, items) = insert_order(&txn, user.user_id, &lines).await?;

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(OrderItem::from).collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_visible_order(state, user, id).await?;
    let items = load_items(state, order.id).await?;

    Ok(ApiResponse::success(
        "Order",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    let status: OrderStatus = payload
        .status
        .trim()
        .parse()
        .map_err(|msg: String| AppError::Validation(ValidationErrors::single("status", msg)))?;

    let order = find_visible_order(state, user, id).await?;
    let mut active: OrderActive = order.into();
    active.status = Set(status.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": status }),
    )
    .await;

    let items = load_items(state, order.id).await?;
    Ok(ApiResponse::success(
        "Order updated",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    let order = find_visible_order(state, user, id).await?;

    Orders::delete_by_id(order.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::orders::OrderLine;

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        assert_eq!(compute_total([(1000, 2), (250, 3), (0, 5)]).unwrap(), 2750);
        assert_eq!(compute_total(Vec::<(i64, i32)>::new()).unwrap(), 0);
    }

    #[test]
    fn oversized_total_is_a_validation_error() {
        match compute_total([(i64::MAX / 2, 3)]) {
            Err(AppError::Validation(errors)) => assert!(errors.contains("total_amount")),
            other => panic!("expected validation error, got {other:?}"),
        }
        // each line fits, the sum does not
        assert!(matches!(
            compute_total([(i64::MAX / 2, 1), (i64::MAX / 2, 1), (2, 1)]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn empty_order_is_rejected() {
        let payload = CreateOrderRequest {
            items: vec![],
            user_id: None,
        };
        match validate_lines(&payload) {
            Err(AppError::Validation(errors)) => assert!(errors.contains("items")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        let payload = CreateOrderRequest {
            items: vec![
                OrderLine {
                    menu_id: Uuid::new_v4(),
                    quantity: 1,
                },
                OrderLine {
                    menu_id: Uuid::new_v4(),
                    quantity: 0,
                },
            ],
            user_id: None,
        };
        match validate_lines(&payload) {
            Err(AppError::Validation(errors)) => assert!(errors.contains("items.1.quantity")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
