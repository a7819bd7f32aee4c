use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::menus::{
        CategoryList, CreateMenuRequest, MenuList, MenuListing, MenuQuery, UpdateMenuRequest,
    },
    entity::{
        menus::{ActiveModel, Column, Entity as Menus, Model as MenuModel},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        restaurants::{Entity as Restaurants, Model as RestaurantModel},
    },
    error::{AppError, AppResult, ValidationErrors},
    middleware::auth::{AuthUser, ensure_any_role},
    models::{Menu, RestaurantSummary, Role},
    response::{ApiResponse, Meta},
    routes::params::{MenuSortBy, SortOrder},
    services::restaurant_service::{ensure_can_manage, find_restaurant},
    state::AppState,
};

pub const MENU_DEFAULT_PER_PAGE: i64 = 10;

pub fn validate_create(payload: &CreateMenuRequest) -> AppResult<()> {
    let mut errors = ValidationErrors::new();
    errors.require_non_blank("name", &payload.name);
    check_price(payload.price, &mut errors);
    errors.into_result()
}

pub fn validate_update(payload: &UpdateMenuRequest) -> AppResult<()> {
    let mut errors = ValidationErrors::new();
    if let Some(name) = &payload.name {
        errors.require_non_blank("name", name);
    }
    if let Some(price) = payload.price {
        check_price(price, &mut errors);
    }
    errors.into_result()
}

fn check_price(price: i64, errors: &mut ValidationErrors) {
    if price < 0 {
        errors.add("price", "The price must be at least 0.");
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn find_menu(state: &AppState, id: Uuid) -> AppResult<MenuModel> {
    Menus::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))
}

pub async fn likes_counts(state: &AppState, menu_ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>> {
    if menu_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT menu_id, COUNT(*)
        FROM menu_likes
        WHERE menu_id = ANY($1)
        GROUP BY menu_id
        "#,
    )
    .bind(menu_ids)
    .fetch_all(&state.pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Attach like counts and restaurant summaries to menu rows.
pub async fn build_listings(
    state: &AppState,
    rows: Vec<(MenuModel, Option<RestaurantModel>)>,
) -> AppResult<Vec<MenuListing>> {
    let ids: Vec<Uuid> = rows.iter().map(|(m, _)| m.id).collect();
    let counts = likes_counts(state, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|(menu, restaurant)| MenuListing {
            likes_count: counts.get(&menu.id).copied().unwrap_or(0),
            restaurant: restaurant.as_ref().map(RestaurantSummary::from),
            menu: Menu::from_entity(menu, &state.config),
        })
        .collect())
}

pub async fn list_menus(state: &AppState, query: MenuQuery) -> AppResult<ApiResponse<MenuList>> {
    let (page, limit, offset) = query.pagination().normalize_with(MENU_DEFAULT_PER_PAGE);
    let mut condition = Condition::all();

    if let Some(restaurant_id) = query.restaurant_id {
        condition = condition.add(Column::RestaurantId.eq(restaurant_id));
    }
    if let Some(category) = query.category.as_ref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(Column::Category.eq(category.trim()));
    }
    if let Some(search) = query.q.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Menus, Column::Name)).ilike(pattern.clone()))
                .add(Expr::col((Menus, Column::Description)).ilike(pattern)),
        );
    }

    let sort_col = match query.sort_by.unwrap_or(MenuSortBy::Name) {
        MenuSortBy::Name => Column::Name,
        MenuSortBy::Price => Column::Price,
        MenuSortBy::CreatedAt => Column::CreatedAt,
    };

    let total = Menus::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await? as i64;

    let mut finder = Menus::find()
        .find_also_related(Restaurants)
        .filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Asc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = build_listings(state, rows).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "All menu items retrieved successfully",
        MenuList { items },
        Some(meta),
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT category FROM menus WHERE category IS NOT NULL ORDER BY category ASC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Food categories retrieved successfully",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_menu(state: &AppState, id: Uuid) -> AppResult<ApiResponse<MenuListing>> {
    let row = Menus::find_by_id(id)
        .find_also_related(Restaurants)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))?;

    let listing = build_listings(state, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Menu item"))?;
    Ok(ApiResponse::success("Menu item", listing, Some(Meta::empty())))
}

pub async fn create_menu(
    state: &AppState,
    user: &AuthUser,
    payload: CreateMenuRequest,
) -> AppResult<ApiResponse<Menu>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    validate_create(&payload)?;

    let restaurant = find_restaurant(state, payload.restaurant_id).await?;
    ensure_can_manage(user, &restaurant)?;

    let menu = ActiveModel {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant.id),
        name: Set(payload.name.trim().to_string()),
        price: Set(payload.price),
        description: Set(non_blank(payload.description)),
        category: Set(non_blank(payload.category)),
        image_path: Set(non_blank(payload.image_path)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "menu_create",
        "menus",
        serde_json::json!({ "menu_id": menu.id, "restaurant_id": restaurant.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item created",
        Menu::from_entity(menu, &state.config),
        Some(Meta::empty()),
    ))
}

pub async fn update_menu(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateMenuRequest,
) -> AppResult<ApiResponse<Menu>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    validate_update(&payload)?;

    let existing = find_menu(state, id).await?;
    let restaurant = find_restaurant(state, existing.restaurant_id).await?;
    ensure_can_manage(user, &restaurant)?;

    let mut active: ActiveModel = existing.into();
    if let Some(restaurant_id) = payload.restaurant_id.filter(|r| *r != restaurant.id) {
        let target = find_restaurant(state, restaurant_id).await?;
        ensure_can_manage(user, &target)?;
        active.restaurant_id = Set(target.id);
    }
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if payload.description.is_some() {
        active.description = Set(non_blank(payload.description));
    }
    if payload.category.is_some() {
        active.category = Set(non_blank(payload.category));
    }
    if payload.image_path.is_some() {
        active.image_path = Set(non_blank(payload.image_path));
    }
    active.updated_at = Set(Utc::now().into());
    let menu = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "menu_update",
        "menus",
        serde_json::json!({ "menu_id": menu.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item updated",
        Menu::from_entity(menu, &state.config),
        Some(Meta::empty()),
    ))
}

pub async fn delete_menu(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    let existing = find_menu(state, id).await?;
    let restaurant = find_restaurant(state, existing.restaurant_id).await?;
    ensure_can_manage(user, &restaurant)?;

    let ordered = OrderItems::find()
        .filter(OrderItemCol::MenuId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "Menu item is referenced by existing orders".into(),
        ));
    }

    Menus::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "menu_delete",
        "menus",
        serde_json::json!({ "menu_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(price: i64, name: &str) -> CreateMenuRequest {
        CreateMenuRequest {
            restaurant_id: Uuid::new_v4(),
            name: name.into(),
            price,
            description: None,
            category: Some("Tagine".into()),
            image_path: None,
        }
    }

    #[test]
    fn negative_price_is_rejected() {
        match validate_create(&create(-1, "Couscous")) {
            Err(AppError::Validation(errors)) => assert!(errors.contains("price")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn zero_price_is_allowed() {
        assert!(validate_create(&create(0, "Water")).is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(validate_create(&create(500, "   ")).is_err());
    }

    #[test]
    fn update_validates_only_present_fields() {
        let payload = UpdateMenuRequest {
            restaurant_id: None,
            name: None,
            price: Some(-5),
            description: None,
            category: None,
            image_path: None,
        };
        assert!(validate_update(&payload).is_err());

        let payload = UpdateMenuRequest {
            price: None,
            ..payload
        };
        assert!(validate_update(&payload).is_ok());
    }

    #[test]
    fn blank_optional_text_becomes_null() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" Pizza ".into())).as_deref(), Some("Pizza"));
    }
}
