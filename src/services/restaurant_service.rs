use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    dto::restaurants::{
        CreateRestaurantRequest, RestaurantList, RestaurantQuery, RestaurantWithMenus,
        UpdateRestaurantRequest,
    },
    entity::{
        menus::{self, Column as MenuCol, Entity as Menus},
        order_items::{self, Entity as OrderItems},
        restaurants::{ActiveModel, Column, Entity as Restaurants, Model as RestaurantModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult, ValidationErrors},
    middleware::auth::{AuthUser, ensure_any_role},
    models::{Menu, Restaurant, Role},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Admins manage every restaurant; restaurant owners manage their own.
pub fn can_manage(user: &AuthUser, restaurant: &RestaurantModel) -> bool {
    user.is_admin() || (user.role == Role::Restaurant && restaurant.user_id == user.user_id)
}

pub fn ensure_can_manage(user: &AuthUser, restaurant: &RestaurantModel) -> AppResult<()> {
    if can_manage(user, restaurant) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn find_restaurant(state: &AppState, id: Uuid) -> AppResult<RestaurantModel> {
    Restaurants::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Restaurant"))
}

pub fn validate_create(
    config: &AppConfig,
    payload: &CreateRestaurantRequest,
) -> Result<String, AppError> {
    let mut errors = ValidationErrors::new();
    errors.require_non_blank("name", &payload.name);
    errors.require_non_blank("address", &payload.address);
    errors.require_non_blank("phone", &payload.phone);
    let city = check_city(config, &payload.city, &mut errors);
    errors.into_result()?;
    Ok(city.unwrap_or_default())
}

pub fn validate_update(
    config: &AppConfig,
    payload: &UpdateRestaurantRequest,
) -> Result<Option<String>, AppError> {
    let mut errors = ValidationErrors::new();
    if let Some(name) = &payload.name {
        errors.require_non_blank("name", name);
    }
    if let Some(address) = &payload.address {
        errors.require_non_blank("address", address);
    }
    if let Some(phone) = &payload.phone {
        errors.require_non_blank("phone", phone);
    }
    let city = payload
        .city
        .as_deref()
        .and_then(|c| check_city(config, c, &mut errors));
    errors.into_result()?;
    Ok(city)
}

fn check_city(config: &AppConfig, city: &str, errors: &mut ValidationErrors) -> Option<String> {
    match config.canonical_city(city) {
        Some(canonical) => Some(canonical.to_string()),
        None => {
            errors.add(
                "city",
                format!(
                    "The city must be one of: {}",
                    config.allowed_cities.join(", ")
                ),
            );
            None
        }
    }
}

pub async fn list_restaurants(
    state: &AppState,
    query: RestaurantQuery,
) -> AppResult<ApiResponse<RestaurantList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Address).ilike(pattern)),
        );
    }
    if let Some(city) = query.city.as_ref().filter(|s| !s.trim().is_empty()) {
        // cities are stored in their canonical spelling; unknown ones match nothing
        let city = state.config.canonical_city(city).unwrap_or(city.trim());
        condition = condition.add(Column::City.eq(city));
    }

    let finder = Restaurants::find()
        .filter(condition)
        .order_by_asc(Column::Name);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Restaurant::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Restaurants",
        RestaurantList { items },
        Some(meta),
    ))
}

pub async fn list_my_restaurants(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<RestaurantList>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    let items: Vec<Restaurant> = Restaurants::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Restaurant::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Restaurants",
        RestaurantList { items },
        Some(Meta::new(1, total.max(1), total)),
    ))
}

pub async fn get_restaurant(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<RestaurantWithMenus>> {
    let restaurant = find_restaurant(state, id).await?;
    let menus = Menus::find()
        .filter(MenuCol::RestaurantId.eq(restaurant.id))
        .order_by_asc(MenuCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|m| Menu::from_entity(m, &state.config))
        .collect();

    Ok(ApiResponse::success(
        "Restaurant",
        RestaurantWithMenus {
            restaurant: restaurant.into(),
            menus,
        },
        Some(Meta::empty()),
    ))
}

pub async fn create_restaurant(
    state: &AppState,
    user: &AuthUser,
    payload: CreateRestaurantRequest,
) -> AppResult<ApiResponse<Restaurant>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    let city = validate_create(&state.config, &payload)?;

    let owner_id = match payload.user_id {
        Some(owner_id) if user.is_admin() && owner_id != user.user_id => {
            let owner = Users::find_by_id(owner_id).one(&state.orm).await?;
            match owner {
                Some(owner) if owner.role == Role::Restaurant.as_str() => owner.id,
                Some(_) => {
                    return Err(AppError::Validation(ValidationErrors::single(
                        "user_id",
                        "The owner must have the restaurant role.",
                    )));
                }
                None => {
                    return Err(AppError::Validation(ValidationErrors::single(
                        "user_id",
                        "The selected user_id is invalid.",
                    )));
                }
            }
        }
        _ => user.user_id,
    };

    let restaurant = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner_id),
        name: Set(payload.name.trim().to_string()),
        address: Set(payload.address.trim().to_string()),
        phone: Set(payload.phone.trim().to_string()),
        city: Set(city),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "restaurant_create",
        "restaurants",
        serde_json::json!({ "restaurant_id": restaurant.id, "owner_id": owner_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Restaurant created",
        restaurant.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_restaurant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateRestaurantRequest,
) -> AppResult<ApiResponse<Restaurant>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    let existing = find_restaurant(state, id).await?;
    ensure_can_manage(user, &existing)?;
    let city = validate_update(&state.config, &payload)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(address) = payload.address {
        active.address = Set(address.trim().to_string());
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone.trim().to_string());
    }
    if let Some(city) = city {
        active.city = Set(city);
    }
    active.updated_at = Set(Utc::now().into());
    let restaurant = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "restaurant_update",
        "restaurants",
        serde_json::json!({ "restaurant_id": restaurant.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Restaurant updated",
        restaurant.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_restaurant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_any_role(user, &[Role::Admin, Role::Restaurant])?;
    let existing = find_restaurant(state, id).await?;
    ensure_can_manage(user, &existing)?;

    let ordered = OrderItems::find()
        .join(JoinType::InnerJoin, order_items::Relation::Menus.def())
        .filter(menus::Column::RestaurantId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "Restaurant has menu items referenced by orders".into(),
        ));
    }

    Restaurants::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "restaurant_delete",
        "restaurants",
        serde_json::json!({ "restaurant_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Restaurant deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
