use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Menu, RestaurantSummary},
    routes::params::{MenuSortBy, Pagination, SortOrder},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuRequest {
    pub restaurant_id: Uuid,
    pub name: String,
    /// Minor units, must be >= 0.
    pub price: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMenuRequest {
    pub restaurant_id: Option<Uuid>,
    pub name: Option<String>,
    pub price: Option<i64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MenuQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub restaurant_id: Option<Uuid>,
    pub category: Option<String>,
    /// Search on name and description.
    pub q: Option<String>,
    pub sort_by: Option<MenuSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl MenuQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuListing {
    #[serde(flatten)]
    pub menu: Menu,
    pub likes_count: i64,
    pub restaurant: Option<RestaurantSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuList {
    pub items: Vec<MenuListing>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<String>,
}
