use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Menu, Restaurant},
    routes::params::Pagination,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRestaurantRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub city: String,
    /// Owner; only honoured for admins.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RestaurantQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Search on name and address.
    pub q: Option<String>,
    pub city: Option<String>,
}

impl RestaurantQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantList {
    pub items: Vec<Restaurant>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantWithMenus {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub menus: Vec<Menu>,
}
