use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{models::OrderItem, routes::params::Pagination};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    pub order_id: Uuid,
    pub menu_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub order_id: Option<Uuid>,
}

impl OrderItemQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemList {
    pub items: Vec<OrderItem>,
}
