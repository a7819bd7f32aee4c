use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::menus::MenuListing;

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeStatus {
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikedMenuList {
    pub items: Vec<MenuListing>,
}
