pub mod auth;
pub mod cart;
pub mod likes;
pub mod menus;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod restaurants;
