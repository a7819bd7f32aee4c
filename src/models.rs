use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{config::AppConfig, entity};

/// Declares a string-backed enum stored in a `TEXT` column.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "The selected value '{}' is invalid. Expected one of: {}",
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(Role {
    Admin => "admin",
    Restaurant => "restaurant",
    Customer => "customer",
});

text_enum!(OrderStatus {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

text_enum!(
    /// Whether an order has been settled.
    PaymentStatus {
        Unpaid => "unpaid",
        Paid => "paid",
    }
);

text_enum!(
    /// Lifecycle of a payment row. `Capturing` marks a capture in flight.
    PaymentState {
        Pending => "pending",
        Capturing => "capturing",
        Completed => "completed",
        Cancelled => "cancelled",
        Failed => "failed",
    }
);

text_enum!(PaymentMethod {
    Paypal => "paypal",
    Cash => "cash",
});

impl Role {
    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => &["manage users", "manage restaurants"],
            Role::Restaurant => &["manage menus", "manage orders"],
            Role::Customer => &["place orders", "manage orders"],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<entity::users::Model> for User {
    fn from(model: entity::users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Restaurant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entity::restaurants::Model> for Restaurant {
    fn from(model: entity::restaurants::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            address: model.address,
            phone: model.phone,
            city: model.city,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestaurantSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&entity::restaurants::Model> for RestaurantSummary {
    fn from(model: &entity::restaurants::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Menu {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    /// Price in minor units.
    pub price: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_path: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Menu {
    pub fn from_entity(model: entity::menus::Model, config: &AppConfig) -> Self {
        let image_url = config.image_url(model.image_path.as_deref());
        Self {
            id: model.id,
            restaurant_id: model.restaurant_id,
            name: model.name,
            price: model.price,
            description: model.description,
            category: model.category,
            image_path: model.image_path,
            image_url,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entity::orders::Model> for Order {
    fn from(model: entity::orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            total_amount: model.total_amount,
            status: model.status,
            payment_status: model.payment_status,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menu_id: Uuid,
    pub quantity: i32,
    /// Menu price when the item was written.
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

impl From<entity::order_items::Model> for OrderItem {
    fn from(model: entity::order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            menu_id: model.menu_id,
            quantity: model.quantity,
            price: model.price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_method: String,
    pub amount: i64,
    pub status: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entity::payments::Model> for Payment {
    fn from(model: entity::payments::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            payment_method: model.payment_method,
            amount: model.amount,
            status: model.status,
            transaction_id: model.transaction_id,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Formats minor units with two decimals, e.g. `1234` -> `"12.34"`.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_text() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().ok(), Some(*status));
        }
        assert_eq!("restaurant".parse::<Role>().ok(), Some(Role::Restaurant));
    }

    #[test]
    fn unknown_status_lists_choices() {
        let err = "paid".parse::<OrderStatus>().unwrap_err();
        assert!(err.contains("pending, processing, shipped, delivered, cancelled"));
    }

    #[test]
    fn minor_units_format_with_two_decimals() {
        assert_eq!(format_minor_units(1234), "12.34");
        assert_eq!(format_minor_units(5), "0.05");
        assert_eq!(format_minor_units(100), "1.00");
        assert_eq!(format_minor_units(-250), "-2.50");
    }

    #[test]
    fn customer_permissions() {
        assert_eq!(
            Role::Customer.permissions(),
            &["place orders", "manage orders"]
        );
    }
}
