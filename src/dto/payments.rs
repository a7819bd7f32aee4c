use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Payment, PaymentMethod, PaymentState},
    routes::params::Pagination,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InitiatePaymentResponse {
    pub approval_url: String,
    pub transaction_id: String,
    pub payment: Payment,
}

/// Query the processor appends to the return/cancel redirect.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentCallbackQuery {
    pub token: Option<String>,
    #[serde(rename = "orderID")]
    pub order_id: Option<String>,
}

impl PaymentCallbackQuery {
    pub fn remote_id(&self) -> Option<&str> {
        self.token
            .as_deref()
            .or(self.order_id.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub payment_method: PaymentMethod,
    /// Defaults to the order total.
    pub amount: Option<i64>,
    pub status: Option<PaymentState>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    pub status: PaymentState,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<PaymentState>,
    pub order_id: Option<Uuid>,
}

impl PaymentQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentCompleted {
    pub payment: Payment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_accepts_token_or_order_id() {
        let q = PaymentCallbackQuery {
            token: None,
            order_id: Some(" 7XY ".into()),
        };
        assert_eq!(q.remote_id(), Some("7XY"));

        let q = PaymentCallbackQuery {
            token: Some("TOK".into()),
            order_id: Some("OTHER".into()),
        };
        assert_eq!(q.remote_id(), Some("TOK"));

        let q = PaymentCallbackQuery {
            token: Some("".into()),
            order_id: None,
        };
        assert_eq!(q.remote_id(), None);
    }
}
