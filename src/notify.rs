use futures::{FutureExt, future::BoxFuture};
use uuid::Uuid;

use crate::models::format_minor_units;

#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub email: String,
    /// Minor units.
    pub total_amount: i64,
}

impl OrderConfirmation {
    pub fn subject(&self) -> String {
        format!("Order Confirmation #{}", self.order_id)
    }

    pub fn body(&self) -> String {
        format!(
            "Thank you for your order!\n\
             Your order (#{}) has been successfully placed.\n\
             Total Amount: ${}",
            self.order_id,
            format_minor_units(self.total_amount)
        )
    }
}

/// Sends customer-facing notifications after a payment completes.
pub trait Notifier: Send + Sync {
    fn order_confirmed<'a>(
        &'a self,
        confirmation: &'a OrderConfirmation,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Emits confirmations to the log instead of a mail server.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn order_confirmed<'a>(
        &'a self,
        confirmation: &'a OrderConfirmation,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        async move {
            tracing::info!(
                to = %confirmation.email,
                subject = %confirmation.subject(),
                body = %confirmation.body(),
                "order confirmation"
            );
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_mentions_order_and_total() {
        let id = Uuid::new_v4();
        let confirmation = OrderConfirmation {
            order_id: id,
            email: "eater@example.com".into(),
            total_amount: 4250,
        };
        let body = confirmation.body();
        assert!(body.contains(&id.to_string()));
        assert!(body.contains("Total Amount: $42.50"));
    }
}
