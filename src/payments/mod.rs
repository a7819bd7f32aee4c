//! Payment processor integration.
//!
//! Services talk to the processor through [`PaymentGateway`] so the payment
//! flow can run against PayPal in production and a fake in tests.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::error::AppError;

pub mod paypal;

pub use paypal::PaypalClient;

#[derive(Debug, Clone)]
pub struct CreateRemoteOrder {
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    /// Our order id, echoed back by the processor.
    pub reference_id: String,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct RemoteOrder {
    pub id: String,
    pub status: String,
    pub approval_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment processor is not configured")]
    NotConfigured,

    #[error("request to payment processor failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment processor rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

pub trait PaymentGateway: Send + Sync {
    fn create_order(
        &self,
        request: CreateRemoteOrder,
    ) -> BoxFuture<'_, Result<RemoteOrder, GatewayError>>;

    fn capture_order<'a>(
        &'a self,
        remote_id: &'a str,
    ) -> BoxFuture<'a, Result<CaptureResult, GatewayError>>;
}
