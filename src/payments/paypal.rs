use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{FutureExt, future::BoxFuture};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use super::{CaptureResult, CreateRemoteOrder, GatewayError, PaymentGateway, RemoteOrder};
use crate::{config::PaypalConfig, models::format_minor_units};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub(crate) href: String,
    pub(crate) rel: String,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// PayPal Orders v2 client using client-credentials OAuth.
#[derive(Clone)]
pub struct PaypalClient {
    http: Client,
    config: PaypalConfig,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl PaypalClient {
    pub fn new(config: PaypalConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            config,
            token: Arc::new(RwLock::new(None)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.mode.base_url(), path)
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        if self.config.client_id.is_empty() || self.config.secret.is_empty() {
            return Err(GatewayError::NotConfigured);
        }

        if let Some(token) = self.token.read().await.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let resp = self
            .http
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        let body: TokenResponse = resp.json().await?;

        // refresh a minute early
        let ttl = Duration::from_secs(body.expires_in.saturating_sub(60));
        *self.token.write().await = Some(CachedToken {
            value: body.access_token.clone(),
            expires_at: Instant::now() + ttl,
        });

        Ok(body.access_token)
    }

    async fn create(&self, request: CreateRemoteOrder) -> Result<RemoteOrder, GatewayError> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.reference_id,
                "amount": {
                    "currency_code": request.currency,
                    "value": format_minor_units(request.amount),
                },
            }],
            "application_context": {
                "return_url": request.return_url,
                "cancel_url": request.cancel_url,
            },
        });

        let resp = self
            .http
            .post(self.url("/v2/checkout/orders"))
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        let order: OrderResponse = ensure_success(resp).await?.json().await?;
        tracing::info!(remote_id = %order.id, status = %order.status, "paypal order created");

        Ok(RemoteOrder {
            approval_url: approval_link(&order.links),
            id: order.id,
            status: order.status,
        })
    }

    async fn capture(&self, remote_id: &str) -> Result<CaptureResult, GatewayError> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .post(self.url(&format!("/v2/checkout/orders/{remote_id}/capture")))
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .json(&json!({}))
            .send()
            .await?;
        let order: OrderResponse = ensure_success(resp).await?.json().await?;
        tracing::info!(remote_id = %order.id, status = %order.status, "paypal order captured");

        Ok(CaptureResult {
            id: order.id,
            status: order.status,
        })
    }
}

impl PaymentGateway for PaypalClient {
    fn create_order(
        &self,
        request: CreateRemoteOrder,
    ) -> BoxFuture<'_, Result<RemoteOrder, GatewayError>> {
        self.create(request).boxed()
    }

    fn capture_order<'a>(
        &'a self,
        remote_id: &'a str,
    ) -> BoxFuture<'a, Result<CaptureResult, GatewayError>> {
        self.capture(remote_id).boxed()
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Rejected {
        status: status.as_u16(),
        body: truncate(&body, 512),
    })
}

fn truncate(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}

/// The buyer approval link is `approve` for classic checkout and
/// `payer-action` when the order was created with a payment source.
pub(crate) fn approval_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel == "approve")
        .or_else(|| links.iter().find(|l| l.rel == "payer-action"))
        .map(|l| l.href.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(rel: &str) -> Link {
        Link {
            href: format!("https://paypal.test/{rel}"),
            rel: rel.to_string(),
        }
    }

    #[test]
    fn approval_link_prefers_approve() {
        let links = vec![link("self"), link("payer-action"), link("approve")];
        assert_eq!(
            approval_link(&links).as_deref(),
            Some("https://paypal.test/approve")
        );
    }

    #[test]
    fn approval_link_falls_back_to_payer_action() {
        let links = vec![link("self"), link("payer-action")];
        assert_eq!(
            approval_link(&links).as_deref(),
            Some("https://paypal.test/payer-action")
        );
        assert_eq!(approval_link(&[link("self")]), None);
    }

    #[test]
    fn order_response_parses_links() {
        let raw = r#"{"id":"5O190127TN364715T","status":"CREATED","links":[
            {"href":"https://api.sandbox.paypal.com/v2/checkout/orders/5O190127TN364715T","rel":"self","method":"GET"},
            {"href":"https://www.sandbox.paypal.com/checkoutnow?token=5O190127TN364715T","rel":"approve","method":"GET"}
        ]}"#;
        let order: OrderResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(order.id, "5O190127TN364715T");
        assert!(approval_link(&order.links).unwrap().contains("checkoutnow"));
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_to_call_out() {
        let client = PaypalClient::new(PaypalConfig {
            mode: crate::config::PaypalMode::Sandbox,
            client_id: String::new(),
            secret: String::new(),
            currency: "USD".into(),
        })
        .unwrap();
        let err = client.capture_order("ABC").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured));
    }
}
