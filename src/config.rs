use std::env;

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaypalMode {
    Sandbox,
    Live,
}

impl PaypalMode {
    pub fn base_url(&self) -> &'static str {
        match self {
            PaypalMode::Sandbox => "https://api-m.sandbox.paypal.com",
            PaypalMode::Live => "https://api-m.paypal.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub mode: PaypalMode,
    pub client_id: String,
    pub secret: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub public_base_url: String,
    pub allowed_cities: Vec<String>,
    pub paypal: PaypalConfig,
    pub payment_return_url: String,
    pub payment_cancel_url: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24);
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();
        let allowed_cities = env::var("ALLOWED_CITIES")
            .map(|v| split_list(&v))
            .unwrap_or_else(|_| default_cities());

        let mode = match env::var("PAYPAL_MODE").as_deref() {
            Ok("live") => PaypalMode::Live,
            _ => PaypalMode::Sandbox,
        };
        let paypal = PaypalConfig {
            mode,
            client_id: env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
            secret: env::var("PAYPAL_SECRET").unwrap_or_default(),
            currency: env::var("PAYPAL_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
        };
        if paypal.client_id.is_empty() {
            tracing::warn!("PAYPAL_CLIENT_ID is not set; payment initiation will fail");
        }

        let payment_return_url = env::var("PAYMENT_RETURN_URL")
            .unwrap_or_else(|_| format!("{public_base_url}/api/payments/success"));
        let payment_cancel_url = env::var("PAYMENT_CANCEL_URL")
            .unwrap_or_else(|_| format!("{public_base_url}/api/payments/cancel"));
        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            public_base_url,
            allowed_cities,
            paypal,
            payment_return_url,
            payment_cancel_url,
            cors_origins,
        })
    }

    /// Config for tests and tooling that never reach the payment processor.
    pub fn for_tests(database_url: impl Into<String>) -> Self {
        let public_base_url = "http://localhost:3000".to_string();
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
            jwt_ttl_hours: 1,
            payment_return_url: format!("{public_base_url}/api/payments/success"),
            payment_cancel_url: format!("{public_base_url}/api/payments/cancel"),
            public_base_url,
            allowed_cities: default_cities(),
            paypal: PaypalConfig {
                mode: PaypalMode::Sandbox,
                client_id: String::new(),
                secret: String::new(),
                currency: "USD".into(),
            },
            cors_origins: Vec::new(),
        }
    }

    /// Returns the canonical spelling of `city` if it is allowed.
    pub fn canonical_city(&self, city: &str) -> Option<&str> {
        let city = city.trim();
        self.allowed_cities
            .iter()
            .find(|allowed| allowed.eq_ignore_ascii_case(city))
            .map(String::as_str)
    }

    pub fn image_url(&self, image_path: Option<&str>) -> Option<String> {
        image_path
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}/storage/{}", self.public_base_url, p.trim_start_matches('/')))
    }
}

fn default_cities() -> Vec<String> {
    ["kenitra", "Rabat", "Casa", "tanger"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_match_is_case_insensitive_and_canonical() {
        let config = AppConfig::for_tests("postgres://unused");
        assert_eq!(config.canonical_city("rabat"), Some("Rabat"));
        assert_eq!(config.canonical_city(" KENITRA "), Some("kenitra"));
        assert_eq!(config.canonical_city("Paris"), None);
    }

    #[test]
    fn image_url_joins_storage_path() {
        let config = AppConfig::for_tests("postgres://unused");
        assert_eq!(
            config.image_url(Some("/menus/pizza.png")).as_deref(),
            Some("http://localhost:3000/storage/menus/pizza.png")
        );
        assert_eq!(config.image_url(Some("")), None);
        assert_eq!(config.image_url(None), None);
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
    }
}
