use std::{env, str::FromStr};

use anyhow::Context;
use rust_decimal::Decimal;
use secrecy::SecretString;

pub const DEFAULT_PRINTIFY_BASE_URL: &str = "https://api.printify.com/v1";
pub const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// Process-wide settings, loaded once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub jwt_secret: SecretString,
    pub media_root: String,
    pub checkout_ttl_minutes: i64,
    pub session_expiry_days: i64,
    pub referral_unlock_threshold: i32,
    pub usd_to_ngn_rate: Decimal,
    pub currency: String,
    pub printify: Option<PrintifyConfig>,
    pub paystack: Option<PaystackConfig>,
}

#[derive(Clone)]
pub struct PrintifyConfig {
    pub api_token: SecretString,
    pub shop_id: Option<String>,
    pub base_url: String,
}

impl std::fmt::Debug for PrintifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintifyConfig")
            .field("api_token", &"[REDACTED]")
            .field("shop_id", &self.shop_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone)]
pub struct PaystackConfig {
    pub secret_key: SecretString,
    pub public_key: Option<String>,
    pub base_url: String,
}

impl std::fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("secret_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000u16)?;
        let base_url = env::var("APP_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://{host}:{port}"));
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;

        let printify = non_empty("PRINTIFY_API_TOKEN").map(|token| PrintifyConfig {
            api_token: SecretString::from(token),
            shop_id: non_empty("PRINTIFY_SHOP_ID"),
            base_url: non_empty("PRINTIFY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PRINTIFY_BASE_URL.to_string()),
        });
        let paystack = non_empty("PAYSTACK_SECRET_KEY").map(|key| PaystackConfig {
            secret_key: SecretString::from(key),
            public_key: non_empty("PAYSTACK_PUBLIC_KEY"),
            base_url: non_empty("PAYSTACK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PAYSTACK_BASE_URL.to_string()),
        });

        Ok(Self {
            database_url,
            base_url,
            jwt_secret: SecretString::from(jwt_secret),
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            checkout_ttl_minutes: parse_or("CHECKOUT_TTL_MINUTES", 120)?,
            session_expiry_days: parse_or("SESSION_EXPIRY_DAYS", 7)?,
            referral_unlock_threshold: parse_or("REFERRAL_UNLOCK_THRESHOLD", 30)?,
            usd_to_ngn_rate: parse_or("USD_TO_NGN_RATE", Decimal::new(160700, 2))?,
            currency: env::var("STORE_CURRENCY").unwrap_or_else(|_| "NGN".to_string()),
            printify,
            paystack,
            host,
            port,
        })
    }

    /// Emits one warning per external integration that is not configured.
    pub fn warn_missing_integrations(&self) {
        if self.printify.is_none() {
            tracing::warn!("PRINTIFY_API_TOKEN is not set; catalog sync and fulfilment are disabled");
        }
        if self.paystack.is_none() {
            tracing::warn!("PAYSTACK_SECRET_KEY is not set; checkout is disabled");
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        None => Ok(default),
    }
}
