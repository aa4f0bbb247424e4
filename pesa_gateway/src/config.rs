use std::time::Duration;

use log::*;
use pesa_common::{parse_number, Secret};

pub const DEFAULT_GATEWAY_URL: &str = "https://sandbox.safaricom.co.ke";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base url of the gateway, without a trailing slash.
    pub base_url: String,
    pub consumer_key: Secret<String>,
    pub consumer_secret: Secret<String>,
    pub shortcode: String,
    pub passkey: Secret<String>,
    /// The public url the gateway should POST payment results to.
    pub callback_url: String,
    pub transaction_type: String,
    /// Upper bound on every request made to the gateway, including the credential refresh.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            consumer_key: Secret::default(),
            consumer_secret: Secret::default(),
            shortcode: "174379".to_string(),
            passkey: Secret::default(),
            callback_url: "http://localhost:8360/payments/callback".to_string(),
            transaction_type: "CustomerPayBillOnline".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("PESA_GATEWAY_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                warn!("🪛️ PESA_GATEWAY_URL not set, using the sandbox url {DEFAULT_GATEWAY_URL}");
                defaults.base_url.clone()
            });
        let consumer_key = Secret::new(std::env::var("PESA_CONSUMER_KEY").unwrap_or_else(|_| {
            warn!("🪛️ PESA_CONSUMER_KEY not set. Payments cannot be initiated until it is.");
            String::default()
        }));
        let consumer_secret = Secret::new(std::env::var("PESA_CONSUMER_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ PESA_CONSUMER_SECRET not set. Payments cannot be initiated until it is.");
            String::default()
        }));
        let shortcode = std::env::var("PESA_SHORTCODE").unwrap_or_else(|_| {
            warn!("🪛️ PESA_SHORTCODE not set, using the sandbox shortcode {}", defaults.shortcode);
            defaults.shortcode.clone()
        });
        let passkey = Secret::new(std::env::var("PESA_PASSKEY").unwrap_or_else(|_| {
            warn!("🪛️ PESA_PASSKEY not set. Payments cannot be initiated until it is.");
            String::default()
        }));
        let callback_url = std::env::var("PESA_CALLBACK_URL").unwrap_or_else(|_| {
            warn!(
                "🪛️ PESA_CALLBACK_URL not set, using {}. The gateway will not be able to reach this address.",
                defaults.callback_url
            );
            defaults.callback_url.clone()
        });
        let transaction_type = std::env::var("PESA_TRANSACTION_TYPE").unwrap_or_else(|_| {
            info!("🪛️ PESA_TRANSACTION_TYPE not set, using {}", defaults.transaction_type);
            defaults.transaction_type.clone()
        });
        let timeout = parse_number::<u64>(std::env::var("PESA_GATEWAY_TIMEOUT_SECS").ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| {
                info!("🪛️ PESA_GATEWAY_TIMEOUT_SECS not set or invalid, using {}s", DEFAULT_TIMEOUT.as_secs());
                DEFAULT_TIMEOUT
            });
        Self { base_url, consumer_key, consumer_secret, shortcode, passkey, callback_url, transaction_type, timeout }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
