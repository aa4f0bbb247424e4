use std::{env, io::Write, net::IpAddr, time::Duration};

use chrono::Duration as ChronoDuration;
use log::*;
use pesa_common::{parse_boolean_flag, parse_number, Amount, Secret, DEFAULT_MAX_AMOUNT};
use pesa_engine::{
    helpers::RetryPolicy,
    FlowConfig,
    DEFAULT_DUPLICATE_WINDOW_SECS,
    DEFAULT_SHIPPING_FEE,
    DEFAULT_STATUS_GRACE_SECS,
};
use pesa_gateway::GatewayConfig;
use rand::RngCore;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_PESA_HOST: &str = "127.0.0.1";
const DEFAULT_PESA_PORT: u16 = 8360;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_STALE_PAYMENT_SECS: i64 = 120;
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// If supplied, gateway callbacks are only accepted from these addresses.
    pub callback_whitelist: Option<Vec<IpAddr>>,
    pub flow: FlowConfig,
    /// How often the sweeper looks for payments that never heard back from the gateway
    pub sweep_interval: Duration,
    /// Pending payments older than this are queried by the sweeper
    pub stale_payment_age: ChronoDuration,
    /// How often the previous day is reconciled
    pub reconcile_interval: Duration,
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PESA_HOST.to_string(),
            port: DEFAULT_PESA_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            callback_whitelist: None,
            flow: FlowConfig::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            stale_payment_age: ChronoDuration::seconds(DEFAULT_STALE_PAYMENT_SECS),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PESA_HOST").ok().unwrap_or_else(|| DEFAULT_PESA_HOST.into());
        let port = parse_number::<u16>(env::var("PESA_PORT").ok()).unwrap_or_else(|| {
            info!("🪛️ PESA_PORT is not set or is invalid. Using the default, {DEFAULT_PESA_PORT}.");
            DEFAULT_PESA_PORT
        });
        let database_url = env::var("PESA_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ PESA_DATABASE_URL is not set. Please set it to the URL for the Pesa database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("PESA_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("PESA_USE_FORWARDED").ok(), false);
        let callback_whitelist = configure_callback_whitelist(env::var("PESA_CALLBACK_IP_WHITELIST").ok());
        let flow = configure_flow();
        let sweep_interval = Duration::from_secs(env_or_default("PESA_SWEEP_INTERVAL_SECS", 60u64));
        let stale_payment_age =
            ChronoDuration::seconds(env_or_default("PESA_STALE_PAYMENT_SECS", DEFAULT_STALE_PAYMENT_SECS));
        let reconcile_interval = Duration::from_secs(env_or_default("PESA_RECONCILE_INTERVAL_HOURS", 24u64) * 3600);
        let gateway = GatewayConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            callback_whitelist,
            flow,
            sweep_interval,
            stale_payment_age,
            reconcile_interval,
            gateway,
        }
    }
}

fn env_or_default<T>(name: &str, default: T) -> T
where T: std::str::FromStr + std::fmt::Display + Copy {
    let value = env::var(name).ok();
    let was_set = value.is_some();
    match parse_number::<T>(value) {
        Some(v) => v,
        None => {
            if was_set {
                warn!("🪛️ Invalid configuration value for {name}. Using the default of {default}.");
            } else {
                info!("🪛️ {name} is not set. Using the default of {default}.");
            }
            default
        },
    }
}

fn configure_flow() -> FlowConfig {
    let max_amount = env_or_default("PESA_MAX_AMOUNT", DEFAULT_MAX_AMOUNT);
    let shipping_fee = Amount::from(env_or_default("PESA_SHIPPING_FEE", DEFAULT_SHIPPING_FEE));
    let duplicate_window =
        ChronoDuration::seconds(env_or_default("PESA_DUPLICATE_WINDOW_SECS", DEFAULT_DUPLICATE_WINDOW_SECS));
    let status_grace = ChronoDuration::seconds(env_or_default("PESA_STATUS_GRACE_SECS", DEFAULT_STATUS_GRACE_SECS));
    FlowConfig { max_amount, duplicate_window, status_grace, shipping_fee, retry: RetryPolicy::default() }
}

/// Parses a comma-separated list of addresses. "none", "false" and "0" explicitly disable the whitelist.
pub fn configure_callback_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let whitelist = value.and_then(|s| {
        if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
            return None;
        }
        let addrs = s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(e) => {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in PESA_CALLBACK_IP_WHITELIST: {e}");
                    None
                },
            })
            .collect::<Vec<IpAddr>>();
        Some(addrs)
    });
    match &whitelist {
        Some(v) if v.is_empty() => warn!(
            "🚨️ The callback IP whitelist was configured, but is empty. The server will run, but won't accept any \
             payment callbacks."
        ),
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Callback IP whitelist: {addrs}");
        },
        None => info!("🪛️ No callback IP whitelist is set. Callbacks are accepted from any address."),
    }
    whitelist
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret shared with the service that issues access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this, since no externally issued token will be accepted. 🚨️🚨️🚨️"
        );
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = base64::encode(bytes);
        match NamedTempFile::new().ok().and_then(|f| f.keep().ok()) {
            Some((mut f, p)) => match writeln!(f, "{secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, you \
                     are doing it wrong! Set the PESA_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.display()
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => warn!("🪛️ Could not create a temporary file to store the JWT secret."),
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("PESA_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [PESA_JWT_SECRET]")))?;
        if secret.trim().len() < 16 {
            return Err(ServerError::ConfigurationError(
                "PESA_JWT_SECRET must be at least 16 characters long".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The parts of the configuration that request handlers need. Contains no secrets.
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub callback_whitelist: Option<Vec<IpAddr>>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            callback_whitelist: config.callback_whitelist.clone(),
        }
    }
}
