//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `PAYPAL_CLIENT_ID` / `PAYPAL_CLIENT_SECRET` - Enable PayPal checkout (both or neither)
//! - `PAYPAL_API_BASE` - PayPal REST base URL (default: sandbox)
//! - `PAYPAL_VND_PER_USD` - Exchange rate for PayPal amounts (default: 25000)
//! - `VNPAY_TMN_CODE` / `VNPAY_HASH_SECRET` - Enable VNPay checkout (both or neither)
//! - `VNPAY_PAYMENT_URL` - VNPay payment page (default: sandbox)
//! - `VNPAY_RETURN_PATH` - Return path on this site (default: /checkout/vnpay/return)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_PAYPAL_API_BASE: &str = "https://api-m.sandbox.paypal.com";
const DEFAULT_VND_PER_USD: &str = "25000";
const DEFAULT_VNPAY_PAYMENT_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";
/// Where VNPay sends customers back to unless `VNPAY_RETURN_PATH` says otherwise.
pub const DEFAULT_VNPAY_RETURN_PATH: &str = "/checkout/vnpay/return";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without a trailing slash
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// PayPal checkout, if configured
    pub paypal: Option<PaypalConfig>,
    /// VNPay checkout, if configured
    pub vnpay: Option<VnpayConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// PayPal REST API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PaypalConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    /// REST base URL (sandbox or live)
    pub api_base: String,
    /// Dong per US dollar, used to convert order totals
    pub vnd_per_usd: Decimal,
}

impl std::fmt::Debug for PaypalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("vnd_per_usd", &self.vnd_per_usd)
            .finish()
    }
}

/// VNPay merchant configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct VnpayConfig {
    /// Merchant terminal code
    pub tmn_code: String,
    /// HMAC-SHA512 signing key
    pub hash_secret: SecretString,
    /// Payment page the customer is redirected to
    pub payment_url: String,
    /// Path on this site VNPay redirects back to
    pub return_path: String,
}

impl std::fmt::Debug for VnpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VnpayConfig")
            .field("tmn_code", &self.tmn_code)
            .field("hash_secret", &"[REDACTED]")
            .field("payment_url", &self.payment_url)
            .field("return_path", &self.return_path)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let paypal = PaypalConfig::from_env()?;
        let vnpay = VnpayConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            paypal,
            vnpay,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Path of the VNPay return route.
    #[must_use]
    pub fn vnpay_return_path(&self) -> &str {
        self.vnpay
            .as_ref()
            .map_or(DEFAULT_VNPAY_RETURN_PATH, |v| v.return_path.as_str())
    }

    /// Absolute URL for a path on this site.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl PaypalConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some((client_id, client_secret)) =
            get_optional_pair("PAYPAL_CLIENT_ID", "PAYPAL_CLIENT_SECRET")?
        else {
            return Ok(None);
        };

        let vnd_per_usd = get_env_or_default("PAYPAL_VND_PER_USD", DEFAULT_VND_PER_USD)
            .parse::<Decimal>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PAYPAL_VND_PER_USD".to_string(), e.to_string())
            })?;
        if vnd_per_usd <= Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                "PAYPAL_VND_PER_USD".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Some(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            api_base: get_env_or_default("PAYPAL_API_BASE", DEFAULT_PAYPAL_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            vnd_per_usd,
        }))
    }
}

impl VnpayConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some((tmn_code, hash_secret)) =
            get_optional_pair("VNPAY_TMN_CODE", "VNPAY_HASH_SECRET")?
        else {
            return Ok(None);
        };

        let return_path = get_env_or_default("VNPAY_RETURN_PATH", DEFAULT_VNPAY_RETURN_PATH);
        let return_path = format!("/{}", return_path.trim_start_matches('/'));

        Ok(Some(Self {
            tmn_code,
            hash_secret: SecretString::from(hash_secret),
            payment_url: get_env_or_default("VNPAY_PAYMENT_URL", DEFAULT_VNPAY_PAYMENT_URL),
            return_path,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get two variables that must be set together.
fn get_optional_pair(first: &str, second: &str) -> Result<Option<(String, String)>, ConfigError> {
    match (get_optional_env(first), get_optional_env(second)) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingEnvVar(format!(
            "{second} (required when {first} is set)"
        ))),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar(format!(
            "{first} (required when {second} is set)"
        ))),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
