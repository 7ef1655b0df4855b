//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COUNSEL_API_BASE_URL` - Base URL of the site API (orders, payment, downloads)
//! - `COUNSEL_GATEWAY_KEY_ID` - Public key id handed to the hosted payment UI
//!
//! ## Optional
//! - `COUNSEL_DATA_DIR` - Directory holding the cart record (default: .counsel)
//! - `COUNSEL_DOWNLOAD_DIR` - Where purchased files are saved (default: downloads)
//! - `COUNSEL_REQUEST_TIMEOUT_SECS` - Per-request HTTP timeout (default: 20)
//! - `COUNSEL_VERIFY_TIMEOUT_SECS` - Bounded wait for payment verification (default: 30)
//! - `COUNSEL_CURRENCY` - Store currency (default: INR)
//! - `COUNSEL_BUSINESS_NAME` - Name shown in the hosted payment UI
//! - `EMAILJS_SERVICE_ID` - Enables the contact channel; requires the next three
//! - `EMAILJS_TEMPLATE_ID` - Contact form template id
//! - `EMAILJS_PUBLIC_KEY` - EmailJS public key
//! - `CONTACT_RECIPIENT` - Inbox that receives contact-form submissions
//! - `EMAILJS_PRIVATE_KEY` - EmailJS private access token (strict mode)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use counsel_core::{CurrencyCode, Email};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

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

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the site API
    pub api_base_url: Url,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Directory holding the persisted cart record
    pub data_dir: PathBuf,
    /// Directory where purchased files are written
    pub download_dir: PathBuf,
    /// Payment gateway configuration
    pub payment: PaymentConfig,
    /// Outbound contact channel (disabled when `None`)
    pub emailjs: Option<EmailJsConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
}

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Public key id for the hosted checkout UI
    pub key_id: String,
    /// Store currency
    pub currency: CurrencyCode,
    /// Business name shown in the hosted checkout UI
    pub business_name: String,
    /// Bounded wait for the verification endpoint
    pub verify_timeout: Duration,
}

/// EmailJS transactional email configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct EmailJsConfig {
    /// Send endpoint (overridable for tests)
    pub endpoint: Url,
    /// EmailJS service id
    pub service_id: String,
    /// EmailJS template id
    pub template_id: String,
    /// EmailJS public key (sent as `user_id`)
    pub public_key: String,
    /// Optional private access token
    pub private_key: Option<SecretString>,
    /// Inbox that receives contact-form submissions
    pub recipient: Email,
}

impl std::fmt::Debug for EmailJsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailJsConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("service_id", &self.service_id)
            .field("template_id", &self.template_id)
            .field("public_key", &self.public_key)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("recipient", &self.recipient)
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

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = get_http_url(env, "COUNSEL_API_BASE_URL")?;
        let request_timeout = get_duration_secs(env, "COUNSEL_REQUEST_TIMEOUT_SECS", 20)?;
        let data_dir = PathBuf::from(get_env_or_default(env, "COUNSEL_DATA_DIR", ".counsel"));
        let download_dir =
            PathBuf::from(get_env_or_default(env, "COUNSEL_DOWNLOAD_DIR", "downloads"));

        let payment = PaymentConfig::from_lookup(env)?;
        let emailjs = EmailJsConfig::from_lookup(env)?;

        let sentry_dsn = get_optional_env(env, "SENTRY_DSN");
        let sentry_environment = get_optional_env(env, "SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_env_or_default(env, "SENTRY_SAMPLE_RATE", "1.0")
            .parse::<f32>()
            .ok()
            .filter(|rate| (0.0..=1.0).contains(rate))
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "SENTRY_SAMPLE_RATE".to_string(),
                    "must be a number between 0.0 and 1.0".to_string(),
                )
            })?;

        Ok(Self {
            api_base_url,
            request_timeout,
            data_dir,
            download_dir,
            payment,
            emailjs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
        })
    }
}

impl PaymentConfig {
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let currency = get_env_or_default(env, "COUNSEL_CURRENCY", "INR")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("COUNSEL_CURRENCY".to_string(), e))?;

        Ok(Self {
            key_id: get_required_env(env, "COUNSEL_GATEWAY_KEY_ID")?,
            currency,
            business_name: get_env_or_default(env, "COUNSEL_BUSINESS_NAME", "Counsel"),
            verify_timeout: get_duration_secs(env, "COUNSEL_VERIFY_TIMEOUT_SECS", 30)?,
        })
    }
}

impl EmailJsConfig {
    /// The section is optional as a whole, but all-or-nothing once started.
    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let Some(service_id) = get_optional_env(env, "EMAILJS_SERVICE_ID") else {
            return Ok(None);
        };

        let recipient_raw = get_required_env(env, "CONTACT_RECIPIENT")?;
        let recipient = Email::parse(&recipient_raw).map_err(|e| {
            ConfigError::InvalidEnvVar("CONTACT_RECIPIENT".to_string(), e.to_string())
        })?;

        let private_key = match get_optional_env(env, "EMAILJS_PRIVATE_KEY") {
            Some(value) => {
                validate_secret_strength(&value, "EMAILJS_PRIVATE_KEY")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        let endpoint = match get_optional_env(env, "EMAILJS_ENDPOINT") {
            Some(_) => get_http_url(env, "EMAILJS_ENDPOINT")?,
            None => Url::parse(DEFAULT_EMAILJS_ENDPOINT).map_err(|e| {
                ConfigError::InvalidEnvVar("EMAILJS_ENDPOINT".to_string(), e.to_string())
            })?,
        };

        Ok(Some(Self {
            endpoint,
            service_id,
            template_id: get_required_env(env, "EMAILJS_TEMPLATE_ID")?,
            public_key: get_required_env(env, "EMAILJS_PUBLIC_KEY")?,
            private_key,
            recipient,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable. Blank values count as missing.
fn get_required_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    get_optional_env(env, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as missing.
fn get_optional_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Get a positive number of seconds as a `Duration`.
fn get_duration_secs(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = get_optional_env(env, key) else {
        return Ok(Duration::from_secs(default));
    };
    raw.parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ConfigError::InvalidEnvVar(key.to_string(), "must be a positive integer".to_string())
        })
}

/// Get a required http(s) URL.
fn get_http_url(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Url, ConfigError> {
    let raw = get_required_env(env, key)?;
    let url =
        Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
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
