//! Admin app configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SHOPIFY_APP_URL` - Public URL of this app (OAuth redirect base)
//! - `SHOPIFY_API_KEY` - Shopify app client ID
//! - `SHOPIFY_API_SECRET` - Shopify app client secret (HMAC verification, token exchange)
//! - `SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//! - `ENCRYPTION_KEY` - 64 hex chars (32-byte AES key for secrets at rest)
//! - `WEBHOOK_URL` - Base URL of the webhook receiver
//! - `ORDERS_PAID_ROUTE` - Path appended to `WEBHOOK_URL` for `ORDERS_PAID`
//! - `APP_SUBSCRIPTIONS_UPDATE_ROUTE` - Path for `APP_SUBSCRIPTIONS_UPDATE`
//! - `APP_UNINSTALLED_ROUTE` - Path for `APP_UNINSTALLED`
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `SCOPES` - Comma separated OAuth scopes
//! - `SHOPIFY_API_VERSION` - API version (default: 2025-01)
//! - `MERCHANT_COLLECTION` / `PRODUCTS_COLLECTION` / `VARIANTS_COLLECTION`
//! - `DIGITAL_PRODUCT_TAG` - Tag marking digital products (default: digiful)
//! - `BILLING_TEST_MODE` - Create test charges (default: false)
//! - `VM_ID` - Instance identifier echoed to the frontend
//! - `LOG_FORMAT` - `json` for structured logs, text otherwise
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (hosted storage, all or none)
//! - `S3_BUCKET`, `S3_REGION`, `S3_ACCESS_KEY`, `S3_SECRET_ACCESS_KEY`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use digiful_core::WebhookTopic;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const ENCRYPTION_KEY_HEX_LENGTH: usize = 64;
const DEFAULT_API_VERSION: &str = "2025-01";
const DEFAULT_SCOPES: &str = "write_products,read_products,write_inventory,read_orders,write_publications,read_publications";

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

/// Admin app configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public URL of the app
    pub app_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Hex-encoded AES-256 key for secrets at rest
    pub encryption_key: SecretString,
    /// Shopify app credentials
    pub shopify: ShopifyAppConfig,
    /// Webhook callback URLs
    pub webhooks: WebhookConfig,
    /// Document collection names
    pub collections: CollectionNames,
    /// Tag applied to every digital product
    pub digital_product_tag: String,
    /// Create app subscriptions as test charges
    pub billing_test_mode: bool,
    /// Instance identifier
    pub vm_id: Option<String>,
    /// Operator-owned bucket for hosted plans
    pub hosted_storage: Option<HostedStorageConfig>,
    /// Emit JSON logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify app credentials.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// App client ID
    pub api_key: String,
    /// App client secret
    pub api_secret: SecretString,
    /// Admin API version (e.g., 2025-01)
    pub api_version: String,
    /// OAuth scopes requested on install
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Webhook receiver endpoints.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Base URL of the receiver
    pub base_url: String,
    pub orders_paid_route: String,
    pub app_subscriptions_update_route: String,
    pub app_uninstalled_route: String,
}

impl WebhookConfig {
    /// Full callback URL registered with Shopify for a topic.
    #[must_use]
    pub fn callback_url(&self, topic: WebhookTopic) -> String {
        let route = match topic {
            WebhookTopic::OrdersPaid => &self.orders_paid_route,
            WebhookTopic::AppSubscriptionsUpdate => &self.app_subscriptions_update_route,
            WebhookTopic::AppUninstalled => &self.app_uninstalled_route,
        };
        format!("{}{}", self.base_url, route)
    }
}

/// Names of the document collections.
#[derive(Debug, Clone)]
pub struct CollectionNames {
    pub merchants: String,
    pub products: String,
    pub variants: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            merchants: "merchants".to_string(),
            products: "products".to_string(),
            variants: "variants".to_string(),
        }
    }
}

/// Operator-owned S3 bucket used by hosted plans.
///
/// Implements `Debug` manually to redact the secret access key.
#[derive(Clone)]
pub struct HostedStorageConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl std::fmt::Debug for HostedStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedStorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

impl HostedStorageConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let bucket = get_optional_env("S3_BUCKET");
        let region = get_optional_env("S3_REGION");
        let access_key_id = get_optional_env("S3_ACCESS_KEY");
        let secret_access_key = get_optional_env("S3_SECRET_ACCESS_KEY");

        match (bucket, region, access_key_id, secret_access_key) {
            (Some(bucket), Some(region), Some(access_key_id), Some(secret)) => Ok(Some(Self {
                bucket,
                region,
                access_key_id,
                secret_access_key: SecretString::from(secret),
            })),
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "S3_*".to_string(),
                "S3_BUCKET, S3_REGION, S3_ACCESS_KEY and S3_SECRET_ACCESS_KEY must be set together"
                    .to_string(),
            )),
        }
    }
}

impl AppConfig {
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

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let app_url = get_required_env("SHOPIFY_APP_URL")?
            .trim_end_matches('/')
            .to_string();
        let session_secret = get_validated_secret("SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SESSION_SECRET")?;
        let encryption_key = get_encryption_key("ENCRYPTION_KEY")?;

        let shopify = ShopifyAppConfig::from_env()?;
        let webhooks = WebhookConfig {
            base_url: get_required_env("WEBHOOK_URL")?,
            orders_paid_route: get_required_env("ORDERS_PAID_ROUTE")?,
            app_subscriptions_update_route: get_required_env("APP_SUBSCRIPTIONS_UPDATE_ROUTE")?,
            app_uninstalled_route: get_required_env("APP_UNINSTALLED_ROUTE")?,
        };
        let defaults = CollectionNames::default();
        let collections = CollectionNames {
            merchants: get_env_or_default("MERCHANT_COLLECTION", &defaults.merchants),
            products: get_env_or_default("PRODUCTS_COLLECTION", &defaults.products),
            variants: get_env_or_default("VARIANTS_COLLECTION", &defaults.variants),
        };
        let digital_product_tag = get_env_or_default("DIGITAL_PRODUCT_TAG", "digiful");
        let billing_test_mode = parse_bool("BILLING_TEST_MODE", false)?;
        let vm_id = get_optional_env("VM_ID");
        let hosted_storage = HostedStorageConfig::from_env()?;
        let log_json = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            app_url,
            session_secret,
            encryption_key,
            shopify,
            webhooks,
            collections,
            digital_product_tag,
            billing_test_mode,
            vm_id,
            hosted_storage,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the app is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.app_url.starts_with("https://")
    }
}

impl ShopifyAppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let scopes = get_env_or_default("SCOPES", DEFAULT_SCOPES)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            api_key: get_required_env("SHOPIFY_API_KEY")?,
            api_secret: get_validated_secret("SHOPIFY_API_SECRET")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            scopes,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional boolean flag (`true`/`false`/`1`/`0`).
fn parse_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key).as_deref() {
        None => Ok(default),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected true or false, got '{other}'"),
        )),
    }
}

/// Load the encryption key and check it decodes to 32 bytes.
fn get_encryption_key(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_encryption_key(&value, key)?;
    Ok(SecretString::from(value))
}

fn validate_encryption_key(value: &str, var_name: &str) -> Result<(), ConfigError> {
    if value.len() != ENCRYPTION_KEY_HEX_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be {ENCRYPTION_KEY_HEX_LENGTH} hex characters (got {})",
                value.len()
            ),
        ));
    }
    if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be hex encoded".to_string(),
        ));
    }
    Ok(())
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
            #[allow(clippy::cast_precision_loss)]
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
