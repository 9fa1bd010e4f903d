//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STYLEHUB_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Required at first use
//! - `OPENAI_API_KEY` - Credential for outfit recommendations
//! - `HF_API_KEY` - Credential for virtual try-on image generation
//!
//! ## Optional
//! - `STYLEHUB_HOST` - Bind address (default: 127.0.0.1)
//! - `STYLEHUB_PORT` - Listen port (default: 3000)
//! - `STYLEHUB_UPLOADS_DIR` - Directory for generated try-on images (default: public/uploads)
//! - `OPENAI_MODEL` - Chat model used for recommendations (default: gpt-4o-mini)
//! - `OPENAI_BASE_URL` - `OpenAI` API base URL (default: <https://api.openai.com/v1>)
//! - `HF_MODEL_URL` - Hugging Face inference endpoint for image-to-image
//! - `INFERENCE_TIMEOUT_SECS` - End-to-end timeout for inference calls (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_HF_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-2";

/// URL path under which generated images are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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
    /// Directory generated try-on images are written to
    pub uploads_dir: PathBuf,
    /// Inference provider configuration
    pub inference: InferenceConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Inference provider configuration.
///
/// Credentials are optional here: a missing key only fails the request that
/// needs it. Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct InferenceConfig {
    /// `OpenAI` API key used for outfit recommendations
    pub openai_api_key: Option<SecretString>,
    /// `OpenAI` API base URL
    pub openai_base_url: Url,
    /// Chat completion model
    pub openai_model: String,
    /// Hugging Face API key used for try-on generation
    pub hf_api_key: Option<SecretString>,
    /// Hugging Face image-to-image endpoint
    pub hf_model_url: Url,
    /// End-to-end timeout for a single inference call
    pub timeout: Duration,
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<SecretString>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("InferenceConfig")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url.as_str())
            .field("openai_model", &self.openai_model)
            .field("hf_api_key", &redact(&self.hf_api_key))
            .field("hf_model_url", &self.hf_model_url.as_str())
            .field("timeout", &self.timeout)
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
    /// if a provided API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STYLEHUB_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("STYLEHUB_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STYLEHUB_PORT", "3000")?;
        let uploads_dir = PathBuf::from(get_env_or_default(
            "STYLEHUB_UPLOADS_DIR",
            "public/uploads",
        ));

        let inference = InferenceConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            uploads_dir,
            inference,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Local defaults without credentials, for unit tests.
    #[cfg(test)]
    pub(crate) fn for_tests(uploads_dir: PathBuf) -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/stylehub_test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            uploads_dir,
            inference: InferenceConfig::for_tests(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl InferenceConfig {
    /// Defaults without credentials, for unit tests.
    #[cfg(test)]
    #[allow(clippy::expect_used)]
    pub(crate) fn for_tests() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: Url::parse(DEFAULT_OPENAI_BASE_URL).expect("valid default"),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            hf_api_key: None,
            hf_model_url: Url::parse(DEFAULT_HF_MODEL_URL).expect("valid default"),
            timeout: Duration::from_secs(5),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = parse_env_or_default::<u64>("INFERENCE_TIMEOUT_SECS", "60")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "INFERENCE_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            openai_api_key: get_optional_secret("OPENAI_API_KEY")?,
            openai_base_url: get_url_or_default("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)?,
            openai_model: get_env_or_default("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            hf_api_key: get_optional_secret("HF_API_KEY")?,
            hf_model_url: get_url_or_default("HF_MODEL_URL", DEFAULT_HF_MODEL_URL)?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a URL environment variable, falling back to a default.
fn get_url_or_default(key: &str, default: &str) -> Result<Url, ConfigError> {
    Url::parse(&get_env_or_default(key, default))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
    let len = s.chars().count() as f64;
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

    // Real API keys are long random strings
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate an optional secret from environment.
fn get_optional_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    get_optional_env(key)
        .map(|value| {
            validate_secret_strength(&value, key)?;
            Ok(SecretString::from(value))
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_inference_config() -> InferenceConfig {
        InferenceConfig {
            openai_api_key: Some(SecretString::from("sk-super-secret-openai-key")),
            openai_base_url: Url::parse(DEFAULT_OPENAI_BASE_URL).unwrap(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            hf_api_key: None,
            hf_model_url: Url::parse(DEFAULT_HF_MODEL_URL).unwrap(),
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-openai-key-here", "OPENAI_API_KEY");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "HF_API_KEY");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("hf_aB3xY9mK2nL5pQ7rT0uW4zC6", "HF_API_KEY");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/stylehub"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            uploads_dir: PathBuf::from("public/uploads"),
            inference: test_inference_config(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_inference_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", test_inference_config());

        assert!(debug_output.contains("gpt-4o-mini"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-super-secret-openai-key"));
    }

    #[test]
    fn test_for_tests_has_no_credentials() {
        let config = InferenceConfig::for_tests();
        assert!(config.openai_api_key.is_none());
        assert!(config.hf_api_key.is_none());
        assert_eq!(config.hf_model_url.as_str(), DEFAULT_HF_MODEL_URL);
    }
}
