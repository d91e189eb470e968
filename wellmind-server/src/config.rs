//! Server configuration, resolved once from environment variables at startup.

use std::fmt;
use std::time::Duration;

use crate::services::provider::{ProviderConfig, COHERE_MODELS};

/// Runtime configuration for wellmind-server.
///
/// Every field has a default so the server runs out-of-the-box; without a
/// `COHERE_API_KEY` the chat pipeline stays in fallback mode permanently.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:5001"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://wellmind.db"`).
    pub database_url: String,

    /// Credential for the completion provider. `None` means fallback only.
    pub cohere_api_key: Option<String>,

    /// Base URL of the completion provider (default: `"https://api.cohere.com"`).
    pub cohere_base_url: String,

    /// Per-model request timeout in seconds.
    pub cohere_timeout_secs: u64,

    /// Upper bound on how many models of the priority list are tried per turn.
    pub cohere_max_models: Option<usize>,

    /// Session/cookie signing secret. Not used by the chat pipeline.
    pub secret_key: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,sqlx=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origin allow-list; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: get("WELLMIND_BIND").unwrap_or_else(|| "0.0.0.0:5001".to_owned()),
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite://wellmind.db".to_owned()),
            cohere_api_key: get("COHERE_API_KEY").map(|v| v.trim().to_owned()),
            cohere_base_url: get("COHERE_BASE_URL")
                .unwrap_or_else(|| "https://api.cohere.com".to_owned()),
            cohere_timeout_secs: parse_or(get("COHERE_TIMEOUT_SECS"), 15),
            cohere_max_models: get("COHERE_MAX_MODELS").and_then(|v| v.parse().ok()),
            secret_key: get("WELLMIND_SECRET_KEY")
                .or_else(|| get("FLASK_SECRET_KEY"))
                .unwrap_or_else(|| "dev-secret-key-change-me".to_owned()),
            log_level: get("WELLMIND_LOG").unwrap_or_else(|| "info".to_owned()),
            log_json: get("WELLMIND_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cors_allowed_origins: get("WELLMIND_CORS_ORIGINS"),
            enable_swagger: get("WELLMIND_ENABLE_SWAGGER")
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or(true),
        }
    }

    /// Provider settings, or `None` when no credential is configured.
    pub fn provider_config(&self) -> Option<ProviderConfig> {
        let api_key = self.cohere_api_key.clone()?;
        let limit = self
            .cohere_max_models
            .unwrap_or(COHERE_MODELS.len())
            .clamp(1, COHERE_MODELS.len());

        Some(ProviderConfig {
            api_key,
            base_url: self.cohere_base_url.trim_end_matches('/').to_owned(),
            models: COHERE_MODELS[..limit].iter().map(|m| (*m).to_owned()).collect(),
            timeout: Duration::from_secs(self.cohere_timeout_secs),
            ..ProviderConfig::default()
        })
    }

    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.database_url.starts_with("sqlite:") {
            anyhow::bail!(
                "DATABASE_URL '{}' is not supported; only sqlite: URLs can be opened",
                redact_credentials(&self.database_url)
            );
        }
        Ok(())
    }

    pub fn ai_enabled(&self) -> bool {
        self.cohere_api_key.is_some()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("database_url", &self.database_url)
            .field("cohere_api_key", &self.cohere_api_key.as_ref().map(|_| "<redacted>"))
            .field("cohere_base_url", &self.cohere_base_url)
            .field("cohere_timeout_secs", &self.cohere_timeout_secs)
            .field("cohere_max_models", &self.cohere_max_models)
            .field("secret_key", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("enable_swagger", &self.enable_swagger)
            .finish()
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

/// Drop any `user:password@` part of a URL before it reaches an error message.
fn redact_credentials(url: &str) -> String {
    match (url.split_once("://"), url.rfind('@')) {
        (Some((scheme, _)), Some(at)) => format!("{scheme}://***{}", &url[at..]),
        _ => url.to_owned(),
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
