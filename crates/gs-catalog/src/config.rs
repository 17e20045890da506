//! Client configuration.
//!
//! Loaded from a YAML file, from the environment, or built in code. Missing
//! values fall back to the defaults of a stock local GeoServer install.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use gs_common::{GsError, GsResult};
use serde::Deserialize;
use tracing::debug;

use crate::retry::RetryPolicy;

/// Credentials sent with every request. Basic and token auth are mutually
/// exclusive by construction.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    Token { token: String },
}

impl Default for Auth {
    fn default() -> Self {
        Auth::Basic {
            username: "admin".to_string(),
            password: "geoserver".to_string(),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Basic { username, .. } => write!(f, "Basic({}, ***)", username),
            Auth::Token { .. } => write!(f, "Token(***)"),
        }
    }
}

/// Root configuration of a catalog client.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_service_url")]
    pub service_url: String,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default = "default_validate_ssl")]
    pub validate_ssl: bool,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: f64,
}

fn default_service_url() -> String {
    "http://localhost:8080/geoserver/rest".to_string()
}

fn default_validate_ssl() -> bool {
    true
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    0.9
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_cache_ttl_secs() -> f64 {
    5.0
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            auth: Auth::default(),
            validate_ssl: default_validate_ssl(),
            retries: default_retries(),
            backoff_factor: default_backoff_factor(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CatalogConfig {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Default::default()
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Auth::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Token { token: token.into() };
        self
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> GsResult<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| GsError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file.
    pub fn from_yaml_file(path: &Path) -> GsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GsError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded catalog configuration");
        Self::from_yaml_str(&content)
    }

    /// Build from `GEOSERVER_*` environment variables over the defaults.
    pub fn from_env() -> GsResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup over the defaults.
    pub fn from_lookup<F>(lookup: F) -> GsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("GEOSERVER_URL") {
            config.service_url = url;
        }

        if let Some(token) = lookup("GEOSERVER_TOKEN").filter(|t| !t.is_empty()) {
            config.auth = Auth::Token { token };
        } else {
            let user = lookup("GEOSERVER_USER");
            let password = lookup("GEOSERVER_PASSWORD");
            if user.is_some() || password.is_some() {
                config.auth = Auth::Basic {
                    username: user.unwrap_or_else(|| "admin".to_string()),
                    password: password.unwrap_or_else(|| "geoserver".to_string()),
                };
            }
        }

        if let Some(v) = lookup("GEOSERVER_RETRIES") {
            config.retries = parse_var("GEOSERVER_RETRIES", &v)?;
        }
        if let Some(v) = lookup("GEOSERVER_BACKOFF_FACTOR") {
            config.backoff_factor = parse_var("GEOSERVER_BACKOFF_FACTOR", &v)?;
        }
        if let Some(v) = lookup("GEOSERVER_CACHE_TTL_SECS") {
            config.cache_ttl_secs = parse_var("GEOSERVER_CACHE_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("GEOSERVER_VALIDATE_SSL") {
            config.validate_ssl = parse_var("GEOSERVER_VALIDATE_SSL", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Durations given in seconds must be finite and not negative.
    pub fn validate(&self) -> GsResult<()> {
        for (name, secs) in [
            ("backoff_factor", self.backoff_factor),
            ("cache_ttl_secs", self.cache_ttl_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(GsError::Config(format!("{} must be a finite, non-negative number: {}", name, secs)));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.backoff_factor)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::try_from_secs_f64(self.cache_ttl_secs.max(0.0)).unwrap_or(Duration::ZERO)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> GsResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GsError::Config(format!("{} has an invalid value: {}", name, value)))
}
