//! Runtime configuration loaded from the environment.
//!
//! `.env` is read first (if present); real environment variables win.

use crate::errors::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

static IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").ok());

/// Checks that a database name is safe to splice into DDL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidIdentifier` for anything outside
/// `^[a-z_][a-z0-9_]*$`.
pub fn validate_identifier(name: &str) -> Result<&str, ConfigError> {
    match IDENTIFIER.as_ref() {
        Some(pattern) if pattern.is_match(name) => Ok(name),
        _ => Err(ConfigError::InvalidIdentifier(name.to_string())),
    }
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Server URL without the database name (`postgresql://user:pw@host:5432/`).
    #[serde(default)]
    pub server_url: Option<String>,
    /// Database holding `influd_data`.
    #[serde(default = "default_database")]
    pub name: String,
    /// Database used to issue `CREATE DATABASE`.
    #[serde(default = "default_admin_database")]
    pub admin_name: String,
}

fn default_database() -> String {
    "srag_brasil".to_string()
}

fn default_admin_database() -> String {
    "postgres".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            name: default_database(),
            admin_name: default_admin_database(),
        }
    }
}

/// News search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Search API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Search endpoint.
    #[serde(default = "default_news_endpoint")]
    pub endpoint: String,
    /// Results requested per source domain.
    #[serde(default = "default_news_max_results")]
    pub max_results: u32,
}

fn default_news_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_news_max_results() -> u32 {
    10
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_news_endpoint(),
            max_results: default_news_max_results(),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL.
    #[serde(default = "default_model_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_model_base_url(),
            model: default_model(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Bulk-load input file.
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,
    /// Root of the `reports/` and `graphics/` directories.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// News search settings.
    #[serde(default)]
    pub news: NewsConfig,
    /// Language model settings.
    #[serde(default)]
    pub model: ModelConfig,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_input_file() -> PathBuf {
    PathBuf::from("data/silver/INFLUD21-25.csv")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_http_timeout() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            input_file: default_input_file(),
            data_dir: default_data_dir(),
            news: NewsConfig::default(),
            model: ModelConfig::default(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, then reads the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_lookup`](Self::from_lookup).
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error for unparsable numbers or invalid database names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.database.server_url = get("POSTGRES_SERVER_URL");
        if let Some(name) = get("SRAG_DATABASE") {
            config.database.name = name;
        }
        if let Some(name) = get("SRAG_ADMIN_DATABASE") {
            config.database.admin_name = name;
        }
        validate_identifier(&config.database.name)?;
        validate_identifier(&config.database.admin_name)?;

        if let Some(path) = get("SRAG_INPUT_FILE") {
            config.input_file = PathBuf::from(path);
        }
        if let Some(path) = get("SRAG_DATA_DIR") {
            config.data_dir = PathBuf::from(path);
        }

        config.news.api_key = get("TAVILY_API_KEY");
        if let Some(endpoint) = get("TAVILY_ENDPOINT") {
            config.news.endpoint = endpoint;
        }
        if let Some(value) = get("SRAG_NEWS_MAX_RESULTS") {
            config.news.max_results = parse_number("SRAG_NEWS_MAX_RESULTS", &value)?;
        }

        config.model.api_key = get("PROVIDER_API_KEY");
        if let Some(url) = get("PROVIDER_BASE_URL") {
            config.model.base_url = url;
        }
        if let Some(model) = get("TARGET_AGENT_MODEL") {
            config.model.model = model;
        }

        if let Some(value) = get("SRAG_HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = parse_number("SRAG_HTTP_TIMEOUT_SECS", &value)?;
        }

        Ok(config)
    }

    /// HTTP request timeout.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Directory of the rendered report.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    /// Directory of the chart images.
    #[must_use]
    pub fn graphics_dir(&self) -> PathBuf {
        self.data_dir.join("graphics")
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
