use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{is_absolute_url, path_matches_prefix, url_path};
use crate::data::QueryParams;
use crate::error::{Error, Result};

/// Environment variable overriding the resolved base URL.
pub const ENV_API_URL: &str = "LIBRIS_API_URL";

/// Environment variable selecting the named environment.
pub const ENV_ENVIRONMENT: &str = "LIBRIS_ENV";

/// Named backend environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(Error::Config(format!("unknown environment: {other}"))),
        }
    }
}

/// Backend base URL for each named environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentUrls {
    pub development: String,
    pub production: String,
    pub test: String,
}

impl Default for EnvironmentUrls {
    fn default() -> Self {
        Self {
            development: "http://localhost:8000/api".to_string(),
            production: "https://library.libris.edu/api".to_string(),
            test: "http://127.0.0.1:8000/api".to_string(),
        }
    }
}

impl EnvironmentUrls {
    pub fn get(&self, environment: Environment) -> &str {
        match environment {
            Environment::Development => &self.development,
            Environment::Production => &self.production,
            Environment::Test => &self.test,
        }
    }
}

/// An endpoint family whose GET responses may be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRule {
    pub prefix: String,
    /// Only cache when this query parameter is present (e.g. `page`).
    #[serde(default)]
    pub requires_param: Option<String>,
}

impl CacheRule {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            requires_param: None,
        }
    }

    #[must_use]
    pub fn requires_param(mut self, param: impl Into<String>) -> Self {
        self.requires_param = Some(param.into());
        self
    }

    pub fn matches(&self, endpoint: &str, params: &QueryParams) -> bool {
        if !path_matches_prefix(&url_path(endpoint), &self.prefix) {
            return false;
        }
        match &self.requires_param {
            Some(param) => params.is_present(param),
            None => true,
        }
    }
}

/// Static client configuration.
///
/// Layered as: defaults, then an optional TOML file, then the
/// `LIBRIS_ENV` / `LIBRIS_API_URL` environment variables.
///
/// # Examples
///
/// ```
/// use libris_http::{ClientConfig, Environment};
///
/// let config = ClientConfig::from_toml_str(r#"
/// environment = "development"
/// timeout_secs = 10
/// "#).unwrap();
///
/// assert_eq!(config.environment, Environment::Development);
/// assert_eq!(config.timeout().as_secs(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub environment: Environment,
    pub urls: EnvironmentUrls,
    /// Explicit base URL; wins over the environment table.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cache_rules: Vec<CacheRule>,
    /// Bare paths with these prefixes are rewritten onto the base URL.
    pub api_paths: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            urls: EnvironmentUrls::default(),
            base_url: None,
            timeout_secs: 30,
            cache_ttl_secs: 300,
            cache_rules: vec![
                CacheRule::prefix("/course"),
                CacheRule::prefix("/books").requires_param("page"),
                CacheRule::prefix("/resources"),
            ],
            api_paths: DEFAULT_API_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Endpoint path prefixes served by the library backend.
pub const DEFAULT_API_PATHS: &[&str] = &[
    "/login",
    "/register",
    "/logout",
    "/forgot-password",
    "/reset-password",
    "/books",
    "/ebooks",
    "/notes",
    "/oldquestion",
    "/notices",
    "/resources",
    "/course",
    "/users",
    "/user",
    "/issue-book",
    "/return-book",
    "/issued-books",
    "/documents",
];

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(env) = lookup(ENV_ENVIRONMENT).filter(|v| !v.trim().is_empty()) {
            self.environment = env.parse()?;
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = Some(url);
        }
        Ok(self)
    }

    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn is_cacheable(&self, endpoint: &str, params: &QueryParams) -> bool {
        self.cache_rules.iter().any(|rule| rule.matches(endpoint, params))
    }

    pub fn is_api_path(&self, path: &str) -> bool {
        self.api_paths.iter().any(|prefix| path_matches_prefix(path, prefix))
    }
}

/// Resolves the active base URL.
///
/// The selected environment can be switched at runtime; requests already in
/// flight keep the URL they were built with.
#[derive(Debug)]
pub struct ConfigResolver {
    config: ClientConfig,
    environment: RwLock<Environment>,
}

impl ConfigResolver {
    pub fn new(config: ClientConfig) -> Self {
        let environment = RwLock::new(config.environment);
        Self {
            config,
            environment,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn environment(&self) -> Environment {
        *self.environment.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_environment(&self, environment: Environment) {
        *self.environment.write().unwrap_or_else(PoisonError::into_inner) = environment;
    }

    pub fn base_url(&self) -> String {
        let url = match &self.config.base_url {
            Some(url) if !url.trim().is_empty() => url.as_str(),
            _ => self.config.urls.get(self.environment()),
        };
        url.trim_end_matches('/').to_string()
    }

    /// Path of `endpoint` relative to the active base URL.
    ///
    /// Absolute URLs on another origin keep their full path.
    pub fn relative_path(&self, endpoint: &str) -> String {
        if is_absolute_url(endpoint)
            && let Some(rest) = endpoint.strip_prefix(&self.base_url())
            && (rest.is_empty() || rest.starts_with(['/', '?', '#']))
        {
            let path = url_path(rest);
            return if path.is_empty() { "/".to_string() } else { path };
        }
        url_path(endpoint)
    }

    pub fn is_cacheable(&self, endpoint: &str, params: &QueryParams) -> bool {
        self.config.is_cacheable(&self.relative_path(endpoint), params)
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
