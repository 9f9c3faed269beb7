//! config
//!
//! Configuration loading and merging.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment variables and CLI flags ([`Overrides`])
//!
//! # Config File Location
//!
//! Searched in order:
//! 1. `--config <path>` (must exist)
//! 2. `$AGPORTAL_CONFIG` if set (must exist)
//! 3. `<config dir>/agportal/config.toml` if it exists
//!
//! # Example
//!
//! ```no_run
//! use agportal::config::{Config, Overrides};
//!
//! let config = Config::load(&Overrides::default()).unwrap();
//! println!("listening on {}", config.http_addr);
//! println!("{}", config.callback_url("github"));
//! ```

pub mod schema;

pub use schema::{FileConfig, HttpConfig, ProviderCredentials};

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Env var naming an explicit config file.
pub const CONFIG_ENV: &str = "AGPORTAL_CONFIG";

/// Default listen address.
pub const DEFAULT_HTTP_ADDR: &str = ":8080";

/// Default static root.
pub const DEFAULT_PUBLIC: &str = "public";

/// Default externally visible host.
pub const DEFAULT_SERVICE_URL: &str = "localhost";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Values supplied by flags or environment; `None` means "not given".
#[derive(Clone, Default)]
pub struct Overrides {
    /// Explicit config file
    pub config_path: Option<PathBuf>,
    /// Listen address
    pub http_addr: Option<String>,
    /// Static root
    pub public: Option<PathBuf>,
    /// Externally visible host
    pub service_url: Option<String>,
    /// Enable the fake provider (only ever turns it on)
    pub provider_fake: bool,
    /// Hex-encoded cookie key
    pub session_key: Option<String>,
    /// GitHub OAuth credentials
    pub github: Option<ProviderCredentials>,
    /// GitLab OAuth credentials
    pub gitlab: Option<ProviderCredentials>,
}

impl std::fmt::Debug for Overrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overrides")
            .field("config_path", &self.config_path)
            .field("http_addr", &self.http_addr)
            .field("public", &self.public)
            .field("service_url", &self.service_url)
            .field("provider_fake", &self.provider_fake)
            .field("github", &self.github)
            .field("gitlab", &self.gitlab)
            .finish_non_exhaustive()
    }
}

/// Fully resolved configuration.
#[derive(Clone)]
pub struct Config {
    /// Socket to listen on
    pub http_addr: SocketAddr,
    /// Directory holding `index.html`
    pub public: PathBuf,
    /// Externally visible host used in callback URLs
    pub service_url: String,
    /// Whether the fake provider is registered
    pub provider_fake: bool,
    /// Decoded cookie key; `None` means generate one at startup
    pub session_key: Option<Vec<u8>>,
    /// GitHub OAuth credentials
    pub github: Option<ProviderCredentials>,
    /// GitLab OAuth credentials
    pub gitlab: Option<ProviderCredentials>,
    /// Config file that was loaded, if any
    pub(crate) loaded_from: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_addr", &self.http_addr)
            .field("public", &self.public)
            .field("service_url", &self.service_url)
            .field("provider_fake", &self.provider_fake)
            .field("session_key", &self.session_key.as_ref().map(|_| "[REDACTED]"))
            .field("github", &self.github)
            .field("gitlab", &self.gitlab)
            .field("loaded_from", &self.loaded_from)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            public: PathBuf::from(DEFAULT_PUBLIC),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            provider_fake: false,
            session_key: None,
            github: None,
            gitlab: None,
            loaded_from: None,
        }
    }
}

impl Config {
    /// Locate and load the config file, then apply `overrides`.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing, if a file
    /// exists but cannot be parsed, or if any merged value is invalid.
    pub fn load(overrides: &Overrides) -> Result<Config, ConfigError> {
        let path = match &overrides.config_path {
            Some(path) => Some(path.clone()),
            None => Self::discover(),
        };
        Self::load_from(path.as_deref(), overrides)
    }

    /// Load from a specific file (or none) and apply `overrides`.
    pub fn load_from(path: Option<&Path>, overrides: &Overrides) -> Result<Config, ConfigError> {
        let file = match path {
            Some(path) => Self::read_file(path)?,
            None => FileConfig::default(),
        };
        file.validate()?;

        let mut config = Self::resolve(file, overrides)?;
        config.loaded_from = path.map(Path::to_path_buf);
        Ok(config)
    }

    /// Merge defaults, file values, and overrides.
    pub fn resolve(file: FileConfig, overrides: &Overrides) -> Result<Config, ConfigError> {
        let http = file.http.unwrap_or_default();

        let addr = overrides
            .http_addr
            .clone()
            .or(http.addr)
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());

        let public = overrides
            .public
            .clone()
            .or_else(|| http.public.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC));

        let service_url = overrides
            .service_url
            .clone()
            .or(file.service_url)
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
        if service_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "service_url cannot be empty".to_string(),
            ));
        }

        let session_key = overrides
            .session_key
            .as_deref()
            .or(file.session_key.as_deref())
            .map(schema::decode_session_key)
            .transpose()?;

        // A provider is enabled only when its client id is set.
        let github = overrides.github.clone().or(file.github).filter(|c| !c.client_id.is_empty());
        let gitlab = overrides.gitlab.clone().or(file.gitlab).filter(|c| !c.client_id.is_empty());

        Ok(Config {
            http_addr: parse_listen_addr(&addr)?,
            public,
            service_url,
            provider_fake: overrides.provider_fake || file.provider_fake.unwrap_or(false),
            session_key,
            github,
            gitlab,
            loaded_from: None,
        })
    }

    /// OAuth callback URL for `provider`.
    ///
    /// ```
    /// use agportal::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(
    ///     config.callback_url("gitlab"),
    ///     "https://localhost/auth/gitlab/callback"
    /// );
    /// ```
    pub fn callback_url(&self, provider: &str) -> String {
        format!("https://{}/auth/{}/callback", self.service_url, provider)
    }

    /// Path of the single-page entry point.
    pub fn entry_point(&self) -> PathBuf {
        self.public.join("index.html")
    }

    /// Get the path of the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::config_dir()
            .map(|dir| dir.join("agportal/config.toml"))
            .filter(|path| path.exists())
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Parse a listen address. A bare `:port` binds all interfaces.
///
/// ```
/// use agportal::config::parse_listen_addr;
///
/// assert_eq!(parse_listen_addr(":8080").unwrap().to_string(), "0.0.0.0:8080");
/// assert_eq!(parse_listen_addr("localhost:3000").unwrap().to_string(), "127.0.0.1:3000");
/// assert!(parse_listen_addr("8080").is_err());
/// ```
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    let normalized = if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{}", port)
    } else if let Some(port) = addr.strip_prefix("localhost:") {
        format!("127.0.0.1:{}", port)
    } else {
        addr.to_string()
    };
    normalized
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("invalid listen address '{}'", addr)))
}
