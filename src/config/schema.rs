//! config::schema
//!
//! Config file schema.
//!
//! # Validation
//!
//! Values are validated after parsing so that a bad file fails at startup with
//! the offending key named, instead of at the first request.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Minimum session key length in bytes (signing + encryption halves).
pub const MIN_SESSION_KEY_BYTES: usize = 64;

/// Config file contents.
///
/// # Example
///
/// ```toml
/// service_url = "ag.example.com"
/// provider_fake = false
/// session_key = "<128+ hex chars>"
///
/// [http]
/// addr = ":8080"
/// public = "public"
///
/// [github]
/// client_id = "Iv1.abc"
/// client_secret = "..."
/// ```
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Listener settings
    pub http: Option<HttpConfig>,

    /// Externally visible host (and optional port) of the service
    pub service_url: Option<String>,

    /// Enable the deterministic fake provider
    pub provider_fake: Option<bool>,

    /// Hex-encoded cookie key
    pub session_key: Option<String>,

    /// GitHub OAuth app credentials
    pub github: Option<ProviderCredentials>,

    /// GitLab OAuth app credentials
    pub gitlab: Option<ProviderCredentials>,
}

// Custom Debug to avoid exposing the session key
impl std::fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfig")
            .field("http", &self.http)
            .field("service_url", &self.service_url)
            .field("provider_fake", &self.provider_fake)
            .field("session_key", &self.session_key.as_ref().map(|_| "[REDACTED]"))
            .field("github", &self.github)
            .field("gitlab", &self.gitlab)
            .finish()
    }
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(addr) = self.http.as_ref().and_then(|h| h.addr.as_deref()) {
            super::parse_listen_addr(addr)?;
        }

        if let Some(url) = &self.service_url {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "service_url cannot be empty".to_string(),
                ));
            }
        }

        if let Some(key) = &self.session_key {
            decode_session_key(key)?;
        }

        for (name, creds) in [("github", &self.github), ("gitlab", &self.gitlab)] {
            if let Some(creds) = creds {
                creds.validate(name)?;
            }
        }

        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Listen address, e.g. ":8080" or "127.0.0.1:8080"
    pub addr: Option<String>,

    /// Directory holding the single-page app (`index.html`)
    pub public: Option<String>,
}

/// OAuth application credentials for one provider.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderCredentials {
    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl ProviderCredentials {
    /// Create credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn validate(&self, provider: &str) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "{}.client_id cannot be empty",
                provider
            )));
        }
        Ok(())
    }
}

/// Decode a hex session key and check its length.
pub fn decode_session_key(hex_key: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| ConfigError::InvalidValue(format!("session_key is not valid hex: {}", e)))?;
    if bytes.len() < MIN_SESSION_KEY_BYTES {
        return Err(ConfigError::InvalidValue(format!(
            "session_key must be at least {} bytes, got {}",
            MIN_SESSION_KEY_BYTES,
            bytes.len()
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let config: FileConfig = toml::from_str(
            r#"
            service_url = "ag.example.com"
            provider_fake = true

            [http]
            addr = ":9090"
            public = "/srv/public"

            [github]
            client_id = "id"
            client_secret = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.service_url.as_deref(), Some("ag.example.com"));
        assert_eq!(config.provider_fake, Some(true));
        assert_eq!(
            config.http.as_ref().and_then(|h| h.addr.as_deref()),
            Some(":9090")
        );
        assert_eq!(config.github, Some(ProviderCredentials::new("id", "secret")));
        assert!(config.gitlab.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("listen = \":8080\"");
        assert!(result.is_err());

        let result: Result<FileConfig, _> = toml::from_str("[http]\nport = 1");
        assert!(result.is_err());
    }

    #[test]
    fn empty_service_url_rejected() {
        let config = FileConfig {
            service_url: Some("  ".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_client_id_rejected() {
        let config = FileConfig {
            gitlab: Some(ProviderCredentials::new("", "s")),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gitlab.client_id"));
    }

    #[test]
    fn bad_listen_addr_rejected() {
        let config = FileConfig {
            http: Some(HttpConfig {
                addr: Some("not-an-addr".into()),
                public: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn session_key_must_be_long_hex() {
        assert!(decode_session_key("zz").is_err());
        assert!(decode_session_key(&"ab".repeat(32)).is_err());
        assert_eq!(decode_session_key(&"ab".repeat(64)).unwrap().len(), 64);
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = FileConfig {
            session_key: Some("deadbeef".into()),
            github: Some(ProviderCredentials::new("id", "hunter2")),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("deadbeef"));
        assert!(!debug.contains("hunter2"));
    }
}
