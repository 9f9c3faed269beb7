//! auth::registry
//!
//! Process-wide table of OAuth providers, built once at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::errors::AuthError;
use super::fake::FakeOAuthProvider;
use super::oauth2::OAuth2Provider;
use super::provider::OAuthProvider;
use crate::config::Config;

/// Named OAuth providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn OAuthProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration.
    ///
    /// GitHub and GitLab are registered only when their credentials are
    /// configured; the fake provider only when enabled.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        match &config.github {
            Some(creds) => registry.register(OAuth2Provider::github(
                &creds.client_id,
                &creds.client_secret,
                &config.callback_url("github"),
            )),
            None => tracing::warn!("GITHUB_KEY not set; github login disabled"),
        }

        match &config.gitlab {
            Some(creds) => registry.register(OAuth2Provider::gitlab(
                &creds.client_id,
                &creds.client_secret,
                &config.callback_url("gitlab"),
            )),
            None => tracing::warn!("GITLAB_KEY not set; gitlab login disabled"),
        }

        if config.provider_fake {
            tracing::warn!("fake provider enabled");
            registry.register(FakeOAuthProvider::new("fake", config.callback_url("fake")));
        }

        registry
    }

    /// Register `provider` under its own name, replacing any previous entry.
    pub fn register(&mut self, provider: impl OAuthProvider + 'static) {
        self.providers
            .insert(provider.name().to_string(), Arc::new(provider));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, provider: impl OAuthProvider + 'static) -> Self {
        self.register(provider);
        self
    }

    /// Look up a provider.
    ///
    /// # Errors
    ///
    /// `AuthError::UnknownProvider` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn OAuthProvider>, AuthError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::UnknownProvider(name.to_string()))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderCredentials;

    #[test]
    fn lookup_unknown_fails() {
        let registry = ProviderRegistry::new();
        assert_eq!(
            registry.get("github").err(),
            Some(AuthError::UnknownProvider("github".into()))
        );
    }

    #[test]
    fn fake_can_be_registered_under_any_name() {
        let registry =
            ProviderRegistry::new().with(FakeOAuthProvider::new("github", "https://x/cb"));
        assert_eq!(registry.names(), vec!["github"]);
        assert_eq!(registry.get("github").unwrap().name(), "github");
    }

    #[test]
    fn from_config_registers_only_configured_providers() {
        let config = Config {
            gitlab: Some(ProviderCredentials::new("id", "secret")),
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config);
        assert_eq!(registry.names(), vec!["gitlab"]);
    }

    #[test]
    fn from_config_adds_fake_when_enabled() {
        let config = Config {
            provider_fake: true,
            github: Some(ProviderCredentials::new("id", "secret")),
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config);
        assert_eq!(registry.names(), vec!["fake", "github"]);
    }

    #[test]
    fn fake_begins_at_configured_callback() {
        let config = Config {
            provider_fake: true,
            service_url: "ag.example.com".into(),
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config);
        let url = registry.get("fake").unwrap().begin_auth("s").unwrap();
        assert!(url.starts_with("https://ag.example.com/auth/fake/callback?"));
    }
}
