//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! Every flag falls back to an environment variable. OAuth credentials are
//! read from `GITHUB_KEY` / `GITHUB_SECRET` and `GITLAB_KEY` /
//! `GITLAB_SECRET`; their values never appear in `--help`.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Overrides, ProviderCredentials};

/// agportal - course portal backend with GitHub and GitLab login
#[derive(Parser)]
#[command(name = "agportal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on (e.g. ":8080" or "127.0.0.1:8080")
    #[arg(long = "http-addr", env = "AGPORTAL_HTTP_ADDR")]
    pub http_addr: Option<String>,

    /// Directory holding the single-page app's index.html
    #[arg(long, env = "AGPORTAL_PUBLIC")]
    pub public: Option<PathBuf>,

    /// Externally visible host, used to build OAuth callback URLs
    #[arg(long = "service-url", env = "AGPORTAL_SERVICE_URL")]
    pub service_url: Option<String>,

    /// Register the fake login provider (local development only)
    #[arg(long = "provider-fake", env = "AGPORTAL_PROVIDER_FAKE")]
    pub provider_fake: bool,

    /// Hex-encoded session cookie key (at least 64 bytes)
    #[arg(long = "session-key", env = "AGPORTAL_SESSION_KEY", hide_env_values = true)]
    pub session_key: Option<String>,

    /// Config file to load
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// GitHub OAuth client id
    #[arg(long = "github-key", env = "GITHUB_KEY", hide_env_values = true)]
    pub github_key: Option<String>,

    /// GitHub OAuth client secret
    #[arg(long = "github-secret", env = "GITHUB_SECRET", hide_env_values = true)]
    pub github_secret: Option<String>,

    /// GitLab OAuth client id
    #[arg(long = "gitlab-key", env = "GITLAB_KEY", hide_env_values = true)]
    pub gitlab_key: Option<String>,

    /// GitLab OAuth client secret
    #[arg(long = "gitlab-secret", env = "GITLAB_SECRET", hide_env_values = true)]
    pub gitlab_secret: Option<String>,
}

impl std::fmt::Debug for Cli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cli")
            .field("http_addr", &self.http_addr)
            .field("public", &self.public)
            .field("service_url", &self.service_url)
            .field("provider_fake", &self.provider_fake)
            .field("config", &self.config)
            .field("debug", &self.debug)
            .field("github_key", &self.github_key)
            .field("gitlab_key", &self.gitlab_key)
            .finish_non_exhaustive()
    }
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// The values given on the command line or in the environment.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            http_addr: self.http_addr.clone(),
            public: self.public.clone(),
            service_url: self.service_url.clone(),
            provider_fake: self.provider_fake,
            session_key: self.session_key.clone(),
            github: credentials(&self.github_key, &self.github_secret),
            gitlab: credentials(&self.gitlab_key, &self.gitlab_secret),
        }
    }
}

fn credentials(key: &Option<String>, secret: &Option<String>) -> Option<ProviderCredentials> {
    key.as_ref()
        .map(|key| ProviderCredentials::new(key.clone(), secret.clone().unwrap_or_default()))
}
