//! cli
//!
//! Process entry: parse arguments, load configuration, serve.
//!
//! # Responsibilities
//!
//! - Parse flags and environment via [`Cli`]
//! - Resolve [`Config`] and wire the components into an [`AppState`]
//! - Run the HTTP server until Ctrl-C, then drain in-flight requests
//!
//! Request handling itself lives in [`crate::web`].

pub mod args;

pub use args::Cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Notify;

use crate::auth::ProviderRegistry;
use crate::config::Config;
use crate::db::MemoryDatabase;
use crate::scm::{Directory, ProviderScmFactory};
use crate::telemetry;
use crate::web::{self, AppState};

/// How long in-flight requests may take to finish after Ctrl-C.
pub const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

/// Run the server.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    telemetry::init(cli.debug);

    let config = Config::load(&cli.overrides()).context("failed to load configuration")?;
    if let Some(path) = config.loaded_from() {
        tracing::info!(path = %path.display(), "loaded config file");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(serve(config))
}

/// Build the application from `config` and serve it until shutdown.
pub async fn serve(config: Config) -> Result<()> {
    let entry_point = config.entry_point();
    if !entry_point.exists() {
        tracing::warn!(path = %entry_point.display(), "single-page entry point not found");
    }

    let registry = ProviderRegistry::from_config(&config);
    if registry.names().is_empty() {
        tracing::warn!("no login providers registered; nobody can log in");
    }

    let state = AppState::new(
        Arc::new(MemoryDatabase::new()),
        registry,
        Arc::new(scm_factory(&config)),
        web::session_key(&config),
        entry_point,
    );
    let router = web::router(state);

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    tracing::info!(addr = %config.http_addr, "listening");

    let stopping = Arc::new(Notify::new());
    let server = axum::serve(listener, router).with_graceful_shutdown({
        let stopping = Arc::clone(&stopping);
        async move {
            shutdown_signal().await;
            tracing::info!("shutting down");
            stopping.notify_one();
        }
    });

    tokio::select! {
        result = async { server.await } => result.context("server error")?,
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(SHUTDOWN_DRAIN).await;
        } => {
            tracing::warn!(drain = ?SHUTDOWN_DRAIN, "in-flight requests did not finish; exiting");
        }
    }
    Ok(())
}

/// The SCM factory for `config`.
///
/// With the fake provider enabled, fake logins see a fixed set of
/// directories so the directory and course pages have something to show.
pub fn scm_factory(config: &Config) -> ProviderScmFactory {
    let factory = ProviderScmFactory::new();
    if config.provider_fake {
        factory.with_fake_directories(fake_directories())
    } else {
        factory
    }
}

fn fake_directories() -> Vec<Directory> {
    [(1, "fake-course-2024"), (2, "fake-sandbox")]
        .into_iter()
        .map(|(id, name)| Directory {
            id,
            name: name.to_string(),
            avatar: None,
        })
        .collect()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
