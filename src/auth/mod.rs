//! auth - OAuth2 login
//!
//! This module implements the authorization-code login flow against the
//! configured providers and binds the resulting remote identity to a local
//! user.
//!
//! # Architecture
//!
//! - [`ProviderRegistry`] - providers by name, built once at startup
//! - [`OAuthProvider`] - `begin_auth` / `complete_auth` per provider
//! - [`OAuth2Provider`] - GitHub and GitLab over HTTP
//! - [`FakeOAuthProvider`] - no network; for local runs and tests
//! - [`LoginFlow`] - the `Anonymous → PendingCallback → Authenticated` machine
//!
//! # Security
//!
//! Access tokens, client secrets, and state values MUST never appear in:
//! - logs (including debug)
//! - error messages
//! - `Debug` output
//!
//! Types in this module that hold such values implement `Debug` by hand to
//! redact them. Logs identify a token by its fingerprint only.

mod errors;
pub mod fake;
mod flow;
pub mod oauth2;
mod provider;
mod registry;
mod state_token;

pub use errors::AuthError;
pub use fake::FakeOAuthProvider;
pub use flow::{Linking, LoginFlow, LoginRedirect, LoginState};
pub use oauth2::{Endpoints, OAuth2Provider};
pub use provider::{CallbackParams, CompletedAuth, OAuthProvider, RemoteProfile};
pub use registry::ProviderRegistry;
pub use state_token::StateToken;
