//! agportal - course portal backend
//!
//! Connects a grading platform's users and courses to GitHub and GitLab.
//! Users log in with OAuth2; their access tokens then drive a uniform
//! source code management client that every API request is handed.
//!
//! # Architecture
//!
//! - [`web`] - HTTP routes, the access gate, error mapping
//! - [`auth`] - OAuth providers and the login state machine
//! - [`session`] - encrypted cookie session
//! - [`scm`] - provider abstraction, adapters, per-token client cache
//! - [`db`] - persistence interface and the in-memory store
//! - [`models`] - users, identities, courses, and the token-stripping transform
//! - [`config`] - config file, environment, and flag merging
//! - [`cli`] - argument parsing and process entry
//! - [`telemetry`] - tracing setup
//!
//! # Invariants
//!
//! 1. Access tokens never leave the process: not in API bodies, logs, or errors
//! 2. At most one SCM client is constructed per access token
//! 3. Every `/api/v1` request passes the gate or is rejected before its handler runs
//! 4. A course is stored only after its directory was fetched with the caller's token

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod scm;
pub mod session;
pub mod telemetry;
pub mod web;
