//! Core library for the Personalized Prophylaxis Platform client.
//!
//! - `auth`: credential store, session context, hydration gate
//! - `routing`: navigation paths, router, route guard
//! - `shell`: the session shell every client owns
//! - `api`: the authorized request gateway and typed endpoints
//! - `health`: backend liveness monitor
//! - `models`: request/response types and form validation
//! - `config`: client configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod health;
pub mod models;
pub mod routing;
pub mod shell;
pub mod validation;

pub use api::{ApiClient, ApiError, RequestOptions};
pub use auth::{Credential, CredentialStore, HydrationState, SessionContext};
pub use config::Config;
pub use health::{BackendStatus, HealthMonitor, MonitorHandle};
pub use routing::{RouteGuard, Router, Screen};
pub use shell::Shell;
pub use validation::ValidationError;
