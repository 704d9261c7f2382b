//! HTTP front end of Open Horizon: an axum router over the assistant runtime
//! with bearer-token auth and 422 validation errors.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod extract;
pub mod health;
pub mod routes;
pub mod state;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use routes::build_app_router;
pub use state::AppState;
