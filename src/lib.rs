//! TenderHub backend: multi-tenant procurement records over an axum HTTP API.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

pub use app::{create_app, AppState};
pub use config::Settings;
pub use store::Store;
