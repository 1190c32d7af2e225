pub mod accounts;
pub mod admin;
pub mod health;
pub mod me;
pub mod relations;
pub mod resource;
pub mod resources;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .route("/registration", post(accounts::register))
        .route("/login", post(accounts::login))
        // Protected routes
        .route("/me", get(me::get_me))
        .route(
            "/table",
            get(accounts::list_accounts).delete(accounts::delete_all_accounts),
        )
        .route("/updateuser/:id", post(accounts::update_account))
        .route("/deleteuser/:id", get(accounts::delete_account))
        .route("/accounts/:id", delete(accounts::delete_account))
        // Entity CRUD and relationship accessors
        .merge(resources::router())
        .merge(relations::router())
        // Admin grids
        .merge(admin::router())
}
