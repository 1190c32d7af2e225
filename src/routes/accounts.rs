//! Account registration, login and the account maintenance endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::admin::RequireAdmin;
use crate::api::{Created, DataResponse, MessageResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{
    AccountResponse, LoginRequest, RegisterRequest, TokenResponse, UpdateAccountRequest,
};
use crate::error::ApiResult;
use crate::services::accounts;
use crate::store::Page;

/// POST /registration (public)
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Created<DataResponse<AccountResponse>>> {
    let account = accounts::register(&state.store, &state.settings, req).await?;
    Ok(Created(DataResponse::new(AccountResponse::from(account))))
}

/// POST /login (public)
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let token = accounts::login(&state.store, &state.tokens, req).await?;
    Ok(Json(token))
}

/// GET /table
pub async fn list_accounts(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DataResponse<Vec<AccountResponse>>> {
    let rows = state.store.accounts.list(&[], Page::unbounded()).await?;
    Ok(DataResponse::new(
        rows.into_iter().map(AccountResponse::from).collect(),
    ))
}

/// POST /updateuser/:id
pub async fn update_account(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<DataResponse<AccountResponse>> {
    let account = accounts::update(&state.store, id, req).await?;
    Ok(DataResponse::new(AccountResponse::from(account)))
}

/// GET /deleteuser/:id and DELETE /accounts/:id
pub async fn delete_account(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<NoContent> {
    accounts::delete(&state.store, id).await?;
    tracing::info!(user_id = %auth.user_id, account_id = %id, "Account removed via API");
    Ok(NoContent)
}

/// DELETE /table
pub async fn delete_all_accounts(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> ApiResult<MessageResponse> {
    let removed = state.store.accounts.delete_all().await?;
    tracing::warn!(admin_id = %admin.user_id(), removed, "All accounts deleted");
    Ok(MessageResponse::new(format!("Deleted {} accounts", removed)))
}
