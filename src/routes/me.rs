use axum::extract::State;
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::AccountResponse;
use crate::error::ApiResult;

/// The account behind the bearer token
pub async fn get_me(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DataResponse<AccountResponse>> {
    let account = state.store.accounts.get(auth.user_id).await?;
    Ok(DataResponse::new(AccountResponse::from(account)))
}
