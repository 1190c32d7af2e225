//! Admin routes
//!
//! Read/delete grids over every catalogue table. Writes other than delete
//! go through the regular resource routes.
//!
//! All routes require an admin token whose account is still flagged admin.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult, ErrorResponse};
use crate::schema::{self, TableDef};
use crate::store::AdminTable;

// ============================================================================
// RequireAdmin extractor
// ============================================================================

/// Extractor that requires admin privileges.
/// Uses RequireAuth internally, then re-checks the account's is_admin flag in the store.
#[derive(Debug, Clone)]
pub struct RequireAdmin {
    pub auth: RequireAuth,
}

impl RequireAdmin {
    pub fn user_id(&self) -> Uuid {
        self.auth.user_id
    }
}

#[derive(Debug)]
pub enum AdminAuthError {
    NotAuthenticated,
    NotAdmin,
    Store(String),
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AdminAuthError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required",
            ),
            AdminAuthError::NotAdmin => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Admin privileges required",
            ),
            AdminAuthError::Store(e) => {
                tracing::error!(error = %e, "Admin lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                )
            }
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        };

        (status, Json(body)).into_response()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = RequireAuth::from_request_parts(parts, state)
            .await
            .map_err(|_| AdminAuthError::NotAuthenticated)?;

        let account = state
            .store
            .accounts
            .find(auth.user_id)
            .await
            .map_err(|e| AdminAuthError::Store(e.to_string()))?
            .ok_or(AdminAuthError::NotAuthenticated)?;

        if !(auth.is_admin && account.is_admin) {
            tracing::warn!(
                user_id = %auth.user_id,
                "Non-admin account attempted to access admin route"
            );
            return Err(AdminAuthError::NotAdmin);
        }

        Ok(RequireAdmin { auth })
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/tables", get(list_tables))
        .route("/admin/tables/:table", get(table_rows))
        .route(
            "/admin/tables/:table/:id",
            get(table_row).delete(delete_table_row),
        )
}

#[derive(Debug, Serialize)]
pub struct TableSummary {
    #[serde(flatten)]
    pub table: &'static TableDef,
    /// Tables holding foreign keys into this one
    pub referenced_by: Vec<&'static str>,
}

fn admin_table<'a>(state: &'a AppState, name: &str) -> ApiResult<&'a dyn AdminTable> {
    state
        .store
        .admin_table(name)
        .ok_or_else(|| ApiError::not_found(format!("Unknown table {}", name)))
}

/// Keep only the grid columns of a full row
fn project(row: serde_json::Value, columns: &[&str]) -> serde_json::Value {
    match row {
        serde_json::Value::Object(mut full) => serde_json::Value::Object(
            columns
                .iter()
                .filter_map(|c| full.remove(*c).map(|v| (c.to_string(), v)))
                .collect(),
        ),
        other => other,
    }
}

/// GET /admin/tables
pub async fn list_tables(_admin: RequireAdmin) -> DataResponse<Vec<TableSummary>> {
    let tables = schema::TABLES
        .iter()
        .map(|t| {
            let mut referenced_by: Vec<&'static str> =
                schema::referencing(t.name).map(|(owner, _)| owner.name).collect();
            referenced_by.dedup();
            TableSummary {
                table: *t,
                referenced_by,
            }
        })
        .collect();
    DataResponse::new(tables)
}

/// GET /admin/tables/:table
pub async fn table_rows(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Paginated<serde_json::Value>> {
    let admin = admin_table(&state, &table)?;
    let columns = admin.schema().admin_columns;

    let (rows, total) = admin.rows(pagination.window()).await?;

    Ok(Paginated::new(rows, &pagination, total).map(|row| project(row, columns)))
}

/// GET /admin/tables/:table/:id
pub async fn table_row(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, Uuid)>,
) -> ApiResult<DataResponse<serde_json::Value>> {
    let admin = admin_table(&state, &table)?;
    let row = admin.row(id).await?.ok_or_else(|| {
        ApiError::not_found(format!("{} {} not found", admin.schema().entity, id))
    })?;
    Ok(DataResponse::new(row))
}

/// DELETE /admin/tables/:table/:id
pub async fn delete_table_row(
    admin_auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, Uuid)>,
) -> ApiResult<NoContent> {
    let admin = admin_table(&state, &table)?;
    if !admin.delete(id).await? {
        return Err(ApiError::not_found(format!(
            "{} {} not found",
            admin.schema().entity,
            id
        )));
    }

    tracing::info!(
        admin_id = %admin_auth.user_id(),
        table = %table,
        id = %id,
        "Admin deleted row"
    );
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_keeps_only_grid_columns() {
        let row = json!({"id": "x", "name": "Acme", "industry": "Steel", "tenant_id": "t"});
        let projected = project(row, &["name", "industry", "missing"]);
        assert_eq!(projected, json!({"name": "Acme", "industry": "Steel"}));
    }
}
