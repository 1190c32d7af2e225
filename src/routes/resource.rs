//! Generic CRUD handlers, instantiated once per entity
//!
//! `POST /<path>`, `GET /<path>`, `GET|PUT|PATCH|DELETE /<path>/:id`.
//! Lists accept `page`/`per_page` plus equality filters on the entity's
//! foreign key and reference value columns.

use axum::{
    async_trait,
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult};
use crate::services::integrity;
use crate::store::{Entity, Filter, Repository, Store};

/// An entity exposed through the generic CRUD routes
#[async_trait]
pub trait Resource: Entity {
    /// URL segment, e.g. `org-units`
    const PATH: &'static str;

    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;

    fn repo(store: &Store) -> &Arc<dyn Repository<Self>>;

    fn build(req: Self::Create) -> Self;

    fn apply(req: Self::Update, row: &mut Self);

    /// Checks beyond parent existence, run before every insert and update
    async fn validate(_store: &Store, _row: &Self) -> ApiResult<()> {
        Ok(())
    }

    /// Persist an updated row
    async fn save(store: &Store, row: Self) -> ApiResult<Self> {
        Ok(Self::repo(store).update(row).await?)
    }
}

pub fn router<R: Resource>() -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("/{}", R::PATH), get(list::<R>).post(create::<R>))
        .route(
            &format!("/{}/:id", R::PATH),
            get(show::<R>)
                .put(update::<R>)
                .patch(update::<R>)
                .delete(destroy::<R>),
        )
}

/// Columns a list may be filtered on
fn filter_column<R: Resource>(name: &str) -> Option<&'static str> {
    R::SCHEMA
        .columns
        .iter()
        .copied()
        .find(|c| *c == name && (R::SCHEMA.foreign_key(c).is_some() || c.ends_with("_value_id")))
}

pub(crate) fn parse_filters<R: Resource>(
    query: &HashMap<String, String>,
) -> ApiResult<Vec<Filter>> {
    let mut filters = Vec::new();
    for (name, value) in query {
        if name == "page" || name == "per_page" {
            continue;
        }
        let column = filter_column::<R>(name).ok_or_else(|| {
            ApiError::bad_request(format!("Cannot filter {} by {}", R::SCHEMA.name, name))
        })?;
        let id = Uuid::parse_str(value)
            .map_err(|_| ApiError::bad_request(format!("{} must be a UUID", name)))?;
        filters.push(Filter::eq(column, id));
    }
    // Stable SQL text regardless of query string order
    filters.sort_by_key(|f| f.column);
    Ok(filters)
}

async fn check_row<R: Resource>(state: &AppState, row: &R) -> ApiResult<()> {
    integrity::check_parents(&state.store, row).await?;
    integrity::check_reference_values(&state.store, row, state.settings.reference_values_strict)
        .await?;
    R::validate(&state.store, row).await
}

pub async fn create<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<R::Create>,
) -> ApiResult<Created<DataResponse<R>>> {
    let row = R::build(req);
    check_row(&state, &row).await?;
    let row = R::repo(&state.store).insert(row).await?;

    tracing::info!(
        user_id = %auth.user_id,
        table = R::SCHEMA.name,
        id = %row.id(),
        "Row created"
    );
    Ok(Created(DataResponse::new(row)))
}

pub async fn list<R: Resource>(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Paginated<R>> {
    let filters = parse_filters::<R>(&query)?;
    let repo = R::repo(&state.store);

    let page = pagination.window();
    let (rows, total) = tokio::try_join!(repo.list(&filters, page), repo.count(&filters))?;

    Ok(Paginated::new(rows, &pagination, total))
}

pub async fn show<R: Resource>(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<R>> {
    let row = R::repo(&state.store).get(id).await?;
    Ok(DataResponse::new(row))
}

/// Partial update: load, assign the fields present, save
pub async fn update<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<R::Update>,
) -> ApiResult<DataResponse<R>> {
    let mut row = R::repo(&state.store).get(id).await?;
    R::apply(req, &mut row);
    check_row(&state, &row).await?;
    let row = R::save(&state.store, row).await?;

    tracing::info!(
        user_id = %auth.user_id,
        table = R::SCHEMA.name,
        id = %id,
        "Row updated"
    );
    Ok(DataResponse::new(row))
}

pub async fn destroy<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<NoContent> {
    if !R::repo(&state.store).delete(id).await? {
        return Err(ApiError::not_found(format!(
            "{} {} not found",
            R::SCHEMA.entity,
            id
        )));
    }

    tracing::info!(
        user_id = %auth.user_id,
        table = R::SCHEMA.name,
        id = %id,
        "Row deleted"
    );
    Ok(NoContent)
}
