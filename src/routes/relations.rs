//! Relationship accessors beyond plain foreign key filters: the one-to-one
//! children of tenders, bids and users, role/permission associations, the
//! org unit tree and the tender evaluation rubric.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::*;
use crate::error::{ApiError, ApiResult};
use crate::services::{integrity, OrgTree};
use crate::store::{Entity, Filter, LinkRepository, Page, Repository, Store};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tenders/:id/specification", get(tender_specification))
        .route("/tenders/:id/evaluation-criteria", get(tender_evaluation_criteria))
        .route("/tenders/:id/evaluation", get(tender_evaluation))
        .route("/bids/:id/document", get(bid_document))
        .route("/bidders/:id/bid", get(bidder_bid))
        .route("/users/:id/audit-log", get(user_audit_log))
        .route("/roles/:id/permissions", get(role_permissions))
        .route(
            "/roles/:id/permissions/:permission_id",
            put(link_role_permission).delete(unlink_role_permission),
        )
        .route("/global-roles/:id/permissions", get(global_role_permissions))
        .route(
            "/global-roles/:id/permissions/:permission_id",
            put(link_global_role_permission).delete(unlink_global_role_permission),
        )
        .route("/permissions/:id/roles", get(permission_roles))
        .route("/permissions/:id/global-roles", get(permission_global_roles))
        .route("/org-units/:id/children", get(org_unit_children))
        .route("/org-units/:id/ancestors", get(org_unit_ancestors))
        .route("/org-units/:id/descendants", get(org_unit_descendants))
}

/// The single child row of `parent_id`, 404 when the parent or the child is missing
async fn only_child<P: Entity, C: Entity>(
    parents: &Arc<dyn Repository<P>>,
    children: &Arc<dyn Repository<C>>,
    column: &'static str,
    parent_id: Uuid,
) -> ApiResult<C> {
    parents.get(parent_id).await?;
    children
        .find_by(&[Filter::eq(column, parent_id)])
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "{} {} has no {}",
                P::SCHEMA.entity,
                parent_id,
                C::SCHEMA.entity.to_lowercase()
            ))
        })
}

async fn load_all<T: Entity>(repo: &Arc<dyn Repository<T>>, ids: Vec<Uuid>) -> ApiResult<Vec<T>> {
    let rows = try_join_all(ids.into_iter().map(|id| repo.find(id))).await?;
    Ok(rows.into_iter().flatten().collect())
}

async fn tender_specification(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<TenderSpecification>> {
    let store = &state.store;
    let spec = only_child(&store.tenders, &store.tender_specifications, "tender_id", id).await?;
    Ok(DataResponse::new(spec))
}

async fn tender_evaluation_criteria(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<EvaluationCriteria>> {
    let store = &state.store;
    let criteria = only_child(&store.tenders, &store.evaluation_criteria, "tender_id", id).await?;
    Ok(DataResponse::new(criteria))
}

async fn bid_document(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<BidDocument>> {
    let store = &state.store;
    let document = only_child(&store.bids, &store.bid_documents, "bid_id", id).await?;
    Ok(DataResponse::new(document))
}

async fn user_audit_log(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<AuditLog>> {
    let store = &state.store;
    let entry = only_child(&store.users, &store.audit_log, "actor_user_id", id).await?;
    Ok(DataResponse::new(entry))
}

async fn bidder_bid(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<Bid>> {
    let store = &state.store;
    let bid = only_child(&store.bidders, &store.bids, "bidder_id", id).await?;
    Ok(DataResponse::new(bid))
}

// Role / permission associations

async fn role_permissions(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<Permission>>> {
    let store = &state.store;
    store.roles.get(id).await?;
    let ids = store.role_permissions.rights_of(id).await?;
    Ok(DataResponse::new(load_all(&store.permissions, ids).await?))
}

async fn global_role_permissions(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<Permission>>> {
    let store = &state.store;
    store.global_roles.get(id).await?;
    let ids = store.global_role_permissions.rights_of(id).await?;
    Ok(DataResponse::new(load_all(&store.permissions, ids).await?))
}

async fn permission_roles(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<Role>>> {
    let store = &state.store;
    store.permissions.get(id).await?;
    let ids = store.role_permissions.lefts_of(id).await?;
    Ok(DataResponse::new(load_all(&store.roles, ids).await?))
}

async fn permission_global_roles(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<GlobalRole>>> {
    let store = &state.store;
    store.permissions.get(id).await?;
    let ids = store.global_role_permissions.lefts_of(id).await?;
    Ok(DataResponse::new(load_all(&store.global_roles, ids).await?))
}

async fn grant(
    auth: &RequireAuth,
    store: &Store,
    links: &Arc<dyn LinkRepository>,
    role_tenant: Uuid,
    role_id: Uuid,
    permission_id: Uuid,
) -> ApiResult<DataResponse<LinkResponse>> {
    integrity::check_role_permission(store, role_tenant, permission_id).await?;
    let linked = links.link(role_id, permission_id).await?;

    tracing::info!(
        user_id = %auth.user_id,
        table = links.schema().name,
        role_id = %role_id,
        permission_id = %permission_id,
        linked,
        "Permission granted"
    );
    Ok(DataResponse::new(LinkResponse {
        left_id: role_id,
        right_id: permission_id,
        linked,
    }))
}

async fn revoke(
    auth: &RequireAuth,
    links: &Arc<dyn LinkRepository>,
    role_id: Uuid,
    permission_id: Uuid,
) -> ApiResult<NoContent> {
    if !links.unlink(role_id, permission_id).await? {
        return Err(ApiError::not_found(format!(
            "Permission {} is not granted to {}",
            permission_id, role_id
        )));
    }

    tracing::info!(
        user_id = %auth.user_id,
        table = links.schema().name,
        role_id = %role_id,
        permission_id = %permission_id,
        "Permission revoked"
    );
    Ok(NoContent)
}

async fn link_role_permission(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<DataResponse<LinkResponse>> {
    let store = &state.store;
    let role = store.roles.get(id).await?;
    grant(&auth, store, &store.role_permissions, role.tenant_id, id, permission_id).await
}

async fn unlink_role_permission(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<NoContent> {
    revoke(&auth, &state.store.role_permissions, id, permission_id).await
}

async fn link_global_role_permission(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<DataResponse<LinkResponse>> {
    let store = &state.store;
    let role = store.global_roles.get(id).await?;
    grant(
        &auth,
        store,
        &store.global_role_permissions,
        role.tenant_id,
        id,
        permission_id,
    )
    .await
}

async fn unlink_global_role_permission(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<NoContent> {
    revoke(&auth, &state.store.global_role_permissions, id, permission_id).await
}

// Org unit tree

async fn org_tree_of(store: &Store, unit_id: Uuid) -> ApiResult<OrgTree> {
    let unit = store.org_units.get(unit_id).await?;
    let units = store
        .org_units
        .list(
            &[Filter::eq("organization_id", unit.organization_id)],
            Page::unbounded(),
        )
        .await?;
    Ok(OrgTree::build(units))
}

async fn org_unit_children(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<OrgUnit>>> {
    let tree = org_tree_of(&state.store, id).await?;
    let children = tree.children(id).into_iter().cloned().collect();
    Ok(DataResponse::new(children))
}

/// Nearest ancestor first
async fn org_unit_ancestors(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<OrgUnit>>> {
    let tree = org_tree_of(&state.store, id).await?;
    let ancestors = tree.ancestors(id).into_iter().cloned().collect();
    Ok(DataResponse::new(ancestors))
}

/// The whole subtree, breadth first
async fn org_unit_descendants(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<Vec<OrgUnit>>> {
    let tree = org_tree_of(&state.store, id).await?;
    let descendants = tree.descendants(id).into_iter().cloned().collect();
    Ok(DataResponse::new(descendants))
}

// Evaluation rubric

async fn tender_evaluation(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<RubricResponse>> {
    let store = &state.store;
    let criteria = only_child(&store.tenders, &store.evaluation_criteria, "tender_id", id).await?;
    let method = store
        .evaluation_methods
        .find(criteria.evaluation_method_id)
        .await?;

    let mut stages = store
        .evaluation_stages
        .list(&[Filter::eq("criteria_id", criteria.id)], Page::unbounded())
        .await?;
    stages.sort_by_key(|s| s.sequence);

    let stages = try_join_all(stages.into_iter().map(|stage| rubric_stage(store, stage))).await?;

    Ok(DataResponse::new(RubricResponse {
        criteria,
        method,
        stages,
    }))
}

async fn rubric_stage(store: &Store, stage: EvaluationStage) -> ApiResult<RubricStage> {
    let mut categories = store
        .evaluation_categories
        .list(&[Filter::eq("stage_id", stage.id)], Page::unbounded())
        .await?;
    categories.sort_by_key(|c| c.sequence);

    let categories = try_join_all(categories.into_iter().map(|category| async move {
        let mut criterion = store
            .evaluation_criterion
            .list(&[Filter::eq("category_id", category.id)], Page::unbounded())
            .await?;
        criterion.sort_by_key(|c| c.sequence);
        Ok::<_, ApiError>(RubricCategory {
            category,
            criterion,
        })
    }))
    .await?;

    Ok(RubricStage { stage, categories })
}
