//! Cross-row checks the storage engines cannot express as plain constraints:
//! parent existence with friendly errors, parent-chain consistency, tenant
//! agreement, value ranges and reference value lookups.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::*;
use crate::error::{ApiError, ApiResult};
use crate::schema;
use crate::store::{Entity, Filter, Page, Store};

use super::org_tree::OrgTree;

/// Every non-null foreign key of `row` must point at an existing row
pub async fn check_parents<T: Entity>(store: &Store, row: &T) -> ApiResult<()> {
    for fk in T::SCHEMA.foreign_keys {
        let Some(crate::store::Key::Uuid(id)) = row.key(fk.column) else {
            continue;
        };
        if !store.row_exists(fk.references, id).await? {
            return Err(ApiError::not_found(format!(
                "{} {} not found",
                schema::singular(fk.references),
                id
            )));
        }
    }
    Ok(())
}

/// With strict checking on, every `*_value_id` column must name an active reference value
pub async fn check_reference_values<T: Entity>(
    store: &Store,
    row: &T,
    strict: bool,
) -> ApiResult<()> {
    if !strict {
        return Ok(());
    }
    for column in T::SCHEMA.columns.iter().filter(|c| c.ends_with("_value_id")) {
        let Some(crate::store::Key::Uuid(id)) = row.key(column) else {
            continue;
        };
        match store.reference_values.find(id).await? {
            Some(value) if value.is_active => {}
            Some(_) => {
                return Err(ApiError::bad_request(format!(
                    "Reference value {} for {} is inactive",
                    id, column
                )))
            }
            None => {
                return Err(ApiError::bad_request(format!(
                    "Unknown reference value {} for {}",
                    id, column
                )))
            }
        }
    }
    Ok(())
}

fn same_tenant(what: &str, expected: Uuid, actual: Uuid) -> ApiResult<()> {
    if expected != actual {
        return Err(ApiError::bad_request(format!(
            "{} belongs to a different tenant",
            what
        )));
    }
    Ok(())
}

pub async fn check_org_unit(store: &Store, unit: &OrgUnit) -> ApiResult<()> {
    let Some(parent_id) = unit.parent_org_unit_id else {
        return Ok(());
    };
    if parent_id == unit.id {
        return Err(ApiError::conflict("Org unit cannot be its own parent"));
    }

    let parent = store.org_units.get(parent_id).await?;
    if parent.organization_id != unit.organization_id {
        return Err(ApiError::bad_request(
            "Parent org unit belongs to a different organization",
        ));
    }

    let siblings = store
        .org_units
        .list(
            &[Filter::eq("organization_id", unit.organization_id)],
            Page::unbounded(),
        )
        .await?;
    if OrgTree::build(siblings).would_cycle(unit.id, parent_id) {
        return Err(ApiError::conflict(ORG_UNIT_CYCLE));
    }
    Ok(())
}

const ORG_UNIT_CYCLE: &str = "Org unit hierarchy would contain a cycle";

/// Save a re-parented org unit. The cycle check runs again against the
/// organization's units while they are locked for the write, so two
/// concurrent moves cannot each pass and together close a loop.
pub async fn save_org_unit(store: &Store, unit: OrgUnit) -> ApiResult<OrgUnit> {
    let id = unit.id;
    let parent = unit.parent_org_unit_id;
    let guard = move |units: &[OrgUnit]| match parent {
        Some(parent) if OrgTree::build(units.to_vec()).would_cycle(id, parent) => {
            Err(ORG_UNIT_CYCLE.to_string())
        }
        _ => Ok(()),
    };

    let scope = [Filter::eq("organization_id", unit.organization_id)];
    Ok(store.org_units.update_guarded(unit, &scope, &guard).await?)
}

pub async fn check_org_unit_user(store: &Store, row: &OrgUnitUser) -> ApiResult<()> {
    let user = store.users.get(row.user_id).await?;
    let unit = store.org_units.get(row.org_unit_id).await?;
    let organization = store.organizations.get(unit.organization_id).await?;
    let role = store.roles.get(row.role_id).await?;
    same_tenant("Org unit", user.tenant_id, organization.tenant_id)?;
    same_tenant("Role", user.tenant_id, role.tenant_id)
}

pub async fn check_global_user_role(store: &Store, row: &GlobalUserRole) -> ApiResult<()> {
    let user = store.users.get(row.user_id).await?;
    let role = store.global_roles.get(row.global_role_id).await?;
    same_tenant("Global role", user.tenant_id, role.tenant_id)
}

pub async fn check_role_permission(
    store: &Store,
    role_tenant: Uuid,
    permission_id: Uuid,
) -> ApiResult<()> {
    let permission = store.permissions.get(permission_id).await?;
    same_tenant("Permission", role_tenant, permission.tenant_id)
}

pub async fn check_tender(store: &Store, tender: &Tender) -> ApiResult<()> {
    let organization = store.organizations.get(tender.organization_id).await?;
    let unit = store.org_units.get(tender.org_unit_id).await?;
    let creator = store.users.get(tender.created_by_user_id).await?;

    same_tenant("Organization", tender.tenant_id, organization.tenant_id)?;
    if unit.organization_id != tender.organization_id {
        return Err(ApiError::bad_request(
            "Org unit does not belong to the tender's organization",
        ));
    }
    same_tenant("Creating user", tender.tenant_id, creator.tenant_id)
}

async fn check_document_repository(
    store: &Store,
    repository_id: Option<Uuid>,
    tenant_id: Uuid,
) -> ApiResult<()> {
    if let Some(id) = repository_id {
        let repository = store.document_repositories.get(id).await?;
        same_tenant("Document repository", tenant_id, repository.tenant_id)?;
    }
    Ok(())
}

pub async fn check_tender_document(store: &Store, doc: &TenderDocument) -> ApiResult<()> {
    let tender = store.tenders.get(doc.tender_id).await?;
    check_document_repository(store, doc.document_repository_id, tender.tenant_id).await
}

pub async fn check_bid(store: &Store, bid: &Bid) -> ApiResult<()> {
    let tender = store.tenders.get(bid.tender_id).await?;
    let bidder = store.bidders.get(bid.bidder_id).await?;
    same_tenant("Bidder", tender.tenant_id, bidder.tenant_id)
}

pub async fn check_bid_document(store: &Store, doc: &BidDocument) -> ApiResult<()> {
    let bid = store.bids.get(doc.bid_id).await?;
    let tender = store.tenders.get(bid.tender_id).await?;
    check_document_repository(store, doc.document_repository_id, tender.tenant_id).await
}

fn percent(name: &str, value: Decimal) -> ApiResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ApiError::bad_request(format!(
            "{} must be between 0 and 100",
            name
        )));
    }
    Ok(())
}

pub fn check_evaluation_method(method: &EvaluationMethod) -> ApiResult<()> {
    percent("technical_weightage", method.technical_weightage)?;
    percent("commercial_weightage", method.commercial_weightage)?;
    if method.technical_weightage + method.commercial_weightage != Decimal::ONE_HUNDRED {
        return Err(ApiError::bad_request(
            "technical_weightage and commercial_weightage must sum to 100",
        ));
    }
    Ok(())
}

pub async fn check_evaluation_criteria(
    store: &Store,
    criteria: &EvaluationCriteria,
) -> ApiResult<()> {
    let tender = store.tenders.get(criteria.tender_id).await?;
    let method = store
        .evaluation_methods
        .get(criteria.evaluation_method_id)
        .await?;
    same_tenant("Evaluation method", tender.tenant_id, method.tenant_id)
}

pub async fn check_evaluation_stage(store: &Store, stage: &EvaluationStage) -> ApiResult<()> {
    let criteria = store.evaluation_criteria.get(stage.criteria_id).await?;
    if criteria.tender_id != stage.tender_id {
        return Err(ApiError::bad_request(
            "Evaluation criteria belongs to a different tender",
        ));
    }
    Ok(())
}

pub fn check_evaluation_criterion(criterion: &EvaluationCriterion) -> ApiResult<()> {
    percent("weightage", criterion.weightage)
}

pub fn check_score(score: f64) -> ApiResult<()> {
    if !score.is_finite() || score < 0.0 {
        return Err(ApiError::bad_request(
            "score must be a finite, non-negative number",
        ));
    }
    Ok(())
}

/// criterion → category → stage → criteria must be one chain, on the bid's tender
pub async fn check_evaluation_result(store: &Store, result: &EvaluationResult) -> ApiResult<()> {
    check_score(result.score)?;

    let bid = store.bids.get(result.bid_id).await?;
    let criterion = store.evaluation_criterion.get(result.criterion_id).await?;
    let category = store.evaluation_categories.get(result.category_id).await?;
    let stage = store.evaluation_stages.get(result.stage_id).await?;
    let criteria = store.evaluation_criteria.get(result.criteria_id).await?;

    if criterion.category_id != category.id {
        return Err(ApiError::bad_request(
            "Criterion does not belong to the given category",
        ));
    }
    if category.stage_id != stage.id {
        return Err(ApiError::bad_request(
            "Category does not belong to the given stage",
        ));
    }
    if stage.criteria_id != criteria.id {
        return Err(ApiError::bad_request(
            "Stage does not belong to the given evaluation criteria",
        ));
    }
    if criteria.tender_id != bid.tender_id {
        return Err(ApiError::bad_request(
            "Evaluation criteria is not for the bid's tender",
        ));
    }
    Ok(())
}

pub async fn check_invitation(store: &Store, invitation: &Invitation) -> ApiResult<()> {
    if invitation.expiry_date <= invitation.invitation_date {
        return Err(ApiError::bad_request(
            "expiry_date must be after invitation_date",
        ));
    }
    let organization = store.organizations.get(invitation.organization_id).await?;
    let inviter = store.users.get(invitation.invited_by_user_id).await?;
    same_tenant("Organization", invitation.tenant_id, organization.tenant_id)?;
    same_tenant("Inviting user", invitation.tenant_id, inviter.tenant_id)
}

pub async fn check_notification(store: &Store, notification: &Notification) -> ApiResult<()> {
    let recipient = store.users.get(notification.recipient_user_id).await?;
    same_tenant("Recipient", notification.tenant_id, recipient.tenant_id)
}

pub async fn check_audit_log(store: &Store, entry: &AuditLog) -> ApiResult<()> {
    let actor = store.users.get(entry.actor_user_id).await?;
    same_tenant("Actor", entry.tenant_id, actor.tenant_id)
}
