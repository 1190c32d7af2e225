//! Which entities get CRUD routes, under which path, with which checks

use axum::{async_trait, Router};
use std::sync::Arc;

use super::resource::{self, Resource};
use crate::app::AppState;
use crate::domain::*;
use crate::error::ApiResult;
use crate::services::integrity;
use crate::store::{Repository, Store};

macro_rules! resource {
    (@impl $ty:ty, $path:literal, $field:ident, $create:ty, $update:ty, { $($extra:tt)* }) => {
        #[async_trait]
        impl Resource for $ty {
            const PATH: &'static str = $path;
            type Create = $create;
            type Update = $update;

            fn repo(store: &Store) -> &Arc<dyn Repository<Self>> {
                &store.$field
            }

            fn build(req: Self::Create) -> Self {
                req.into_row()
            }

            fn apply(req: Self::Update, row: &mut Self) {
                req.apply_to(row)
            }

            $($extra)*
        }
    };
    ($ty:ty, $path:literal, $field:ident, $create:ty, $update:ty $(,)?) => {
        resource!(@impl $ty, $path, $field, $create, $update, {});
    };
    ($ty:ty, $path:literal, $field:ident, $create:ty, $update:ty, check = $check:path $(,)?) => {
        resource!(@impl $ty, $path, $field, $create, $update, {
            async fn validate(store: &Store, row: &Self) -> ApiResult<()> {
                $check(store, row).await
            }
        });
    };
    (
        $ty:ty, $path:literal, $field:ident, $create:ty, $update:ty,
        check = $check:path, save = $save:path $(,)?
    ) => {
        resource!(@impl $ty, $path, $field, $create, $update, {
            async fn validate(store: &Store, row: &Self) -> ApiResult<()> {
                $check(store, row).await
            }

            async fn save(store: &Store, row: Self) -> ApiResult<Self> {
                $save(store, row).await
            }
        });
    };
}

async fn evaluation_method(_store: &Store, row: &EvaluationMethod) -> ApiResult<()> {
    integrity::check_evaluation_method(row)
}

async fn evaluation_criterion(_store: &Store, row: &EvaluationCriterion) -> ApiResult<()> {
    integrity::check_evaluation_criterion(row)
}

resource!(Tenant, "tenants", tenants, CreateTenantRequest, UpdateTenantRequest);
resource!(
    Organization,
    "organizations",
    organizations,
    CreateOrganizationRequest,
    UpdateOrganizationRequest,
);
resource!(
    OrgUnit,
    "org-units",
    org_units,
    CreateOrgUnitRequest,
    UpdateOrgUnitRequest,
    check = integrity::check_org_unit,
    save = integrity::save_org_unit,
);
resource!(User, "users", users, CreateUserRequest, UpdateUserRequest);
resource!(
    UserIdentityMapping,
    "user-identity-mappings",
    identity_mappings,
    CreateIdentityMappingRequest,
    UpdateIdentityMappingRequest,
);
resource!(Role, "roles", roles, CreateRoleRequest, UpdateRoleRequest);
resource!(Permission, "permissions", permissions, CreatePermissionRequest, UpdatePermissionRequest);
resource!(
    GlobalRole,
    "global-roles",
    global_roles,
    CreateGlobalRoleRequest,
    UpdateGlobalRoleRequest,
);
resource!(
    GlobalUserRole,
    "global-user-roles",
    global_user_roles,
    CreateGlobalUserRoleRequest,
    UpdateGlobalUserRoleRequest,
    check = integrity::check_global_user_role,
);
resource!(
    OrgUnitUser,
    "org-unit-users",
    org_unit_users,
    CreateOrgUnitUserRequest,
    UpdateOrgUnitUserRequest,
    check = integrity::check_org_unit_user,
);
resource!(
    Integration,
    "integrations",
    integrations,
    CreateIntegrationRequest,
    UpdateIntegrationRequest,
);
resource!(
    DocumentRepository,
    "document-repositories",
    document_repositories,
    CreateDocumentRepositoryRequest,
    UpdateDocumentRepositoryRequest,
);
resource!(
    Tender,
    "tenders",
    tenders,
    CreateTenderRequest,
    UpdateTenderRequest,
    check = integrity::check_tender,
);
resource!(
    TenderSpecification,
    "tender-specifications",
    tender_specifications,
    CreateTenderSpecificationRequest,
    UpdateTenderSpecificationRequest,
);
resource!(
    TenderDocument,
    "tender-documents",
    tender_documents,
    CreateTenderDocumentRequest,
    UpdateDocumentRequest,
    check = integrity::check_tender_document,
);
resource!(Bidder, "bidders", bidders, CreateBidderRequest, UpdateBidderRequest);
resource!(Bid, "bids", bids, CreateBidRequest, UpdateBidRequest, check = integrity::check_bid);
resource!(
    BidDocument,
    "bid-documents",
    bid_documents,
    CreateBidDocumentRequest,
    UpdateDocumentRequest,
    check = integrity::check_bid_document,
);
resource!(
    EvaluationMethod,
    "evaluation-methods",
    evaluation_methods,
    CreateEvaluationMethodRequest,
    UpdateEvaluationMethodRequest,
    check = evaluation_method,
);
resource!(
    EvaluationCriteria,
    "evaluation-criteria",
    evaluation_criteria,
    CreateEvaluationCriteriaRequest,
    UpdateEvaluationCriteriaRequest,
    check = integrity::check_evaluation_criteria,
);
resource!(
    EvaluationStage,
    "evaluation-stages",
    evaluation_stages,
    CreateEvaluationStageRequest,
    UpdateEvaluationStageRequest,
    check = integrity::check_evaluation_stage,
);
resource!(
    EvaluationCategory,
    "evaluation-categories",
    evaluation_categories,
    CreateEvaluationCategoryRequest,
    UpdateEvaluationCategoryRequest,
);
resource!(
    EvaluationCriterion,
    "evaluation-criterion",
    evaluation_criterion,
    CreateEvaluationCriterionRequest,
    UpdateEvaluationCriterionRequest,
    check = evaluation_criterion,
);
resource!(
    EvaluationResult,
    "evaluation-results",
    evaluation_results,
    CreateEvaluationResultRequest,
    UpdateEvaluationResultRequest,
    check = integrity::check_evaluation_result,
);
resource!(
    ReferenceType,
    "reference-types",
    reference_types,
    CreateReferenceTypeRequest,
    UpdateReferenceTypeRequest,
);
resource!(
    ReferenceValue,
    "reference-values",
    reference_values,
    CreateReferenceValueRequest,
    UpdateReferenceValueRequest,
);
resource!(
    Invitation,
    "invitations",
    invitations,
    CreateInvitationRequest,
    UpdateInvitationRequest,
    check = integrity::check_invitation,
);
resource!(
    Notification,
    "notifications",
    notifications,
    CreateNotificationRequest,
    UpdateNotificationRequest,
    check = integrity::check_notification,
);
resource!(
    AuditLog,
    "audit-log",
    audit_log,
    CreateAuditLogRequest,
    UpdateAuditLogRequest,
    check = integrity::check_audit_log,
);

/// CRUD routes for every entity except accounts, which have their own flow
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(resource::router::<Tenant>())
        .merge(resource::router::<Organization>())
        .merge(resource::router::<OrgUnit>())
        .merge(resource::router::<User>())
        .merge(resource::router::<UserIdentityMapping>())
        .merge(resource::router::<Role>())
        .merge(resource::router::<Permission>())
        .merge(resource::router::<GlobalRole>())
        .merge(resource::router::<GlobalUserRole>())
        .merge(resource::router::<OrgUnitUser>())
        .merge(resource::router::<Integration>())
        .merge(resource::router::<DocumentRepository>())
        .merge(resource::router::<Tender>())
        .merge(resource::router::<TenderSpecification>())
        .merge(resource::router::<TenderDocument>())
        .merge(resource::router::<Bidder>())
        .merge(resource::router::<Bid>())
        .merge(resource::router::<BidDocument>())
        .merge(resource::router::<EvaluationMethod>())
        .merge(resource::router::<EvaluationCriteria>())
        .merge(resource::router::<EvaluationStage>())
        .merge(resource::router::<EvaluationCategory>())
        .merge(resource::router::<EvaluationCriterion>())
        .merge(resource::router::<EvaluationResult>())
        .merge(resource::router::<ReferenceType>())
        .merge(resource::router::<ReferenceValue>())
        .merge(resource::router::<Invitation>())
        .merge(resource::router::<Notification>())
        .merge(resource::router::<AuditLog>())
}
