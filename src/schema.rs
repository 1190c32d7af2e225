//! Declarative table catalogue
//!
//! Every persisted table is described here once: its ordered columns, its
//! foreign keys with their delete behaviour, and its unique constraints.
//! The Postgres migrations mirror this catalogue, the in-memory engine
//! enforces it, and the admin views render it.

use serde::Serialize;

/// What happens to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Restrict,
    Cascade,
}

#[derive(Debug, Serialize)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
    pub on_delete: OnDelete,
}

impl ForeignKey {
    const fn restrict(column: &'static str, references: &'static str) -> Self {
        Self {
            column,
            references,
            on_delete: OnDelete::Restrict,
        }
    }

    const fn cascade(column: &'static str, references: &'static str) -> Self {
        Self {
            column,
            references,
            on_delete: OnDelete::Cascade,
        }
    }

    /// Constraint name following the Postgres `<table>_<column>_fkey` convention
    pub fn constraint_name(&self, table: &str) -> String {
        format!("{}_{}_fkey", table, self.column)
    }
}

#[derive(Debug, Serialize)]
pub struct UniqueConstraint {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    /// Message shown to API callers when the constraint is violated
    pub message: &'static str,
}

/// Shape of a table's primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKey {
    /// Surrogate `id` UUID column
    Id,
    /// Association table keyed by its two foreign key columns
    Pair(&'static str, &'static str),
}

#[derive(Debug, Serialize)]
pub struct TableDef {
    pub name: &'static str,
    /// Singular display name used in messages
    pub entity: &'static str,
    pub primary_key: PrimaryKey,
    /// All columns in storage order; `id` first for surrogate-keyed tables
    pub columns: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
    pub unique: &'static [UniqueConstraint],
    /// Columns shown in the admin list grid
    pub admin_columns: &'static [&'static str],
}

impl TableDef {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }
}

pub const TENANTS: TableDef = TableDef {
    name: "tenants",
    entity: "Tenant",
    primary_key: PrimaryKey::Id,
    columns: &["id", "name", "description", "additional_attributes", "created_at"],
    foreign_keys: &[],
    unique: &[],
    admin_columns: &["id", "name", "description"],
};

pub const ORGANIZATIONS: TableDef = TableDef {
    name: "organizations",
    entity: "Organization",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "name",
        "industry",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[],
    admin_columns: &["id", "name", "industry"],
};

pub const ORG_UNITS: TableDef = TableDef {
    name: "org_units",
    entity: "Org unit",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "organization_id",
        "parent_org_unit_id",
        "name",
        "description",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("organization_id", "organizations"),
        ForeignKey::restrict("parent_org_unit_id", "org_units"),
    ],
    unique: &[],
    admin_columns: &["id", "name", "created_at"],
};

pub const USERS: TableDef = TableDef {
    name: "users",
    entity: "User",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "display_name",
        "email",
        "department",
        "last_login_date",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[UniqueConstraint {
        name: "users_email_key",
        columns: &["email"],
        message: "A user with this email already exists",
    }],
    admin_columns: &["display_name", "email", "tenant_id"],
};

pub const USER_IDENTITY_MAPPINGS: TableDef = TableDef {
    name: "user_identity_mappings",
    entity: "Identity mapping",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "user_id",
        "provider_name",
        "external_user_id",
        "last_sync_date",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("user_id", "users")],
    unique: &[],
    admin_columns: &["user_id", "provider_name", "external_user_id"],
};

pub const ROLES: TableDef = TableDef {
    name: "roles",
    entity: "Role",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "name",
        "description",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[],
    admin_columns: &["id", "name"],
};

pub const PERMISSIONS: TableDef = TableDef {
    name: "permissions",
    entity: "Permission",
    primary_key: PrimaryKey::Id,
    columns: &["id", "tenant_id", "name", "description", "created_at"],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[],
    admin_columns: &["id", "name"],
};

pub const ROLE_PERMISSIONS: TableDef = TableDef {
    name: "role_permissions",
    entity: "Role permission",
    primary_key: PrimaryKey::Pair("role_id", "permission_id"),
    columns: &["role_id", "permission_id"],
    foreign_keys: &[
        ForeignKey::cascade("role_id", "roles"),
        ForeignKey::cascade("permission_id", "permissions"),
    ],
    unique: &[],
    admin_columns: &["role_id", "permission_id"],
};

pub const GLOBAL_ROLES: TableDef = TableDef {
    name: "global_roles",
    entity: "Global role",
    primary_key: PrimaryKey::Id,
    columns: &["id", "tenant_id", "name", "description", "created_at"],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[],
    admin_columns: &["id", "name"],
};

pub const GLOBAL_ROLE_PERMISSIONS: TableDef = TableDef {
    name: "global_role_permissions",
    entity: "Global role permission",
    primary_key: PrimaryKey::Pair("global_role_id", "permission_id"),
    columns: &["global_role_id", "permission_id"],
    foreign_keys: &[
        ForeignKey::cascade("global_role_id", "global_roles"),
        ForeignKey::cascade("permission_id", "permissions"),
    ],
    unique: &[],
    admin_columns: &["global_role_id", "permission_id"],
};

pub const GLOBAL_USER_ROLES: TableDef = TableDef {
    name: "global_user_roles",
    entity: "Global user role",
    primary_key: PrimaryKey::Id,
    columns: &["id", "user_id", "global_role_id", "created_at"],
    foreign_keys: &[
        ForeignKey::restrict("user_id", "users"),
        ForeignKey::restrict("global_role_id", "global_roles"),
    ],
    unique: &[UniqueConstraint {
        name: "global_user_roles_user_id_global_role_id_key",
        columns: &["user_id", "global_role_id"],
        message: "User already holds this global role",
    }],
    admin_columns: &["global_role_id", "user_id"],
};

pub const ORG_UNIT_USERS: TableDef = TableDef {
    name: "org_unit_users",
    entity: "Org unit user",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "user_id",
        "org_unit_id",
        "role_id",
        "assigned_date",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("user_id", "users"),
        ForeignKey::restrict("org_unit_id", "org_units"),
        ForeignKey::restrict("role_id", "roles"),
    ],
    unique: &[],
    admin_columns: &["org_unit_id", "created_at"],
};

pub const TENDERS: TableDef = TableDef {
    name: "tenders",
    entity: "Tender",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "organization_id",
        "org_unit_id",
        "title",
        "tender_status_value_id",
        "tender_type_value_id",
        "created_by_user_id",
        "approved_date",
        "external_tender_id",
        "external_portal_name",
        "integration_id",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("tenant_id", "tenants"),
        ForeignKey::restrict("organization_id", "organizations"),
        ForeignKey::restrict("org_unit_id", "org_units"),
        ForeignKey::restrict("created_by_user_id", "users"),
    ],
    unique: &[],
    admin_columns: &["title"],
};

pub const TENDER_SPECIFICATIONS: TableDef = TableDef {
    name: "tender_specifications",
    entity: "Tender specification",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tender_id",
        "details",
        "generated_date",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::cascade("tender_id", "tenders")],
    unique: &[UniqueConstraint {
        name: "tender_specifications_tender_id_key",
        columns: &["tender_id"],
        message: "Tender already has a specification",
    }],
    admin_columns: &["id", "tender_id", "generated_date"],
};

pub const TENDER_DOCUMENTS: TableDef = TableDef {
    name: "tender_documents",
    entity: "Tender document",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tender_id",
        "file_name",
        "file_type",
        "file_size",
        "content",
        "uploaded_date",
        "document_source_value_id",
        "external_document_id",
        "external_portal_name",
        "document_repository_id",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("tender_id", "tenders"),
        ForeignKey::restrict("document_repository_id", "document_repositories"),
    ],
    unique: &[],
    admin_columns: &["file_name", "file_type", "file_size"],
};

pub const BIDDERS: TableDef = TableDef {
    name: "bidders",
    entity: "Bidder",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "name",
        "contact_info",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[],
    admin_columns: &["id", "name", "contact_info"],
};

pub const BIDS: TableDef = TableDef {
    name: "bids",
    entity: "Bid",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tender_id",
        "bidder_id",
        "submission_date",
        "bid_status_value_id",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("tender_id", "tenders"),
        ForeignKey::restrict("bidder_id", "bidders"),
    ],
    unique: &[
        UniqueConstraint {
            name: "bids_tender_id_bidder_id_key",
            columns: &["tender_id", "bidder_id"],
            message: "Bidder has already submitted a bid for this tender",
        },
        UniqueConstraint {
            name: "bids_bidder_id_key",
            columns: &["bidder_id"],
            message: "Bidder already has a bid",
        },
    ],
    admin_columns: &["id", "tender_id", "bidder_id", "submission_date"],
};

pub const BID_DOCUMENTS: TableDef = TableDef {
    name: "bid_documents",
    entity: "Bid document",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "bid_id",
        "file_name",
        "file_type",
        "file_size",
        "content",
        "uploaded_date",
        "document_source_value_id",
        "external_document_id",
        "external_portal_name",
        "document_repository_id",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("bid_id", "bids"),
        ForeignKey::restrict("document_repository_id", "document_repositories"),
    ],
    unique: &[UniqueConstraint {
        name: "bid_documents_bid_id_key",
        columns: &["bid_id"],
        message: "Bid already has a document",
    }],
    admin_columns: &["file_name", "file_type", "file_size"],
};

pub const EVALUATION_METHODS: TableDef = TableDef {
    name: "evaluation_methods",
    entity: "Evaluation method",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "name",
        "technical_weightage",
        "commercial_weightage",
        "formula_or_notes",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[],
    admin_columns: &["name", "created_at"],
};

pub const EVALUATION_CRITERIA: TableDef = TableDef {
    name: "evaluation_criteria",
    entity: "Evaluation criteria",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tender_id",
        "evaluation_method_id",
        "criteria_details",
        "generated_date",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("tender_id", "tenders"),
        ForeignKey::restrict("evaluation_method_id", "evaluation_methods"),
    ],
    unique: &[UniqueConstraint {
        name: "evaluation_criteria_tender_id_key",
        columns: &["tender_id"],
        message: "Tender already has evaluation criteria",
    }],
    admin_columns: &["id", "tender_id", "generated_date"],
};

pub const EVALUATION_STAGES: TableDef = TableDef {
    name: "evaluation_stages",
    entity: "Evaluation stage",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tender_id",
        "criteria_id",
        "stage_type_value_id",
        "sequence",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("tender_id", "tenders"),
        ForeignKey::restrict("criteria_id", "evaluation_criteria"),
    ],
    unique: &[],
    admin_columns: &["id", "tender_id", "sequence"],
};

pub const EVALUATION_CATEGORIES: TableDef = TableDef {
    name: "evaluation_categories",
    entity: "Evaluation category",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "stage_id",
        "name",
        "description",
        "sequence",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("stage_id", "evaluation_stages")],
    unique: &[],
    admin_columns: &["name", "sequence"],
};

pub const EVALUATION_CRITERION: TableDef = TableDef {
    name: "evaluation_criterion",
    entity: "Evaluation criterion",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "category_id",
        "description",
        "weightage",
        "is_mandatory",
        "criteria_type_value_id",
        "sequence",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("category_id", "evaluation_categories")],
    unique: &[],
    admin_columns: &["description", "weightage", "is_mandatory"],
};

pub const EVALUATION_RESULTS: TableDef = TableDef {
    name: "evaluation_results",
    entity: "Evaluation result",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "bid_id",
        "criteria_id",
        "stage_id",
        "category_id",
        "criterion_id",
        "evaluation_outcome_value_id",
        "score",
        "comments",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("bid_id", "bids"),
        ForeignKey::restrict("criteria_id", "evaluation_criteria"),
        ForeignKey::restrict("stage_id", "evaluation_stages"),
        ForeignKey::restrict("category_id", "evaluation_categories"),
        ForeignKey::restrict("criterion_id", "evaluation_criterion"),
    ],
    unique: &[],
    admin_columns: &["id", "bid_id", "criterion_id", "score"],
};

pub const REFERENCE_TYPES: TableDef = TableDef {
    name: "reference_types",
    entity: "Reference type",
    primary_key: PrimaryKey::Id,
    columns: &["id", "name", "description", "created_at"],
    foreign_keys: &[],
    unique: &[UniqueConstraint {
        name: "reference_types_name_key",
        columns: &["name"],
        message: "A reference type with this name already exists",
    }],
    admin_columns: &["id", "name"],
};

pub const REFERENCE_VALUES: TableDef = TableDef {
    name: "reference_values",
    entity: "Reference value",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "reference_type_id",
        "value",
        "code",
        "sort_order",
        "is_active",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("reference_type_id", "reference_types")],
    unique: &[UniqueConstraint {
        name: "reference_values_reference_type_id_code_key",
        columns: &["reference_type_id", "code"],
        message: "This code is already used within the reference type",
    }],
    admin_columns: &["id", "code", "value", "is_active"],
};

pub const INTEGRATIONS: TableDef = TableDef {
    name: "integrations",
    entity: "Integration",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "provider_name",
        "integration_type",
        "configuration_details",
        "last_sync_date",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[],
    admin_columns: &["id", "provider_name"],
};

pub const DOCUMENT_REPOSITORIES: TableDef = TableDef {
    name: "document_repositories",
    entity: "Document repository",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "provider_name",
        "repository_type",
        "configuration_details",
        "created_at",
    ],
    foreign_keys: &[ForeignKey::restrict("tenant_id", "tenants")],
    unique: &[],
    admin_columns: &["provider_name", "repository_type", "created_at"],
};

pub const INVITATIONS: TableDef = TableDef {
    name: "invitations",
    entity: "Invitation",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "organization_id",
        "invited_by_user_id",
        "email",
        "invitation_date",
        "expiry_date",
        "invitation_status_value_id",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("tenant_id", "tenants"),
        ForeignKey::restrict("organization_id", "organizations"),
        ForeignKey::restrict("invited_by_user_id", "users"),
    ],
    unique: &[UniqueConstraint {
        name: "invitations_email_key",
        columns: &["email"],
        message: "An invitation for this email already exists",
    }],
    admin_columns: &["id", "email", "created_at"],
};

pub const NOTIFICATIONS: TableDef = TableDef {
    name: "notifications",
    entity: "Notification",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "recipient_user_id",
        "message",
        "sent_date",
        "is_read",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("tenant_id", "tenants"),
        ForeignKey::restrict("recipient_user_id", "users"),
    ],
    unique: &[],
    admin_columns: &["id", "recipient_user_id", "is_read"],
};

pub const AUDIT_LOG: TableDef = TableDef {
    name: "audit_log",
    entity: "Audit log",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "tenant_id",
        "actor_user_id",
        "action",
        "action_date",
        "details",
        "additional_attributes",
        "created_at",
    ],
    foreign_keys: &[
        ForeignKey::restrict("tenant_id", "tenants"),
        ForeignKey::restrict("actor_user_id", "users"),
    ],
    unique: &[UniqueConstraint {
        name: "audit_log_actor_user_id_key",
        columns: &["actor_user_id"],
        message: "User already has an audit log",
    }],
    admin_columns: &["id", "action", "action_date"],
};

pub const ACCOUNTS: TableDef = TableDef {
    name: "accounts",
    entity: "Account",
    primary_key: PrimaryKey::Id,
    columns: &[
        "id",
        "email",
        "name",
        "phone",
        "password_hash",
        "is_admin",
        "created_at",
    ],
    foreign_keys: &[],
    unique: &[
        UniqueConstraint {
            name: "accounts_email_key",
            columns: &["email"],
            message: "Email already exists",
        },
        UniqueConstraint {
            name: "accounts_phone_key",
            columns: &["phone"],
            message: "Phone number already exists",
        },
    ],
    admin_columns: &["id", "name", "email", "phone", "is_admin"],
};

/// Every table, parents before children
pub static TABLES: &[&TableDef] = &[
    &TENANTS,
    &ORGANIZATIONS,
    &ORG_UNITS,
    &USERS,
    &USER_IDENTITY_MAPPINGS,
    &ROLES,
    &PERMISSIONS,
    &ROLE_PERMISSIONS,
    &GLOBAL_ROLES,
    &GLOBAL_ROLE_PERMISSIONS,
    &GLOBAL_USER_ROLES,
    &ORG_UNIT_USERS,
    &INTEGRATIONS,
    &DOCUMENT_REPOSITORIES,
    &TENDERS,
    &TENDER_SPECIFICATIONS,
    &TENDER_DOCUMENTS,
    &BIDDERS,
    &BIDS,
    &BID_DOCUMENTS,
    &EVALUATION_METHODS,
    &EVALUATION_CRITERIA,
    &EVALUATION_STAGES,
    &EVALUATION_CATEGORIES,
    &EVALUATION_CRITERION,
    &EVALUATION_RESULTS,
    &REFERENCE_TYPES,
    &REFERENCE_VALUES,
    &INVITATIONS,
    &NOTIFICATIONS,
    &AUDIT_LOG,
    &ACCOUNTS,
];

/// Columns that never leave the server, even through the admin views
pub const HIDDEN_COLUMNS: &[&str] = &["password_hash"];

pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().copied().find(|t| t.name == name)
}

/// Singular display name for a table, falling back to the table name
pub fn singular(table_name: &str) -> &str {
    table(table_name).map_or(table_name, |t| t.entity)
}

pub fn constraint_message(constraint: &str) -> Option<&'static str> {
    TABLES
        .iter()
        .flat_map(|t| t.unique.iter())
        .find(|u| u.name == constraint)
        .map(|u| u.message)
}

/// Foreign keys across the catalogue that point at `table_name`, with the owning table
pub fn referencing(
    table_name: &str,
) -> impl Iterator<Item = (&'static TableDef, &'static ForeignKey)> + '_ {
    TABLES.iter().copied().flat_map(move |t| {
        t.foreign_keys
            .iter()
            .filter(move |fk| fk.references == table_name)
            .map(move |fk| (t, fk))
    })
}
