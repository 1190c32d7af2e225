//! Roles, permissions and role assignments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

use super::{empty_object, nullable};

/// Tenant-scoped role, granted within an org unit through [`OrgUnitUser`]
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoleRequest {
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateRoleRequest {
    pub fn into_row(self) -> Role {
        Role {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            description: self.description,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateRoleRequest {
    pub fn apply_to(self, row: &mut Role) {
        if let Some(name) = self.name {
            row.name = name;
        }
        if let Some(description) = self.description {
            row.description = description;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for Role {
    const SCHEMA: &'static TableDef = &schema::ROLES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.tenant_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePermissionRequest {
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePermissionRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl CreatePermissionRequest {
    pub fn into_row(self) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            description: self.description,
            created_at: Utc::now(),
        }
    }
}

impl UpdatePermissionRequest {
    pub fn apply_to(self, row: &mut Permission) {
        if let Some(name) = self.name {
            row.name = name;
        }
        if let Some(description) = self.description {
            row.description = description;
        }
    }
}

impl Entity for Permission {
    const SCHEMA: &'static TableDef = &schema::PERMISSIONS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.tenant_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.created_at)
    }
}

/// Role granted to a user across the whole tenant
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GlobalRole {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGlobalRoleRequest {
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGlobalRoleRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl CreateGlobalRoleRequest {
    pub fn into_row(self) -> GlobalRole {
        GlobalRole {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            description: self.description,
            created_at: Utc::now(),
        }
    }
}

impl UpdateGlobalRoleRequest {
    pub fn apply_to(self, row: &mut GlobalRole) {
        if let Some(name) = self.name {
            row.name = name;
        }
        if let Some(description) = self.description {
            row.description = description;
        }
    }
}

impl Entity for GlobalRole {
    const SCHEMA: &'static TableDef = &schema::GLOBAL_ROLES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.tenant_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GlobalUserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub global_role_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGlobalUserRoleRequest {
    pub user_id: Uuid,
    pub global_role_id: Uuid,
}

/// Reassign the role held by the grant; the user stays fixed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGlobalUserRoleRequest {
    pub global_role_id: Option<Uuid>,
}

impl CreateGlobalUserRoleRequest {
    pub fn into_row(self) -> GlobalUserRole {
        GlobalUserRole {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            global_role_id: self.global_role_id,
            created_at: Utc::now(),
        }
    }
}

impl UpdateGlobalUserRoleRequest {
    pub fn apply_to(self, row: &mut GlobalUserRole) {
        if let Some(global_role_id) = self.global_role_id {
            row.global_role_id = global_role_id;
        }
    }
}

impl Entity for GlobalUserRole {
    const SCHEMA: &'static TableDef = &schema::GLOBAL_USER_ROLES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "global_role_id" => Some(self.global_role_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.user_id)
            .bind(self.global_role_id)
            .bind(self.created_at)
    }
}

/// Membership of a user in an org unit under a role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrgUnitUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub org_unit_id: Uuid,
    pub role_id: Uuid,
    pub assigned_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrgUnitUserRequest {
    pub user_id: Uuid,
    pub org_unit_id: Uuid,
    pub role_id: Uuid,
    #[serde(default = "super::now")]
    pub assigned_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrgUnitUserRequest {
    pub org_unit_id: Option<Uuid>,
    pub role_id: Option<Uuid>,
    pub assigned_date: Option<DateTime<Utc>>,
}

impl CreateOrgUnitUserRequest {
    pub fn into_row(self) -> OrgUnitUser {
        OrgUnitUser {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            org_unit_id: self.org_unit_id,
            role_id: self.role_id,
            assigned_date: self.assigned_date,
            created_at: Utc::now(),
        }
    }
}

impl UpdateOrgUnitUserRequest {
    pub fn apply_to(self, row: &mut OrgUnitUser) {
        if let Some(org_unit_id) = self.org_unit_id {
            row.org_unit_id = org_unit_id;
        }
        if let Some(role_id) = self.role_id {
            row.role_id = role_id;
        }
        if let Some(assigned_date) = self.assigned_date {
            row.assigned_date = assigned_date;
        }
    }
}

impl Entity for OrgUnitUser {
    const SCHEMA: &'static TableDef = &schema::ORG_UNIT_USERS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "org_unit_id" => Some(self.org_unit_id.into()),
            "role_id" => Some(self.role_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.user_id)
            .bind(self.org_unit_id)
            .bind(self.role_id)
            .bind(self.assigned_date)
            .bind(self.created_at)
    }
}

/// Outcome of linking or unlinking an association pair
#[derive(Debug, Clone, Serialize)]
pub struct LinkResponse {
    pub left_id: Uuid,
    pub right_id: Uuid,
    pub linked: bool,
}
