//! Tenants and the organisational structure beneath them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

use super::{empty_object, nullable};

/// Top-level isolation boundary; every business row belongs to exactly one tenant
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateTenantRequest {
    pub fn into_row(self) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateTenantRequest {
    pub fn apply_to(self, row: &mut Tenant) {
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

impl Entity for Tenant {
    const SCHEMA: &'static TableDef = &schema::TENANTS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub industry: String,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationRequest {
    pub tenant_id: Uuid,
    pub name: String,
    pub industry: String,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

/// The owning tenant is fixed at creation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateOrganizationRequest {
    pub fn into_row(self) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            industry: self.industry,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateOrganizationRequest {
    pub fn apply_to(self, row: &mut Organization) {
        if let Some(name) = self.name {
            row.name = name;
        }
        if let Some(industry) = self.industry {
            row.industry = industry;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for Organization {
    const SCHEMA: &'static TableDef = &schema::ORGANIZATIONS;

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
            .bind(&self.industry)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// Node in an organization's unit hierarchy
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrgUnit {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub parent_org_unit_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrgUnitRequest {
    pub organization_id: Uuid,
    #[serde(default)]
    pub parent_org_unit_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

/// `parent_org_unit_id: null` moves the unit to the root
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrgUnitRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub parent_org_unit_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateOrgUnitRequest {
    pub fn into_row(self) -> OrgUnit {
        OrgUnit {
            id: Uuid::new_v4(),
            organization_id: self.organization_id,
            parent_org_unit_id: self.parent_org_unit_id,
            name: self.name,
            description: self.description,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateOrgUnitRequest {
    pub fn apply_to(self, row: &mut OrgUnit) {
        if let Some(parent) = self.parent_org_unit_id {
            row.parent_org_unit_id = parent;
        }
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

impl Entity for OrgUnit {
    const SCHEMA: &'static TableDef = &schema::ORG_UNITS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "organization_id" => Some(self.organization_id.into()),
            "parent_org_unit_id" => self.parent_org_unit_id.map(Key::Uuid),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.organization_id)
            .bind(self.parent_org_unit_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// Directory user of a tenant (distinct from login accounts)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub department: Option<String>,
    pub last_login_date: Option<DateTime<Utc>>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub tenant_id: Uuid,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_login_date: Option<Option<DateTime<Utc>>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateUserRequest {
    pub fn into_row(self) -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            display_name: self.display_name,
            email: self.email.trim().to_lowercase(),
            department: self.department,
            last_login_date: None,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateUserRequest {
    pub fn apply_to(self, row: &mut User) {
        if let Some(display_name) = self.display_name {
            row.display_name = display_name;
        }
        if let Some(email) = self.email {
            row.email = email.trim().to_lowercase();
        }
        if let Some(department) = self.department {
            row.department = department;
        }
        if let Some(last_login_date) = self.last_login_date {
            row.last_login_date = last_login_date;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for User {
    const SCHEMA: &'static TableDef = &schema::USERS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            "email" => Some(self.email.as_str().into()),
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
            .bind(&self.display_name)
            .bind(&self.email)
            .bind(&self.department)
            .bind(self.last_login_date)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// Link between a directory user and an external identity provider account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserIdentityMapping {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_name: String,
    pub external_user_id: String,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIdentityMappingRequest {
    pub user_id: Uuid,
    pub provider_name: String,
    pub external_user_id: String,
    #[serde(default)]
    pub last_sync_date: Option<DateTime<Utc>>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIdentityMappingRequest {
    pub provider_name: Option<String>,
    pub external_user_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_sync_date: Option<Option<DateTime<Utc>>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateIdentityMappingRequest {
    pub fn into_row(self) -> UserIdentityMapping {
        UserIdentityMapping {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            provider_name: self.provider_name,
            external_user_id: self.external_user_id,
            last_sync_date: self.last_sync_date,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateIdentityMappingRequest {
    pub fn apply_to(self, row: &mut UserIdentityMapping) {
        if let Some(provider_name) = self.provider_name {
            row.provider_name = provider_name;
        }
        if let Some(external_user_id) = self.external_user_id {
            row.external_user_id = external_user_id;
        }
        if let Some(last_sync_date) = self.last_sync_date {
            row.last_sync_date = last_sync_date;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for UserIdentityMapping {
    const SCHEMA: &'static TableDef = &schema::USER_IDENTITY_MAPPINGS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
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
            .bind(&self.provider_name)
            .bind(&self.external_user_id)
            .bind(self.last_sync_date)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_emails_are_normalised() {
        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "tenant_id": Uuid::nil(),
            "display_name": "Asha",
            "email": "  Asha@Example.COM ",
        }))
        .unwrap();
        let user = req.into_row();
        assert_eq!(user.email, "asha@example.com");
        assert_eq!(user.additional_attributes, serde_json::json!({}));
        assert_eq!(user.key("email"), Some(Key::Text("asha@example.com".into())));
    }

    #[test]
    fn null_parent_moves_unit_to_root() {
        let mut unit = CreateOrgUnitRequest {
            organization_id: Uuid::nil(),
            parent_org_unit_id: Some(Uuid::new_v4()),
            name: "Works".into(),
            description: None,
            additional_attributes: empty_object(),
        }
        .into_row();

        let untouched: UpdateOrgUnitRequest = serde_json::from_str(r#"{"name": "Civil"}"#).unwrap();
        untouched.apply_to(&mut unit);
        assert!(unit.parent_org_unit_id.is_some());
        assert_eq!(unit.name, "Civil");

        let cleared: UpdateOrgUnitRequest =
            serde_json::from_str(r#"{"parent_org_unit_id": null}"#).unwrap();
        cleared.apply_to(&mut unit);
        assert_eq!(unit.parent_org_unit_id, None);
        assert_eq!(unit.key("parent_org_unit_id"), None);
    }
}
