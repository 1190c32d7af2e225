//! External systems a tenant is connected to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

use super::{empty_object, nullable};

/// Connection to an external tender portal
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Integration {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub provider_name: String,
    pub integration_type: String,
    pub configuration_details: serde_json::Value,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntegrationRequest {
    pub tenant_id: Uuid,
    pub provider_name: String,
    pub integration_type: String,
    #[serde(default = "empty_object")]
    pub configuration_details: serde_json::Value,
    #[serde(default)]
    pub last_sync_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIntegrationRequest {
    pub provider_name: Option<String>,
    pub integration_type: Option<String>,
    pub configuration_details: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_sync_date: Option<Option<DateTime<Utc>>>,
}

impl CreateIntegrationRequest {
    pub fn into_row(self) -> Integration {
        Integration {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            provider_name: self.provider_name,
            integration_type: self.integration_type,
            configuration_details: self.configuration_details,
            last_sync_date: self.last_sync_date,
            created_at: Utc::now(),
        }
    }
}

impl UpdateIntegrationRequest {
    pub fn apply_to(self, row: &mut Integration) {
        if let Some(provider_name) = self.provider_name {
            row.provider_name = provider_name;
        }
        if let Some(integration_type) = self.integration_type {
            row.integration_type = integration_type;
        }
        if let Some(config) = self.configuration_details {
            row.configuration_details = config;
        }
        if let Some(last_sync_date) = self.last_sync_date {
            row.last_sync_date = last_sync_date;
        }
    }
}

impl Entity for Integration {
    const SCHEMA: &'static TableDef = &schema::INTEGRATIONS;

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
            .bind(&self.provider_name)
            .bind(&self.integration_type)
            .bind(&self.configuration_details)
            .bind(self.last_sync_date)
            .bind(self.created_at)
    }
}

/// External store where documents may live
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentRepository {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub provider_name: String,
    pub repository_type: String,
    pub configuration_details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRepositoryRequest {
    pub tenant_id: Uuid,
    pub provider_name: String,
    pub repository_type: String,
    #[serde(default = "empty_object")]
    pub configuration_details: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentRepositoryRequest {
    pub provider_name: Option<String>,
    pub repository_type: Option<String>,
    pub configuration_details: Option<serde_json::Value>,
}

impl CreateDocumentRepositoryRequest {
    pub fn into_row(self) -> DocumentRepository {
        DocumentRepository {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            provider_name: self.provider_name,
            repository_type: self.repository_type,
            configuration_details: self.configuration_details,
            created_at: Utc::now(),
        }
    }
}

impl UpdateDocumentRepositoryRequest {
    pub fn apply_to(self, row: &mut DocumentRepository) {
        if let Some(provider_name) = self.provider_name {
            row.provider_name = provider_name;
        }
        if let Some(repository_type) = self.repository_type {
            row.repository_type = repository_type;
        }
        if let Some(config) = self.configuration_details {
            row.configuration_details = config;
        }
    }
}

impl Entity for DocumentRepository {
    const SCHEMA: &'static TableDef = &schema::DOCUMENT_REPOSITORIES;

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
            .bind(&self.provider_name)
            .bind(&self.repository_type)
            .bind(&self.configuration_details)
            .bind(self.created_at)
    }
}
