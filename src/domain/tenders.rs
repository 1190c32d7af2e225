//! Tenders, their specification and attached documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

use super::{base64_bytes, empty_object, nullable};

/// Tender issued by an org unit
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tender {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub org_unit_id: Uuid,
    pub title: String,
    pub tender_status_value_id: Uuid,
    pub tender_type_value_id: Uuid,
    pub created_by_user_id: Uuid,
    pub approved_date: Option<DateTime<Utc>>,
    pub external_tender_id: Option<String>,
    pub external_portal_name: Option<String>,
    pub integration_id: Option<Uuid>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenderRequest {
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub org_unit_id: Uuid,
    pub title: String,
    pub tender_status_value_id: Uuid,
    pub tender_type_value_id: Uuid,
    pub created_by_user_id: Uuid,
    #[serde(default)]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub external_tender_id: Option<String>,
    #[serde(default)]
    pub external_portal_name: Option<String>,
    #[serde(default)]
    pub integration_id: Option<Uuid>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

/// Ownership (tenant, organization, org unit, creator) is fixed at creation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTenderRequest {
    pub title: Option<String>,
    pub tender_status_value_id: Option<Uuid>,
    pub tender_type_value_id: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable")]
    pub approved_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub external_tender_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub external_portal_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub integration_id: Option<Option<Uuid>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateTenderRequest {
    pub fn into_row(self) -> Tender {
        Tender {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            organization_id: self.organization_id,
            org_unit_id: self.org_unit_id,
            title: self.title,
            tender_status_value_id: self.tender_status_value_id,
            tender_type_value_id: self.tender_type_value_id,
            created_by_user_id: self.created_by_user_id,
            approved_date: self.approved_date,
            external_tender_id: self.external_tender_id,
            external_portal_name: self.external_portal_name,
            integration_id: self.integration_id,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateTenderRequest {
    pub fn apply_to(self, row: &mut Tender) {
        if let Some(title) = self.title {
            row.title = title;
        }
        if let Some(status) = self.tender_status_value_id {
            row.tender_status_value_id = status;
        }
        if let Some(kind) = self.tender_type_value_id {
            row.tender_type_value_id = kind;
        }
        if let Some(approved_date) = self.approved_date {
            row.approved_date = approved_date;
        }
        if let Some(external_tender_id) = self.external_tender_id {
            row.external_tender_id = external_tender_id;
        }
        if let Some(external_portal_name) = self.external_portal_name {
            row.external_portal_name = external_portal_name;
        }
        if let Some(integration_id) = self.integration_id {
            row.integration_id = integration_id;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for Tender {
    const SCHEMA: &'static TableDef = &schema::TENDERS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            "organization_id" => Some(self.organization_id.into()),
            "org_unit_id" => Some(self.org_unit_id.into()),
            "created_by_user_id" => Some(self.created_by_user_id.into()),
            "tender_status_value_id" => Some(self.tender_status_value_id.into()),
            "tender_type_value_id" => Some(self.tender_type_value_id.into()),
            "integration_id" => self.integration_id.map(Key::Uuid),
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
            .bind(self.organization_id)
            .bind(self.org_unit_id)
            .bind(&self.title)
            .bind(self.tender_status_value_id)
            .bind(self.tender_type_value_id)
            .bind(self.created_by_user_id)
            .bind(self.approved_date)
            .bind(&self.external_tender_id)
            .bind(&self.external_portal_name)
            .bind(self.integration_id)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// Generated specification text; removed together with its tender
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenderSpecification {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub details: String,
    pub generated_date: DateTime<Utc>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenderSpecificationRequest {
    pub tender_id: Uuid,
    pub details: String,
    #[serde(default = "super::now")]
    pub generated_date: DateTime<Utc>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTenderSpecificationRequest {
    pub details: Option<String>,
    pub generated_date: Option<DateTime<Utc>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateTenderSpecificationRequest {
    pub fn into_row(self) -> TenderSpecification {
        TenderSpecification {
            id: Uuid::new_v4(),
            tender_id: self.tender_id,
            details: self.details,
            generated_date: self.generated_date,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateTenderSpecificationRequest {
    pub fn apply_to(self, row: &mut TenderSpecification) {
        if let Some(details) = self.details {
            row.details = details;
        }
        if let Some(generated_date) = self.generated_date {
            row.generated_date = generated_date;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for TenderSpecification {
    const SCHEMA: &'static TableDef = &schema::TENDER_SPECIFICATIONS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tender_id" => Some(self.tender_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.tender_id)
            .bind(&self.details)
            .bind(self.generated_date)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenderDocument {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    /// Always the byte length of `content`
    pub file_size: i64,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    pub uploaded_date: DateTime<Utc>,
    pub document_source_value_id: Uuid,
    pub external_document_id: Option<String>,
    pub external_portal_name: Option<String>,
    pub document_repository_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenderDocumentRequest {
    pub tender_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    #[serde(default = "super::now")]
    pub uploaded_date: DateTime<Utc>,
    pub document_source_value_id: Uuid,
    #[serde(default)]
    pub external_document_id: Option<String>,
    #[serde(default)]
    pub external_portal_name: Option<String>,
    #[serde(default)]
    pub document_repository_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    #[serde(default, with = "base64_bytes::option")]
    pub content: Option<Vec<u8>>,
    pub document_source_value_id: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable")]
    pub external_document_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub external_portal_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub document_repository_id: Option<Option<Uuid>>,
}

/// Shared by tender and bid documents, which carry the same file columns
pub trait DocumentFields {
    fn file_name_mut(&mut self) -> &mut String;
    fn file_type_mut(&mut self) -> &mut String;
    fn set_content(&mut self, content: Vec<u8>);
    fn document_source_value_id_mut(&mut self) -> &mut Uuid;
    fn external_document_id_mut(&mut self) -> &mut Option<String>;
    fn external_portal_name_mut(&mut self) -> &mut Option<String>;
    fn document_repository_id_mut(&mut self) -> &mut Option<Uuid>;
}

impl UpdateDocumentRequest {
    pub fn apply_to<D: DocumentFields>(self, row: &mut D) {
        if let Some(file_name) = self.file_name {
            *row.file_name_mut() = file_name;
        }
        if let Some(file_type) = self.file_type {
            *row.file_type_mut() = file_type;
        }
        if let Some(content) = self.content {
            row.set_content(content);
        }
        if let Some(source) = self.document_source_value_id {
            *row.document_source_value_id_mut() = source;
        }
        if let Some(external_document_id) = self.external_document_id {
            *row.external_document_id_mut() = external_document_id;
        }
        if let Some(external_portal_name) = self.external_portal_name {
            *row.external_portal_name_mut() = external_portal_name;
        }
        if let Some(repository) = self.document_repository_id {
            *row.document_repository_id_mut() = repository;
        }
    }
}

pub(crate) fn byte_len(content: &[u8]) -> i64 {
    i64::try_from(content.len()).unwrap_or(i64::MAX)
}

impl CreateTenderDocumentRequest {
    pub fn into_row(self) -> TenderDocument {
        TenderDocument {
            id: Uuid::new_v4(),
            tender_id: self.tender_id,
            file_name: self.file_name,
            file_type: self.file_type,
            file_size: byte_len(&self.content),
            content: self.content,
            uploaded_date: self.uploaded_date,
            document_source_value_id: self.document_source_value_id,
            external_document_id: self.external_document_id,
            external_portal_name: self.external_portal_name,
            document_repository_id: self.document_repository_id,
            created_at: Utc::now(),
        }
    }
}

impl DocumentFields for TenderDocument {
    fn file_name_mut(&mut self) -> &mut String {
        &mut self.file_name
    }
    fn file_type_mut(&mut self) -> &mut String {
        &mut self.file_type
    }
    fn set_content(&mut self, content: Vec<u8>) {
        self.file_size = byte_len(&content);
        self.content = content;
    }
    fn document_source_value_id_mut(&mut self) -> &mut Uuid {
        &mut self.document_source_value_id
    }
    fn external_document_id_mut(&mut self) -> &mut Option<String> {
        &mut self.external_document_id
    }
    fn external_portal_name_mut(&mut self) -> &mut Option<String> {
        &mut self.external_portal_name
    }
    fn document_repository_id_mut(&mut self) -> &mut Option<Uuid> {
        &mut self.document_repository_id
    }
}

impl Entity for TenderDocument {
    const SCHEMA: &'static TableDef = &schema::TENDER_DOCUMENTS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tender_id" => Some(self.tender_id.into()),
            "document_source_value_id" => Some(self.document_source_value_id.into()),
            "document_repository_id" => self.document_repository_id.map(Key::Uuid),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.tender_id)
            .bind(&self.file_name)
            .bind(&self.file_type)
            .bind(self.file_size)
            .bind(&self.content)
            .bind(self.uploaded_date)
            .bind(self.document_source_value_id)
            .bind(&self.external_document_id)
            .bind(&self.external_portal_name)
            .bind(self.document_repository_id)
            .bind(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_size_follows_content() {
        let req: CreateTenderDocumentRequest = serde_json::from_value(serde_json::json!({
            "tender_id": Uuid::nil(),
            "file_name": "scope.txt",
            "file_type": "text/plain",
            "content": "aGVsbG8=",
            "document_source_value_id": Uuid::nil(),
        }))
        .unwrap();
        let mut doc = req.into_row();
        assert_eq!(doc.file_size, 5);

        let patch: UpdateDocumentRequest =
            serde_json::from_str(r#"{"content": "aGVsbG8gd29ybGQ="}"#).unwrap();
        patch.apply_to(&mut doc);
        assert_eq!(doc.content, b"hello world");
        assert_eq!(doc.file_size, 11);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["content"], "aGVsbG8gd29ybGQ=");
    }
}
