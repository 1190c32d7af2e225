//! Bidders, bids and the single document attached to each bid

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

use super::tenders::{byte_len, DocumentFields};
use super::{base64_bytes, empty_object};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bidder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub contact_info: String,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBidderRequest {
    pub tenant_id: Uuid,
    pub name: String,
    pub contact_info: String,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBidderRequest {
    pub name: Option<String>,
    pub contact_info: Option<String>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateBidderRequest {
    pub fn into_row(self) -> Bidder {
        Bidder {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            contact_info: self.contact_info,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateBidderRequest {
    pub fn apply_to(self, row: &mut Bidder) {
        if let Some(name) = self.name {
            row.name = name;
        }
        if let Some(contact_info) = self.contact_info {
            row.contact_info = contact_info;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for Bidder {
    const SCHEMA: &'static TableDef = &schema::BIDDERS;

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
            .bind(&self.contact_info)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// A bidder's submission against a tender; at most one per (tender, bidder)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub bidder_id: Uuid,
    pub submission_date: DateTime<Utc>,
    pub bid_status_value_id: Uuid,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBidRequest {
    pub tender_id: Uuid,
    pub bidder_id: Uuid,
    #[serde(default = "super::now")]
    pub submission_date: DateTime<Utc>,
    pub bid_status_value_id: Uuid,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

/// The tender and bidder of a bid never change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBidRequest {
    pub submission_date: Option<DateTime<Utc>>,
    pub bid_status_value_id: Option<Uuid>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateBidRequest {
    pub fn into_row(self) -> Bid {
        Bid {
            id: Uuid::new_v4(),
            tender_id: self.tender_id,
            bidder_id: self.bidder_id,
            submission_date: self.submission_date,
            bid_status_value_id: self.bid_status_value_id,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateBidRequest {
    pub fn apply_to(self, row: &mut Bid) {
        if let Some(submission_date) = self.submission_date {
            row.submission_date = submission_date;
        }
        if let Some(status) = self.bid_status_value_id {
            row.bid_status_value_id = status;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for Bid {
    const SCHEMA: &'static TableDef = &schema::BIDS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tender_id" => Some(self.tender_id.into()),
            "bidder_id" => Some(self.bidder_id.into()),
            "bid_status_value_id" => Some(self.bid_status_value_id.into()),
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
            .bind(self.bidder_id)
            .bind(self.submission_date)
            .bind(self.bid_status_value_id)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BidDocument {
    pub id: Uuid,
    pub bid_id: Uuid,
    pub file_name: String,
    pub file_type: String,
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
pub struct CreateBidDocumentRequest {
    pub bid_id: Uuid,
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

impl CreateBidDocumentRequest {
    pub fn into_row(self) -> BidDocument {
        BidDocument {
            id: Uuid::new_v4(),
            bid_id: self.bid_id,
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

impl DocumentFields for BidDocument {
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

impl Entity for BidDocument {
    const SCHEMA: &'static TableDef = &schema::BID_DOCUMENTS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "bid_id" => Some(self.bid_id.into()),
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
            .bind(self.bid_id)
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
