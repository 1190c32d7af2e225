//! Lookup tables backing the `*_value_id` columns (statuses, types, outcomes)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

use super::{empty_object, nullable};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReferenceType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReferenceTypeRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReferenceTypeRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl CreateReferenceTypeRequest {
    pub fn into_row(self) -> ReferenceType {
        ReferenceType {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            created_at: Utc::now(),
        }
    }
}

impl UpdateReferenceTypeRequest {
    pub fn apply_to(self, row: &mut ReferenceType) {
        if let Some(name) = self.name {
            row.name = name;
        }
        if let Some(description) = self.description {
            row.description = description;
        }
    }
}

impl Entity for ReferenceType {
    const SCHEMA: &'static TableDef = &schema::REFERENCE_TYPES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
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
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReferenceValue {
    pub id: Uuid,
    pub reference_type_id: Uuid,
    pub value: String,
    pub code: String,
    pub sort_order: Option<i32>,
    pub is_active: bool,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

fn active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReferenceValueRequest {
    pub reference_type_id: Uuid,
    pub value: String,
    pub code: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReferenceValueRequest {
    pub value: Option<String>,
    pub code: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub sort_order: Option<Option<i32>>,
    pub is_active: Option<bool>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateReferenceValueRequest {
    pub fn into_row(self) -> ReferenceValue {
        ReferenceValue {
            id: Uuid::new_v4(),
            reference_type_id: self.reference_type_id,
            value: self.value,
            code: self.code,
            sort_order: self.sort_order,
            is_active: self.is_active,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateReferenceValueRequest {
    pub fn apply_to(self, row: &mut ReferenceValue) {
        if let Some(value) = self.value {
            row.value = value;
        }
        if let Some(code) = self.code {
            row.code = code;
        }
        if let Some(sort_order) = self.sort_order {
            row.sort_order = sort_order;
        }
        if let Some(is_active) = self.is_active {
            row.is_active = is_active;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for ReferenceValue {
    const SCHEMA: &'static TableDef = &schema::REFERENCE_VALUES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "reference_type_id" => Some(self.reference_type_id.into()),
            "code" => Some(self.code.as_str().into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.reference_type_id)
            .bind(&self.value)
            .bind(&self.code)
            .bind(self.sort_order)
            .bind(self.is_active)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}
