//! Evaluation rubric: method, per-tender criteria, and the
//! stage → category → criterion tree that bids are scored against

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

use super::{empty_object, nullable};

/// Weighting between technical and commercial scores, in percent
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EvaluationMethod {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub technical_weightage: Decimal,
    pub commercial_weightage: Decimal,
    pub formula_or_notes: String,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvaluationMethodRequest {
    pub tenant_id: Uuid,
    pub name: String,
    pub technical_weightage: Decimal,
    pub commercial_weightage: Decimal,
    #[serde(default)]
    pub formula_or_notes: String,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEvaluationMethodRequest {
    pub name: Option<String>,
    pub technical_weightage: Option<Decimal>,
    pub commercial_weightage: Option<Decimal>,
    pub formula_or_notes: Option<String>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateEvaluationMethodRequest {
    pub fn into_row(self) -> EvaluationMethod {
        EvaluationMethod {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            technical_weightage: self.technical_weightage,
            commercial_weightage: self.commercial_weightage,
            formula_or_notes: self.formula_or_notes,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateEvaluationMethodRequest {
    pub fn apply_to(self, row: &mut EvaluationMethod) {
        if let Some(name) = self.name {
            row.name = name;
        }
        if let Some(technical) = self.technical_weightage {
            row.technical_weightage = technical;
        }
        if let Some(commercial) = self.commercial_weightage {
            row.commercial_weightage = commercial;
        }
        if let Some(notes) = self.formula_or_notes {
            row.formula_or_notes = notes;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for EvaluationMethod {
    const SCHEMA: &'static TableDef = &schema::EVALUATION_METHODS;

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
            .bind(self.technical_weightage)
            .bind(self.commercial_weightage)
            .bind(&self.formula_or_notes)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// Root of a tender's rubric; one per tender
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EvaluationCriteria {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub evaluation_method_id: Uuid,
    pub criteria_details: String,
    pub generated_date: DateTime<Utc>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvaluationCriteriaRequest {
    pub tender_id: Uuid,
    pub evaluation_method_id: Uuid,
    pub criteria_details: String,
    #[serde(default = "super::now")]
    pub generated_date: DateTime<Utc>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEvaluationCriteriaRequest {
    pub evaluation_method_id: Option<Uuid>,
    pub criteria_details: Option<String>,
    pub generated_date: Option<DateTime<Utc>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateEvaluationCriteriaRequest {
    pub fn into_row(self) -> EvaluationCriteria {
        EvaluationCriteria {
            id: Uuid::new_v4(),
            tender_id: self.tender_id,
            evaluation_method_id: self.evaluation_method_id,
            criteria_details: self.criteria_details,
            generated_date: self.generated_date,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateEvaluationCriteriaRequest {
    pub fn apply_to(self, row: &mut EvaluationCriteria) {
        if let Some(method) = self.evaluation_method_id {
            row.evaluation_method_id = method;
        }
        if let Some(details) = self.criteria_details {
            row.criteria_details = details;
        }
        if let Some(generated_date) = self.generated_date {
            row.generated_date = generated_date;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for EvaluationCriteria {
    const SCHEMA: &'static TableDef = &schema::EVALUATION_CRITERIA;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tender_id" => Some(self.tender_id.into()),
            "evaluation_method_id" => Some(self.evaluation_method_id.into()),
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
            .bind(self.evaluation_method_id)
            .bind(&self.criteria_details)
            .bind(self.generated_date)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EvaluationStage {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub criteria_id: Uuid,
    pub stage_type_value_id: Uuid,
    pub sequence: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvaluationStageRequest {
    pub tender_id: Uuid,
    pub criteria_id: Uuid,
    pub stage_type_value_id: Uuid,
    pub sequence: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEvaluationStageRequest {
    pub stage_type_value_id: Option<Uuid>,
    pub sequence: Option<i32>,
}

impl CreateEvaluationStageRequest {
    pub fn into_row(self) -> EvaluationStage {
        EvaluationStage {
            id: Uuid::new_v4(),
            tender_id: self.tender_id,
            criteria_id: self.criteria_id,
            stage_type_value_id: self.stage_type_value_id,
            sequence: self.sequence,
            created_at: Utc::now(),
        }
    }
}

impl UpdateEvaluationStageRequest {
    pub fn apply_to(self, row: &mut EvaluationStage) {
        if let Some(stage_type) = self.stage_type_value_id {
            row.stage_type_value_id = stage_type;
        }
        if let Some(sequence) = self.sequence {
            row.sequence = sequence;
        }
    }
}

impl Entity for EvaluationStage {
    const SCHEMA: &'static TableDef = &schema::EVALUATION_STAGES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tender_id" => Some(self.tender_id.into()),
            "criteria_id" => Some(self.criteria_id.into()),
            "stage_type_value_id" => Some(self.stage_type_value_id.into()),
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
            .bind(self.criteria_id)
            .bind(self.stage_type_value_id)
            .bind(self.sequence)
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EvaluationCategory {
    pub id: Uuid,
    pub stage_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sequence: i32,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvaluationCategoryRequest {
    pub stage_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sequence: i32,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEvaluationCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub sequence: Option<i32>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateEvaluationCategoryRequest {
    pub fn into_row(self) -> EvaluationCategory {
        EvaluationCategory {
            id: Uuid::new_v4(),
            stage_id: self.stage_id,
            name: self.name,
            description: self.description,
            sequence: self.sequence,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateEvaluationCategoryRequest {
    pub fn apply_to(self, row: &mut EvaluationCategory) {
        if let Some(name) = self.name {
            row.name = name;
        }
        if let Some(description) = self.description {
            row.description = description;
        }
        if let Some(sequence) = self.sequence {
            row.sequence = sequence;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for EvaluationCategory {
    const SCHEMA: &'static TableDef = &schema::EVALUATION_CATEGORIES;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "stage_id" => Some(self.stage_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.stage_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.sequence)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// Single scored line item within a category
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EvaluationCriterion {
    pub id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub weightage: Decimal,
    pub is_mandatory: bool,
    pub criteria_type_value_id: Uuid,
    pub sequence: i32,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvaluationCriterionRequest {
    pub category_id: Uuid,
    pub description: String,
    pub weightage: Decimal,
    #[serde(default)]
    pub is_mandatory: bool,
    pub criteria_type_value_id: Uuid,
    pub sequence: i32,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEvaluationCriterionRequest {
    pub description: Option<String>,
    pub weightage: Option<Decimal>,
    pub is_mandatory: Option<bool>,
    pub criteria_type_value_id: Option<Uuid>,
    pub sequence: Option<i32>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateEvaluationCriterionRequest {
    pub fn into_row(self) -> EvaluationCriterion {
        EvaluationCriterion {
            id: Uuid::new_v4(),
            category_id: self.category_id,
            description: self.description,
            weightage: self.weightage,
            is_mandatory: self.is_mandatory,
            criteria_type_value_id: self.criteria_type_value_id,
            sequence: self.sequence,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateEvaluationCriterionRequest {
    pub fn apply_to(self, row: &mut EvaluationCriterion) {
        if let Some(description) = self.description {
            row.description = description;
        }
        if let Some(weightage) = self.weightage {
            row.weightage = weightage;
        }
        if let Some(is_mandatory) = self.is_mandatory {
            row.is_mandatory = is_mandatory;
        }
        if let Some(kind) = self.criteria_type_value_id {
            row.criteria_type_value_id = kind;
        }
        if let Some(sequence) = self.sequence {
            row.sequence = sequence;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for EvaluationCriterion {
    const SCHEMA: &'static TableDef = &schema::EVALUATION_CRITERION;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "category_id" => Some(self.category_id.into()),
            "criteria_type_value_id" => Some(self.criteria_type_value_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.category_id)
            .bind(&self.description)
            .bind(self.weightage)
            .bind(self.is_mandatory)
            .bind(self.criteria_type_value_id)
            .bind(self.sequence)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// Score awarded to one bid against one criterion
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EvaluationResult {
    pub id: Uuid,
    pub bid_id: Uuid,
    pub criteria_id: Uuid,
    pub stage_id: Uuid,
    pub category_id: Uuid,
    pub criterion_id: Uuid,
    pub evaluation_outcome_value_id: Uuid,
    pub score: f64,
    pub comments: Option<String>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvaluationResultRequest {
    pub bid_id: Uuid,
    pub criteria_id: Uuid,
    pub stage_id: Uuid,
    pub category_id: Uuid,
    pub criterion_id: Uuid,
    pub evaluation_outcome_value_id: Uuid,
    pub score: f64,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

/// Only the outcome, score and comments of a result can be revised
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEvaluationResultRequest {
    pub evaluation_outcome_value_id: Option<Uuid>,
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub comments: Option<Option<String>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateEvaluationResultRequest {
    pub fn into_row(self) -> EvaluationResult {
        EvaluationResult {
            id: Uuid::new_v4(),
            bid_id: self.bid_id,
            criteria_id: self.criteria_id,
            stage_id: self.stage_id,
            category_id: self.category_id,
            criterion_id: self.criterion_id,
            evaluation_outcome_value_id: self.evaluation_outcome_value_id,
            score: self.score,
            comments: self.comments,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateEvaluationResultRequest {
    pub fn apply_to(self, row: &mut EvaluationResult) {
        if let Some(outcome) = self.evaluation_outcome_value_id {
            row.evaluation_outcome_value_id = outcome;
        }
        if let Some(score) = self.score {
            row.score = score;
        }
        if let Some(comments) = self.comments {
            row.comments = comments;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for EvaluationResult {
    const SCHEMA: &'static TableDef = &schema::EVALUATION_RESULTS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "bid_id" => Some(self.bid_id.into()),
            "criteria_id" => Some(self.criteria_id.into()),
            "stage_id" => Some(self.stage_id.into()),
            "category_id" => Some(self.category_id.into()),
            "criterion_id" => Some(self.criterion_id.into()),
            "evaluation_outcome_value_id" => Some(self.evaluation_outcome_value_id.into()),
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
            .bind(self.criteria_id)
            .bind(self.stage_id)
            .bind(self.category_id)
            .bind(self.criterion_id)
            .bind(self.evaluation_outcome_value_id)
            .bind(self.score)
            .bind(&self.comments)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// `GET /tenders/:id/evaluation`: the whole rubric of a tender, ordered by `sequence`
#[derive(Debug, Clone, Serialize)]
pub struct RubricResponse {
    pub criteria: EvaluationCriteria,
    pub method: Option<EvaluationMethod>,
    pub stages: Vec<RubricStage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RubricStage {
    #[serde(flatten)]
    pub stage: EvaluationStage,
    pub categories: Vec<RubricCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RubricCategory {
    #[serde(flatten)]
    pub category: EvaluationCategory,
    pub criterion: Vec<EvaluationCriterion>,
}
