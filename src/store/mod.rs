//! Persistence layer
//!
//! Entities are read and written through [`Repository`], which has two
//! engines: Postgres (sqlx) for deployments and an in-process arena for
//! tests and local runs. Both honour the constraints declared in
//! [`crate::schema`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::QueryAs,
    FromRow, PgPool, Postgres,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::*;
use crate::schema::{self, TableDef};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: Uuid },

    #[error("unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint {constraint} violated")]
    ForeignKeyViolation { constraint: String },

    #[error("table {0} is not registered")]
    UnknownTable(String),

    /// A guard passed to [`Repository::update_guarded`] refused the write
    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return Self::UniqueViolation { constraint };
            }
            if db.is_foreign_key_violation() {
                return Self::ForeignKeyViolation { constraint };
            }
        }
        Self::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Check run against a locked set of sibling rows before a guarded update
pub type Guard<'a, T> = &'a (dyn Fn(&[T]) -> Result<(), String> + Send + Sync);

/// Value of a key column: the columns that take part in foreign keys,
/// unique constraints and list filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Uuid(Uuid),
    Text(String),
}

impl From<Uuid> for Key {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Equality filter on a catalogue column
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: &'static str,
    pub value: Key,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Key>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// Row window for list queries
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: i64::from(limit),
            offset: i64::from(offset),
        }
    }

    /// Every row; used for tree and rubric assembly
    pub fn unbounded() -> Self {
        Self {
            limit: i64::MAX,
            offset: 0,
        }
    }
}

/// A persisted row type described by a catalogue entry
pub trait Entity:
    Clone + Serialize + Send + Sync + Unpin + 'static + for<'r> FromRow<'r, PgRow>
{
    const SCHEMA: &'static TableDef;

    fn id(&self) -> Uuid;

    /// Value of a key column, `None` when the column is null or not a key column
    fn key(&self, column: &str) -> Option<Key>;

    /// Bind every column in `SCHEMA.columns` order
    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments>;
}

#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn insert(&self, row: T) -> StoreResult<T>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<T>>;

    async fn list(&self, filters: &[Filter], page: Page) -> StoreResult<Vec<T>>;

    async fn count(&self, filters: &[Filter]) -> StoreResult<u64>;

    /// Save a modified row; fails with `NotFound` if it no longer exists
    async fn update(&self, row: T) -> StoreResult<T>;

    /// Like `update`, but first reads the rows matching `scope` under the
    /// same lock (memory) or transaction with `FOR UPDATE` (Postgres) and
    /// lets `guard` refuse the write with [`StoreError::Rejected`]. The rows
    /// passed to `guard` are the stored ones, before `row` is applied.
    async fn update_guarded(
        &self,
        row: T,
        scope: &[Filter],
        guard: Guard<'_, T>,
    ) -> StoreResult<T>;

    /// Returns false when no row had that id
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn delete_all(&self) -> StoreResult<u64>;

    async fn get(&self, id: Uuid) -> StoreResult<T> {
        self.find(id).await?.ok_or(StoreError::NotFound {
            table: T::SCHEMA.name,
            id,
        })
    }

    async fn exists(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.find(id).await?.is_some())
    }

    async fn find_by(&self, filters: &[Filter]) -> StoreResult<Option<T>> {
        Ok(self.list(filters, Page::new(1, 0)).await?.into_iter().next())
    }
}

/// Many-to-many association table keyed by (left, right)
#[async_trait]
pub trait LinkRepository: Send + Sync {
    fn schema(&self) -> &'static TableDef;

    /// Returns false when the pair was already linked
    async fn link(&self, left: Uuid, right: Uuid) -> StoreResult<bool>;

    async fn unlink(&self, left: Uuid, right: Uuid) -> StoreResult<bool>;

    async fn rights_of(&self, left: Uuid) -> StoreResult<Vec<Uuid>>;

    async fn lefts_of(&self, right: Uuid) -> StoreResult<Vec<Uuid>>;

    async fn pairs(&self, page: Page) -> StoreResult<Vec<(Uuid, Uuid)>>;

    async fn count(&self) -> StoreResult<u64>;
}

/// Type-erased table access for the admin grids
#[async_trait]
pub trait AdminTable: Send + Sync {
    fn schema(&self) -> &'static TableDef;

    async fn rows(&self, page: Page) -> StoreResult<(Vec<serde_json::Value>, u64)>;

    async fn row(&self, id: Uuid) -> StoreResult<Option<serde_json::Value>>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

/// Serialize a row for the admin views, dropping columns that must never leave the server
pub fn to_admin_json<T: Serialize>(row: &T) -> serde_json::Value {
    let mut value = serde_json::to_value(row).unwrap_or(serde_json::Value::Null);
    if let Some(obj) = value.as_object_mut() {
        for hidden in schema::HIDDEN_COLUMNS {
            obj.remove(*hidden);
        }
    }
    value
}

struct EntityAdmin<T: Entity>(Arc<dyn Repository<T>>);

#[async_trait]
impl<T: Entity> AdminTable for EntityAdmin<T> {
    fn schema(&self) -> &'static TableDef {
        T::SCHEMA
    }

    async fn rows(&self, page: Page) -> StoreResult<(Vec<serde_json::Value>, u64)> {
        let total = self.0.count(&[]).await?;
        let rows = self.0.list(&[], page).await?;
        Ok((rows.iter().map(to_admin_json).collect(), total))
    }

    async fn row(&self, id: Uuid) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.0.find(id).await?.as_ref().map(to_admin_json))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        self.0.delete(id).await
    }
}

struct LinkAdmin(Arc<dyn LinkRepository>);

#[async_trait]
impl AdminTable for LinkAdmin {
    fn schema(&self) -> &'static TableDef {
        self.0.schema()
    }

    async fn rows(&self, page: Page) -> StoreResult<(Vec<serde_json::Value>, u64)> {
        let (left, right) = link_columns(self.0.schema());
        let total = self.0.count().await?;
        let rows = self
            .0
            .pairs(page)
            .await?
            .into_iter()
            .map(|(l, r)| {
                let mut row = serde_json::Map::new();
                row.insert(left.to_string(), serde_json::Value::String(l.to_string()));
                row.insert(right.to_string(), serde_json::Value::String(r.to_string()));
                serde_json::Value::Object(row)
            })
            .collect();
        Ok((rows, total))
    }

    // Association rows have no surrogate id
    async fn row(&self, _id: Uuid) -> StoreResult<Option<serde_json::Value>> {
        Ok(None)
    }

    async fn delete(&self, _id: Uuid) -> StoreResult<bool> {
        Ok(false)
    }
}

pub(crate) fn link_columns(def: &TableDef) -> (&'static str, &'static str) {
    match def.primary_key {
        schema::PrimaryKey::Pair(left, right) => (left, right),
        schema::PrimaryKey::Id => ("id", "id"),
    }
}

/// Builds repositories for one storage engine
trait Backend {
    fn repo<T: Entity>(&self) -> Arc<dyn Repository<T>>;
    fn links(&self, def: &'static TableDef) -> Arc<dyn LinkRepository>;
}

/// All repositories, shared across requests
#[derive(Clone)]
pub struct Store {
    pool: Option<PgPool>,

    pub tenants: Arc<dyn Repository<Tenant>>,
    pub organizations: Arc<dyn Repository<Organization>>,
    pub org_units: Arc<dyn Repository<OrgUnit>>,
    pub users: Arc<dyn Repository<User>>,
    pub identity_mappings: Arc<dyn Repository<UserIdentityMapping>>,
    pub roles: Arc<dyn Repository<Role>>,
    pub permissions: Arc<dyn Repository<Permission>>,
    pub role_permissions: Arc<dyn LinkRepository>,
    pub global_roles: Arc<dyn Repository<GlobalRole>>,
    pub global_role_permissions: Arc<dyn LinkRepository>,
    pub global_user_roles: Arc<dyn Repository<GlobalUserRole>>,
    pub org_unit_users: Arc<dyn Repository<OrgUnitUser>>,
    pub integrations: Arc<dyn Repository<Integration>>,
    pub document_repositories: Arc<dyn Repository<DocumentRepository>>,
    pub tenders: Arc<dyn Repository<Tender>>,
    pub tender_specifications: Arc<dyn Repository<TenderSpecification>>,
    pub tender_documents: Arc<dyn Repository<TenderDocument>>,
    pub bidders: Arc<dyn Repository<Bidder>>,
    pub bids: Arc<dyn Repository<Bid>>,
    pub bid_documents: Arc<dyn Repository<BidDocument>>,
    pub evaluation_methods: Arc<dyn Repository<EvaluationMethod>>,
    pub evaluation_criteria: Arc<dyn Repository<EvaluationCriteria>>,
    pub evaluation_stages: Arc<dyn Repository<EvaluationStage>>,
    pub evaluation_categories: Arc<dyn Repository<EvaluationCategory>>,
    pub evaluation_criterion: Arc<dyn Repository<EvaluationCriterion>>,
    pub evaluation_results: Arc<dyn Repository<EvaluationResult>>,
    pub reference_types: Arc<dyn Repository<ReferenceType>>,
    pub reference_values: Arc<dyn Repository<ReferenceValue>>,
    pub invitations: Arc<dyn Repository<Invitation>>,
    pub notifications: Arc<dyn Repository<Notification>>,
    pub audit_log: Arc<dyn Repository<AuditLog>>,
    pub accounts: Arc<dyn Repository<Account>>,

    admin: Vec<Arc<dyn AdminTable>>,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        let backend = postgres::PgBackend::new(pool.clone());
        Self::assemble(&backend, Some(pool))
    }

    pub fn memory() -> Self {
        let backend = memory::MemoryBackend::new();
        Self::assemble(&backend, None)
    }

    fn assemble(backend: &impl Backend, pool: Option<PgPool>) -> Self {
        let mut store = Self {
            pool,
            tenants: backend.repo(),
            organizations: backend.repo(),
            org_units: backend.repo(),
            users: backend.repo(),
            identity_mappings: backend.repo(),
            roles: backend.repo(),
            permissions: backend.repo(),
            role_permissions: backend.links(&schema::ROLE_PERMISSIONS),
            global_roles: backend.repo(),
            global_role_permissions: backend.links(&schema::GLOBAL_ROLE_PERMISSIONS),
            global_user_roles: backend.repo(),
            org_unit_users: backend.repo(),
            integrations: backend.repo(),
            document_repositories: backend.repo(),
            tenders: backend.repo(),
            tender_specifications: backend.repo(),
            tender_documents: backend.repo(),
            bidders: backend.repo(),
            bids: backend.repo(),
            bid_documents: backend.repo(),
            evaluation_methods: backend.repo(),
            evaluation_criteria: backend.repo(),
            evaluation_stages: backend.repo(),
            evaluation_categories: backend.repo(),
            evaluation_criterion: backend.repo(),
            evaluation_results: backend.repo(),
            reference_types: backend.repo(),
            reference_values: backend.repo(),
            invitations: backend.repo(),
            notifications: backend.repo(),
            audit_log: backend.repo(),
            accounts: backend.repo(),
            admin: Vec::new(),
        };
        store.admin = store.build_admin_tables();
        store
    }

    fn build_admin_tables(&self) -> Vec<Arc<dyn AdminTable>> {
        fn entity<T: Entity>(repo: &Arc<dyn Repository<T>>) -> Arc<dyn AdminTable> {
            Arc::new(EntityAdmin(repo.clone()))
        }
        fn link(repo: &Arc<dyn LinkRepository>) -> Arc<dyn AdminTable> {
            Arc::new(LinkAdmin(repo.clone()))
        }

        vec![
            entity(&self.tenants),
            entity(&self.organizations),
            entity(&self.org_units),
            entity(&self.users),
            entity(&self.identity_mappings),
            entity(&self.roles),
            entity(&self.permissions),
            link(&self.role_permissions),
            entity(&self.global_roles),
            link(&self.global_role_permissions),
            entity(&self.global_user_roles),
            entity(&self.org_unit_users),
            entity(&self.integrations),
            entity(&self.document_repositories),
            entity(&self.tenders),
            entity(&self.tender_specifications),
            entity(&self.tender_documents),
            entity(&self.bidders),
            entity(&self.bids),
            entity(&self.bid_documents),
            entity(&self.evaluation_methods),
            entity(&self.evaluation_criteria),
            entity(&self.evaluation_stages),
            entity(&self.evaluation_categories),
            entity(&self.evaluation_criterion),
            entity(&self.evaluation_results),
            entity(&self.reference_types),
            entity(&self.reference_values),
            entity(&self.invitations),
            entity(&self.notifications),
            entity(&self.audit_log),
            entity(&self.accounts),
        ]
    }

    pub fn admin_table(&self, name: &str) -> Option<&dyn AdminTable> {
        self.admin
            .iter()
            .find(|t| t.schema().name == name)
            .map(|t| &**t)
    }

    /// Existence check by table name, for foreign key targets
    pub async fn row_exists(&self, table: &str, id: Uuid) -> StoreResult<bool> {
        match self.admin_table(table) {
            Some(t) => Ok(t.row(id).await?.is_some()),
            None => Err(StoreError::UnknownTable(table.to_string())),
        }
    }

    /// Lightweight health check for the backing store
    pub async fn health_check(&self) -> bool {
        match &self.pool {
            Some(pool) => crate::db::health_check(pool).await,
            None => true,
        }
    }
}
