//! Postgres storage engine
//!
//! SQL is generated once per table from the catalogue column list, so the
//! statements stay in step with [`Entity::bind_columns`].

use async_trait::async_trait;
use sqlx::{postgres::PgArguments, query::QueryAs, PgPool, Postgres};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    link_columns, Backend, Entity, Filter, Guard, Key, LinkRepository, Page, Repository,
    StoreError, StoreResult,
};
use crate::schema::TableDef;

struct Statements {
    insert: String,
    update: String,
    select_one: String,
    delete_one: String,
}

impl Statements {
    fn for_table(def: &TableDef) -> Self {
        let cols = def.columns.join(", ");
        let placeholders = (1..=def.columns.len())
            .map(|n| format!("${}", n))
            .collect::<Vec<_>>()
            .join(", ");
        // `id` is always $1, the remaining columns follow in catalogue order
        let assignments = def
            .columns
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| format!("{} = ${}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            insert: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                def.name, cols, placeholders, cols
            ),
            update: format!(
                "UPDATE {} SET {} WHERE id = $1 RETURNING {}",
                def.name, assignments, cols
            ),
            select_one: format!("SELECT {} FROM {} WHERE id = $1", cols, def.name),
            delete_one: format!("DELETE FROM {} WHERE id = $1", def.name),
        }
    }
}

/// `WHERE` clause for equality filters, numbering placeholders from 1
fn where_clause(filters: &[Filter]) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let conditions = filters
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{} = ${}", f.column, i + 1))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(" WHERE {}", conditions)
}

fn bind_filters<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    filters: &[Filter],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for filter in filters {
        query = match &filter.value {
            Key::Uuid(id) => query.bind(*id),
            Key::Text(text) => query.bind(text.clone()),
        };
    }
    query
}

pub struct PgRepository<T: Entity> {
    pool: PgPool,
    sql: Statements,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            sql: Statements::for_table(T::SCHEMA),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for PgRepository<T> {
    async fn insert(&self, row: T) -> StoreResult<T> {
        let inserted = row
            .bind_columns(sqlx::query_as::<_, T>(&self.sql.insert))
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<T>> {
        let row = sqlx::query_as::<_, T>(&self.sql.select_one)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self, filters: &[Filter], page: Page) -> StoreResult<Vec<T>> {
        let n = filters.len();
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY created_at, id LIMIT ${} OFFSET ${}",
            T::SCHEMA.columns.join(", "),
            T::SCHEMA.name,
            where_clause(filters),
            n + 1,
            n + 2
        );
        let rows = bind_filters(sqlx::query_as::<_, T>(&sql), filters)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self, filters: &[Filter]) -> StoreResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            T::SCHEMA.name,
            where_clause(filters)
        );
        let (total,): (i64,) = bind_filters(sqlx::query_as(&sql), filters)
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }

    async fn update(&self, row: T) -> StoreResult<T> {
        let id = row.id();
        row.bind_columns(sqlx::query_as::<_, T>(&self.sql.update))
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                table: T::SCHEMA.name,
                id,
            })
    }

    async fn update_guarded(
        &self,
        row: T,
        scope: &[Filter],
        guard: Guard<'_, T>,
    ) -> StoreResult<T> {
        let id = row.id();
        let mut tx = self.pool.begin().await?;

        // Row locks in id order so concurrent guarded updates on one scope queue up
        let lock_sql = format!(
            "SELECT {} FROM {}{} ORDER BY id FOR UPDATE",
            T::SCHEMA.columns.join(", "),
            T::SCHEMA.name,
            where_clause(scope)
        );
        let siblings = bind_filters(sqlx::query_as::<_, T>(&lock_sql), scope)
            .fetch_all(&mut *tx)
            .await?;
        guard(&siblings).map_err(StoreError::Rejected)?;

        let saved = row
            .bind_columns(sqlx::query_as::<_, T>(&self.sql.update))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound {
                table: T::SCHEMA.name,
                id,
            })?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(&self.sql.delete_one)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let result = sqlx::query(&format!("DELETE FROM {}", T::SCHEMA.name))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

pub struct PgLinks {
    pool: PgPool,
    def: &'static TableDef,
}

impl PgLinks {
    pub fn new(pool: PgPool, def: &'static TableDef) -> Self {
        Self { pool, def }
    }

    fn columns(&self) -> (&'static str, &'static str) {
        link_columns(self.def)
    }
}

#[async_trait]
impl LinkRepository for PgLinks {
    fn schema(&self) -> &'static TableDef {
        self.def
    }

    async fn link(&self, left: Uuid, right: Uuid) -> StoreResult<bool> {
        let (l, r) = self.columns();
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            self.def.name, l, r
        );
        let result = sqlx::query(&sql)
            .bind(left)
            .bind(right)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unlink(&self, left: Uuid, right: Uuid) -> StoreResult<bool> {
        let (l, r) = self.columns();
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            self.def.name, l, r
        );
        let result = sqlx::query(&sql)
            .bind(left)
            .bind(right)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rights_of(&self, left: Uuid) -> StoreResult<Vec<Uuid>> {
        let (l, r) = self.columns();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY {}",
            r, self.def.name, l, r
        );
        let ids = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(left)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn lefts_of(&self, right: Uuid) -> StoreResult<Vec<Uuid>> {
        let (l, r) = self.columns();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY {}",
            l, self.def.name, r, l
        );
        let ids = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(right)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn pairs(&self, page: Page) -> StoreResult<Vec<(Uuid, Uuid)>> {
        let (l, r) = self.columns();
        let sql = format!(
            "SELECT {}, {} FROM {} ORDER BY {}, {} LIMIT $1 OFFSET $2",
            l, r, self.def.name, l, r
        );
        let pairs = sqlx::query_as::<_, (Uuid, Uuid)>(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(pairs)
    }

    async fn count(&self) -> StoreResult<u64> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.def.name))
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }
}

pub(super) struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub(super) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Backend for PgBackend {
    fn repo<T: Entity>(&self) -> Arc<dyn Repository<T>> {
        Arc::new(PgRepository::<T>::new(self.pool.clone()))
    }

    fn links(&self, def: &'static TableDef) -> Arc<dyn LinkRepository> {
        Arc::new(PgLinks::new(self.pool.clone(), def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn update_binds_id_first() {
        let sql = Statements::for_table(&schema::TENANTS);
        assert_eq!(
            sql.update,
            "UPDATE tenants SET name = $2, description = $3, additional_attributes = $4, \
             created_at = $5 WHERE id = $1 RETURNING id, name, description, additional_attributes, created_at"
        );
        assert!(sql.insert.contains("VALUES ($1, $2, $3, $4, $5)"));
    }

    #[test]
    fn filters_number_their_placeholders() {
        let filters = [
            Filter::eq("tender_id", Uuid::nil()),
            Filter::eq("bidder_id", Uuid::nil()),
        ];
        assert_eq!(
            where_clause(&filters),
            " WHERE tender_id = $1 AND bidder_id = $2"
        );
        assert_eq!(where_clause(&[]), "");
    }
}
