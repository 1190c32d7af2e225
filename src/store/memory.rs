//! In-process storage engine
//!
//! Rows live in typed tables indexed by id (an arena per table), all
//! behind one lock so that a write and its constraint checks are atomic.
//! Foreign keys, unique constraints and `ON DELETE` behaviour come from
//! the table catalogue, so this engine rejects the same writes Postgres
//! would.

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    link_columns, Backend, Entity, Filter, Guard, Key, LinkRepository, Page, Repository,
    StoreError, StoreResult,
};
use crate::schema::{self, OnDelete, TableDef};

/// Address of a row inside a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKey {
    Id(Uuid),
    Pair(Uuid, Uuid),
}

trait ErasedTable: Send + Sync {
    fn schema(&self) -> &'static TableDef;
    fn contains(&self, id: Uuid) -> bool;
    /// Rows whose `column` holds `id`
    fn referencing(&self, column: &str, id: Uuid) -> Vec<RowKey>;
    fn remove(&mut self, key: RowKey);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct EntityTable<T: Entity> {
    rows: IndexMap<Uuid, T>,
}

impl<T: Entity> ErasedTable for EntityTable<T> {
    fn schema(&self) -> &'static TableDef {
        T::SCHEMA
    }

    fn contains(&self, id: Uuid) -> bool {
        self.rows.contains_key(&id)
    }

    fn referencing(&self, column: &str, id: Uuid) -> Vec<RowKey> {
        let target = Some(Key::Uuid(id));
        self.rows
            .values()
            .filter(|row| row.key(column) == target)
            .map(|row| RowKey::Id(row.id()))
            .collect()
    }

    fn remove(&mut self, key: RowKey) {
        if let RowKey::Id(id) = key {
            self.rows.shift_remove(&id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct LinkTable {
    def: &'static TableDef,
    pairs: IndexSet<(Uuid, Uuid)>,
}

impl ErasedTable for LinkTable {
    fn schema(&self) -> &'static TableDef {
        self.def
    }

    fn contains(&self, _id: Uuid) -> bool {
        false
    }

    fn referencing(&self, column: &str, id: Uuid) -> Vec<RowKey> {
        let (left, right) = link_columns(self.def);
        self.pairs
            .iter()
            .filter(|(l, r)| (column == left && *l == id) || (column == right && *r == id))
            .map(|(l, r)| RowKey::Pair(*l, *r))
            .collect()
    }

    fn remove(&mut self, key: RowKey) {
        if let RowKey::Pair(l, r) = key {
            self.pairs.shift_remove(&(l, r));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

type Tables = HashMap<&'static str, Box<dyn ErasedTable>>;

/// Shared state behind every memory repository
#[derive(Default)]
pub struct MemoryDb {
    tables: RwLock<Tables>,
}

impl MemoryDb {
    fn register<T: Entity>(&self) {
        self.tables
            .write()
            .entry(T::SCHEMA.name)
            .or_insert_with(|| Box::new(EntityTable::<T> { rows: IndexMap::new() }));
    }

    fn register_link(&self, def: &'static TableDef) {
        self.tables.write().entry(def.name).or_insert_with(|| {
            Box::new(LinkTable {
                def,
                pairs: IndexSet::new(),
            })
        });
    }
}

fn typed<T: Entity>(tables: &Tables) -> StoreResult<&EntityTable<T>> {
    tables
        .get(T::SCHEMA.name)
        .and_then(|t| t.as_any().downcast_ref::<EntityTable<T>>())
        .ok_or_else(|| StoreError::UnknownTable(T::SCHEMA.name.to_string()))
}

fn typed_mut<T: Entity>(tables: &mut Tables) -> StoreResult<&mut EntityTable<T>> {
    tables
        .get_mut(T::SCHEMA.name)
        .and_then(|t| t.as_any_mut().downcast_mut::<EntityTable<T>>())
        .ok_or_else(|| StoreError::UnknownTable(T::SCHEMA.name.to_string()))
}

fn link_table<'a>(tables: &'a Tables, def: &TableDef) -> StoreResult<&'a LinkTable> {
    tables
        .get(def.name)
        .and_then(|t| t.as_any().downcast_ref::<LinkTable>())
        .ok_or_else(|| StoreError::UnknownTable(def.name.to_string()))
}

fn link_table_mut<'a>(tables: &'a mut Tables, def: &TableDef) -> StoreResult<&'a mut LinkTable> {
    tables
        .get_mut(def.name)
        .and_then(|t| t.as_any_mut().downcast_mut::<LinkTable>())
        .ok_or_else(|| StoreError::UnknownTable(def.name.to_string()))
}

/// Every non-null foreign key value must name an existing row
fn check_foreign_keys(
    tables: &Tables,
    def: &TableDef,
    value_of: impl Fn(&str) -> Option<Key>,
) -> StoreResult<()> {
    for fk in def.foreign_keys {
        let Some(Key::Uuid(target)) = value_of(fk.column) else {
            continue;
        };
        let present = tables
            .get(fk.references)
            .is_some_and(|t| t.contains(target));
        if !present {
            return Err(StoreError::ForeignKeyViolation {
                constraint: fk.constraint_name(def.name),
            });
        }
    }
    Ok(())
}

fn unique_key<T: Entity>(row: &T, columns: &[&str]) -> Option<Vec<Key>> {
    // Any null component exempts the row, as in SQL
    columns.iter().map(|c| row.key(c)).collect()
}

fn check_unique<T: Entity>(table: &EntityTable<T>, row: &T) -> StoreResult<()> {
    for constraint in T::SCHEMA.unique {
        let Some(key) = unique_key(row, constraint.columns) else {
            continue;
        };
        let clash = table.rows.values().any(|other| {
            other.id() != row.id() && unique_key(other, constraint.columns).as_ref() == Some(&key)
        });
        if clash {
            return Err(StoreError::UniqueViolation {
                constraint: constraint.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Collect the rows a delete would remove, following cascades and
/// refusing when a restricting reference exists
fn plan_delete(
    tables: &Tables,
    table: &'static str,
    id: Uuid,
    plan: &mut Vec<(&'static str, RowKey)>,
) -> StoreResult<()> {
    plan.push((table, RowKey::Id(id)));

    for (child, fk) in schema::referencing(table) {
        let Some(child_table) = tables.get(child.name) else {
            continue;
        };
        for key in child_table.referencing(fk.column, id) {
            if plan.contains(&(child.name, key)) {
                continue;
            }
            match (fk.on_delete, key) {
                (OnDelete::Cascade, RowKey::Id(child_id)) => {
                    plan_delete(tables, child.name, child_id, plan)?;
                }
                (OnDelete::Cascade, pair) => plan.push((child.name, pair)),
                (OnDelete::Restrict, _) => {
                    return Err(StoreError::ForeignKeyViolation {
                        constraint: fk.constraint_name(child.name),
                    });
                }
            }
        }
    }
    Ok(())
}

fn apply_plan(tables: &mut Tables, plan: Vec<(&'static str, RowKey)>) {
    for (table, key) in plan {
        if let Some(t) = tables.get_mut(table) {
            t.remove(key);
        }
    }
}

fn row_matches<T: Entity>(row: &T, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| row.key(f.column).as_ref() == Some(&f.value))
}

fn window<I: Iterator>(iter: I, page: Page) -> impl Iterator<Item = I::Item> {
    let offset = usize::try_from(page.offset).unwrap_or(0);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    iter.skip(offset).take(limit)
}

pub struct MemoryRepository<T: Entity> {
    db: Arc<MemoryDb>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        db.register::<T>();
        Self {
            db,
            _marker: PhantomData,
        }
    }
}

/// Replace a stored row, enforcing the same constraints as insert
fn save_existing<T: Entity>(tables: &mut Tables, row: T) -> StoreResult<T> {
    let table = typed::<T>(tables)?;
    if !table.rows.contains_key(&row.id()) {
        return Err(StoreError::NotFound {
            table: T::SCHEMA.name,
            id: row.id(),
        });
    }
    check_unique(table, &row)?;
    check_foreign_keys(tables, T::SCHEMA, |c| row.key(c))?;

    typed_mut::<T>(tables)?.rows.insert(row.id(), row.clone());
    Ok(row)
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn insert(&self, row: T) -> StoreResult<T> {
        let mut tables = self.db.tables.write();
        check_foreign_keys(&tables, T::SCHEMA, |c| row.key(c))?;

        let table = typed::<T>(&tables)?;
        if table.rows.contains_key(&row.id()) {
            return Err(StoreError::UniqueViolation {
                constraint: format!("{}_pkey", T::SCHEMA.name),
            });
        }
        check_unique(table, &row)?;

        typed_mut::<T>(&mut tables)?
            .rows
            .insert(row.id(), row.clone());
        Ok(row)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<T>> {
        let tables = self.db.tables.read();
        Ok(typed::<T>(&tables)?.rows.get(&id).cloned())
    }

    async fn list(&self, filters: &[Filter], page: Page) -> StoreResult<Vec<T>> {
        let tables = self.db.tables.read();
        let table = typed::<T>(&tables)?;
        let rows = table.rows.values().filter(|r| row_matches(*r, filters));
        Ok(window(rows, page).cloned().collect())
    }

    async fn count(&self, filters: &[Filter]) -> StoreResult<u64> {
        let tables = self.db.tables.read();
        let table = typed::<T>(&tables)?;
        Ok(table.rows.values().filter(|r| row_matches(*r, filters)).count() as u64)
    }

    async fn update(&self, row: T) -> StoreResult<T> {
        let mut tables = self.db.tables.write();
        save_existing(&mut tables, row)
    }

    async fn update_guarded(
        &self,
        row: T,
        scope: &[Filter],
        guard: Guard<'_, T>,
    ) -> StoreResult<T> {
        let mut tables = self.db.tables.write();
        let siblings: Vec<T> = typed::<T>(&tables)?
            .rows
            .values()
            .filter(|r| row_matches(*r, scope))
            .cloned()
            .collect();
        guard(&siblings).map_err(StoreError::Rejected)?;
        save_existing(&mut tables, row)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.db.tables.write();
        if !typed::<T>(&tables)?.rows.contains_key(&id) {
            return Ok(false);
        }

        let mut plan = Vec::new();
        plan_delete(&tables, T::SCHEMA.name, id, &mut plan)?;
        apply_plan(&mut tables, plan);
        Ok(true)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let mut tables = self.db.tables.write();
        let ids: Vec<Uuid> = typed::<T>(&tables)?.rows.keys().copied().collect();

        // Plan everything first so a single restricting reference aborts the whole delete
        let mut plan = Vec::new();
        for id in &ids {
            if !plan.contains(&(T::SCHEMA.name, RowKey::Id(*id))) {
                plan_delete(&tables, T::SCHEMA.name, *id, &mut plan)?;
            }
        }
        apply_plan(&mut tables, plan);
        Ok(ids.len() as u64)
    }
}

pub struct MemoryLinks {
    db: Arc<MemoryDb>,
    def: &'static TableDef,
}

impl MemoryLinks {
    pub fn new(db: Arc<MemoryDb>, def: &'static TableDef) -> Self {
        db.register_link(def);
        Self { db, def }
    }
}

#[async_trait]
impl LinkRepository for MemoryLinks {
    fn schema(&self) -> &'static TableDef {
        self.def
    }

    async fn link(&self, left: Uuid, right: Uuid) -> StoreResult<bool> {
        let (left_col, right_col) = link_columns(self.def);
        let mut tables = self.db.tables.write();
        check_foreign_keys(&tables, self.def, |c| {
            if c == left_col {
                Some(Key::Uuid(left))
            } else if c == right_col {
                Some(Key::Uuid(right))
            } else {
                None
            }
        })?;
        Ok(link_table_mut(&mut tables, self.def)?
            .pairs
            .insert((left, right)))
    }

    async fn unlink(&self, left: Uuid, right: Uuid) -> StoreResult<bool> {
        let mut tables = self.db.tables.write();
        Ok(link_table_mut(&mut tables, self.def)?
            .pairs
            .shift_remove(&(left, right)))
    }

    async fn rights_of(&self, left: Uuid) -> StoreResult<Vec<Uuid>> {
        let tables = self.db.tables.read();
        Ok(link_table(&tables, self.def)?
            .pairs
            .iter()
            .filter(|(l, _)| *l == left)
            .map(|(_, r)| *r)
            .collect())
    }

    async fn lefts_of(&self, right: Uuid) -> StoreResult<Vec<Uuid>> {
        let tables = self.db.tables.read();
        Ok(link_table(&tables, self.def)?
            .pairs
            .iter()
            .filter(|(_, r)| *r == right)
            .map(|(l, _)| *l)
            .collect())
    }

    async fn pairs(&self, page: Page) -> StoreResult<Vec<(Uuid, Uuid)>> {
        let tables = self.db.tables.read();
        let table = link_table(&tables, self.def)?;
        Ok(window(table.pairs.iter(), page).copied().collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        let tables = self.db.tables.read();
        Ok(link_table(&tables, self.def)?.pairs.len() as u64)
    }
}

pub(super) struct MemoryBackend {
    db: Arc<MemoryDb>,
}

impl MemoryBackend {
    pub(super) fn new() -> Self {
        Self {
            db: Arc::new(MemoryDb::default()),
        }
    }
}

impl Backend for MemoryBackend {
    fn repo<T: Entity>(&self) -> Arc<dyn Repository<T>> {
        Arc::new(MemoryRepository::<T>::new(self.db.clone()))
    }

    fn links(&self, def: &'static TableDef) -> Arc<dyn LinkRepository> {
        Arc::new(MemoryLinks::new(self.db.clone(), def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Organization, OrgUnit, Tenant, Tender, TenderSpecification};
    use crate::store::Store;
    use chrono::Utc;
    use serde_json::json;

    fn tenant(name: &str) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            additional_attributes: json!({}),
            created_at: Utc::now(),
        }
    }

    fn organization(tenant_id: Uuid) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            tenant_id,
            name: "Acme".to_string(),
            industry: "Construction".to_string(),
            additional_attributes: json!({}),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_dangling_foreign_key() {
        let store = Store::memory();
        let err = store
            .organizations
            .insert(organization(Uuid::new_v4()))
            .await
            .unwrap_err();
        let StoreError::ForeignKeyViolation { constraint } = err else {
            panic!("expected a foreign key violation, got {:?}", err);
        };
        assert_eq!(constraint, "organizations_tenant_id_fkey");
        assert_eq!(store.organizations.count(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_is_restricted_while_children_exist() {
        let store = Store::memory();
        let t = store.tenants.insert(tenant("T")).await.unwrap();
        let o = store.organizations.insert(organization(t.id)).await.unwrap();

        let err = store.tenants.delete(t.id).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
        assert!(store.tenants.exists(t.id).await.unwrap());

        assert!(store.organizations.delete(o.id).await.unwrap());
        assert!(store.tenants.delete(t.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_missing_row_reports_false() {
        let store = Store::memory();
        store.tenants.insert(tenant("T")).await.unwrap();
        assert!(!store.tenants.delete(Uuid::new_v4()).await.unwrap());
        assert_eq!(store.tenants.count(&[]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn filters_and_pages_keep_insertion_order() {
        let store = Store::memory();
        let a = store.tenants.insert(tenant("a")).await.unwrap();
        let b = store.tenants.insert(tenant("b")).await.unwrap();
        for _ in 0..3 {
            store.organizations.insert(organization(a.id)).await.unwrap();
        }
        store.organizations.insert(organization(b.id)).await.unwrap();

        let filter = [Filter::eq("tenant_id", a.id)];
        assert_eq!(store.organizations.count(&filter).await.unwrap(), 3);
        let page = store
            .organizations
            .list(&filter, Page::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert!(page.iter().all(|o| o.tenant_id == a.id));
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = Store::memory();
        let err = store.tenants.update(tenant("ghost")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { table: "tenants", .. }));
    }

    #[tokio::test]
    async fn guarded_update_sees_the_scope_and_can_refuse() {
        let store = Store::memory();
        let t = store.tenants.insert(tenant("T")).await.unwrap();
        let org = store.organizations.insert(organization(t.id)).await.unwrap();
        store.organizations.insert(organization(t.id)).await.unwrap();

        let scope = [Filter::eq("tenant_id", t.id)];
        let mut renamed = org.clone();
        renamed.name = "Acme Water".to_string();

        let refuse = |orgs: &[Organization]| match orgs.len() {
            2 => Err("tenant already has two organizations".to_string()),
            _ => Ok(()),
        };
        let err = store
            .organizations
            .update_guarded(renamed.clone(), &scope, &refuse)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(ref reason) if reason.contains("two")));
        assert_eq!(store.organizations.get(org.id).await.unwrap().name, "Acme");

        let allow = |_: &[Organization]| Ok::<(), String>(());
        let saved = store
            .organizations
            .update_guarded(renamed, &scope, &allow)
            .await
            .unwrap();
        assert_eq!(saved.name, "Acme Water");
    }

    #[tokio::test]
    async fn specification_cascades_with_its_tender() {
        let store = Store::memory();
        let t = store.tenants.insert(tenant("T")).await.unwrap();
        let o = store.organizations.insert(organization(t.id)).await.unwrap();
        let unit = store
            .org_units
            .insert(OrgUnit {
                id: Uuid::new_v4(),
                organization_id: o.id,
                parent_org_unit_id: None,
                name: "Procurement".to_string(),
                description: None,
                additional_attributes: json!({}),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let user = store
            .users
            .insert(crate::domain::User {
                id: Uuid::new_v4(),
                tenant_id: t.id,
                display_name: "Owner".to_string(),
                email: "owner@example.com".to_string(),
                department: None,
                last_login_date: None,
                additional_attributes: json!({}),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let tender = store
            .tenders
            .insert(Tender {
                id: Uuid::new_v4(),
                tenant_id: t.id,
                organization_id: o.id,
                org_unit_id: unit.id,
                title: "Bridge repairs".to_string(),
                tender_status_value_id: Uuid::new_v4(),
                tender_type_value_id: Uuid::new_v4(),
                created_by_user_id: user.id,
                approved_date: None,
                external_tender_id: None,
                external_portal_name: None,
                integration_id: None,
                additional_attributes: json!({}),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let spec = store
            .tender_specifications
            .insert(TenderSpecification {
                id: Uuid::new_v4(),
                tender_id: tender.id,
                details: "Scope".to_string(),
                generated_date: Utc::now(),
                additional_attributes: json!({}),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.tenders.delete(tender.id).await.unwrap());
        assert!(!store.tender_specifications.exists(spec.id).await.unwrap());
        assert!(store.org_units.exists(unit.id).await.unwrap());
    }

    #[tokio::test]
    async fn links_check_both_sides_and_cascade() {
        let store = Store::memory();
        let t = store.tenants.insert(tenant("T")).await.unwrap();
        let role = store
            .roles
            .insert(crate::domain::Role {
                id: Uuid::new_v4(),
                tenant_id: t.id,
                name: "Evaluator".to_string(),
                description: None,
                additional_attributes: json!({}),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let perm = store
            .permissions
            .insert(crate::domain::Permission {
                id: Uuid::new_v4(),
                tenant_id: t.id,
                name: "bids.score".to_string(),
                description: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store
            .role_permissions
            .link(role.id, Uuid::new_v4())
            .await
            .is_err());
        assert!(store.role_permissions.link(role.id, perm.id).await.unwrap());
        assert!(!store.role_permissions.link(role.id, perm.id).await.unwrap());
        assert_eq!(
            store.role_permissions.lefts_of(perm.id).await.unwrap(),
            vec![role.id]
        );

        assert!(store.permissions.delete(perm.id).await.unwrap());
        assert!(store.role_permissions.rights_of(role.id).await.unwrap().is_empty());
    }
}
