use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use folio_core::attributes::Attributes;
use folio_core::{ModelError, ModelResult, TableSchema};

use super::r#trait::{FetchOptions, Filter, Store};

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Attributes>,
}

impl Table {
    /// Unique-column check for `candidate`, ignoring the row `except`.
    fn check_unique(
        &self,
        schema: &TableSchema,
        candidate: &Attributes,
        except: Option<i64>,
    ) -> ModelResult<()> {
        for column in schema.unique_columns() {
            let Some(value) = candidate.get(column.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = self
                .rows
                .iter()
                .any(|(id, row)| Some(*id) != except && row.get(column.name) == Some(value));
            if clash {
                return Err(ModelError::duplicate(format!(
                    "{}.{} already holds {value}",
                    schema.name, column.name
                )));
            }
        }
        Ok(())
    }
}

/// In-memory row store.
///
/// Intended for tests/dev. Enforces unique columns the way a database
/// constraint would, so check-then-act races still fail loudly.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in `table`.
    pub fn count(&self, table: &TableSchema) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table.name).map_or(0, |t| t.rows.len()))
            .unwrap_or(0)
    }

    fn poisoned() -> ModelError {
        ModelError::storage("lock poisoned")
    }

    fn select(
        &self,
        table: &TableSchema,
        filter: &Filter,
    ) -> ModelResult<Vec<Attributes>> {
        filter.check_columns(table)?;
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .get(table.name)
            .map(|t| {
                t.rows
                    .values()
                    .filter(|row| filter.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_one(
        &self,
        table: &'static TableSchema,
        filter: &Filter,
        options: FetchOptions,
    ) -> ModelResult<Option<Attributes>> {
        let found = self.select(table, filter)?.into_iter().next();
        if found.is_none() && options.require {
            return Err(ModelError::NotFound);
        }
        Ok(found)
    }

    async fn find_all(
        &self,
        table: &'static TableSchema,
        filter: &Filter,
    ) -> ModelResult<Vec<Attributes>> {
        self.select(table, filter)
    }

    async fn insert(
        &self,
        table: &'static TableSchema,
        attrs: &Attributes,
    ) -> ModelResult<Attributes> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let stored = tables.entry(table.name).or_default();

        let id = match attrs.get(TableSchema::PRIMARY_KEY).and_then(Value::as_i64) {
            Some(id) if stored.rows.contains_key(&id) => {
                return Err(ModelError::duplicate(format!("{}.id already holds {id}", table.name)));
            }
            Some(id) => id,
            None => stored.last_id + 1,
        };
        stored.check_unique(table, attrs, None)?;

        let mut row = attrs.clone();
        row.insert(TableSchema::PRIMARY_KEY.into(), Value::from(id));
        stored.last_id = stored.last_id.max(id);
        stored.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &'static TableSchema,
        id: i64,
        attrs: &Attributes,
    ) -> ModelResult<Attributes> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let stored = tables.get_mut(table.name).ok_or(ModelError::NotFound)?;
        let mut row = stored.rows.get(&id).cloned().ok_or(ModelError::NotFound)?;

        for (field, value) in attrs {
            if field != TableSchema::PRIMARY_KEY {
                row.insert(field.clone(), value.clone());
            }
        }
        stored.check_unique(table, &row, Some(id))?;
        stored.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn delete(&self, table: &'static TableSchema, id: i64) -> ModelResult<()> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables
            .get_mut(table.name)
            .and_then(|t| t.rows.remove(&id))
            .map(|_| ())
            .ok_or(ModelError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::Column;
    use serde_json::json;

    static TAGS: TableSchema = TableSchema {
        name: "tags",
        columns: &[
            Column::increments("id"),
            Column::string("name", 150),
            Column::string("slug", 150).unique(),
        ],
    };

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let a = store.insert(&TAGS, &attrs(json!({ "name": "a", "slug": "a" }))).await.unwrap();
        let b = store.insert(&TAGS, &attrs(json!({ "name": "b", "slug": "b" }))).await.unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
        assert_eq!(store.count(&TAGS), 2);
    }

    #[tokio::test]
    async fn unique_columns_are_enforced() {
        let store = InMemoryStore::new();
        store.insert(&TAGS, &attrs(json!({ "name": "a", "slug": "same" }))).await.unwrap();
        let err = store
            .insert(&TAGS, &attrs(json!({ "name": "b", "slug": "same" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Duplicate(_)));
        assert_eq!(store.count(&TAGS), 1);
    }

    #[tokio::test]
    async fn update_may_keep_its_own_unique_value() {
        let store = InMemoryStore::new();
        let row = store.insert(&TAGS, &attrs(json!({ "name": "a", "slug": "a" }))).await.unwrap();
        let id = row["id"].as_i64().unwrap();
        let updated = store
            .update(&TAGS, id, &attrs(json!({ "name": "renamed", "slug": "a" })))
            .await
            .unwrap();
        assert_eq!(updated["name"], json!("renamed"));
    }

    #[tokio::test]
    async fn required_fetch_reports_not_found() {
        let store = InMemoryStore::new();
        let filter = Filter::new().eq("slug", "missing");
        assert_eq!(store.find_one(&TAGS, &filter, FetchOptions::default()).await.unwrap(), None);
        let err = store.find_one(&TAGS, &filter, FetchOptions::required()).await.unwrap_err();
        assert_eq!(err, ModelError::NotFound);
    }

    #[tokio::test]
    async fn unknown_filter_columns_are_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .find_all(&TAGS, &Filter::new().eq("colour", "red"))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_removes_rows() {
        let store = InMemoryStore::new();
        let row = store.insert(&TAGS, &attrs(json!({ "name": "a", "slug": "a" }))).await.unwrap();
        let id = row["id"].as_i64().unwrap();
        store.delete(&TAGS, id).await.unwrap();
        assert_eq!(store.delete(&TAGS, id).await.unwrap_err(), ModelError::NotFound);
        assert!(store.find_all(&TAGS, &Filter::new()).await.unwrap().is_empty());
    }
}
