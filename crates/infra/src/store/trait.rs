use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use folio_core::attributes::{Attributes, decode_bool};
use folio_core::{ModelError, ModelResult, TableSchema};

/// Equality predicate over a table's columns.
///
/// Every condition must hold for a row to match. Booleans are compared in their
/// stored `0` / `1` form, so `eq("page", false)` matches a stored `0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Attributes,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on the primary key.
    pub fn by_id(id: i64) -> Self {
        Self::new().eq(TableSchema::PRIMARY_KEY, id)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = match value.into() {
            Value::Bool(b) => Value::from(i64::from(b)),
            other => other,
        };
        self.conditions.insert(field.into(), value);
        self
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Reject conditions on columns `table` does not declare.
    pub fn check_columns(&self, table: &TableSchema) -> ModelResult<()> {
        match self.conditions.keys().find(|field| !table.permits(field)) {
            Some(field) => Err(ModelError::validation(format!(
                "cannot filter {} on unknown column {field}",
                table.name
            ))),
            None => Ok(()),
        }
    }

    pub fn matches(&self, row: &Attributes) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            let actual = row.get(field).unwrap_or(&Value::Null);
            actual == expected
                || matches!((decode_bool(actual), decode_bool(expected)), (Some(a), Some(b)) if a == b)
        })
    }
}

/// Options of a single-row fetch.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Turn a miss into [`ModelError::NotFound`].
    pub require: bool,
}

impl FetchOptions {
    pub fn required() -> Self {
        Self { require: true }
    }
}

/// Row storage used by the model layer.
///
/// ## Implementation requirements
///
/// - rows are attribute bags keyed by column name, including the integer `id`;
/// - `insert` assigns `id` when the caller did not and returns the stored row;
/// - columns declared `unique` are enforced, violations surface as
///   [`ModelError::Duplicate`];
/// - missing rows on `update` / `delete` surface as [`ModelError::NotFound`];
/// - everything else is an opaque [`ModelError::Storage`].
#[async_trait]
pub trait Store: Send + Sync {
    /// First row (lowest id) matching `filter`.
    async fn find_one(
        &self,
        table: &'static TableSchema,
        filter: &Filter,
        options: FetchOptions,
    ) -> ModelResult<Option<Attributes>>;

    /// Every row matching `filter`, ordered by id.
    async fn find_all(
        &self,
        table: &'static TableSchema,
        filter: &Filter,
    ) -> ModelResult<Vec<Attributes>>;

    async fn insert(&self, table: &'static TableSchema, attrs: &Attributes)
    -> ModelResult<Attributes>;

    async fn update(
        &self,
        table: &'static TableSchema,
        id: i64,
        attrs: &Attributes,
    ) -> ModelResult<Attributes>;

    async fn delete(&self, table: &'static TableSchema, id: i64) -> ModelResult<()>;
}

#[async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn find_one(
        &self,
        table: &'static TableSchema,
        filter: &Filter,
        options: FetchOptions,
    ) -> ModelResult<Option<Attributes>> {
        (**self).find_one(table, filter, options).await
    }

    async fn find_all(
        &self,
        table: &'static TableSchema,
        filter: &Filter,
    ) -> ModelResult<Vec<Attributes>> {
        (**self).find_all(table, filter).await
    }

    async fn insert(
        &self,
        table: &'static TableSchema,
        attrs: &Attributes,
    ) -> ModelResult<Attributes> {
        (**self).insert(table, attrs).await
    }

    async fn update(
        &self,
        table: &'static TableSchema,
        id: i64,
        attrs: &Attributes,
    ) -> ModelResult<Attributes> {
        (**self).update(table, id, attrs).await
    }

    async fn delete(&self, table: &'static TableSchema, id: i64) -> ModelResult<()> {
        (**self).delete(table, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_conditions_match_integer_storage() {
        let row = json!({ "page": 0, "status": "draft" }).as_object().cloned().unwrap();
        assert!(Filter::new().eq("page", false).matches(&row));
        assert!(Filter::new().eq("status", "draft").eq("page", 0).matches(&row));
        assert!(!Filter::new().eq("page", true).matches(&row));
        assert!(!Filter::new().eq("slug", "x").matches(&row));
    }

    #[test]
    fn null_condition_matches_missing_column() {
        let row = Attributes::new();
        assert!(Filter::new().eq("published_at", Value::Null).matches(&row));
    }
}
