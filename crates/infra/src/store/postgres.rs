//! Postgres-backed row store.
//!
//! SQL is generated from the [`TableSchema`]: identifiers come from the schema
//! (never from caller input, filter columns are checked first) and every value
//! is bound as a typed parameter chosen by its column type.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | ModelError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (not-null / check violation) | `23502` / `23514` | `Validation` |
//! | Database (other) | Any other | `Storage` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use folio_core::attributes::{Attributes, canonical_date, decode_bool, parse_date};
use folio_core::{Column, ColumnDefault, ColumnType, ModelError, ModelResult, TableSchema};

use super::r#trait::{FetchOptions, Filter, Store};
use crate::config::DatabaseConfig;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Postgres-backed row store.
///
/// ## Thread Safety
///
/// Uses SQLx connection pool which is thread-safe (Arc + Send + Sync).
/// Each write is a single statement, so a row is never partially written.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool for `config`.
    #[instrument(skip_all, fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &DatabaseConfig) -> ModelResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create `table` (with its unique constraints) unless it already exists.
    #[instrument(skip_all, fields(table = table.name), err)]
    pub async fn create_table(&self, table: &TableSchema) -> ModelResult<()> {
        sqlx::query(&create_table_sql(table))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_table", e))?;
        Ok(())
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_sql_type(kind: ColumnType) -> String {
    match kind {
        ColumnType::Increments => "BIGSERIAL PRIMARY KEY".to_string(),
        ColumnType::Integer | ColumnType::Boolean => "BIGINT".to_string(),
        ColumnType::String { max_length } => format!("VARCHAR({max_length})"),
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::DateTime => "TIMESTAMPTZ".to_string(),
        ColumnType::Uuid => "UUID".to_string(),
    }
}

fn default_sql(default: ColumnDefault) -> String {
    match default {
        ColumnDefault::Bool(b) => i64::from(b).to_string(),
        ColumnDefault::Int(i) => i.to_string(),
        ColumnDefault::Str(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// `CREATE TABLE IF NOT EXISTS` statement for `table`.
pub fn create_table_sql(table: &TableSchema) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let mut sql = format!("{} {}", quote(column.name), column_sql_type(column.kind));
            if column.kind != ColumnType::Increments {
                if !column.nullable {
                    sql.push_str(" NOT NULL");
                }
                if column.unique {
                    sql.push_str(" UNIQUE");
                }
                if let Some(default) = column.default {
                    sql.push_str(" DEFAULT ");
                    sql.push_str(&default_sql(default));
                }
            }
            sql
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(table.name),
        columns.join(", ")
    )
}

/// `SELECT` for `filter`, plus the columns/values to bind in order.
fn select_sql<'a>(
    table: &'a TableSchema,
    filter: &'a Filter,
    limit_one: bool,
) -> ModelResult<(String, Vec<(&'a Column, &'a Value)>)> {
    filter.check_columns(table)?;

    let mut sql = format!("SELECT * FROM {}", quote(table.name));
    let mut binds = Vec::new();
    let mut clauses = Vec::new();
    for (field, value) in filter.conditions() {
        let column = table.column(field).ok_or_else(|| unknown_column(table, field))?;
        if value.is_null() {
            clauses.push(format!("{} IS NULL", quote(column.name)));
        } else {
            binds.push((column, value));
            clauses.push(format!("{} = ${}", quote(column.name), binds.len()));
        }
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(&format!(" ORDER BY {}", quote(TableSchema::PRIMARY_KEY)));
    if limit_one {
        sql.push_str(" LIMIT 1");
    }
    Ok((sql, binds))
}

/// Columns of `attrs` that `table` declares, in schema order.
fn writable<'a>(table: &'a TableSchema, attrs: &'a Attributes) -> Vec<(&'a Column, &'a Value)> {
    table
        .columns
        .iter()
        .filter_map(|column| attrs.get(column.name).map(|value| (column, value)))
        .collect()
}

fn insert_sql<'a>(
    table: &'a TableSchema,
    attrs: &'a Attributes,
) -> (String, Vec<(&'a Column, &'a Value)>) {
    let binds: Vec<_> = writable(table, attrs)
        .into_iter()
        .filter(|(column, value)| !(column.kind == ColumnType::Increments && value.is_null()))
        .collect();

    let sql = if binds.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quote(table.name))
    } else {
        let names: Vec<String> = binds.iter().map(|(c, _)| quote(c.name)).collect();
        let params: Vec<String> = (1..=binds.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            quote(table.name),
            names.join(", "),
            params.join(", ")
        )
    };
    (sql, binds)
}

/// `UPDATE` statement; the row id is bound last.
fn update_sql<'a>(
    table: &'a TableSchema,
    attrs: &'a Attributes,
) -> (String, Vec<(&'a Column, &'a Value)>) {
    let binds: Vec<_> = writable(table, attrs)
        .into_iter()
        .filter(|(column, _)| column.name != TableSchema::PRIMARY_KEY)
        .collect();

    let assignments: Vec<String> = binds
        .iter()
        .enumerate()
        .map(|(i, (c, _))| format!("{} = ${}", quote(c.name), i + 1))
        .collect();
    let target = if assignments.is_empty() {
        // Nothing to change: still return the row so callers see its state.
        format!(
            "{} = {}",
            quote(TableSchema::PRIMARY_KEY),
            quote(TableSchema::PRIMARY_KEY)
        )
    } else {
        assignments.join(", ")
    };
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING *",
        quote(table.name),
        target,
        quote(TableSchema::PRIMARY_KEY),
        binds.len() + 1
    );
    (sql, binds)
}

fn unknown_column(table: &TableSchema, field: &str) -> ModelError {
    ModelError::validation(format!("{field} is not a column of {}", table.name))
}

fn type_mismatch(column: &Column, value: &Value) -> ModelError {
    ModelError::validation(format!("cannot store {value} in {}", column.name))
}

/// Bind `value` with the Rust type matching the column's SQL type.
fn bind_value<'q>(query: PgQuery<'q>, column: &Column, value: &Value) -> ModelResult<PgQuery<'q>> {
    let null = value.is_null();
    let query = match column.kind {
        ColumnType::Increments | ColumnType::Integer => {
            let v = if null {
                None
            } else {
                Some(value.as_i64().ok_or_else(|| type_mismatch(column, value))?)
            };
            query.bind(v)
        }
        ColumnType::Boolean => {
            let v = if null {
                None
            } else {
                let b = decode_bool(value).ok_or_else(|| type_mismatch(column, value))?;
                Some(i64::from(b))
            };
            query.bind(v)
        }
        ColumnType::String { .. } | ColumnType::Text => {
            let v = if null {
                None
            } else {
                Some(
                    value
                        .as_str()
                        .ok_or_else(|| type_mismatch(column, value))?
                        .to_string(),
                )
            };
            query.bind(v)
        }
        ColumnType::DateTime => {
            let v: Option<DateTime<Utc>> = if null {
                None
            } else {
                Some(parse_date(value).ok_or_else(|| type_mismatch(column, value))?)
            };
            query.bind(v)
        }
        ColumnType::Uuid => {
            let v = if null {
                None
            } else {
                let s = value.as_str().ok_or_else(|| type_mismatch(column, value))?;
                Some(Uuid::parse_str(s).map_err(|_| type_mismatch(column, value))?)
            };
            query.bind(v)
        }
    };
    Ok(query)
}

fn build_query<'q>(sql: &'q str, binds: &[(&Column, &Value)]) -> ModelResult<PgQuery<'q>> {
    let mut query = sqlx::query(sql);
    for (column, value) in binds {
        query = bind_value(query, column, value)?;
    }
    Ok(query)
}

/// Read a row back into attributes, in the same encodings the pipeline writes.
fn row_to_attributes(table: &TableSchema, row: &PgRow) -> ModelResult<Attributes> {
    let mut attrs = Attributes::new();
    for column in table.columns {
        let name = column.name;
        let decode_err = |e: sqlx::Error| map_sqlx_error("decode_row", e);
        let value = match column.kind {
            ColumnType::Increments | ColumnType::Integer | ColumnType::Boolean => row
                .try_get::<Option<i64>, _>(name)
                .map_err(decode_err)?
                .map(Value::from),
            ColumnType::String { .. } | ColumnType::Text => row
                .try_get::<Option<String>, _>(name)
                .map_err(decode_err)?
                .map(Value::from),
            ColumnType::DateTime => row
                .try_get::<Option<DateTime<Utc>>, _>(name)
                .map_err(decode_err)?
                .map(canonical_date),
            ColumnType::Uuid => row
                .try_get::<Option<Uuid>, _>(name)
                .map_err(decode_err)?
                .map(|u| Value::from(u.to_string())),
        };
        attrs.insert(name.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(attrs)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> ModelError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => ModelError::Duplicate(msg),
                Some("23502") | Some("23514") => ModelError::Validation(msg),
                _ => ModelError::Storage(msg),
            }
        }
        sqlx::Error::RowNotFound => ModelError::NotFound,
        sqlx::Error::PoolClosed => {
            ModelError::storage(format!("connection pool closed in {operation}"))
        }
        _ => ModelError::storage(format!("sqlx error in {operation}: {err}")),
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip_all, fields(table = table.name), err)]
    async fn find_one(
        &self,
        table: &'static TableSchema,
        filter: &Filter,
        options: FetchOptions,
    ) -> ModelResult<Option<Attributes>> {
        let (sql, binds) = select_sql(table, filter, true)?;
        let row = build_query(&sql, &binds)?
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_one", e))?;

        match row {
            Some(row) => Ok(Some(row_to_attributes(table, &row)?)),
            None if options.require => Err(ModelError::NotFound),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(table = table.name), err)]
    async fn find_all(
        &self,
        table: &'static TableSchema,
        filter: &Filter,
    ) -> ModelResult<Vec<Attributes>> {
        let (sql, binds) = select_sql(table, filter, false)?;
        let rows = build_query(&sql, &binds)?
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_all", e))?;

        rows.iter().map(|row| row_to_attributes(table, row)).collect()
    }

    #[instrument(skip_all, fields(table = table.name), err)]
    async fn insert(
        &self,
        table: &'static TableSchema,
        attrs: &Attributes,
    ) -> ModelResult<Attributes> {
        let (sql, binds) = insert_sql(table, attrs);
        let row = build_query(&sql, &binds)?
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        row_to_attributes(table, &row)
    }

    #[instrument(skip_all, fields(table = table.name, id = id), err)]
    async fn update(
        &self,
        table: &'static TableSchema,
        id: i64,
        attrs: &Attributes,
    ) -> ModelResult<Attributes> {
        let (sql, binds) = update_sql(table, attrs);
        let row = build_query(&sql, &binds)?
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?
            .ok_or(ModelError::NotFound)?;

        row_to_attributes(table, &row)
    }

    #[instrument(skip_all, fields(table = table.name, id = id), err)]
    async fn delete(&self, table: &'static TableSchema, id: i64) -> ModelResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote(table.name),
            quote(TableSchema::PRIMARY_KEY)
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(ModelError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static POSTS: TableSchema = TableSchema {
        name: "posts",
        columns: &[
            Column::increments("id"),
            Column::uuid("uuid").unique(),
            Column::string("title", 150),
            Column::string("slug", 150).unique(),
            Column::string("status", 150).default_to(ColumnDefault::Str("draft")),
            Column::boolean("page").default_to(ColumnDefault::Bool(false)),
            Column::date_time("published_at").nullable(),
        ],
    };

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn ddl_carries_types_and_constraints() {
        let sql = create_table_sql(&POSTS);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"posts\" (\
             \"id\" BIGSERIAL PRIMARY KEY, \
             \"uuid\" UUID NOT NULL UNIQUE, \
             \"title\" VARCHAR(150) NOT NULL, \
             \"slug\" VARCHAR(150) NOT NULL UNIQUE, \
             \"status\" VARCHAR(150) NOT NULL DEFAULT 'draft', \
             \"page\" BIGINT NOT NULL DEFAULT 0, \
             \"published_at\" TIMESTAMPTZ)"
        );
    }

    #[test]
    fn select_binds_values_and_inlines_nulls() {
        let filter = Filter::new()
            .eq("slug", "hello")
            .eq("published_at", Value::Null)
            .eq("page", false);
        let (sql, binds) = select_sql(&POSTS, &filter, true).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"posts\" WHERE \"page\" = $1 AND \"published_at\" IS NULL \
             AND \"slug\" = $2 ORDER BY \"id\" LIMIT 1"
        );
        assert_eq!(binds.len(), 2);
        assert_eq!(binds[0].1, &json!(0));
    }

    #[test]
    fn select_rejects_unknown_columns() {
        let filter = Filter::new().eq("title; DROP TABLE posts", "x");
        assert!(matches!(
            select_sql(&POSTS, &filter, false),
            Err(ModelError::Validation(_))
        ));
    }

    #[test]
    fn insert_skips_unassigned_primary_key() {
        let a = attrs(json!({ "id": null, "title": "t", "slug": "t", "ignored": 1 }));
        let (sql, binds) = insert_sql(&POSTS, &a);
        assert_eq!(
            sql,
            "INSERT INTO \"posts\" (\"title\", \"slug\") VALUES ($1, $2) RETURNING *"
        );
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn update_binds_id_last() {
        let a = attrs(json!({ "id": 3, "title": "t", "status": "published" }));
        let (sql, binds) = update_sql(&POSTS, &a);
        assert_eq!(
            sql,
            "UPDATE \"posts\" SET \"title\" = $1, \"status\" = $2 WHERE \"id\" = $3 RETURNING *"
        );
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn mismatched_values_fail_before_reaching_the_database() {
        let column = Column::uuid("uuid");
        let bound = bind_value(sqlx::query("SELECT 1"), &column, &json!("not-a-uuid"));
        assert!(matches!(bound, Err(ModelError::Validation(_))));
    }
}
