//! Declarative table schemas: permitted fields, column types and constraints.
//!
//! A [`TableSchema`] is the single source for three things:
//! - which attributes survive the filtering stage of a save,
//! - what the validation stage accepts,
//! - which columns the storage layer must keep unique.

use serde_json::Value;

use crate::attributes::{Attributes, decode_bool, parse_date};
use crate::error::{ModelError, ModelResult};

/// Storage type of a column.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-incrementing integer primary key, assigned by storage.
    Increments,
    Integer,
    /// Bounded string (character count).
    String { max_length: usize },
    /// Unbounded text.
    Text,
    /// Boolean, stored as `0` / `1`.
    Boolean,
    DateTime,
    Uuid,
}

/// Value a column takes when a new record omits it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColumnDefault {
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl ColumnDefault {
    pub fn to_value(self) -> Value {
        match self {
            ColumnDefault::Bool(b) => Value::Bool(b),
            ColumnDefault::Int(i) => Value::from(i),
            ColumnDefault::Str(s) => Value::from(s),
        }
    }
}

/// One column of a table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub default: Option<ColumnDefault>,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    pub const fn increments(name: &'static str) -> Self {
        Self::new(name, ColumnType::Increments)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub const fn string(name: &'static str, max_length: usize) -> Self {
        Self::new(name, ColumnType::String { max_length })
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub const fn date_time(name: &'static str) -> Self {
        Self::new(name, ColumnType::DateTime)
    }

    pub const fn uuid(name: &'static str) -> Self {
        Self::new(name, ColumnType::Uuid)
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn default_to(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// A column the caller must supply (no default, not nullable, not storage-assigned).
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none() && self.kind != ColumnType::Increments
    }

    /// Check a single value against this column. `Ok(())` for acceptable values.
    fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.nullable || self.kind == ColumnType::Increments {
                Ok(())
            } else {
                Err(format!("{} must not be null", self.name))
            };
        }

        match self.kind {
            ColumnType::Increments | ColumnType::Integer => value
                .as_i64()
                .map(|_| ())
                .ok_or_else(|| format!("{} must be an integer", self.name)),
            ColumnType::Boolean => decode_bool(value)
                .map(|_| ())
                .ok_or_else(|| format!("{} must be a boolean", self.name)),
            ColumnType::String { max_length } => match value.as_str() {
                Some(s) if s.chars().count() <= max_length => Ok(()),
                Some(_) => Err(format!(
                    "{} exceeds maximum length of {max_length}",
                    self.name
                )),
                None => Err(format!("{} must be a string", self.name)),
            },
            ColumnType::Text => value
                .as_str()
                .map(|_| ())
                .ok_or_else(|| format!("{} must be a string", self.name)),
            ColumnType::DateTime => parse_date(value)
                .map(|_| ())
                .ok_or_else(|| format!("{} must be a valid date", self.name)),
            ColumnType::Uuid => value
                .as_str()
                .and_then(|s| uuid::Uuid::parse_str(s).ok())
                .map(|_| ())
                .ok_or_else(|| format!("{} must be a uuid", self.name)),
        }
    }
}

/// Declared schema of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    /// Name of the primary key column every table carries.
    pub const PRIMARY_KEY: &'static str = "id";

    pub const fn new(name: &'static str, columns: &'static [Column]) -> Self {
        Self { name, columns }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether `field` belongs to this table.
    pub fn permits(&self, field: &str) -> bool {
        self.column(field).is_some()
    }

    pub fn permitted_attributes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    pub fn unique_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter().filter(|c| c.unique)
    }

    /// Singular form of the table name (`posts` → `post`).
    pub fn singular_name(&self) -> &'static str {
        self.name.strip_suffix('s').unwrap_or(self.name)
    }

    /// Validate a fully assembled attribute set.
    ///
    /// Reports every violation at once, joined with `; `.
    pub fn validate(&self, attrs: &Attributes) -> ModelResult<()> {
        let mut problems = Vec::new();

        for (field, value) in attrs {
            match self.column(field) {
                Some(column) => {
                    if let Err(msg) = column.check(value) {
                        problems.push(msg);
                    }
                }
                None => problems.push(format!("{field} is not a column of {}", self.name)),
            }
        }

        for column in self.columns.iter().filter(|c| c.is_required()) {
            if !attrs.contains_key(column.name) {
                problems.push(format!("{} is required", column.name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ModelError::validation(format!(
                "{}: {}",
                self.name,
                problems.join("; ")
            )))
        }
    }
}
