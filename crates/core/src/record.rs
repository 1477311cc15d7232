//! In-memory entity instances.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::attributes::{self, Attributes, decode_bool, parse_date};
use crate::id::EntityUuid;
use crate::sanitize::strip_xss;
use crate::schema::TableSchema;

/// Relation names starting with this prefix hold junction-table bookkeeping and
/// never appear in projections.
pub const PIVOT_PREFIX: &str = "_pivot_";

/// A loaded relation of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

impl Relation {
    pub fn to_json(&self) -> Value {
        match self {
            Relation::One(Some(record)) => record.to_json(false),
            Relation::One(None) => Value::Null,
            Relation::Many(records) => {
                Value::Array(records.iter().map(|r| r.to_json(false)).collect())
            }
        }
    }
}

/// One entity instance: its attributes plus whatever relations were loaded.
///
/// The `uuid` attribute is fixed once present: [`Record::set`] and
/// [`Record::merge`] leave it untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    attributes: Attributes,
    persisted: Attributes,
    relations: BTreeMap<String, Relation>,
}

impl Record {
    /// Build a new, unsaved record for `table`.
    ///
    /// Schema defaults fill omitted columns and a fresh uuid is assigned unless
    /// the caller supplied one (imports keep their uuids).
    pub fn forge(table: &TableSchema, attrs: Attributes) -> Self {
        let mut attributes = attrs;
        if table.permits("uuid") && !attributes.get("uuid").is_some_and(Value::is_string) {
            attributes.insert("uuid".into(), Value::from(EntityUuid::new().to_string()));
        }
        for column in table.columns {
            if let Some(default) = column.default {
                attributes
                    .entry(column.name)
                    .or_insert_with(|| default.to_value());
            }
        }
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// Record materialized from a stored row.
    pub fn from_row(row: Attributes) -> Self {
        Self {
            persisted: row.clone(),
            attributes: row,
            relations: BTreeMap::new(),
        }
    }

    /// Primary key, once storage has assigned one.
    pub fn id(&self) -> Option<i64> {
        self.get_i64(TableSchema::PRIMARY_KEY)
    }

    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    pub fn uuid(&self) -> Option<EntityUuid> {
        self.get_str("uuid").and_then(|s| s.parse().ok())
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    /// Read a boolean column, decoding the stored `0` / `1`.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(decode_bool)
    }

    pub fn get_date(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(parse_date)
    }

    /// Whether `field` holds a non-null value.
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some_and(|v| !v.is_null())
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        if field == "uuid" && self.attributes.contains_key("uuid") {
            return;
        }
        self.attributes.insert(field, value.into());
    }

    pub fn unset(&mut self, field: &str) -> Option<Value> {
        self.attributes.remove(field)
    }

    /// Overlay caller-proposed attributes.
    pub fn merge(&mut self, attrs: Attributes) {
        for (field, value) in attrs {
            self.set(field, value);
        }
    }

    /// Keep only the attributes for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.attributes.retain(|field, _| keep(field));
    }

    /// Apply `f` to the attribute bag in place.
    pub fn update_attributes(&mut self, f: impl FnOnce(&mut Attributes)) {
        f(&mut self.attributes);
    }

    /// Whether `field` differs from the last persisted state.
    pub fn has_changed(&self, field: &str) -> bool {
        self.attributes.get(field) != self.persisted.get(field)
    }

    /// Adopt the row storage reports after a write.
    pub fn mark_persisted(&mut self, row: Attributes) {
        self.attributes = row;
        self.persisted = self.attributes.clone();
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &Relation)> {
        self.relations.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set_relation(&mut self, name: impl Into<String>, relation: Relation) {
        self.relations.insert(name.into(), relation);
    }

    /// External projection of the record.
    ///
    /// Dates and booleans get the storage fixups. Unless `shallow`, every loaded
    /// relation is included under its name, except pivot bookkeeping.
    pub fn to_json(&self, shallow: bool) -> Value {
        let mut attrs = self.attributes.clone();
        attributes::format(&mut attrs);

        if !shallow {
            for (name, relation) in &self.relations {
                if name.starts_with(PIVOT_PREFIX) {
                    continue;
                }
                attrs.insert(name.clone(), relation.to_json());
            }
        }

        Value::Object(attrs)
    }

    /// Text of `field` with XSS vectors stripped. `None` for missing or
    /// non-text fields.
    pub fn sanitize(&self, field: &str) -> Option<String> {
        self.get_str(field).map(strip_xss)
    }
}
