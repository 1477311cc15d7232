//! Verb wrappers over a model: browse / read / add / edit / destroy.
//!
//! These delegate to the [`Store`](folio_infra::Store) and the generic save
//! runner. Relations are loaded here, never by the store, and only when asked
//! for by name.

use serde_json::Value;
use tracing::instrument;

use folio_core::attributes::Attributes;
use folio_core::{AuditContext, Entity, ModelError, ModelResult, Record, Relation, TableSchema};
use folio_core::record::PIVOT_PREFIX;
use folio_infra::{FetchOptions, Filter};

use crate::context::ModelContext;
use crate::lifecycle::{self, SaveOptions};
use crate::model::{Model, RelationDef, RelationKind};

/// Read switches shared by the fetch verbs and the slug resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Turn a miss into [`ModelError::NotFound`].
    pub require: bool,
    /// Relations to load, by name.
    pub with_related: Vec<&'static str>,
    /// Extra `status` condition, for tables that have one.
    pub status: Option<String>,
}

impl ReadOptions {
    pub fn required() -> Self {
        Self {
            require: true,
            ..Self::default()
        }
    }

    pub fn with_related(mut self, names: &[&'static str]) -> Self {
        self.with_related.extend_from_slice(names);
        self
    }

    fn scope(&self, table: &TableSchema, filter: Filter) -> Filter {
        match &self.status {
            Some(status) if table.permits("status") => filter.eq("status", status.as_str()),
            _ => filter,
        }
    }
}

/// Verb wrappers over one model type.
#[derive(Debug, Clone)]
pub struct Repository<M> {
    ctx: ModelContext,
    model: M,
}

impl<M: Model> Repository<M> {
    pub fn new(ctx: ModelContext, model: M) -> Self {
        Self { ctx, model }
    }

    pub fn context(&self) -> &ModelContext {
        &self.ctx
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn table(&self) -> &'static TableSchema {
        self.model.table()
    }

    /// New, unsaved record with defaults and a fresh uuid.
    pub fn forge(&self, attrs: Attributes) -> Record {
        Record::forge(self.table(), attrs)
    }

    /// Every matching record, with the requested relations loaded.
    #[instrument(skip_all, fields(table = self.table().name), err)]
    pub async fn browse(&self, filter: Filter, options: &ReadOptions) -> ModelResult<Vec<Record>> {
        let filter = options.scope(self.table(), filter);
        let rows = self.ctx.store().find_all(self.table(), &filter).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = Record::from_row(row);
            self.load_relations(&mut record, &options.with_related).await?;
            records.push(record);
        }
        Ok(records)
    }

    /// First matching record.
    #[instrument(skip_all, fields(table = self.table().name), err)]
    pub async fn read(&self, filter: Filter, options: &ReadOptions) -> ModelResult<Option<Record>> {
        let filter = options.scope(self.table(), filter);
        let fetch = FetchOptions {
            require: options.require,
        };
        let Some(row) = self.ctx.store().find_one(self.table(), &filter, fetch).await? else {
            return Ok(None);
        };

        let mut record = Record::from_row(row);
        self.load_relations(&mut record, &options.with_related).await?;
        Ok(Some(record))
    }

    /// Required lookup by primary key.
    pub async fn find_by_id(&self, id: i64) -> ModelResult<Record> {
        self.read(Filter::by_id(id), &ReadOptions::required())
            .await?
            .ok_or(ModelError::NotFound)
    }

    /// Create a record from `attrs`.
    #[instrument(skip_all, fields(table = self.table().name), err)]
    pub async fn add(
        &self,
        attrs: Attributes,
        audit: AuditContext,
        options: SaveOptions,
    ) -> ModelResult<Record> {
        // Imports keep their uuids.
        let mut seed = Attributes::new();
        if let Some(uuid) = attrs.get("uuid").filter(|v| v.is_string()) {
            seed.insert("uuid".into(), uuid.clone());
        }
        let mut record = self.forge(seed);
        lifecycle::save(&self.ctx, &self.model, &mut record, attrs, audit, options).await?;
        Ok(record)
    }

    /// Update the row `id` with `attrs`.
    #[instrument(skip_all, fields(table = self.table().name, id = id), err)]
    pub async fn edit(&self, id: i64, attrs: Attributes, audit: AuditContext) -> ModelResult<Record> {
        let mut record = self.find_by_id(id).await?;
        lifecycle::save(&self.ctx, &self.model, &mut record, attrs, audit, SaveOptions::default())
            .await?;
        Ok(record)
    }

    /// Delete the row `id` and its many-to-many junction rows.
    #[instrument(skip_all, fields(table = self.table().name, id = id), err)]
    pub async fn destroy(&self, id: i64) -> ModelResult<()> {
        let store = self.ctx.store();
        for relation in self.model.relations() {
            if let RelationKind::BelongsToMany { pivot, local_key, .. } = relation.kind {
                let links = store.find_all(pivot, &Filter::new().eq(local_key, id)).await?;
                for link in links {
                    if let Some(link_id) = link.get(TableSchema::PRIMARY_KEY).and_then(Value::as_i64) {
                        store.delete(pivot, link_id).await?;
                    }
                }
            }
        }
        store.delete(self.table(), id).await
    }

    /// Link `record` to `target` through the many-to-many relation `name`.
    ///
    /// The junction row gets its column defaults and is validated like any
    /// other row.
    pub async fn attach(&self, record: &Record, name: &str, target: &Record) -> ModelResult<()> {
        let relation = self.relation_def(name)?;
        let RelationKind::BelongsToMany {
            pivot,
            local_key,
            foreign_key,
        } = relation.kind
        else {
            return Err(ModelError::validation(format!(
                "{}.{name} is not a many-to-many relation",
                self.table().name
            )));
        };
        let (Some(local), Some(foreign)) = (record.id(), target.id()) else {
            return Err(ModelError::validation("cannot attach unsaved records"));
        };

        let mut link = Attributes::new();
        link.insert(local_key.into(), Value::from(local));
        link.insert(foreign_key.into(), Value::from(foreign));
        let link = Record::forge(pivot, link);
        pivot.validate(link.attributes())?;
        self.ctx.store().insert(pivot, link.attributes()).await?;
        Ok(())
    }

    fn relation_def(&self, name: &str) -> ModelResult<&'static RelationDef> {
        self.model.relation(name).ok_or_else(|| {
            ModelError::validation(format!("{} has no relation {name}", self.table().name))
        })
    }

    /// Load the named relations onto `record`.
    pub async fn load_relations(&self, record: &mut Record, names: &[&'static str]) -> ModelResult<()> {
        for name in names {
            let relation = self.relation_def(name)?;
            let loaded = self.load_relation(record, relation).await?;
            record.set_relation(relation.name, loaded);
        }
        Ok(())
    }

    async fn load_relation(&self, record: &Record, relation: &RelationDef) -> ModelResult<Relation> {
        let store = self.ctx.store();
        let target = relation.target;

        match relation.kind {
            RelationKind::BelongsTo { foreign_key } => {
                let Some(target_id) = record.get_i64(foreign_key) else {
                    return Ok(Relation::One(None));
                };
                let row = store
                    .find_one(target, &Filter::by_id(target_id), FetchOptions::default())
                    .await?;
                Ok(Relation::One(row.map(|r| Box::new(Record::from_row(r)))))
            }
            RelationKind::HasMany { foreign_key } => {
                let Some(id) = record.id() else {
                    return Ok(Relation::Many(Vec::new()));
                };
                let rows = store.find_all(target, &Filter::new().eq(foreign_key, id)).await?;
                Ok(Relation::Many(rows.into_iter().map(Record::from_row).collect()))
            }
            RelationKind::BelongsToMany {
                pivot,
                local_key,
                foreign_key,
            } => {
                let Some(id) = record.id() else {
                    return Ok(Relation::Many(Vec::new()));
                };
                let mut links = store.find_all(pivot, &Filter::new().eq(local_key, id)).await?;
                links.sort_by_key(|link| link.get("sort_order").and_then(Value::as_i64).unwrap_or(0));

                let mut related = Vec::with_capacity(links.len());
                for link in links {
                    let Some(target_id) = link.get(foreign_key).and_then(Value::as_i64) else {
                        continue;
                    };
                    let Some(row) = store
                        .find_one(target, &Filter::by_id(target_id), FetchOptions::default())
                        .await?
                    else {
                        continue;
                    };
                    let mut target_record = Record::from_row(row);
                    target_record.set_relation(
                        format!("{PIVOT_PREFIX}{}", pivot.name),
                        Relation::One(Some(Box::new(Record::from_row(link)))),
                    );
                    related.push(target_record);
                }
                Ok(Relation::Many(related))
            }
        }
    }
}
