//! The `Model` trait: an [`Entity`] plus relations and a pre-save hook.

use async_trait::async_trait;

use folio_core::{Entity, ModelResult, Record, SaveContext, TableSchema};

use crate::context::ModelContext;

/// How a relation's rows are found.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// `foreign_key` on this row points at the target's id.
    BelongsTo { foreign_key: &'static str },
    /// `foreign_key` on the target rows points at this row's id.
    HasMany { foreign_key: &'static str },
    /// Rows of `pivot` pair `local_key` (this row) with `foreign_key` (target).
    BelongsToMany {
        pivot: &'static TableSchema,
        local_key: &'static str,
        foreign_key: &'static str,
    },
}

/// A named relation of a model.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub target: &'static TableSchema,
    pub kind: RelationKind,
}

impl RelationDef {
    pub const fn belongs_to(
        name: &'static str,
        target: &'static TableSchema,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            target,
            kind: RelationKind::BelongsTo { foreign_key },
        }
    }

    pub const fn has_many(
        name: &'static str,
        target: &'static TableSchema,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            target,
            kind: RelationKind::HasMany { foreign_key },
        }
    }

    pub const fn belongs_to_many(
        name: &'static str,
        target: &'static TableSchema,
        pivot: &'static TableSchema,
        local_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            target,
            kind: RelationKind::BelongsToMany {
                pivot,
                local_key,
                foreign_key,
            },
        }
    }
}

/// A persisted entity type.
///
/// Concrete types implement this and are driven by
/// [`crate::lifecycle::save`]; there is no shared mutable model state.
#[async_trait]
pub trait Model: Entity + Send + Sync {
    fn relations(&self) -> &'static [RelationDef] {
        &[]
    }

    fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations().iter().find(|r| r.name == name)
    }

    /// Runs after the proposed attributes are merged and before the in-memory
    /// save stages. Slug resolution happens here.
    async fn before_save(
        &self,
        _ctx: &ModelContext,
        _record: &mut Record,
        _save: &SaveContext,
    ) -> ModelResult<()> {
        Ok(())
    }
}
