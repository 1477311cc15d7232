//! The in-memory stages of the save lifecycle.
//!
//! ```text
//! proposed attributes merged into the record
//!   ↓
//! 1. StampCreation    (insert only) created_by ← principal, if absent
//!   ↓
//! 2. FilterAttributes drop every field the table does not declare
//!   ↓
//! 3. StampAudit       updated_by ← principal; created_at / updated_at ← now
//!   ↓
//! 4. Normalize        `_at` fields → canonical dates, booleans → 0 / 1
//!   ↓
//! 5. Validate         schema check; failure aborts before any write
//!   ↓
//! 6. Persist          (storage collaborator, not in this crate)
//! ```
//!
//! Stages 1-5 only touch the record. On a validation failure the record keeps
//! the filtered, stamped and normalized attributes, not the caller's input.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::attributes::{self, canonical_date};
use crate::audit::AuditContext;
use crate::entity::Entity;
use crate::error::ModelResult;
use crate::record::Record;

/// Whether a save creates a row or updates one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SaveMethod {
    Insert,
    Update,
}

impl SaveMethod {
    pub fn for_record(record: &Record) -> Self {
        if record.is_new() {
            SaveMethod::Insert
        } else {
            SaveMethod::Update
        }
    }
}

/// Named stages of the save lifecycle, in execution order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SaveStage {
    StampCreation,
    FilterAttributes,
    StampAudit,
    Normalize,
    Validate,
    Persist,
}

impl SaveStage {
    /// The stages run before anything reaches storage.
    pub const IN_MEMORY: [SaveStage; 5] = [
        SaveStage::StampCreation,
        SaveStage::FilterAttributes,
        SaveStage::StampAudit,
        SaveStage::Normalize,
        SaveStage::Validate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SaveStage::StampCreation => "stamp_creation",
            SaveStage::FilterAttributes => "filter_attributes",
            SaveStage::StampAudit => "stamp_audit",
            SaveStage::Normalize => "normalize",
            SaveStage::Validate => "validate",
            SaveStage::Persist => "persist",
        }
    }
}

/// Per-save inputs of the pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SaveContext {
    pub method: SaveMethod,
    pub audit: AuditContext,
    pub now: DateTime<Utc>,
    /// `false` while importing: caller-supplied timestamps are kept verbatim.
    pub stamp_timestamps: bool,
}

impl SaveContext {
    pub fn new(method: SaveMethod, audit: AuditContext) -> Self {
        Self {
            method,
            audit,
            now: Utc::now(),
            stamp_timestamps: true,
        }
    }

    pub fn importing(mut self) -> Self {
        self.stamp_timestamps = false;
        self
    }

    pub fn is_importing(&self) -> bool {
        !self.stamp_timestamps
    }

    /// The acting principal as an attribute value (null when anonymous).
    pub fn principal_value(&self) -> Value {
        self.audit
            .principal()
            .map(|p| Value::from(p.to_string()))
            .unwrap_or(Value::Null)
    }
}

/// Stage 1: on insert, record the creating principal unless one is present.
pub fn stamp_creation(record: &mut Record, ctx: &SaveContext) {
    if ctx.method == SaveMethod::Insert && !record.has("created_by") {
        record.set("created_by", ctx.principal_value());
    }
}

/// Stage 2: keep only the fields the table declares.
pub fn filter_attributes(record: &mut Record, entity: &impl Entity) {
    let table = entity.table();
    record.retain(|field| table.permits(field));
}

/// Stage 3: stamp the updating principal and the timestamps.
pub fn stamp_audit(record: &mut Record, entity: &impl Entity, ctx: &SaveContext) {
    let table = entity.table();

    if entity.tracks_updated_by() && table.permits("updated_by") {
        record.set("updated_by", ctx.principal_value());
    }

    if entity.has_timestamps() && ctx.stamp_timestamps {
        let now = canonical_date(ctx.now);
        if ctx.method == SaveMethod::Insert
            && table.permits("created_at")
            && !record.has("created_at")
        {
            record.set("created_at", now.clone());
        }
        if table.permits("updated_at") {
            record.set("updated_at", now);
        }
    }
}

/// Stage 4: canonical dates and integer booleans.
pub fn normalize(record: &mut Record) {
    record.update_attributes(attributes::format);
}

/// Stage 5: schema validation of the assembled attributes.
pub fn validate(record: &Record, entity: &impl Entity) -> ModelResult<()> {
    entity.table().validate(record.attributes())
}

/// Run one in-memory stage. [`SaveStage::Persist`] is a no-op here.
pub fn run_stage(
    stage: SaveStage,
    record: &mut Record,
    entity: &impl Entity,
    ctx: &SaveContext,
) -> ModelResult<()> {
    match stage {
        SaveStage::StampCreation => stamp_creation(record, ctx),
        SaveStage::FilterAttributes => filter_attributes(record, entity),
        SaveStage::StampAudit => stamp_audit(record, entity, ctx),
        SaveStage::Normalize => normalize(record),
        SaveStage::Validate => validate(record, entity)?,
        SaveStage::Persist => {}
    }
    Ok(())
}

/// Run stages 1-5 in order, stopping at the first failure.
pub fn prepare(record: &mut Record, entity: &impl Entity, ctx: &SaveContext) -> ModelResult<()> {
    let table = entity.table().name;
    for stage in SaveStage::IN_MEMORY {
        if let Err(err) = run_stage(stage, record, entity, ctx) {
            tracing::debug!(table, stage = stage.as_str(), error = %err, "save stage failed");
            return Err(err);
        }
        tracing::trace!(table, stage = stage.as_str(), "save stage done");
    }
    Ok(())
}
