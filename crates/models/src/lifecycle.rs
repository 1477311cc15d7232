//! Generic save runner: merge → hook → in-memory stages → persist.

use tracing::instrument;

use folio_core::attributes::Attributes;
use folio_core::pipeline;
use folio_core::{
    AuditContext, Entity, ModelError, ModelResult, Record, SaveContext, SaveMethod, SaveStage,
    TableSchema,
};

use crate::context::ModelContext;
use crate::model::Model;

/// Per-call save switches.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Keep caller-supplied `created_at` / `updated_at` verbatim.
    pub importing: bool,
}

/// Save `record` with `proposed` merged in.
///
/// Whether this inserts or updates is decided by the record alone. The primary
/// key is never taken from `proposed`. On success the record holds the row storage reports. On failure before
/// persistence nothing is written, and the record keeps whatever the stages
/// had produced so far.
#[instrument(skip_all, fields(table = model.table().name), err)]
pub async fn save<M: Model>(
    ctx: &ModelContext,
    model: &M,
    record: &mut Record,
    mut proposed: Attributes,
    audit: AuditContext,
    options: SaveOptions,
) -> ModelResult<()> {
    let method = SaveMethod::for_record(record);
    proposed.remove(TableSchema::PRIMARY_KEY);
    record.merge(proposed);

    let mut save = SaveContext::new(method, audit);
    if options.importing {
        save = save.importing();
    }

    model.before_save(ctx, record, &save).await?;
    pipeline::prepare(record, model, &save)?;

    let table = model.table();
    let row = match method {
        SaveMethod::Insert => ctx.store().insert(table, record.attributes()).await?,
        SaveMethod::Update => {
            let id = record
                .id()
                .ok_or_else(|| ModelError::validation(format!("{}: update without id", table.name)))?;
            ctx.store().update(table, id, record.attributes()).await?
        }
    };
    record.mark_persisted(row);

    tracing::debug!(
        table = table.name,
        stage = SaveStage::Persist.as_str(),
        id = record.id(),
        "record saved"
    );
    Ok(())
}
