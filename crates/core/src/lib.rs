//! `folio-core`: model layer building blocks.
//!
//! This crate contains the **pure** parts of the persistence layer: schemas,
//! records, the in-memory save stages, slug normalization and sanitization.
//! No IO happens here.

pub mod attributes;
pub mod audit;
pub mod entity;
pub mod error;
pub mod id;
pub mod pipeline;
pub mod record;
pub mod sanitize;
pub mod schema;
pub mod slug;

pub use attributes::Attributes;
pub use audit::AuditContext;
pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use id::{EntityUuid, PrincipalId};
pub use pipeline::{SaveContext, SaveMethod, SaveStage};
pub use record::{Record, Relation};
pub use schema::{Column, ColumnDefault, ColumnType, TableSchema};
