//! `folio-models`: the model layer on top of a [`folio_infra::Store`].
//!
//! Entity types implement [`Model`] and are saved through one generic runner,
//! [`lifecycle::save`], which composes the pre-save hook, the in-memory stages
//! from `folio-core` and the write. The [`ModelContext`] carrying the store is
//! passed explicitly; nothing here is global.

pub mod context;
pub mod lifecycle;
pub mod model;
pub mod post;
pub mod repository;
pub mod session;
pub mod slug;
pub mod tables;
pub mod tag;

pub use context::{ModelContext, ModelSettings};
pub use lifecycle::{SaveOptions, save};
pub use model::{Model, RelationDef, RelationKind};
pub use post::Post;
pub use repository::{ReadOptions, Repository};
pub use session::Session;
pub use slug::generate_slug;
pub use tag::Tag;
