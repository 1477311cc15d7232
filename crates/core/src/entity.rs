//! Entity trait: what the save pipeline needs to know about an entity type.

use crate::schema::TableSchema;

/// Entity type description.
///
/// Implemented by every concrete entity type and consumed by the generic save
/// pipeline. Kept free of IO so it can be driven from pure code and tests.
pub trait Entity {
    /// Declared table schema (permitted fields and constraints).
    fn table(&self) -> &'static TableSchema;

    /// Whether saves stamp `updated_by`. Session-like entities opt out.
    fn tracks_updated_by(&self) -> bool {
        true
    }

    /// Whether saves stamp `created_at` / `updated_at`.
    fn has_timestamps(&self) -> bool {
        true
    }
}

impl<E: Entity + ?Sized> Entity for &E {
    fn table(&self) -> &'static TableSchema {
        (**self).table()
    }

    fn tracks_updated_by(&self) -> bool {
        (**self).tracks_updated_by()
    }

    fn has_timestamps(&self) -> bool {
        (**self).has_timestamps()
    }
}
