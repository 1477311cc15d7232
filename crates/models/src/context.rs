//! Explicit storage-access context handed to every repository and service.

use std::fmt;
use std::sync::Arc;

use folio_infra::Store;

/// Tunables of the model layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// Upper bound on slug candidates tried before giving up with
    /// [`folio_core::ModelError::Duplicate`].
    pub slug_max_attempts: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            slug_max_attempts: 1_000,
        }
    }
}

/// Store plus settings. Cheap to clone.
#[derive(Clone)]
pub struct ModelContext {
    store: Arc<dyn Store>,
    settings: ModelSettings,
}

impl ModelContext {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            settings: ModelSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }
}

impl fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
