use folio_core::{Entity, TableSchema};

use crate::model::Model;
use crate::tables::SESSIONS;

/// Session rows: no updating actor, no timestamps.
#[derive(Debug, Copy, Clone, Default)]
pub struct Session;

impl Entity for Session {
    fn table(&self) -> &'static TableSchema {
        &SESSIONS
    }

    fn tracks_updated_by(&self) -> bool {
        false
    }

    fn has_timestamps(&self) -> bool {
        false
    }
}

impl Model for Session {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use folio_core::{AuditContext, PrincipalId};
    use folio_infra::InMemoryStore;
    use serde_json::json;

    use crate::context::ModelContext;
    use crate::lifecycle::SaveOptions;
    use crate::repository::Repository;

    #[tokio::test]
    async fn sessions_never_receive_audit_stamps() {
        let ctx = ModelContext::new(Arc::new(InMemoryStore::new()));
        let sessions = Repository::new(ctx, Session);

        let session = sessions
            .add(
                json!({ "sid": "abc", "sess": "{}", "expires": 1_700_000_000_000_i64, "created_by": "x" })
                    .as_object()
                    .cloned()
                    .unwrap(),
                AuditContext::new(PrincipalId::new()),
                SaveOptions::default(),
            )
            .await
            .unwrap();

        assert!(session.uuid().is_some());
        assert!(!session.has("updated_by"));
        assert!(!session.has("created_by"));
        assert!(!session.has("updated_at"));
    }
}
