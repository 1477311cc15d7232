//! Audit context: who is acting in the current operation.

use serde::{Deserialize, Serialize};

use crate::id::PrincipalId;

/// Acting principal for one operation.
///
/// Supplied by the caller, consumed by the audit stages of the save pipeline and
/// never persisted itself. `None` means the operation runs without a known actor
/// (bootstrap, imports); the audit columns are then written as null.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    principal: Option<PrincipalId>,
}

impl AuditContext {
    pub fn new(principal: PrincipalId) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    /// Context with no acting principal.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn principal(&self) -> Option<PrincipalId> {
        self.principal
    }
}
