//! Per-request caller context carried alongside every envelope.

use serde::{Deserialize, Serialize};

use crate::RequestId;

/// Identity and correlation data for one logical request.
///
/// The context is handed to the transport with every envelope and is
/// serialised next to the arguments; it never influences schema selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Correlation identifier, fresh per logical request.
    pub request_id: RequestId,
    /// Authenticated user, if any.
    pub user_id: Option<String>,
    /// Project (tenant) the request is scoped to, if any.
    pub project_id: Option<String>,
    /// Whether the caller holds administrative rights.
    pub is_admin: bool,
}

impl RequestContext {
    /// Creates an anonymous, non-admin context with a fresh request id.
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new_random(),
            user_id: None,
            project_id: None,
            is_admin: false,
        }
    }

    /// Creates an administrative context, as used by internal services
    /// (e.g. periodic capability reports).
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            ..Self::new()
        }
    }

    /// Scopes the context to a user and project.
    pub fn with_user(mut self, user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.project_id = Some(project_id.into());
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
