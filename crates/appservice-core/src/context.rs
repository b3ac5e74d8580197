//! Caller context passed through every operation.

use serde::{Deserialize, Serialize};

/// Identity and credentials of the caller.
///
/// Opaque to the core: it is recorded as the task owner and handed to the
/// catalog and executor, which make their own authorization decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Authenticated user, if known.
    pub user_id: Option<String>,

    /// Raw credential, passed through untouched.
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl CallerContext {
    /// Context with no identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for a named user.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            token: None,
        }
    }

    /// Builder method to attach a credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}
