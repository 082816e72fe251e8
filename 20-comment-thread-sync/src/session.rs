//! Credentials produced by the site verification handshake.

use serde::{Deserialize, Serialize};

use crate::error::ThreadError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(deserialize_with = "crate::model::id_from_text_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Bearer token plus the site it was issued for. Held in memory only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub site: Site,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<present>")
            .field("site", &self.site)
            .finish()
    }
}

impl Session {
    pub fn new(token: impl Into<String>, site: Site) -> Self {
        Self {
            token: token.into(),
            site,
        }
    }

    pub fn ensure_usable(&self) -> Result<(), ThreadError> {
        if self.token.trim().is_empty() {
            return Err(ThreadError::PreconditionFailed("session token is empty"));
        }
        if self.site.id.trim().is_empty() {
            return Err(ThreadError::PreconditionFailed("session has no site id"));
        }
        Ok(())
    }
}
