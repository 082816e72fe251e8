use thiserror::Error;

/// Failures reported by a [`CommentRepository`](crate::repository::CommentRepository).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("url error: {0}")]
    Url(String),
}

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("precondition failed: {0}")]
    PreconditionFailed(&'static str),
    #[error("remote comment store unavailable: {0}")]
    RemoteUnavailable(#[from] RepositoryError),
    #[error("{kind} '{id}' is not in the loaded thread")]
    NotFound { kind: &'static str, id: String },
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl ThreadError {
    pub(crate) fn comment_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "comment",
            id: id.to_string(),
        }
    }

    pub(crate) fn reply_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "reply",
            id: id.to_string(),
        }
    }
}
