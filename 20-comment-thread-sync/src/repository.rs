use async_trait::async_trait;

use crate::{
    error::RepositoryError,
    model::{CommentNode, CommentPage, Draft, ReplyNode},
    reaction::{ReactionKind, ReactionSet},
    session::Session,
};

/// Remote persistence for comment threads.
///
/// Implementations own the transport. Callers may issue overlapping requests
/// for the same target, so `set_reaction` must be idempotent.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Fetches one 1-based page of top-level comments.
    async fn fetch_page(
        &self,
        session: &Session,
        content_id: &str,
        page: u32,
    ) -> Result<CommentPage, RepositoryError>;

    async fn create_comment(
        &self,
        session: &Session,
        content_id: &str,
        draft: &Draft,
    ) -> Result<CommentNode, RepositoryError>;

    async fn create_reply(
        &self,
        session: &Session,
        content_id: &str,
        comment_id: &str,
        draft: &Draft,
    ) -> Result<ReplyNode, RepositoryError>;

    /// Records the viewer's reaction on the content item (`target_id` of
    /// `None`) or on a comment/reply, returning the server's counts.
    async fn set_reaction(
        &self,
        session: &Session,
        content_id: &str,
        target_id: Option<&str>,
        kind: ReactionKind,
    ) -> Result<ReactionSet, RepositoryError>;
}
