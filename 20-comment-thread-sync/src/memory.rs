//! Process-local [`CommentRepository`] that behaves like the backend.
//!
//! Threads are kept newest-first and sliced into pages of a fixed size.
//! Reactions model a single viewer: setting a kind selects it, setting the
//! same kind again changes nothing.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::RepositoryError,
    model::{CommentNode, CommentPage, Draft, Pagination, ReplyNode},
    reaction::{ReactionKind, ReactionSet},
    repository::CommentRepository,
    session::Session,
};

#[derive(Default)]
struct StoredThread {
    comments: Vec<CommentNode>,
    reactions: ReactionSet,
}

impl StoredThread {
    fn reactions_mut(&mut self, target_id: Option<&str>) -> Option<&mut ReactionSet> {
        let Some(target_id) = target_id else {
            return Some(&mut self.reactions);
        };
        for comment in &mut self.comments {
            if comment.id == target_id {
                return Some(&mut comment.reactions);
            }
            if let Some(reply) = comment.replies.iter_mut().find(|reply| reply.id == target_id) {
                return Some(&mut reply.reactions);
            }
        }
        None
    }
}

pub struct InMemoryRepository {
    per_page: u32,
    next_id: AtomicU64,
    offline: AtomicBool,
    threads: Mutex<HashMap<String, StoredThread>>,
}

impl InMemoryRepository {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
            next_id: AtomicU64::new(1),
            offline: AtomicBool::new(false),
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// While offline every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Replaces the stored thread for `content_id`. `comments` are newest-first.
    pub async fn seed(&self, content_id: &str, comments: Vec<CommentNode>) {
        let mut threads = self.threads.lock().await;
        threads.entry(content_id.to_string()).or_default().comments = comments;
    }

    /// Snapshot of what the "server" currently holds.
    pub async fn comments(&self, content_id: &str) -> Vec<CommentNode> {
        let threads = self.threads.lock().await;
        threads
            .get(content_id)
            .map(|thread| thread.comments.clone())
            .unwrap_or_default()
    }

    pub async fn content_reactions(&self, content_id: &str) -> ReactionSet {
        let threads = self.threads.lock().await;
        threads
            .get(content_id)
            .map(|thread| thread.reactions.clone())
            .unwrap_or_default()
    }

    fn check_reachable(&self, session: &Session) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(RepositoryError::Transport("repository offline".into()));
        }
        if session.token.is_empty() {
            return Err(RepositoryError::Http {
                status: 401,
                body: "missing bearer token".into(),
            });
        }
        Ok(())
    }

    fn mint_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

fn not_found(what: &str, id: &str) -> RepositoryError {
    RepositoryError::Http {
        status: 404,
        body: format!("{what} {id} not found"),
    }
}

#[async_trait]
impl CommentRepository for InMemoryRepository {
    async fn fetch_page(
        &self,
        session: &Session,
        content_id: &str,
        page: u32,
    ) -> Result<CommentPage, RepositoryError> {
        self.check_reachable(session)?;
        let page = page.max(1);
        let threads = self.threads.lock().await;
        let comments = threads
            .get(content_id)
            .map(|thread| thread.comments.as_slice())
            .unwrap_or_default();

        let total = comments.len() as u64;
        let per_page = u64::from(self.per_page);
        let last_page = u32::try_from(total.div_ceil(per_page).max(1)).unwrap_or(u32::MAX);
        let start = usize::try_from(u64::from(page - 1) * per_page).unwrap_or(usize::MAX);
        let slice: Vec<CommentNode> = comments
            .iter()
            .skip(start)
            .take(self.per_page as usize)
            .cloned()
            .collect();

        debug!(content_id, page, returned = slice.len(), "served comment page");
        Ok(CommentPage {
            comments: slice,
            pagination: Pagination {
                current_page: page,
                last_page,
                per_page: self.per_page,
                total,
                has_more: page < last_page,
            },
        })
    }

    async fn create_comment(
        &self,
        session: &Session,
        content_id: &str,
        draft: &Draft,
    ) -> Result<CommentNode, RepositoryError> {
        self.check_reachable(session)?;
        let comment = CommentNode {
            id: self.mint_id(),
            author: draft.author.clone(),
            body: draft.body.clone(),
            created_at: Utc::now(),
            reactions: ReactionSet::new(),
            replies: Vec::new(),
        };
        let mut threads = self.threads.lock().await;
        threads
            .entry(content_id.to_string())
            .or_default()
            .comments
            .insert(0, comment.clone());
        Ok(comment)
    }

    async fn create_reply(
        &self,
        session: &Session,
        content_id: &str,
        comment_id: &str,
        draft: &Draft,
    ) -> Result<ReplyNode, RepositoryError> {
        self.check_reachable(session)?;
        let mut threads = self.threads.lock().await;
        let parent = threads
            .get_mut(content_id)
            .and_then(|thread| thread.comments.iter_mut().find(|c| c.id == comment_id))
            .ok_or_else(|| not_found("comment", comment_id))?;

        let reply = ReplyNode {
            id: self.mint_id(),
            author: draft.author.clone(),
            body: draft.body.clone(),
            created_at: Utc::now(),
            reactions: ReactionSet::new(),
        };
        parent.replies.insert(0, reply.clone());
        Ok(reply)
    }

    async fn set_reaction(
        &self,
        session: &Session,
        content_id: &str,
        target_id: Option<&str>,
        kind: ReactionKind,
    ) -> Result<ReactionSet, RepositoryError> {
        self.check_reachable(session)?;
        let mut threads = self.threads.lock().await;
        let thread = threads.entry(content_id.to_string()).or_default();
        let reactions = thread
            .reactions_mut(target_id)
            .ok_or_else(|| not_found("target", target_id.unwrap_or_default()))?;

        if !reactions.is_selected(kind) {
            reactions.toggle(kind);
        }
        Ok(reactions.clone())
    }
}
