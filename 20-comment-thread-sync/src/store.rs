//! Optimistic comment thread state for one content item.
//!
//! Every mutation is applied to the in-memory tree first, in call order, and
//! only then handed to the repository on a spawned task. The task reports its
//! outcome as a [`ThreadEvent`]; it never edits the tree, so late or
//! reordered responses cannot disturb what the caller already sees.

use std::{future::Future, sync::Arc};

use futures::future::join_all;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    error::{RepositoryError, ThreadError},
    events::{Operation, ReactionTarget, ThreadEvent},
    model::{CommentNode, CommentPage, ContentItem, Draft, Pagination, ReplyNode},
    reaction::{ReactionKind, ReactionSet},
    repository::CommentRepository,
    session::Session,
};

const EVENT_CAPACITY: usize = 256;

/// Read-only view of a thread handed out by [`ThreadStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadState {
    content_id: Option<String>,
    items: Vec<CommentNode>,
    pagination: Option<Pagination>,
    reactions: ReactionSet,
}

impl ThreadState {
    fn for_content(content_id: &str) -> Self {
        Self {
            content_id: Some(content_id.to_string()),
            ..Self::default()
        }
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// Top-level comments in display order.
    pub fn items(&self) -> &[CommentNode] {
        &self.items
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.pagination.is_some_and(|cursor| cursor.has_more)
    }

    /// Reactions on the content item itself.
    pub fn reactions(&self) -> &ReactionSet {
        &self.reactions
    }

    pub fn comment(&self, comment_id: &str) -> Option<&CommentNode> {
        self.items.iter().find(|comment| comment.id == comment_id)
    }

    pub fn reply(&self, reply_id: &str) -> Option<&ReplyNode> {
        self.items.iter().find_map(|comment| comment.reply(reply_id))
    }

    pub fn reactions_of(&self, target: &ReactionTarget) -> Option<&ReactionSet> {
        match target {
            ReactionTarget::Content => Some(&self.reactions),
            ReactionTarget::Comment(id) => self.comment(id).map(|comment| &comment.reactions),
            ReactionTarget::Reply(id) => self.reply(id).map(|reply| &reply.reactions),
        }
    }

    fn comment_mut(&mut self, comment_id: &str) -> Option<&mut CommentNode> {
        self.items.iter_mut().find(|comment| comment.id == comment_id)
    }

    fn reactions_mut(&mut self, target: &ReactionTarget) -> Result<&mut ReactionSet, ThreadError> {
        match target {
            ReactionTarget::Content => Ok(&mut self.reactions),
            ReactionTarget::Comment(id) => self
                .comment_mut(id)
                .map(|comment| &mut comment.reactions)
                .ok_or_else(|| ThreadError::comment_not_found(id)),
            ReactionTarget::Reply(id) => self
                .items
                .iter_mut()
                .flat_map(|comment| comment.replies.iter_mut())
                .find(|reply| reply.id == *id)
                .map(|reply| &mut reply.reactions)
                .ok_or_else(|| ThreadError::reply_not_found(id)),
        }
    }
}

/// Single source of truth for one content item's comment tree.
///
/// Mutating operations take `&mut self`, so a store is driven from one logical
/// thread of control. `submit_*` and `toggle_reaction` spawn their repository
/// request and must be called inside a Tokio runtime.
pub struct ThreadStore {
    repository: Arc<dyn CommentRepository>,
    session: Option<Session>,
    state: ThreadState,
    events: broadcast::Sender<ThreadEvent>,
    in_flight: Vec<JoinHandle<()>>,
}

impl ThreadStore {
    pub fn new(repository: Arc<dyn CommentRepository>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            repository,
            session: None,
            state: ThreadState::default(),
            events,
            in_flight: Vec::new(),
        }
    }

    pub fn with_session(repository: Arc<dyn CommentRepository>, session: Session) -> Self {
        let mut store = Self::new(repository);
        store.set_session(session);
        store
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn state(&self) -> &ThreadState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThreadEvent> {
        self.events.subscribe()
    }

    /// Loads the thread for `content` unless it is already the loaded one.
    pub async fn attach(&mut self, content: &ContentItem) -> Result<&ThreadState, ThreadError> {
        if self.state.content_id() == Some(content.id.as_str()) && self.state.pagination.is_some()
        {
            debug!(content_id = %content.id, "thread already loaded");
            return Ok(&self.state);
        }
        self.reset_for(&content.id);
        self.state.reactions = content.reaction_counts.clone();
        self.load_initial(&content.id).await
    }

    /// Fetches page 1 for `content_id`, replacing the items and cursor.
    pub async fn load_initial(&mut self, content_id: &str) -> Result<&ThreadState, ThreadError> {
        let session = self.session()?.clone();
        if self.state.content_id() != Some(content_id) {
            self.reset_for(content_id);
        }

        let page = self.fetch(&session, content_id, 1).await?;
        info!(
            content_id,
            comments = page.comments.len(),
            total = page.pagination.total,
            "thread loaded"
        );
        self.state.items = page.comments;
        self.state.pagination = Some(page.pagination);
        self.emit(ThreadEvent::ThreadLoaded {
            content_id: content_id.to_string(),
            comments: self.state.items.len(),
            pagination: page.pagination,
        });
        Ok(&self.state)
    }

    /// Appends the next page, or does nothing when there is none.
    pub async fn load_more(&mut self) -> Result<&ThreadState, ThreadError> {
        let (Some(content_id), Some(next)) = (
            self.state.content_id.clone(),
            self.state.pagination.and_then(|cursor| cursor.next_page()),
        ) else {
            return Ok(&self.state);
        };
        let session = self.session()?.clone();

        let page = self.fetch(&session, &content_id, next).await?;
        let appended = page.comments.len();
        debug!(content_id = %content_id, page = next, appended, "page appended");
        self.state.items.extend(page.comments);
        self.state.pagination = Some(page.pagination);
        self.emit(ThreadEvent::PageAppended {
            comments: appended,
            pagination: page.pagination,
        });
        Ok(&self.state)
    }

    /// Shows a new comment at the top of the thread and sends it to the
    /// repository. A failed send leaves the comment in place.
    pub fn submit_comment(&mut self, author: &str, body: &str) -> Result<CommentNode, ThreadError> {
        let draft = Draft::new(author, body)
            .ok_or(ThreadError::InvalidInput("author and body must not be blank"))?;
        let (session, content_id) = self.mutation_context()?;

        let comment = CommentNode::local(&draft);
        self.state.items.insert(0, comment.clone());
        self.emit(ThreadEvent::CommentAdded {
            comment: comment.clone(),
        });

        let repository = Arc::clone(&self.repository);
        let local_id = comment.id.clone();
        self.dispatch(
            Operation::CreateComment {
                local_id: local_id.clone(),
            },
            async move {
                let remote = repository
                    .create_comment(&session, &content_id, &draft)
                    .await?;
                Ok::<_, RepositoryError>(ThreadEvent::CommentPersisted { local_id, remote })
            },
        );
        Ok(comment)
    }

    /// Shows a new reply at the top of `comment_id`'s replies and sends it to
    /// the repository. A failed send leaves the reply in place.
    pub fn submit_reply(
        &mut self,
        comment_id: &str,
        author: &str,
        body: &str,
    ) -> Result<ReplyNode, ThreadError> {
        let draft = Draft::new(author, body)
            .ok_or(ThreadError::InvalidInput("author and body must not be blank"))?;
        let (session, content_id) = self.mutation_context()?;

        let reply = ReplyNode::local(&draft);
        let parent = self
            .state
            .comment_mut(comment_id)
            .ok_or_else(|| ThreadError::comment_not_found(comment_id))?;
        parent.replies.insert(0, reply.clone());
        self.emit(ThreadEvent::ReplyAdded {
            comment_id: comment_id.to_string(),
            reply: reply.clone(),
        });

        let repository = Arc::clone(&self.repository);
        let comment_id = comment_id.to_string();
        let local_id = reply.id.clone();
        self.dispatch(
            Operation::CreateReply {
                comment_id: comment_id.clone(),
                local_id: local_id.clone(),
            },
            async move {
                let remote = repository
                    .create_reply(&session, &content_id, &comment_id, &draft)
                    .await?;
                Ok::<_, RepositoryError>(ThreadEvent::ReplyPersisted {
                    comment_id,
                    local_id,
                    remote,
                })
            },
        );
        Ok(reply)
    }

    /// Applies the viewer's click on `kind` to `target` and reports it to the
    /// repository. The server snapshot is announced but not merged.
    pub fn toggle_reaction(
        &mut self,
        target: &ReactionTarget,
        kind: ReactionKind,
    ) -> Result<ReactionSet, ThreadError> {
        let (session, content_id) = self.mutation_context()?;

        let reactions = self.state.reactions_mut(target)?;
        let transition = reactions.toggle(kind);
        let reactions = reactions.clone();
        debug!(?target, ?transition, "reaction toggled");
        self.emit(ThreadEvent::ReactionChanged {
            target: target.clone(),
            transition,
            selected: reactions.selected(),
            reactions: reactions.clone(),
        });

        let repository = Arc::clone(&self.repository);
        let target = target.clone();
        self.dispatch(
            Operation::SetReaction {
                target: target.clone(),
                kind,
            },
            async move {
                let snapshot = repository
                    .set_reaction(&session, &content_id, target.node_id(), kind)
                    .await?;
                Ok::<_, RepositoryError>(ThreadEvent::ReactionPersisted { target, snapshot })
            },
        );
        Ok(reactions)
    }

    /// Waits for every repository request spawned so far.
    pub async fn settle(&mut self) {
        let pending = std::mem::take(&mut self.in_flight);
        for result in join_all(pending).await {
            if let Err(err) = result {
                warn!(error = %err, "repository task ended abnormally");
            }
        }
    }

    /// Drops the thread. Requests already in flight still report their events.
    pub fn detach(&mut self) {
        if let Some(content_id) = self.state.content_id() {
            debug!(content_id, "thread detached");
        }
        self.state = ThreadState::default();
    }

    fn reset_for(&mut self, content_id: &str) {
        self.state = ThreadState::for_content(content_id);
    }

    fn session(&self) -> Result<&Session, ThreadError> {
        let session = self
            .session
            .as_ref()
            .ok_or(ThreadError::PreconditionFailed("no authenticated session"))?;
        session.ensure_usable()?;
        Ok(session)
    }

    fn mutation_context(&self) -> Result<(Session, String), ThreadError> {
        let session = self.session()?.clone();
        let content_id = self
            .state
            .content_id()
            .ok_or(ThreadError::PreconditionFailed("no content item attached"))?
            .to_string();
        Ok((session, content_id))
    }

    async fn fetch(
        &self,
        session: &Session,
        content_id: &str,
        page: u32,
    ) -> Result<CommentPage, ThreadError> {
        match self.repository.fetch_page(session, content_id, page).await {
            Ok(fetched) => {
                if !fetched.pagination.is_consistent() {
                    warn!(content_id, page, pagination = ?fetched.pagination, "inconsistent pagination cursor");
                }
                Ok(fetched)
            }
            Err(err) => {
                warn!(content_id, page, error = %err, "failed to fetch comment page");
                self.emit(ThreadEvent::RemoteFailed {
                    operation: Operation::FetchPage { page },
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    fn dispatch<F>(&mut self, operation: Operation, request: F)
    where
        F: Future<Output = Result<ThreadEvent, RepositoryError>> + Send + 'static,
    {
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let event = match request.await {
                Ok(event) => event,
                Err(err) => {
                    warn!(?operation, error = %err, "remote write failed; keeping local change");
                    ThreadEvent::RemoteFailed {
                        operation,
                        message: err.to_string(),
                    }
                }
            };
            publish(&events, event);
        });

        self.in_flight.retain(|task| !task.is_finished());
        self.in_flight.push(handle);
    }

    fn emit(&self, event: ThreadEvent) {
        publish(&self.events, event);
    }
}

fn publish(events: &broadcast::Sender<ThreadEvent>, event: ThreadEvent) {
    if events.send(event).is_err() {
        debug!("no thread event subscribers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::InMemoryRepository, session::Site};

    fn session() -> Session {
        Session::new(
            "token",
            Site {
                id: "site-1".into(),
                name: "Example".into(),
                url: "https://example.com".into(),
            },
        )
    }

    async fn loaded_store() -> ThreadStore {
        let repo = Arc::new(InMemoryRepository::new(10));
        let mut store = ThreadStore::with_session(repo, session());
        store.load_initial("blog-1").await.expect("initial load");
        store
    }

    #[tokio::test]
    async fn mutations_need_a_session() {
        let mut store = ThreadStore::new(Arc::new(InMemoryRepository::new(10)));

        let load = store.load_initial("blog-1").await;
        assert!(matches!(load, Err(ThreadError::PreconditionFailed(_))));

        let comment = store.submit_comment("Alice", "hello");
        assert!(matches!(comment, Err(ThreadError::PreconditionFailed(_))));
        assert!(store.state().items().is_empty());
    }

    #[tokio::test]
    async fn mutations_need_an_attached_content_item() {
        let mut store = ThreadStore::with_session(Arc::new(InMemoryRepository::new(10)), session());
        let toggle = store.toggle_reaction(&ReactionTarget::Content, ReactionKind::Like);
        assert!(matches!(toggle, Err(ThreadError::PreconditionFailed(_))));
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_mutation() {
        let mut store = loaded_store().await;
        let result = store.submit_comment("Alice", "   ");
        assert!(matches!(result, Err(ThreadError::InvalidInput(_))));
        assert!(store.state().items().is_empty());
    }

    #[tokio::test]
    async fn unknown_reaction_targets_are_not_found() {
        let mut store = loaded_store().await;
        let comment = store.toggle_reaction(&ReactionTarget::Comment("nope".into()), ReactionKind::Sad);
        let reply = store.toggle_reaction(&ReactionTarget::Reply("nope".into()), ReactionKind::Sad);

        assert!(matches!(comment, Err(ThreadError::NotFound { kind: "comment", .. })));
        assert!(matches!(reply, Err(ThreadError::NotFound { kind: "reply", .. })));
    }

    #[tokio::test]
    async fn detach_discards_the_thread() {
        let mut store = loaded_store().await;
        store.submit_comment("Alice", "hello").expect("submit");
        store.detach();

        assert_eq!(store.state(), &ThreadState::default());
        store.settle().await;
    }
}
