//! Client-side state engine for an embeddable comment and reaction widget.
//!
//! A page carries reactions, a paginated list of comments, and one level of
//! replies under each comment. The engine keeps that tree in memory, applies
//! every user action optimistically, and reconciles with the remote store in
//! the background. Each module focuses on a concrete responsibility:
//!
//! - [`reaction`] defines the reaction catalog and the per-viewer toggle
//!   state machine.
//! - [`model`] holds comments, replies and the pagination cursor in their
//!   JSON wire shape.
//! - [`store`] owns one thread and mediates every mutation; [`events`] is the
//!   typed feed it publishes for presentation layers.
//! - [`repository`] is the persistence seam, implemented over HTTP in
//!   [`http`] and in process by [`memory`].
//! - [`preferences`] remembers the commenter's display name.
//! - [`cli`], [`config`], [`client`] and [`render`] make up the
//!   `comment-thread` terminal client.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod memory;
pub mod model;
pub mod preferences;
pub mod reaction;
pub mod render;
pub mod repository;
pub mod session;
pub mod store;

pub use error::{RepositoryError, ThreadError};
pub use events::{Operation, ReactionTarget, ThreadEvent};
pub use model::{CommentNode, CommentPage, ContentItem, Draft, Pagination, ReplyNode};
pub use reaction::{ReactionKind, ReactionSet, Transition, REACTION_CATALOG};
pub use repository::CommentRepository;
pub use session::{Session, Site};
pub use store::{ThreadState, ThreadStore};
