//! Typed notifications emitted by [`ThreadStore`](crate::store::ThreadStore).
//!
//! Presentation layers subscribe to these instead of wiring callbacks into
//! the store. Optimistic changes are announced synchronously; the outcome of
//! the matching repository request follows as a separate event.

use serde::{Deserialize, Serialize};

use crate::{
    model::{CommentNode, Pagination, ReplyNode},
    reaction::{ReactionKind, ReactionSet, Transition},
};

/// Owner of a [`ReactionSet`] within one thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReactionTarget {
    /// The post itself.
    Content,
    Comment(String),
    Reply(String),
}

impl ReactionTarget {
    /// Id sent to the repository; the content item has none.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::Content => None,
            Self::Comment(id) | Self::Reply(id) => Some(id),
        }
    }
}

/// Repository call that a [`ThreadEvent::RemoteFailed`] refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    FetchPage { page: u32 },
    CreateComment { local_id: String },
    CreateReply { comment_id: String, local_id: String },
    SetReaction { target: ReactionTarget, kind: ReactionKind },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadEvent {
    ThreadLoaded {
        content_id: String,
        comments: usize,
        pagination: Pagination,
    },
    PageAppended {
        comments: usize,
        pagination: Pagination,
    },
    CommentAdded {
        comment: CommentNode,
    },
    ReplyAdded {
        comment_id: String,
        reply: ReplyNode,
    },
    ReactionChanged {
        target: ReactionTarget,
        transition: Transition,
        selected: Option<ReactionKind>,
        reactions: ReactionSet,
    },
    /// The server stored a comment. The thread keeps `local_id`.
    CommentPersisted {
        local_id: String,
        remote: CommentNode,
    },
    /// The server stored a reply. The thread keeps `local_id`.
    ReplyPersisted {
        comment_id: String,
        local_id: String,
        remote: ReplyNode,
    },
    ReactionPersisted {
        target: ReactionTarget,
        snapshot: ReactionSet,
    },
    RemoteFailed {
        operation: Operation,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = ThreadEvent::RemoteFailed {
            operation: Operation::SetReaction {
                target: ReactionTarget::Reply("r-1".into()),
                kind: ReactionKind::Laugh,
            },
            message: "timeout".into(),
        };

        let encoded = serde_json::to_value(&event).expect("encode event");
        assert_eq!(
            encoded,
            serde_json::json!({
                "type": "remote_failed",
                "operation": {
                    "operation": "set_reaction",
                    "target": {"kind": "reply", "id": "r-1"},
                    "kind": "laugh"
                },
                "message": "timeout"
            })
        );
    }

    #[test]
    fn content_target_has_no_node_id() {
        assert_eq!(ReactionTarget::Content.node_id(), None);
        assert_eq!(ReactionTarget::Comment("9".into()).node_id(), Some("9"));
    }
}
