//! Comment tree entities and the pagination cursor, in their JSON wire shape.

use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Deserializer, Serialize};

use crate::reaction::ReactionSet;

const LOCAL_COMMENT_PREFIX: &str = "comment-";
const LOCAL_REPLY_PREFIX: &str = "reply-";

/// A reply to a top-level comment. Replies never have children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyNode {
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id: String,
    #[serde(rename = "name")]
    pub author: String,
    pub body: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "reaction_counts", default, deserialize_with = "null_as_default")]
    pub reactions: ReactionSet,
}

/// A top-level comment and its replies, newest reply first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id: String,
    #[serde(rename = "name")]
    pub author: String,
    pub body: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "reaction_counts", default, deserialize_with = "null_as_default")]
    pub reactions: ReactionSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub replies: Vec<ReplyNode>,
}

impl ReplyNode {
    /// Builds a reply that only exists locally until the server stores it.
    pub fn local(draft: &Draft) -> Self {
        Self {
            id: format!("{LOCAL_REPLY_PREFIX}{}", nanoid!()),
            author: draft.author.clone(),
            body: draft.body.clone(),
            created_at: Utc::now(),
            reactions: ReactionSet::new(),
        }
    }
}

impl CommentNode {
    /// Builds a comment that only exists locally until the server stores it.
    pub fn local(draft: &Draft) -> Self {
        Self {
            id: format!("{LOCAL_COMMENT_PREFIX}{}", nanoid!()),
            author: draft.author.clone(),
            body: draft.body.clone(),
            created_at: Utc::now(),
            reactions: ReactionSet::new(),
            replies: Vec::new(),
        }
    }

    pub fn reply(&self, reply_id: &str) -> Option<&ReplyNode> {
        self.replies.iter().find(|reply| reply.id == reply_id)
    }
}

/// True for ids minted by [`CommentNode::local`] or [`ReplyNode::local`].
pub fn is_local_id(id: &str) -> bool {
    [LOCAL_COMMENT_PREFIX, LOCAL_REPLY_PREFIX]
        .iter()
        .any(|prefix| id.strip_prefix(prefix).is_some_and(|rest| !rest.is_empty()))
}

/// Validated author/body pair for a new comment or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub author: String,
    pub body: String,
}

impl Draft {
    /// Returns `None` when either field is blank.
    pub fn new(author: &str, body: &str) -> Option<Self> {
        let author = author.trim();
        if author.is_empty() || body.trim().is_empty() {
            return None;
        }
        Some(Self {
            author: author.to_string(),
            body: body.to_string(),
        })
    }
}

/// Pagination cursor returned with every comment page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn next_page(&self) -> Option<u32> {
        self.has_more.then(|| self.current_page.saturating_add(1))
    }

    /// Checks the cursor invariants: `has_more` agrees with the page numbers
    /// and `total` fits the pages that exist.
    pub fn is_consistent(&self) -> bool {
        if self.current_page == 0 || self.last_page == 0 || self.per_page == 0 {
            return false;
        }
        let per_page = u64::from(self.per_page);
        let upper = u64::from(self.last_page) * per_page;
        let lower = u64::from(self.current_page - 1) * per_page;

        self.has_more == (self.current_page < self.last_page)
            && self.total <= upper
            && (self.total == 0 || self.total >= lower)
    }
}

/// One page of the remote comment listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPage {
    pub comments: Vec<CommentNode>,
    pub pagination: Pagination,
}

/// The post or page a thread hangs off. The backend calls it a blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reaction_counts: ReactionSet,
    #[serde(default)]
    pub total_comments: u64,
}

/// Record ids arrive as JSON strings or integers depending on the backend.
pub(crate) fn id_from_text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match WireId::deserialize(deserializer)? {
        WireId::Text(id) => id,
        WireId::Unsigned(id) => id.to_string(),
        WireId::Signed(id) => id.to_string(),
    })
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
