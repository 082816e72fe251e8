use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::reaction::ReactionKind;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Base URL of the comment API.
    #[arg(long, env = "COMMENT_WIDGET_API", default_value = DEFAULT_API_URL, global = true)]
    pub api: String,

    /// Client key issued for this site.
    #[arg(long, env = "COMMENT_WIDGET_CLIENT_KEY", global = true)]
    pub client_key: Option<String>,

    /// File holding the remembered display name.
    #[arg(long, env = "COMMENT_WIDGET_PREFERENCES", global = true)]
    pub preferences: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the comment thread for a page.
    Show(ShowArgs),
    /// Post a top-level comment.
    Comment(CommentArgs),
    /// Reply to an existing comment.
    Reply(ReplyArgs),
    /// Toggle a reaction on the page, a comment or a reply.
    React(ReactArgs),
    /// Remember the display name used for new comments.
    Name(NameArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ThreadArgs {
    /// URL of the page the thread belongs to.
    #[arg(long)]
    pub url: String,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub thread: ThreadArgs,

    /// Number of comment pages to load.
    #[arg(long, default_value_t = 1)]
    pub pages: u32,
}

#[derive(Args, Debug, Clone)]
pub struct CommentArgs {
    #[command(flatten)]
    pub thread: ThreadArgs,

    /// Display name; defaults to the remembered one.
    #[arg(long)]
    pub name: Option<String>,

    pub body: String,
}

#[derive(Args, Debug, Clone)]
pub struct ReplyArgs {
    #[command(flatten)]
    pub thread: ThreadArgs,

    /// Id of the comment being answered.
    #[arg(long)]
    pub comment: String,

    /// Display name; defaults to the remembered one.
    #[arg(long)]
    pub name: Option<String>,

    pub body: String,
}

#[derive(Args, Debug, Clone)]
pub struct ReactArgs {
    #[command(flatten)]
    pub thread: ThreadArgs,

    /// React to this comment instead of the page.
    #[arg(long, conflicts_with = "reply")]
    pub comment: Option<String>,

    /// React to this reply instead of the page.
    #[arg(long)]
    pub reply: Option<String>,

    /// One of like, love, laugh, surprised, sad.
    pub kind: ReactionKind,
}

#[derive(Args, Debug, Clone)]
pub struct NameArgs {
    pub value: String,
}
