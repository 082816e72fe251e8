use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::{io::AsyncWriteExt, sync::broadcast};
use tracing::{info, warn};

use crate::{
    cli::{Cli, Command, CommentArgs, ReactArgs, ReplyArgs, ShowArgs},
    config::WidgetConfig,
    events::{Operation, ReactionTarget, ThreadEvent},
    model::ContentItem,
    preferences::{DisplayNameWriter, PreferenceFile},
    render::render_thread,
    store::ThreadStore,
};

pub async fn run(cli: Cli) -> Result<()> {
    let config = WidgetConfig::from_args(&cli.connection)?;
    let preferences = PreferenceFile::new(config.preferences_path.clone());

    match cli.command {
        Command::Name(args) => {
            remember_name(&config, &preferences, &args.value).await;
            write_stdout(&format!("*** display name set to {}", args.value.trim())).await?;
            Ok(())
        }
        Command::Show(args) => show(&config, args).await,
        Command::Comment(args) => comment(&config, &preferences, args).await,
        Command::Reply(args) => reply(&config, &preferences, args).await,
        Command::React(args) => react(&config, args).await,
    }
}

/// A thread attached to one page, plus the event feed of its store.
struct Widget {
    content: ContentItem,
    store: ThreadStore,
    events: broadcast::Receiver<ThreadEvent>,
}

impl Widget {
    async fn open(config: &WidgetConfig, url: &str) -> Result<Self> {
        let repository = Arc::new(config.repository()?);
        let session = repository
            .authenticate()
            .await
            .context("failed to authenticate with the comment service")?;
        let content = repository
            .verify_content(&session, url)
            .await
            .with_context(|| format!("failed to verify {url}"))?;
        info!(content_id = %content.id, "content verified");

        let mut store = ThreadStore::with_session(repository, session);
        let events = store.subscribe();
        store.attach(&content).await?;
        Ok(Self {
            content,
            store,
            events,
        })
    }

    /// Waits for outstanding writes, reports the ones that failed and prints
    /// the thread as the viewer sees it.
    async fn finish(mut self) -> Result<()> {
        self.store.settle().await;
        while let Ok(event) = self.events.try_recv() {
            if let ThreadEvent::RemoteFailed { operation, message } = event {
                write_stderr(&format!(
                    "!!! {} was not saved: {message}",
                    describe(&operation)
                ))
                .await?;
            }
        }
        write_stdout(&render_thread(&self.content, self.store.state())).await
    }
}

async fn show(config: &WidgetConfig, args: ShowArgs) -> Result<()> {
    let mut widget = Widget::open(config, &args.thread.url).await?;
    for _ in 1..args.pages.max(1) {
        if !widget.store.state().has_more() {
            break;
        }
        widget.store.load_more().await?;
    }
    widget.finish().await
}

async fn comment(config: &WidgetConfig, preferences: &PreferenceFile, args: CommentArgs) -> Result<()> {
    let author = resolve_author(config, preferences, args.name).await?;
    let mut widget = Widget::open(config, &args.thread.url).await?;
    widget.store.submit_comment(&author, &args.body)?;
    widget.finish().await
}

async fn reply(config: &WidgetConfig, preferences: &PreferenceFile, args: ReplyArgs) -> Result<()> {
    let author = resolve_author(config, preferences, args.name).await?;
    let mut widget = Widget::open(config, &args.thread.url).await?;
    widget
        .store
        .submit_reply(&args.comment, &author, &args.body)?;
    widget.finish().await
}

async fn react(config: &WidgetConfig, args: ReactArgs) -> Result<()> {
    let target = match (args.comment, args.reply) {
        (Some(comment), _) => ReactionTarget::Comment(comment),
        (None, Some(reply)) => ReactionTarget::Reply(reply),
        (None, None) => ReactionTarget::Content,
    };
    let mut widget = Widget::open(config, &args.thread.url).await?;
    widget.store.toggle_reaction(&target, args.kind)?;
    widget.finish().await
}

/// An explicit name wins and is remembered; otherwise the stored one is used.
async fn resolve_author(
    config: &WidgetConfig,
    preferences: &PreferenceFile,
    explicit: Option<String>,
) -> Result<String> {
    if let Some(name) = explicit.filter(|name| !name.trim().is_empty()) {
        remember_name(config, preferences, &name).await;
        return Ok(name);
    }
    match preferences.display_name().await {
        Ok(Some(name)) if !name.trim().is_empty() => Ok(name),
        Ok(_) => bail!("no display name stored; pass --name"),
        Err(err) => {
            warn!(error = ?err, "could not read stored display name");
            bail!("no display name available; pass --name")
        }
    }
}

async fn remember_name(config: &WidgetConfig, preferences: &PreferenceFile, name: &str) {
    let writer = DisplayNameWriter::spawn(preferences.clone(), config.name_debounce);
    writer.update(name.trim());
    writer.flush().await;
}

fn describe(operation: &Operation) -> String {
    match operation {
        Operation::FetchPage { page } => format!("loading page {page}"),
        Operation::CreateComment { local_id } => format!("comment {local_id}"),
        Operation::CreateReply {
            comment_id,
            local_id,
        } => format!("reply {local_id} to comment {comment_id}"),
        Operation::SetReaction { target, kind } => match target.node_id() {
            Some(id) => format!("{kind} reaction on {id}"),
            None => format!("{kind} reaction on the page"),
        },
    }
}

async fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}

async fn write_stderr(line: &str) -> Result<()> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(line.as_bytes()).await?;
    stderr.write_all(b"\n").await?;
    stderr.flush().await?;
    Ok(())
}
