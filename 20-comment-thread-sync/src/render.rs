//! Plain-text rendering of a thread for the terminal.

use chrono::{DateTime, Utc};

use crate::{model::ContentItem, reaction::ReactionSet, store::ThreadState};

const EMPTY_THREAD: &str = "No comments yet. Be the first to comment!";

pub fn render_thread(content: &ContentItem, state: &ThreadState) -> String {
    let title = if content.name.is_empty() {
        content.id.as_str()
    } else {
        content.name.as_str()
    };
    let mut lines = vec![
        format!("# {title}"),
        format!("reactions: {}", render_reactions(state.reactions())),
    ];

    if state.items().is_empty() {
        lines.push(EMPTY_THREAD.to_string());
    }
    for comment in state.items() {
        lines.push(String::new());
        lines.push(format!(
            "[{}] {} · {}",
            comment.id,
            comment.author,
            render_time(&comment.created_at)
        ));
        lines.push(format!("    {}", comment.body));
        lines.push(format!("    {}", render_reactions(&comment.reactions)));
        for reply in &comment.replies {
            lines.push(format!(
                "    ↳ [{}] {} · {}",
                reply.id,
                reply.author,
                render_time(&reply.created_at)
            ));
            lines.push(format!("        {}", reply.body));
            lines.push(format!("        {}", render_reactions(&reply.reactions)));
        }
    }

    if let Some(cursor) = state.pagination().filter(|cursor| cursor.has_more) {
        lines.push(String::new());
        lines.push(format!(
            "-- more comments: page {} of {} ({} total)",
            cursor.current_page, cursor.last_page, cursor.total
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Non-zero counts in catalog order; the viewer's pick is starred.
pub fn render_reactions(reactions: &ReactionSet) -> String {
    let parts: Vec<String> = reactions
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| {
            let marker = if reactions.is_selected(kind) { "*" } else { "" };
            format!("{} {count}{marker}", kind.emoji())
        })
        .collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join("  ")
    }
}

fn render_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}
