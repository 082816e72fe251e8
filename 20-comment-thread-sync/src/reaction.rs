//! Reaction catalog and the per-viewer toggle state machine.
//!
//! Every post, comment and reply carries a [`ReactionSet`]: one counter per
//! [`ReactionKind`] plus the kind the current viewer picked, if any. The
//! viewer selection never leaves this process; on the wire a set is just a
//! `{kind: count}` object.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Emoji-style sentiments a viewer can attach to a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Like,
    Love,
    Laugh,
    Surprised,
    Sad,
}

const KIND_COUNT: usize = 5;

/// Display order of the reaction buttons. Every [`ReactionSet`] is laid out
/// against this single catalog.
pub const REACTION_CATALOG: [ReactionKind; KIND_COUNT] = [
    ReactionKind::Like,
    ReactionKind::Love,
    ReactionKind::Laugh,
    ReactionKind::Surprised,
    ReactionKind::Sad,
];

impl ReactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Love => "love",
            Self::Laugh => "laugh",
            Self::Surprised => "surprised",
            Self::Sad => "sad",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Like => "👍",
            Self::Love => "❤️",
            Self::Laugh => "😂",
            Self::Surprised => "😮",
            Self::Sad => "😢",
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Like => 0,
            Self::Love => 1,
            Self::Laugh => 2,
            Self::Surprised => 3,
            Self::Sad => 4,
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown reaction '{0}'")]
pub struct UnknownReaction(pub String);

impl FromStr for ReactionKind {
    type Err = UnknownReaction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        REACTION_CATALOG
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownReaction(value.to_string()))
    }
}

/// What a single toggle did to a [`ReactionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum Transition {
    /// `Unselected -> SelectedAs(kind)`
    Selected { kind: ReactionKind },
    /// `SelectedAs(kind) -> Unselected`
    Deselected { kind: ReactionKind },
    /// `SelectedAs(from) -> SelectedAs(to)`
    Switched { from: ReactionKind, to: ReactionKind },
}

/// Per-kind counters plus the viewer's own selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")]
pub struct ReactionSet {
    counts: [u32; KIND_COUNT],
    selected: Option<ReactionKind>,
}

impl ReactionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (ReactionKind, u32)>,
    {
        let mut set = Self::default();
        for (kind, count) in counts {
            set.counts[kind.slot()] = count;
        }
        set
    }

    pub fn count(&self, kind: ReactionKind) -> u32 {
        self.counts[kind.slot()]
    }

    pub fn selected(&self) -> Option<ReactionKind> {
        self.selected
    }

    pub fn is_selected(&self, kind: ReactionKind) -> bool {
        self.selected == Some(kind)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|count| u64::from(*count)).sum()
    }

    /// Counts in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (ReactionKind, u32)> + '_ {
        REACTION_CATALOG
            .into_iter()
            .map(move |kind| (kind, self.count(kind)))
    }

    /// Applies the viewer's click on `kind`.
    pub fn toggle(&mut self, kind: ReactionKind) -> Transition {
        match self.selected {
            Some(current) if current == kind => {
                self.decrement(kind);
                self.selected = None;
                Transition::Deselected { kind }
            }
            Some(current) => {
                self.decrement(current);
                self.increment(kind);
                self.selected = Some(kind);
                Transition::Switched {
                    from: current,
                    to: kind,
                }
            }
            None => {
                self.increment(kind);
                self.selected = Some(kind);
                Transition::Selected { kind }
            }
        }
    }

    fn increment(&mut self, kind: ReactionKind) {
        let slot = &mut self.counts[kind.slot()];
        *slot = slot.saturating_add(1);
    }

    fn decrement(&mut self, kind: ReactionKind) {
        let slot = &mut self.counts[kind.slot()];
        *slot = slot.saturating_sub(1);
    }
}

impl From<BTreeMap<String, u32>> for ReactionSet {
    fn from(raw: BTreeMap<String, u32>) -> Self {
        // Blog records carry kinds outside the catalog (dislike, wow, ...).
        Self::with_counts(
            raw.into_iter()
                .filter_map(|(key, count)| key.parse().ok().map(|kind| (kind, count))),
        )
    }
}

impl From<ReactionSet> for BTreeMap<String, u32> {
    fn from(set: ReactionSet) -> Self {
        set.iter()
            .map(|(kind, count)| (kind.as_str().to_string(), count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_walks_the_state_machine() {
        let mut set = ReactionSet::new();

        assert_eq!(
            set.toggle(ReactionKind::Love),
            Transition::Selected {
                kind: ReactionKind::Love
            }
        );
        assert_eq!(set.count(ReactionKind::Love), 1);
        assert_eq!(set.selected(), Some(ReactionKind::Love));

        assert_eq!(
            set.toggle(ReactionKind::Like),
            Transition::Switched {
                from: ReactionKind::Love,
                to: ReactionKind::Like
            }
        );
        assert_eq!(set.count(ReactionKind::Love), 0);
        assert_eq!(set.count(ReactionKind::Like), 1);
        assert_eq!(set.selected(), Some(ReactionKind::Like));

        assert_eq!(
            set.toggle(ReactionKind::Like),
            Transition::Deselected {
                kind: ReactionKind::Like
            }
        );
        assert_eq!(set.count(ReactionKind::Like), 0);
        assert_eq!(set.selected(), None);
        assert_eq!(set.total(), 0);
    }

    #[test]
    fn toggles_build_on_existing_counts() {
        let mut set = ReactionSet::with_counts([(ReactionKind::Sad, 4), (ReactionKind::Laugh, 2)]);

        set.toggle(ReactionKind::Sad);
        set.toggle(ReactionKind::Laugh);

        assert_eq!(set.count(ReactionKind::Sad), 4);
        assert_eq!(set.count(ReactionKind::Laugh), 3);
        assert_eq!(set.total(), 7);
    }

    #[test]
    fn long_toggle_sequence_keeps_one_selection_and_no_underflow() {
        let mut set = ReactionSet::new();
        let clicks = [0usize, 0, 3, 1, 1, 4, 2, 2, 2, 0, 3, 3, 4, 1];

        for (step, slot) in clicks.into_iter().enumerate() {
            let before = set.total();
            set.toggle(REACTION_CATALOG[slot]);
            let after = set.total();

            let selected = REACTION_CATALOG
                .into_iter()
                .filter(|kind| set.is_selected(*kind))
                .count();
            assert!(selected <= 1, "step {step}: {selected} kinds selected");
            assert_eq!(after, u64::from(set.selected().is_some()), "step {step}");
            assert!(before.abs_diff(after) <= 1, "step {step}");
        }
    }

    #[test]
    fn wire_form_ignores_unknown_kinds_and_selection() {
        let set: ReactionSet =
            serde_json::from_str(r#"{"like": 3, "wow": 9, "sad": 1}"#).expect("decode counts");
        assert_eq!(set.count(ReactionKind::Like), 3);
        assert_eq!(set.count(ReactionKind::Sad), 1);
        assert_eq!(set.total(), 4);

        let mut selected = set.clone();
        selected.toggle(ReactionKind::Love);
        let encoded = serde_json::to_value(&selected).expect("encode counts");
        assert_eq!(
            encoded,
            serde_json::json!({"like": 3, "love": 1, "laugh": 0, "surprised": 0, "sad": 1})
        );
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!("Surprised".parse::<ReactionKind>(), Ok(ReactionKind::Surprised));
        assert_eq!(
            "angry".parse::<ReactionKind>(),
            Err(UnknownReaction("angry".into()))
        );
    }
}
