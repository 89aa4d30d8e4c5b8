//! Core types for deck retrieval and study sessions.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// File extension that marks a repository file as a deck.
pub const DECK_EXTENSION: &str = ".deck";

/// A single question/answer pair. Both sides are Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Card {
    pub front: String,
    pub back: String,
}

impl Card {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// Ordered collection of cards loaded from one deck file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(name: impl Into<String>, cards: Vec<Card>) -> Self {
        Self {
            name: name.into(),
            cards,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Derive a deck name from a repository path.
    ///
    /// `decks/rust/ownership.deck` becomes `ownership`.
    pub fn name_from_path(path: &str) -> String {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        file_name
            .strip_suffix(DECK_EXTENSION)
            .unwrap_or(file_name)
            .to_string()
    }

    /// Copy of this deck with its cards in random order (Fisher-Yates).
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut cards = self.cards.clone();
        cards.shuffle(rng);
        Self {
            name: self.name.clone(),
            cards,
        }
    }
}

/// Location of a deck file in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckFileRef {
    pub name: String,
    pub path: String,
    /// Git blob hash reported by the hosting API.
    pub sha: String,
    /// Raw content location. Null for directories.
    pub download_url: Option<String>,
}

impl DeckFileRef {
    /// Whether the file name carries the deck extension.
    pub fn is_deck(&self) -> bool {
        self.name.ends_with(DECK_EXTENSION)
    }

    /// Case-insensitive substring match on the file name.
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// When a deck was last studied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub name: String,
    pub last_session_date: DateTime<Utc>,
}
