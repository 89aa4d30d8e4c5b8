//! Core deck library shared by the command-line client and its tests.
//!
//! Provides:
//! - YAML deck parser and serializer
//! - Markdown rendering with syntax highlighting and math markup
//! - Relative "last studied" labels
//! - Shared types (Card, Deck, DeckFileRef, SessionRecord)

pub mod error;
pub mod parser;
pub mod recency;
pub mod render;
pub mod types;

pub use error::{ParseError, Result};
pub use parser::{parse_deck, serialize_deck};
pub use recency::RelativeLabel;
pub use render::{highlight_code, render_card, render_markdown, RenderedCard};
pub use types::{Card, Deck, DeckFileRef, SessionRecord, DECK_EXTENSION};
