//! YAML parser for deck files.
//!
//! # Format
//! ```yaml
//! - front: |
//!     What is Rust?
//!   back: |
//!     A systems programming language.
//! - front: Explain borrowing
//!   back: |
//!     Borrowing allows references without ownership.
//!     Multiple lines are supported.
//! ```
//!
//! The document must be a sequence of mappings with exactly the keys `front` and
//! `back`. Anything else is rejected rather than loaded with missing sides.

use crate::error::{ParseError, Result};
use crate::types::Card;

/// Parse deck YAML into cards, preserving document order.
pub fn parse_deck(content: &str) -> Result<Vec<Card>> {
    if content.trim().is_empty() {
        return Ok(vec![]);
    }

    // A document holding only comments or `---` is null.
    let cards: Option<Vec<Card>> = serde_yaml::from_str(content)?;
    Ok(cards.unwrap_or_default())
}

/// Serialize cards back into deck YAML.
pub fn serialize_deck(cards: &[Card]) -> Result<String> {
    serde_yaml::to_string(cards).map_err(|e| ParseError::Serialize(e.to_string()))
}
