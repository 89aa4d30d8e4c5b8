//! Deck generation through hosted LLM APIs.
//!
//! Providers receive [`DECK_INSTRUCTIONS`] as the system instruction plus a user message
//! (topic, source text, links) and are expected to answer with a fenced YAML block in
//! the deck format. [`extract_deck`] pulls that block out and validates it.

pub mod azure;
pub mod gemini;

use async_trait::async_trait;
use flasher_core::{parse_deck, Card, ParseError};
use thiserror::Error;

pub use azure::AzureOpenAiGenerator;
pub use gemini::{GeminiFile, GeminiGenerator};

/// System instruction describing the deck format to the model.
pub const DECK_INSTRUCTIONS: &str = r#"You are an assistant that writes flashcards as YAML. A deck is a YAML document containing a sequence of mappings with exactly two keys: "front" and "back". "front" holds the question and "back" holds the answer. Both values may use GitHub flavored Markdown when it helps to format the content. Use literal block scalars ("|") for every front and back value, never folded scalars (">").
Include code snippets in fenced code blocks with a language identifier whenever possible so they can be syntax highlighted. Write math in LaTeX, enclosed in single dollar signs for inline math and double dollar signs for display math.
The cards are shown by a study application that first displays the front, lets the user think about the answer, and then reveals the back.
Cover all of the material you are given, creating as many cards as needed. Keep each card granular: one concept or construct per card.
Answer with a single ```yaml fenced code block containing the deck and nothing else."#;

/// Generation errors.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("upload did not return an upload url")]
    MissingUploadUrl,

    #[error("file {name} failed to process (state {state})")]
    FileProcessing { name: String, state: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A hosted model that turns a user message into deck text.
#[async_trait]
pub trait DeckGenerator: Send + Sync {
    /// Provider identifier.
    fn name(&self) -> &'static str;

    /// Send `message` with the deck instructions and return the raw model text.
    async fn generate(&self, message: &str) -> Result<String, GenerateError>;
}

/// Return the body of the first ```yaml (or ```yml) fence, or the whole text when the
/// model did not fence its answer.
pub fn extract_yaml_block(text: &str) -> &str {
    let opening = ["```yaml", "```yml"]
        .into_iter()
        .filter_map(|fence| text.find(fence).map(|start| (start, fence)))
        .min_by_key(|(start, _)| *start);

    let Some((start, fence)) = opening else {
        return text;
    };
    let after_fence = &text[start + fence.len()..];
    let body = match after_fence.find('\n') {
        Some(newline) => &after_fence[newline + 1..],
        None => return "",
    };
    // Fences nested inside the YAML are indented; the closing one starts a line.
    let end = if body.starts_with("```") {
        Some(0)
    } else {
        body.find("\n```").map(|newline| newline + 1)
    };
    match end {
        Some(end) => &body[..end],
        None => body,
    }
}

/// Extract and validate the deck in a model answer.
pub fn extract_deck(text: &str) -> Result<Vec<Card>, ParseError> {
    parse_deck(extract_yaml_block(text))
}

/// Turn a non-success response into a provider error.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GenerateError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(GenerateError::Provider { status, message })
}
