//! Deck retrieval from a GitHub repository through the contents API.
//!
//! Deck content is always fetched through the `download_url` returned by the metadata
//! call; the inline base64 `content` field is ignored.

use flasher_core::{parse_deck, Deck, DeckFileRef, ParseError};
use serde::Deserialize;
use thiserror::Error;

use crate::http::{HttpClient, TransportError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Deck retrieval errors.
#[derive(Debug, Error)]
pub enum DeckError {
    /// Network failure or non-success status.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Malformed metadata JSON or deck YAML.
    #[error("parse failed: {0}")]
    Parse(String),
}

impl From<TransportError> for DeckError {
    fn from(e: TransportError) -> Self {
        Self::Fetch(e.to_string())
    }
}

impl From<ParseError> for DeckError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e.to_string())
    }
}

// === API Response Types ===

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    sha: String,
    download_url: Option<String>,
}

impl From<ContentEntry> for DeckFileRef {
    fn from(entry: ContentEntry) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            sha: entry.sha,
            download_url: entry.download_url,
        }
    }
}

/// Reads decks and deck listings from a repository.
pub struct DeckSource<C> {
    client: C,
    api_url: String,
}

impl<C: HttpClient> DeckSource<C> {
    /// Create a source against the public GitHub API.
    pub fn new(client: C) -> Self {
        Self::with_api_url(client, DEFAULT_API_URL)
    }

    /// Create a source against another API root (GitHub Enterprise, test servers).
    pub fn with_api_url(client: C, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Contents API URL for a path in a repository.
    pub fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            owner,
            repo,
            path.trim_matches('/')
        )
    }

    /// Fetch and parse a single deck file.
    pub async fn fetch_deck(&self, owner: &str, repo: &str, path: &str) -> Result<Deck, DeckError> {
        let url = self.contents_url(owner, repo, path);
        tracing::info!("Fetching deck metadata from {}", url);

        let body = self.get_ok(&url).await?;
        let entry: ContentEntry = serde_json::from_str(&body)
            .map_err(|e| DeckError::Parse(format!("invalid file metadata: {}", e)))?;

        let download_url = entry
            .download_url
            .ok_or_else(|| DeckError::Parse(format!("{} has no download url", entry.path)))?;

        let yaml = self.get_ok(&download_url).await?;
        let cards = parse_deck(&yaml)?;

        tracing::info!("Loaded {} cards from {}", cards.len(), entry.path);
        Ok(Deck::new(Deck::name_from_path(&entry.path), cards))
    }

    /// List the deck files in a folder.
    ///
    /// Listing failures are logged and produce an empty list.
    pub async fn list_deck_files(&self, owner: &str, repo: &str, folder: &str) -> Vec<DeckFileRef> {
        self.search_deck_files(owner, repo, folder, None).await
    }

    /// List the deck files in a folder whose name contains `filter`, ignoring case.
    ///
    /// Listing failures are logged and produce an empty list.
    pub async fn search_deck_files(
        &self,
        owner: &str,
        repo: &str,
        folder: &str,
        filter: Option<&str>,
    ) -> Vec<DeckFileRef> {
        let files = match self.list_folder(owner, repo, folder).await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!("Error fetching deck files from {}/{}/{}: {}", owner, repo, folder, e);
                return Vec::new();
            }
        };

        files
            .into_iter()
            .filter(DeckFileRef::is_deck)
            .filter(|file| filter.map_or(true, |needle| file.name_contains(needle)))
            .collect()
    }

    // === Private methods ===

    async fn list_folder(&self, owner: &str, repo: &str, folder: &str) -> Result<Vec<DeckFileRef>, DeckError> {
        let url = self.contents_url(owner, repo, folder);
        let body = self.get_ok(&url).await?;

        let entries: Vec<ContentEntry> = serde_json::from_str(&body)
            .map_err(|e| DeckError::Parse(format!("invalid folder listing: {}", e)))?;

        Ok(entries.into_iter().map(DeckFileRef::from).collect())
    }

    async fn get_ok(&self, url: &str) -> Result<String, DeckError> {
        let resp = self.client.get(url).await?;
        if !resp.is_success() {
            return Err(DeckError::Fetch(format!("{} returned status {}", url, resp.status)));
        }
        Ok(resp.body)
    }
}
