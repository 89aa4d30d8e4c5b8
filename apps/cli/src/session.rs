//! Per-deck "last studied" bookkeeping.
//!
//! All records live in one JSON array under [`SESSIONS_KEY`]. Every operation reads the
//! whole collection and, when it changes anything, writes the whole collection back.
//! There is no locking: concurrent writers race and the last write wins.

use chrono::{DateTime, Utc};
use flasher_core::{RelativeLabel, SessionRecord};
use thiserror::Error;

use crate::store::{KeyValueStore, StoreError};

/// Storage key holding the session collection.
pub const SESSIONS_KEY: &str = "decks_last_session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("corrupt session data: {0}")]
    Corrupt(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, SessionError>;

/// Records and reads study sessions through an injected store.
pub struct SessionTracker<S> {
    store: S,
}

impl<S: KeyValueStore> SessionTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All stored records, in insertion order.
    pub fn sessions(&self) -> Result<Vec<SessionRecord>> {
        match self.store.get_item(SESSIONS_KEY)? {
            // `null` is treated like a missing key.
            Some(raw) => Ok(serde_json::from_str::<Option<Vec<SessionRecord>>>(&raw)?
                .unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    /// Mark `deck_name` as studied now.
    pub fn record_session(&self, deck_name: &str) -> Result<SessionRecord> {
        self.record_session_at(deck_name, Utc::now())
    }

    /// Mark `deck_name` as studied at `now`.
    pub fn record_session_at(&self, deck_name: &str, now: DateTime<Utc>) -> Result<SessionRecord> {
        let mut records = self.sessions()?;

        let record = match records.iter_mut().find(|r| r.name == deck_name) {
            Some(existing) => {
                existing.last_session_date = now;
                existing.clone()
            }
            None => {
                let created = SessionRecord {
                    name: deck_name.to_string(),
                    last_session_date: now,
                };
                records.push(created.clone());
                created
            }
        };

        self.store
            .set_item(SESSIONS_KEY, &serde_json::to_string(&records)?)?;
        tracing::debug!("Recorded study session for {}", deck_name);

        Ok(record)
    }

    /// When `deck_name` was last studied, if ever.
    pub fn last_session(&self, deck_name: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .sessions()?
            .into_iter()
            .find(|r| r.name == deck_name)
            .map(|r| r.last_session_date))
    }

    /// Time since `deck_name` was last studied. `None` when it never was.
    pub fn relative_label(&self, deck_name: &str) -> Result<Option<RelativeLabel>> {
        self.relative_label_at(deck_name, Utc::now())
    }

    /// Time between the last session of `deck_name` and `now`.
    pub fn relative_label_at(
        &self,
        deck_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RelativeLabel>> {
        Ok(self
            .last_session(deck_name)?
            .map(|then| RelativeLabel::between(then, now)))
    }
}
