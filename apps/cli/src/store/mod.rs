//! Persistent key-value storage for client-side state.

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

type Result<T> = std::result::Result<T, StoreError>;

/// String key-value store with local-storage semantics.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}
