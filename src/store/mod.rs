pub mod memory;
pub mod file;

pub use memory::MemoryStore;
pub use file::FileStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// String key-value persistence port.
///
/// Values are opaque strings; callers own the encoding. A missing key is
/// `Ok(None)`, never an error.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
