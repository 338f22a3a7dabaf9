mod file_store;
mod keyring_store;
mod memory_store;

pub use file_store::FileStorage;
pub use keyring_store::KeyringStorage;
pub use memory_store::MemoryStorage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error")]
    Io(#[from] std::io::Error),
    #[error("storage file is not valid json")]
    Json(#[from] serde_json::Error),
    #[error("secret service is unavailable")]
    Keyring(#[from] keyring::Error),
}

/// Durable key/value storage, the browser's `localStorage` equivalent.
pub trait DurableStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
