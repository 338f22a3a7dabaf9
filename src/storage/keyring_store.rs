use super::{DurableStorage, StorageError};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub const DEFAULT_KEYRING_SERVICE: &str = "local.microblog.client";

/// Keeps each key as a credential in the OS keychain / secret service.
pub struct KeyringStorage {
    service: String,
    entries: Mutex<HashMap<String, keyring::Entry>>,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        let service = if service.trim().is_empty() {
            DEFAULT_KEYRING_SERVICE.to_string()
        } else {
            service
        };
        Self {
            service,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `op` against the cached entry for `key`, creating it on first use.
    fn with_entry<T>(
        &self,
        key: &str,
        op: impl FnOnce(&keyring::Entry) -> Result<T, keyring::Error>,
    ) -> Result<T, keyring::Error> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(key) {
            let entry = keyring::Entry::new(&self.service, key)?;
            entries.insert(key.to_string(), entry);
        }
        match entries.get(key) {
            Some(entry) => op(entry),
            None => Err(keyring::Error::NoEntry),
        }
    }

    pub fn is_available(&self) -> bool {
        let Ok(entry) = keyring::Entry::new(&self.service, "probe") else {
            return false;
        };

        match entry.get_password() {
            Ok(_) => true,
            Err(keyring::Error::NoEntry) => true,
            Err(keyring::Error::BadEncoding(_)) => true,
            Err(keyring::Error::Ambiguous(_)) => true,
            Err(_) => false,
        }
    }
}

impl DurableStorage for KeyringStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.with_entry(key, keyring::Entry::get_password) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_entry(key, |entry| entry.set_password(value))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match self.with_entry(key, keyring::Entry::delete_credential) {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
