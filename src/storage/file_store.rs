use super::{DurableStorage, StorageError};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// JSON object on disk, written through on every change.
pub struct FileStorage {
  path: PathBuf,
  entries: Mutex<Map<String, Value>>,
}

impl FileStorage {
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
    let path = path.into();
    let entries = match fs::read_to_string(&path) {
      Ok(text) if text.trim().is_empty() => Map::new(),
      Ok(text) => match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => map,
        _ => Map::new(),
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
      Err(e) => return Err(e.into()),
    };
    Ok(Self {
      path,
      entries: Mutex::new(entries),
    })
  }

  fn persist(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(entries)?;
    let tmp = self.path.with_extension("json.tmp");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, &self.path)?;
    Ok(())
  }
}

impl DurableStorage for FileStorage {
  fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(entries.get(key).and_then(|v| v.as_str()).map(|s| s.to_string()))
  }

  fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.insert(key.to_string(), Value::String(value.to_string()));
    self.persist(&entries)
  }

  fn remove_item(&self, key: &str) -> Result<(), StorageError> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    if entries.remove(key).is_none() {
      return Ok(());
    }
    self.persist(&entries)
  }
}
