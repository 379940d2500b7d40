//! Store - the in-memory map and the backend it mirrors to.
//!
//! The map is loaded once when the store is constructed. Every mutating
//! call re-serializes the whole map and hands it to the backend, which
//! overwrites the backing file. There is no partial-write path: a flush
//! that fails halfway may leave the backing file truncated, and nothing
//! rolls it back.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::info;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::file::JsonFile;

/// The full contents of a store, in insertion order.
pub type Entries = Map<String, Value>;

/// Storage seam a [`Store`] loads from and flushes to.
///
/// Every method works on the whole backing file; there are no partial reads
/// or writes.
pub trait Backend: Send {
    /// Read and parse the backing file, creating it holding `{}` if absent.
    ///
    /// Creation is exclusive: if another creator wins the race, this fails.
    fn load(&mut self) -> Result<Entries>;

    /// Serialize `entries` and overwrite the backing file.
    fn flush(&mut self, entries: &Entries) -> Result<()>;

    /// Copy the backing file verbatim to the backup called `name`.
    fn backup(&mut self, name: &str) -> Result<()>;

    /// Copy the backup called `name` over the backing file.
    fn restore(&mut self, name: &str) -> Result<()>;
}

/// Serialize entries the way they are written to disk (2-space indent).
pub fn encode(entries: &Entries) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Parse backing file contents. Anything but a JSON object is rejected.
pub fn decode(text: &str) -> Result<Entries> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(entries) => Ok(entries),
        other => Err(StoreError::Parse(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        ))),
    }
}

/// Name of a value's JSON type, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate that a key is usable.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::Validation("key cannot be empty".to_string()));
    }
    Ok(())
}

/// Validate a backup name. Backups live next to the backing file, so
/// names may not contain path separators.
pub fn validate_backup_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::Validation(
            "backup name cannot be empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name == ".." {
        return Err(StoreError::Validation(format!(
            "backup name {name:?} must not contain a path"
        )));
    }
    Ok(())
}

/// Blocking store: every call does its I/O on the calling thread.
///
/// Reads (`get`, `has`, `all`) never touch the backend. Mutations update the
/// map, then flush it in full before returning.
pub struct Store<B: Backend = JsonFile> {
    data: Entries,
    /// Infinity/NaN results of arithmetic, stored as `null` in `data`.
    non_finite: HashMap<String, f64>,
    backend: B,
}

impl Store<JsonFile> {
    /// Open the backing file named by `config`, creating it if missing.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.resolve()?;
        info!("Opening JSON store at {:?}", path);
        Self::with_backend(JsonFile::new(path))
    }
}

impl<B: Backend> Store<B> {
    /// Build a store over `backend`, loading its current contents.
    ///
    /// Load failures are fatal: no store is returned.
    pub fn with_backend(mut backend: B) -> Result<Self> {
        let data = backend.load()?;
        Ok(Self {
            data,
            non_finite: HashMap::new(),
            backend,
        })
    }

    /// Replace the in-memory map with the backing file's contents.
    ///
    /// On failure the map is left as it was.
    pub fn load(&mut self) -> Result<()> {
        self.data = self.backend.load()?;
        self.non_finite.clear();
        Ok(())
    }

    /// Write the whole map to the backing file.
    pub fn flush(&mut self) -> Result<()> {
        self.backend.flush(&self.data)
    }

    /// Insert or overwrite an entry, then flush.
    ///
    /// Overwriting keeps the key's original position.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        validate_key(key)?;
        self.non_finite.remove(key);
        self.data.insert(key.to_string(), value.into());
        self.flush()
    }

    /// Get the value stored under `key`.
    ///
    /// Returns `None` if the key does not exist.
    pub fn get(&self, key: &str) -> Result<Option<&Value>> {
        validate_key(key)?;
        Ok(self.data.get(key))
    }

    /// Check if a key exists.
    pub fn has(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.data.contains_key(key))
    }

    /// Remove an entry, then flush.
    ///
    /// Returns whether the key existed. Removing a missing key still flushes.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        validate_key(key)?;
        self.non_finite.remove(key);
        let existed = self.data.shift_remove(key).is_some();
        self.flush()?;
        Ok(existed)
    }

    /// Remove every entry, then flush.
    pub fn delete_all(&mut self) -> Result<()> {
        self.data.clear();
        self.non_finite.clear();
        self.flush()
    }

    /// Snapshot of the whole map.
    pub fn all(&self) -> Entries {
        self.data.clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remember that `key` holds a non-finite arithmetic result.
    pub(crate) fn mark_non_finite(&mut self, key: &str, n: f64) {
        self.non_finite.insert(key.to_string(), n);
    }

    /// Non-finite arithmetic result held under `key`, if any.
    pub(crate) fn non_finite(&self, key: &str) -> Option<f64> {
        self.non_finite.get(key).copied()
    }

    /// The backend this store mirrors to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Copy the backing file to the backup called `name`.
    pub fn backup(&mut self, name: &str) -> Result<()> {
        validate_backup_name(name)?;
        self.backend.backup(name)
    }

    /// Copy the backup called `name` over the backing file and reload.
    ///
    /// If the backup does not parse, the backing file has already been
    /// overwritten but the in-memory map keeps its previous contents.
    pub fn restore(&mut self, name: &str) -> Result<()> {
        validate_backup_name(name)?;
        self.backend.restore(name)?;
        self.load()
    }
}
