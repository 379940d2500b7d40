//! In-memory backend.
//!
//! Keeps the serialized "backing file" and its backups as strings in the
//! process. This backend is NOT durable - data is lost on process exit.
//! Use for testing and development only.

use std::collections::BTreeMap;
use std::io;

use crate::error::Result;
use crate::store::{decode, encode, Backend, Entries};

/// In-memory implementation of [`Backend`].
///
/// Stores exactly the text a [`JsonFile`](crate::JsonFile) would write, so
/// parse failures and flush contents can be observed without touching disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    file: Option<String>,
    backups: BTreeMap<String, String>,
    flushes: usize,
}

impl MemoryBackend {
    /// Create a backend with no backing file yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend whose backing file already holds `text`.
    pub fn with_contents(text: impl Into<String>) -> Self {
        Self {
            file: Some(text.into()),
            ..Self::default()
        }
    }

    /// Current backing file contents, if it exists.
    pub fn contents(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Contents of the backup called `name`, if it exists.
    pub fn backup_contents(&self, name: &str) -> Option<&str> {
        self.backups.get(name).map(String::as_str)
    }

    /// Place a backup directly, bypassing the backing file.
    pub fn insert_backup(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.backups.insert(name.into(), text.into());
    }

    /// Number of flushes performed so far.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

fn not_found(what: String) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, what)
}

impl Backend for MemoryBackend {
    fn load(&mut self) -> Result<Entries> {
        match &self.file {
            Some(text) => decode(text),
            None => {
                self.file = Some("{}".to_string());
                Ok(Entries::new())
            }
        }
    }

    fn flush(&mut self, entries: &Entries) -> Result<()> {
        self.file = Some(encode(entries)?);
        self.flushes += 1;
        Ok(())
    }

    fn backup(&mut self, name: &str) -> Result<()> {
        let text = self
            .file
            .clone()
            .ok_or_else(|| not_found("backing file does not exist".to_string()))?;
        self.backups.insert(name.to_string(), text);
        Ok(())
    }

    fn restore(&mut self, name: &str) -> Result<()> {
        let text = self
            .backups
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(format!("backup not found: {name}")))?;
        self.file = Some(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde_json::json;

    #[test]
    fn test_load_creates_empty_file() {
        let mut backend = MemoryBackend::new();
        assert!(backend.contents().is_none());

        let entries = backend.load().unwrap();
        assert!(entries.is_empty());
        assert_eq!(backend.contents(), Some("{}"));
    }

    #[test]
    fn test_flush_then_load() {
        let mut backend = MemoryBackend::new();
        let mut entries = Entries::new();
        entries.insert("k".to_string(), json!([1, "two"]));

        backend.flush(&entries).unwrap();
        assert_eq!(backend.flush_count(), 1);
        assert_eq!(backend.load().unwrap(), entries);
    }

    #[test]
    fn test_backup_copies_verbatim() {
        let mut backend = MemoryBackend::with_contents("{\"a\":1}");
        backend.backup("snap").unwrap();
        assert_eq!(backend.backup_contents("snap"), Some("{\"a\":1}"));
    }

    #[test]
    fn test_backup_without_file() {
        let mut backend = MemoryBackend::new();
        let err = backend.backup("snap").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_restore_missing() {
        let mut backend = MemoryBackend::with_contents("{}");
        let err = backend.restore("missing").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(backend.contents(), Some("{}"));
    }
}
