//! JSON file backend.
//!
//! The backing file is a single pretty-printed JSON object. Every flush
//! truncates and rewrites it in place; there is no temp file and no rename,
//! so a crash mid-write can leave it truncated. Backups are plain copies
//! named `<name>.json` next to the backing file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{decode, encode, Backend, Entries};

/// File-backed implementation of [`Backend`].
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    /// Use the file at `path` as the backing file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the backup called `name`.
    pub fn backup_path(&self, name: &str) -> PathBuf {
        self.path.with_file_name(format!("{name}.json"))
    }

    /// Check if `other` names the backing file itself.
    fn is_backing_file(&self, other: &Path) -> bool {
        if other == self.path {
            return true;
        }
        match (fs::canonicalize(other), fs::canonicalize(&self.path)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Create the backing file holding `{}`. Fails if it already exists.
    fn create_empty(&self) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        file.write_all(b"{}")?;
        info!("Created backing file {:?}", self.path);
        Ok(())
    }
}

impl Backend for JsonFile {
    fn load(&mut self) -> Result<Entries> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let entries = decode(&text)?;
                debug!(entries = entries.len(), "Loaded {:?}", self.path);
                Ok(entries)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.create_empty()?;
                Ok(Entries::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self, entries: &Entries) -> Result<()> {
        let text = encode(entries)?;
        fs::write(&self.path, text)?;
        debug!(entries = entries.len(), "Flushed {:?}", self.path);
        Ok(())
    }

    fn backup(&mut self, name: &str) -> Result<()> {
        let target = self.backup_path(name);
        if self.is_backing_file(&target) {
            // Copying a file onto itself truncates it before reading.
            fs::metadata(&self.path)?;
            return Ok(());
        }
        fs::copy(&self.path, &target)?;
        info!("Backed up {:?} to {:?}", self.path, target);
        Ok(())
    }

    fn restore(&mut self, name: &str) -> Result<()> {
        let source = self.backup_path(name);
        if self.is_backing_file(&source) {
            fs::metadata(&self.path)?;
            return Ok(());
        }
        fs::copy(&source, &self.path)?;
        info!("Restored {:?} from {:?}", self.path, source);
        Ok(())
    }
}
