//! # json-state
//!
//! Trivial durable state for scripts and small services: an in-memory map
//! of string keys to JSON values, mirrored to a single JSON file.
//!
//! - **Whole-file persistence**: every mutation rewrites the full file
//! - **Typed helpers**: arithmetic, array and functional operations on top
//!   of `get`/`set`
//! - **Backups**: point-in-time copies of the backing file, restorable
//! - **Two disciplines**: a blocking [`Store`] and a non-blocking
//!   [`AsyncStore`] that serializes calls per instance
//!
//! Single process only. There is no locking across processes, and a crash
//! in the middle of a flush can leave the backing file truncated.
//!
//! ## Backends
//!
//! - [`JsonFile`]: the backing file on disk (default)
//! - [`MemoryBackend`]: serialized contents kept in memory (testing and development)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use json_state::{Store, StoreConfig};
//! use serde_json::json;
//!
//! fn main() -> json_state::Result<()> {
//!     let mut store = Store::open(&StoreConfig::default())?;
//!
//!     store.set("count", 10)?;
//!     store.add("count", 5.0)?;
//!     store.math("count", "*", 2.0)?;
//!     assert_eq!(store.get("count")?, Some(&json!(30)));
//!
//!     store.push("users", json!({"name": "Alice", "id": 1}))?;
//!     let alice = store.find_by("users", "id", &json!(1))?;
//!     println!("{:?}", alice);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Async
//!
//! ```rust,no_run
//! use json_state::{AsyncStore, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> json_state::Result<()> {
//!     let store = AsyncStore::open(StoreConfig::new("state.json")).await?;
//!
//!     store.set("visits", 0).await?;
//!     store.add("visits", 1.0).await?;
//!
//!     store.backup("before-reset").await?;
//!     store.delete_all().await?;
//!     store.restore("before-reset").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod async_store;
pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod ops;
pub mod store;

// Re-export main types
pub use async_store::AsyncStore;
pub use config::{StoreConfig, DEFAULT_FILE_PATH};
pub use error::{Result, StoreError};
pub use file::JsonFile;
pub use memory::MemoryBackend;
pub use ops::{strict_eq, MathOp};
pub use store::{Backend, Entries, Store};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::async_store::AsyncStore;
    pub use crate::config::StoreConfig;
    pub use crate::error::{Result, StoreError};
    pub use crate::file::JsonFile;
    pub use crate::memory::MemoryBackend;
    pub use crate::store::{Backend, Store};
}
