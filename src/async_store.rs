//! Non-blocking adapter over [`Store`].
//!
//! Every call is shipped to the tokio blocking pool and runs there while
//! holding the instance mutex. Calls against one instance therefore execute
//! one at a time, and a read-modify-write helper such as `add` or `push` can
//! never interleave with another call's flush. Calls are not cancellable:
//! once scheduled, dropping the future does not stop the operation.

use parking_lot::Mutex;
use serde_json::Value;
use std::io;
use std::panic;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::file::JsonFile;
use crate::store::{Backend, Entries, Store};

/// Run `f` on the blocking pool.
///
/// A panic inside `f` (for example in a `map` callback) is resumed on the
/// caller's task.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
        Err(e) => Err(StoreError::Io(io::Error::new(io::ErrorKind::Interrupted, e))),
    }
}

/// Shared, non-blocking handle to a [`Store`].
///
/// Cloning is cheap; clones operate on the same store.
pub struct AsyncStore<B: Backend = JsonFile> {
    inner: Arc<Mutex<Store<B>>>,
}

impl<B: Backend> Clone for AsyncStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl AsyncStore<JsonFile> {
    /// Open the backing file named by `config`, creating it if missing.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let store = blocking(move || Store::open(&config)).await?;
        Ok(Self::from_store(store))
    }
}

impl<B: Backend + 'static> AsyncStore<B> {
    /// Build a store over `backend`, loading its current contents.
    pub async fn with_backend(backend: B) -> Result<Self> {
        let store = blocking(move || Store::with_backend(backend)).await?;
        Ok(Self::from_store(store))
    }

    /// Wrap an already-open blocking store.
    pub fn from_store(store: Store<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Store<B>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        blocking(move || {
            let mut store = inner.lock();
            f(&mut *store)
        })
        .await
    }

    /// Reload the map from the backing file.
    pub async fn load(&self) -> Result<()> {
        self.run(|store| store.load()).await
    }

    /// Write the whole map to the backing file.
    pub async fn flush(&self) -> Result<()> {
        self.run(|store| store.flush()).await
    }

    /// Insert or overwrite an entry, then flush.
    pub async fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let key = key.to_string();
        let value = value.into();
        self.run(move |store| store.set(&key, value)).await
    }

    /// Get a copy of the value stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.run(move |store| Ok(store.get(&key)?.cloned())).await
    }

    /// Check if a key exists.
    pub async fn has(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.run(move |store| store.has(&key)).await
    }

    /// Remove an entry, then flush. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.run(move |store| store.delete(&key)).await
    }

    /// Remove every entry, then flush.
    pub async fn delete_all(&self) -> Result<()> {
        self.run(|store| store.delete_all()).await
    }

    /// Snapshot of the whole map.
    pub async fn all(&self) -> Result<Entries> {
        self.run(|store| Ok(store.all())).await
    }

    /// Number of entries.
    pub async fn len(&self) -> Result<usize> {
        self.run(|store| Ok(store.len())).await
    }

    /// Add `delta` to the number at `key` (0 if absent).
    pub async fn add(&self, key: &str, delta: f64) -> Result<f64> {
        let key = key.to_string();
        self.run(move |store| store.add(&key, delta)).await
    }

    /// Subtract `delta` from the number at `key` (0 if absent).
    pub async fn subtract(&self, key: &str, delta: f64) -> Result<f64> {
        let key = key.to_string();
        self.run(move |store| store.subtract(&key, delta)).await
    }

    /// Apply `operator` (`+ - * / %`) to the number at `key` and `operand`.
    pub async fn math(&self, key: &str, operator: &str, operand: f64) -> Result<f64> {
        let key = key.to_string();
        let operator = operator.to_string();
        self.run(move |store| store.math(&key, &operator, operand))
            .await
    }

    /// Append `value` to the array at `key`, creating it if absent.
    pub async fn push(&self, key: &str, value: impl Into<Value>) -> Result<Vec<Value>> {
        let key = key.to_string();
        let value = value.into();
        self.run(move |store| store.push(&key, value)).await
    }

    /// Remove every element strictly equal to `value` from the array at `key`.
    pub async fn pull(&self, key: &str, value: Value) -> Result<Vec<Value>> {
        let key = key.to_string();
        self.run(move |store| store.pull(&key, &value)).await
    }

    /// Elements of the array at `key` strictly equal to `value`.
    pub async fn find(&self, key: &str, value: Value) -> Result<Vec<Value>> {
        let key = key.to_string();
        self.run(move |store| store.find(&key, &value)).await
    }

    /// Object elements of the array at `key` whose `property` equals `value`.
    pub async fn find_by(&self, key: &str, property: &str, value: Value) -> Result<Vec<Value>> {
        let key = key.to_string();
        let property = property.to_string();
        self.run(move |store| store.find_by(&key, &property, &value))
            .await
    }

    /// Transform each element of the array at `key`. Not persisted.
    pub async fn map<T, F>(&self, key: &str, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Value, usize) -> T + Send + 'static,
        T: Send + 'static,
    {
        let key = key.to_string();
        self.run(move |store| store.map(&key, f)).await
    }

    /// Elements of the array at `key` for which `f` returns true.
    pub async fn filter<F>(&self, key: &str, f: F) -> Result<Vec<Value>>
    where
        F: FnMut(&Value, usize) -> bool + Send + 'static,
    {
        let key = key.to_string();
        self.run(move |store| store.filter(&key, f)).await
    }

    /// Fold the array at `key`, starting from `initial`.
    pub async fn reduce<A, F>(&self, key: &str, f: F, initial: A) -> Result<A>
    where
        F: FnMut(A, &Value, usize) -> A + Send + 'static,
        A: Send + 'static,
    {
        let key = key.to_string();
        self.run(move |store| store.reduce(&key, f, initial)).await
    }

    /// Call `f` on each element of the array at `key`.
    pub async fn for_each<F>(&self, key: &str, f: F) -> Result<()>
    where
        F: FnMut(&Value, usize) + Send + 'static,
    {
        let key = key.to_string();
        self.run(move |store| store.for_each(&key, f)).await
    }

    /// Numeric value of `key`, including a non-finite arithmetic result.
    pub async fn number(&self, key: &str) -> Result<Option<f64>> {
        let key = key.to_string();
        self.run(move |store| store.number(&key)).await
    }

    /// Copy the backing file to the backup called `name`.
    pub async fn backup(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.run(move |store| store.backup(&name)).await
    }

    /// Copy the backup called `name` over the backing file and reload.
    pub async fn restore(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.run(move |store| store.restore(&name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_in(dir: &TempDir) -> AsyncStore {
        AsyncStore::open(StoreConfig::new(dir.path().join("db.json")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        store.set("greeting", "hello").await.unwrap();
        assert_eq!(store.get("greeting").await.unwrap(), Some(json!("hello")));
        assert!(store.has("greeting").await.unwrap());
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        store.set("a", json!({"x": [1, 2]})).await.unwrap();
        store.push("list", 1).await.unwrap();
        let expected = store.all().await.unwrap();
        drop(store);

        let reopened = open_in(&dir).await;
        assert_eq!(reopened.all().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_concurrent_adds_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.add("counter", 1.0).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get("counter").await.unwrap(), Some(json!(32)));
        let reopened = open_in(&dir).await;
        assert_eq!(reopened.get("counter").await.unwrap(), Some(json!(32)));
    }

    #[tokio::test]
    async fn test_math_and_arrays() {
        let store = AsyncStore::with_backend(MemoryBackend::new()).await.unwrap();

        store.set("count", 10).await.unwrap();
        assert_eq!(store.add("count", 5.0).await.unwrap(), 15.0);
        assert_eq!(store.math("count", "*", 2.0).await.unwrap(), 30.0);
        assert_eq!(store.math("count", "%", 7.0).await.unwrap(), 2.0);
        assert_eq!(store.subtract("count", 2.0).await.unwrap(), 0.0);

        store
            .set("users", json!([{"name": "Alice", "id": 1}, {"name": "Bob", "id": 2}]))
            .await
            .unwrap();
        let found = store.find_by("users", "id", json!(2)).await.unwrap();
        assert_eq!(found, vec![json!({"name": "Bob", "id": 2})]);

        store.push("tags", "a").await.unwrap();
        store.push("tags", "b").await.unwrap();
        assert_eq!(store.pull("tags", json!("a")).await.unwrap(), vec![json!("b")]);
        assert_eq!(store.find("tags", json!("b")).await.unwrap(), vec![json!("b")]);
    }

    #[tokio::test]
    async fn test_functional_helpers() {
        let store = AsyncStore::with_backend(MemoryBackend::new()).await.unwrap();
        store.set("nums", json!([1, 2, 3])).await.unwrap();

        let squares = store
            .map("nums", |v, _| v.as_i64().unwrap_or(0).pow(2))
            .await
            .unwrap();
        assert_eq!(squares, vec![1, 4, 9]);

        let odd = store
            .filter("nums", |v, _| v.as_i64().is_some_and(|n| n % 2 == 1))
            .await
            .unwrap();
        assert_eq!(odd, vec![json!(1), json!(3)]);

        let total = store
            .reduce("nums", |acc, v, _| acc + v.as_i64().unwrap_or(0), 100)
            .await
            .unwrap();
        assert_eq!(total, 106);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .for_each("nums", move |_, i| sink.lock().push(i))
            .await
            .unwrap();
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_backup_and_restore() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        store.set("a", 1).await.unwrap();
        let snapshot = store.all().await.unwrap();
        store.backup("b").await.unwrap();
        assert!(dir.path().join("b.json").exists());

        store.set("a", 2).await.unwrap();
        store.delete_all().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);

        store.restore("b").await.unwrap();
        assert_eq!(store.all().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_errors_reach_caller() {
        let store = AsyncStore::with_backend(MemoryBackend::new()).await.unwrap();
        store.set("s", "text").await.unwrap();

        assert!(matches!(
            store.set("", 1).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.add("s", 1.0).await,
            Err(StoreError::TypeMismatch { .. })
        ));
        assert!(matches!(
            store.math("s", "?", 1.0).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.restore("missing").await,
            Err(StoreError::Io(_))
        ));
        assert!(!store.delete("absent").await.unwrap());
    }

    #[tokio::test]
    #[should_panic(expected = "callback failed")]
    async fn test_callback_panic_propagates() {
        let store = AsyncStore::with_backend(MemoryBackend::new()).await.unwrap();
        store.set("nums", json!([1])).await.unwrap();

        let _ = store
            .map("nums", |_, _| -> i64 { panic!("callback failed") })
            .await;
    }

    #[tokio::test]
    async fn test_store_usable_after_callback_panic() {
        let store = AsyncStore::with_backend(MemoryBackend::new()).await.unwrap();
        store.set("nums", json!([1, 2])).await.unwrap();

        let clone = store.clone();
        let handle = tokio::spawn(async move {
            clone.for_each("nums", |_, _| panic!("callback failed")).await
        });
        assert!(handle.await.unwrap_err().is_panic());

        assert_eq!(store.add("n", 1.0).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_division_by_zero_keeps_infinity() {
        let store = AsyncStore::with_backend(MemoryBackend::new()).await.unwrap();
        store.set("x", 5).await.unwrap();

        assert_eq!(store.math("x", "/", 0.0).await.unwrap(), f64::INFINITY);
        assert_eq!(store.number("x").await.unwrap(), Some(f64::INFINITY));
        assert_eq!(store.add("x", 1.0).await.unwrap(), f64::INFINITY);
    }

    #[tokio::test]
    async fn test_open_fails_on_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let result = AsyncStore::open(StoreConfig::new(&path)).await;
        assert!(matches!(result, Err(StoreError::Parse(_))));
    }
}
