//! Ordered, identity-deduplicated collection persisted as a JSON array.
//!
//! # Invariants
//! - No two elements share identity; insertion order is preserved.
//! - Contents are read lazily on first access.
//! - Every mutation is a synchronous read-modify-write against the store.
//!   A failed write leaves both the store and the in-memory view unchanged.
//! - An absent or malformed blob reads as empty. Elements that do not decode,
//!   or decode with an empty identity, are skipped.

use std::{cell::OnceCell, fmt, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};

use crate::{error::StorageError, storage::BlobStore};

/// Result of an `add` or `remove` that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    Unchanged,
}

pub struct PersistentSet<T> {
    key: String,
    store: Arc<dyn BlobStore>,
    identity: fn(&T) -> &str,
    cache: OnceCell<Vec<T>>,
}

impl<T> fmt::Debug for PersistentSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentSet")
            .field("key", &self.key)
            .field("store", &self.store)
            .field("loaded", &self.cache.get().map(Vec::len))
            .finish()
    }
}

impl<T> PersistentSet<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(key: impl Into<String>, store: Arc<dyn BlobStore>, identity: fn(&T) -> &str) -> Self {
        Self {
            key: key.into(),
            store,
            identity,
            cache: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current contents in insertion order.
    pub fn load(&self) -> &[T] {
        self.cache.get_or_init(|| match self.read_current() {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "favorites unreadable; treating as empty");
                Vec::new()
            }
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.load().iter().any(|item| (self.identity)(item) == id)
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.load().is_empty()
    }

    /// Append `item` unless an element with the same identity exists.
    pub fn add(&mut self, item: T) -> Result<Mutation, StorageError> {
        let mut current = self.read_current()?;
        let id = (self.identity)(&item);

        if id.is_empty() || current.iter().any(|existing| (self.identity)(existing) == id) {
            self.cache = OnceCell::from(current);
            return Ok(Mutation::Unchanged);
        }

        current.push(item);
        self.persist(&current)?;
        self.cache = OnceCell::from(current);
        Ok(Mutation::Applied)
    }

    /// Remove the element whose identity is `id`, if any.
    pub fn remove(&mut self, id: &str) -> Result<Mutation, StorageError> {
        let mut current = self.read_current()?;
        let before = current.len();
        current.retain(|existing| (self.identity)(existing) != id);

        if current.len() == before {
            self.cache = OnceCell::from(current);
            return Ok(Mutation::Unchanged);
        }

        self.persist(&current)?;
        self.cache = OnceCell::from(current);
        Ok(Mutation::Applied)
    }

    fn read_current(&self) -> Result<Vec<T>, StorageError> {
        Ok(self
            .store
            .read(&self.key)?
            .map(|blob| self.decode(&blob))
            .unwrap_or_default())
    }

    fn decode(&self, blob: &str) -> Vec<T> {
        let values: Vec<serde_json::Value> = match serde_json::from_str(blob) {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "malformed favorites blob; treating as empty");
                return Vec::new();
            }
        };

        let mut items: Vec<T> = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<T>(value) {
                Ok(item) => {
                    let id = (self.identity)(&item);
                    if !id.is_empty() && !items.iter().any(|existing| (self.identity)(existing) == id) {
                        items.push(item);
                    }
                }
                Err(err) => {
                    tracing::debug!(key = %self.key, error = %err, "skipping undecodable element");
                }
            }
        }
        items
    }

    fn persist(&self, items: &[T]) -> Result<(), StorageError> {
        let blob = serde_json::to_string(items).map_err(|source| StorageError::Serialize {
            key: self.key.clone(),
            source,
        })?;
        self.store.write(&self.key, &blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::FavoriteAttraction, storage::MemoryStore};

    const KEY: &str = "favorite_destinations";

    fn destinations(store: &MemoryStore) -> PersistentSet<String> {
        PersistentSet::new(KEY, Arc::new(store.clone()), String::as_str)
    }

    fn attraction_id(fav: &FavoriteAttraction) -> &str {
        &fav.id
    }

    /// Reads succeed, writes are refused.
    #[derive(Debug, Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl BlobStore for ReadOnlyStore {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.read(key)
        }

        fn write(&self, _key: &str, _blob: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
    }

    #[test]
    fn add_then_contains() {
        let store = MemoryStore::new();
        let mut set = destinations(&store);

        assert_eq!(set.add("Paris".into()).expect("add"), Mutation::Applied);
        assert!(set.contains("Paris"));
        assert_eq!(store.get_raw(KEY).as_deref(), Some(r#"["Paris"]"#));
    }

    #[test]
    fn add_is_idempotent() {
        let store = MemoryStore::new();
        let mut set = destinations(&store);

        set.add("Paris".into()).expect("add");
        assert_eq!(set.add("Paris".into()).expect("add again"), Mutation::Unchanged);

        assert_eq!(set.load(), ["Paris".to_string()]);
    }

    #[test]
    fn remove_then_not_contains() {
        let store = MemoryStore::new();
        let mut set = destinations(&store);

        set.add("Paris".into()).expect("add");
        set.add("Rome".into()).expect("add");
        assert_eq!(set.remove("Paris").expect("remove"), Mutation::Applied);

        assert!(!set.contains("Paris"));
        assert_eq!(set.load(), ["Rome".to_string()]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let store = MemoryStore::new();
        let mut set = destinations(&store);
        set.add("Rome".into()).expect("add");

        assert_eq!(set.remove("Paris").expect("remove"), Mutation::Unchanged);
        assert_eq!(set.load(), ["Rome".to_string()]);
    }

    #[test]
    fn insertion_order_preserved_across_reload() {
        let store = MemoryStore::new();
        let mut set = destinations(&store);
        for city in ["Tokyo", "Paris", "Rome"] {
            set.add(city.into()).expect("add");
        }

        let reloaded = destinations(&store);
        assert_eq!(reloaded.load(), ["Tokyo", "Paris", "Rome"].map(String::from));
    }

    #[test]
    fn malformed_blob_reads_empty() {
        let store = MemoryStore::new();
        store.insert_raw(KEY, "{not json");

        let set = destinations(&store);
        assert!(set.is_empty());
    }

    #[test]
    fn malformed_blob_is_replaced_on_next_add() {
        let store = MemoryStore::new();
        store.insert_raw(KEY, "garbage");
        let mut set = destinations(&store);

        set.add("Paris".into()).expect("add");
        assert_eq!(store.get_raw(KEY).as_deref(), Some(r#"["Paris"]"#));
    }

    #[test]
    fn lenient_element_decode_and_dedup() {
        let store = MemoryStore::new();
        store.insert_raw(
            "favorite_attractions",
            r#"[
                {"id":"a1","name":"Louvre","address":"Paris","rating":9},
                {"id":"a1","name":"Louvre (dup)"},
                {"name":"no id"},
                42,
                {"id":"a2"}
            ]"#,
        );

        let set: PersistentSet<FavoriteAttraction> =
            PersistentSet::new("favorite_attractions", Arc::new(store), attraction_id);

        let items = set.load();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Louvre");
        assert_eq!(items[1].id, "a2");
        assert_eq!(items[1].address, "");
    }

    #[test]
    fn failed_write_keeps_prior_state() {
        let store = ReadOnlyStore::default();
        store.inner.insert_raw(KEY, r#"["Rome"]"#);
        let mut set: PersistentSet<String> = PersistentSet::new(KEY, Arc::new(store), String::as_str);

        let err = set.add("Paris".into()).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(!set.contains("Paris"));
        assert_eq!(set.load(), ["Rome".to_string()]);

        assert!(set.remove("Rome").is_err());
        assert!(set.contains("Rome"));
    }

    #[test]
    fn mutation_sees_writes_made_through_another_handle() {
        let store = MemoryStore::new();
        let mut first = destinations(&store);
        let mut second = destinations(&store);
        assert!(first.is_empty());

        second.add("Rome".into()).expect("add");
        first.add("Paris".into()).expect("add");

        assert_eq!(first.load(), ["Rome", "Paris"].map(String::from));
    }
}
