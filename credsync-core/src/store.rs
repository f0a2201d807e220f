use crate::errors::{Error, Result};
use crate::labels::{Labels, Selector};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Object kinds that can live in an [`ObjectStore`].
pub trait StoredObject: Send + Sync {
    /// Kind label reported in `NotFound` errors.
    const KIND: &'static str;

    /// Namespace the object lives in; `None` for cluster-scoped kinds.
    fn namespace(&self) -> Option<&str>;

    fn name(&self) -> &str;

    fn labels(&self) -> &Labels;
}

// Bucket key under which cluster-scoped entries are indexed.
const CLUSTER_SCOPE: &str = "";

/// Indexed, eventually-consistent mirror of a remote collection.
///
/// The store holds at most one entry per `(namespace, name)` key and hands
/// out `Arc` snapshots: readers observe either the previous or the current
/// version of an entry, never a partially written one. An external watcher
/// keeps the contents fresh through [`replace`](Self::replace),
/// [`apply`](Self::apply) and [`remove`](Self::remove); reads may run
/// concurrently with each other and with that writer.
pub struct ObjectStore<T: StoredObject> {
    buckets: RwLock<HashMap<String, HashMap<String, Arc<T>>>>,
}

impl<T: StoredObject> Default for ObjectStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoredObject> ObjectStore<T> {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// All entries matching the selector, in unspecified order.
    pub fn list(&self, selector: &Selector) -> Vec<Arc<T>> {
        let buckets = self.buckets.read().unwrap();
        buckets
            .values()
            .flat_map(|bucket| bucket.values())
            .filter(|entry| selector.matches(entry.labels()))
            .cloned()
            .collect()
    }

    /// Entries of one namespace matching the selector.
    ///
    /// Namespace is the outer index key, so entries of other namespaces are
    /// never scanned. Pass the empty string for cluster-scoped kinds.
    pub fn list_in_namespace(&self, namespace: &str, selector: &Selector) -> Vec<Arc<T>> {
        let buckets = self.buckets.read().unwrap();
        buckets
            .get(namespace)
            .map(|bucket| {
                bucket
                    .values()
                    .filter(|entry| selector.matches(entry.labels()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Exact key lookup. A missing key is reported as
    /// [`Error::NotFound`]; other fault kinds are reserved for mirrors with
    /// a fallible backend.
    pub fn get(&self, namespace: &str, name: &str) -> Result<Arc<T>> {
        let buckets = self.buckets.read().unwrap();
        buckets
            .get(namespace)
            .and_then(|bucket| bucket.get(name))
            .cloned()
            .ok_or_else(|| Error::not_found(T::KIND, name))
    }

    pub fn len(&self) -> usize {
        let buckets = self.buckets.read().unwrap();
        buckets.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole collection in one atomic swap.
    pub fn replace(&self, objects: impl IntoIterator<Item = T>) {
        let mut next: HashMap<String, HashMap<String, Arc<T>>> = HashMap::new();
        for object in objects {
            let bucket = next.entry(bucket_key(&object)).or_default();
            bucket.insert(object.name().to_string(), Arc::new(object));
        }
        let mut buckets = self.buckets.write().unwrap();
        *buckets = next;
    }

    /// Insert or overwrite a single entry.
    pub fn apply(&self, object: T) {
        let key = bucket_key(&object);
        let mut buckets = self.buckets.write().unwrap();
        buckets
            .entry(key)
            .or_default()
            .insert(object.name().to_string(), Arc::new(object));
    }

    /// Drop one entry; returns whether it was present.
    pub fn remove(&self, namespace: &str, name: &str) -> bool {
        let mut buckets = self.buckets.write().unwrap();
        match buckets.get_mut(namespace) {
            Some(bucket) => {
                let removed = bucket.remove(name).is_some();
                if bucket.is_empty() {
                    buckets.remove(namespace);
                }
                removed
            }
            None => false,
        }
    }
}

fn bucket_key<T: StoredObject>(object: &T) -> String {
    object.namespace().unwrap_or(CLUSTER_SCOPE).to_string()
}
