use crate::errors::Result;
use crate::labels::Selector;
use crate::store::{ObjectStore, StoredObject};
use std::sync::Arc;

/// Read-only typed view over an [`ObjectStore`].
///
/// Returned entries are shared snapshots and must be treated as read-only.
pub struct Lister<T: StoredObject> {
    store: Arc<ObjectStore<T>>,
}

impl<T: StoredObject> Clone for Lister<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: StoredObject> Lister<T> {
    pub fn new(store: Arc<ObjectStore<T>>) -> Self {
        Self { store }
    }

    /// All entries matching the selector, across every namespace.
    pub fn list(&self, selector: &Selector) -> Vec<Arc<T>> {
        self.store.list(selector)
    }

    /// Exact lookup for cluster-scoped kinds.
    pub fn get(&self, name: &str) -> Result<Arc<T>> {
        self.store.get("", name)
    }

    /// Narrow the view to one namespace.
    pub fn namespace(&self, namespace: impl Into<String>) -> NamespaceLister<T> {
        NamespaceLister {
            store: Arc::clone(&self.store),
            namespace: namespace.into(),
        }
    }
}

/// Namespace-scoped view produced by [`Lister::namespace`].
pub struct NamespaceLister<T: StoredObject> {
    store: Arc<ObjectStore<T>>,
    namespace: String,
}

impl<T: StoredObject> NamespaceLister<T> {
    /// Entries of this namespace matching the selector.
    pub fn list(&self, selector: &Selector) -> Vec<Arc<T>> {
        self.store.list_in_namespace(&self.namespace, selector)
    }

    /// Exact lookup within this namespace.
    pub fn get(&self, name: &str) -> Result<Arc<T>> {
        self.store.get(&self.namespace, name)
    }
}
