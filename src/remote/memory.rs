use super::{Collection, DELETED_FIELD, RemoteStore};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::trace;

type Documents = HashMap<Collection, BTreeMap<String, Value>>;

/// In-process document store.
///
/// Used when no managed backend is configured and in tests. It can be switched
/// offline to exercise the failure paths of the repositories.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: RwLock<Documents>,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryRemoteStore {
    /// Creates an empty, online store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail (or succeed again)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Whether the store currently rejects calls
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of successful `put` calls so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of documents in `collection`
    pub async fn len(&self, collection: Collection) -> usize {
        self.documents
            .read()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_online(&self) -> Result<()> {
        if self.is_offline() {
            return Err(Error::Remote {
                message: "remote store unreachable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn put(&self, collection: Collection, id: &str, document: Value) -> Result<()> {
        self.check_online()?;
        trace!(%collection, id, "put document");
        self.documents
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(id.to_string(), document);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        self.check_online()?;
        Ok(self
            .documents
            .read()
            .await
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn query_by_user(
        &self,
        collection: Collection,
        user_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<Value>> {
        self.check_online()?;
        let owner_field = collection.owner_field();
        let documents = self.documents.read().await;
        let Some(docs) = documents.get(&collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .values()
            .filter(|doc| doc.get(owner_field).and_then(Value::as_str) == Some(user_id))
            .filter(|doc| {
                include_deleted || !doc.get(DELETED_FIELD).and_then(Value::as_bool).unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}
