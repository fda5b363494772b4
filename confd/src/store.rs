//! In-memory store implementation.
//!
//! Backs unit and integration tests, and any deployment that does not need
//! durability. Iteration order per resource type is sorted natural-key
//! order, which is stable across calls as required by the pagination
//! protocol. Available in all builds so integration tests can use it.

use confd_core::{ConfdError, ConfigObject, ObjectId, Result, Store};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory `Store` with stable iteration order and identity-pair storage.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, BTreeMap<String, ConfigObject>>>,
    ids_by_key: RwLock<HashMap<String, ObjectId>>,
    keys_by_id: RwLock<HashMap<ObjectId, String>>,
    identity_writes_failing: AtomicBool,
    object_writes_failing: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent identity writes fail, to exercise the orphan path
    pub fn set_identity_writes_failing(&self, failing: bool) {
        self.identity_writes_failing
            .store(failing, Ordering::SeqCst);
    }

    /// Make subsequent object writes fail, to exercise the orphan path
    pub fn set_object_writes_failing(&self, failing: bool) {
        self.object_writes_failing.store(failing, Ordering::SeqCst);
    }

    fn check_identity_writable(&self) -> Result<()> {
        if self.identity_writes_failing.load(Ordering::SeqCst) {
            return Err(ConfdError::store("identity storage unavailable"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(&self, resource: &str, key: &str) -> Result<Option<ConfigObject>> {
        Ok(self
            .objects
            .read()
            .get(resource)
            .and_then(|objs| objs.get(key))
            .cloned())
    }

    async fn put(&self, key: &str, obj: &ConfigObject) -> Result<()> {
        if self.object_writes_failing.load(Ordering::SeqCst) {
            return Err(ConfdError::store("object storage unavailable"));
        }
        self.objects
            .write()
            .entry(obj.resource().to_string())
            .or_default()
            .insert(key.to_string(), obj.clone());
        Ok(())
    }

    async fn delete(&self, resource: &str, key: &str) -> Result<()> {
        if let Some(objs) = self.objects.write().get_mut(resource) {
            objs.remove(key);
        }
        Ok(())
    }

    async fn iterate(&self, resource: &str) -> Result<Vec<ConfigObject>> {
        Ok(self
            .objects
            .read()
            .get(resource)
            .map(|objs| objs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn put_identity(&self, id: ObjectId, key: &str) -> Result<()> {
        self.check_identity_writable()?;
        self.ids_by_key.write().insert(key.to_string(), id);
        self.keys_by_id.write().insert(id, key.to_string());
        Ok(())
    }

    async fn id_for_key(&self, key: &str) -> Result<Option<ObjectId>> {
        Ok(self.ids_by_key.read().get(key).copied())
    }

    async fn key_for_id(&self, id: ObjectId) -> Result<Option<String>> {
        Ok(self.keys_by_id.read().get(&id).cloned())
    }

    async fn remove_identity(&self, id: ObjectId, key: &str) -> Result<()> {
        self.check_identity_writable()?;
        self.ids_by_key.write().remove(key);
        self.keys_by_id.write().remove(&id);
        Ok(())
    }
}
