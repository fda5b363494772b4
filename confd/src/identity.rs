//! The identity map: external identifier ↔ natural key.
//!
//! External identifiers decouple the caller-facing address space from
//! internal natural keys, which are rebuilt from mutable multi-field data.
//! The mapping is bijective while an object lives: exactly one identifier
//! per natural key, assigned once at creation and released only after the
//! owning subsystem confirms deletion.

use confd_core::{ConfdError, ObjectId, Result, Store};
use std::sync::Arc;
use tracing::debug;

/// Bidirectional persistent identifier map, backed by the store.
#[derive(Clone)]
pub struct IdentityMap {
    store: Arc<dyn Store>,
}

impl IdentityMap {
    /// Create an identity map over a store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Assign a fresh identifier to a natural key.
    ///
    /// Called exactly once per object creation. A key that already has an
    /// identifier is an upstream invariant violation, not a lookup miss.
    pub async fn assign(&self, natural_key: &str) -> Result<ObjectId> {
        if self.store.id_for_key(natural_key).await?.is_some() {
            return Err(ConfdError::identity_conflict(natural_key));
        }
        let id = ObjectId::new();
        self.store.put_identity(id, natural_key).await?;
        debug!(key = natural_key, id = %id, "assigned identity");
        Ok(id)
    }

    /// Natural key behind an external identifier
    pub async fn lookup_key(&self, id: ObjectId) -> Result<String> {
        self.store
            .key_for_id(id)
            .await?
            .ok_or_else(|| ConfdError::not_found("identifier", id.to_string()))
    }

    /// External identifier for a natural key
    pub async fn lookup_id(&self, natural_key: &str) -> Result<ObjectId> {
        self.store
            .id_for_key(natural_key)
            .await?
            .ok_or_else(|| ConfdError::not_found("natural key", natural_key))
    }

    /// Remove both directions of the mapping.
    ///
    /// Must only be called after the owning subsystem has confirmed the
    /// object's deletion; a failure here leaves the object orphaned.
    pub async fn release(&self, id: ObjectId, natural_key: &str) -> Result<()> {
        self.store.remove_identity(id, natural_key).await?;
        debug!(key = natural_key, id = %id, "released identity");
        Ok(())
    }

    /// Existing identifier for the key, or a fresh one if none is mapped.
    ///
    /// Bootstrap uses this to backfill identity for objects that already
    /// exist in the store; an existing mapping is confirmed, never an error.
    pub async fn confirm(&self, natural_key: &str) -> Result<ObjectId> {
        if let Some(id) = self.store.id_for_key(natural_key).await? {
            return Ok(id);
        }
        let id = ObjectId::new();
        self.store.put_identity(id, natural_key).await?;
        debug!(key = natural_key, id = %id, "backfilled identity");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn identity_map() -> IdentityMap {
        IdentityMap::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_assign_and_lookup_both_directions() {
        let map = identity_map();
        let id = map.assign("Vlan#100").await.unwrap();
        assert_eq!(map.lookup_key(id).await.unwrap(), "Vlan#100");
        assert_eq!(map.lookup_id("Vlan#100").await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_double_assign_conflicts() {
        let map = identity_map();
        map.assign("Vlan#100").await.unwrap();
        let err = map.assign("Vlan#100").await.unwrap_err();
        assert!(matches!(err, ConfdError::IdentityConflict { .. }));
    }

    #[tokio::test]
    async fn test_release_removes_both_directions() {
        let map = identity_map();
        let id = map.assign("Vlan#100").await.unwrap();
        map.release(id, "Vlan#100").await.unwrap();
        assert!(map.lookup_key(id).await.unwrap_err().is_not_found());
        assert!(map.lookup_id("Vlan#100").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_confirm_is_idempotent() {
        let map = identity_map();
        let id = map.confirm("Port#3").await.unwrap();
        assert_eq!(map.confirm("Port#3").await.unwrap(), id);
    }
}
