//! The object lifecycle orchestrator.
//!
//! Every request runs the same staged state machine: resolve the resource
//! type, gate on the owning subsystem's connectivity, resolve identity,
//! check existence against the persisted store, reconcile (updates only),
//! dispatch to the owning subsystem, then persist the identity/object
//! bookkeeping. Any stage's failure short-circuits the rest; stages before
//! dispatch leave no state behind and are safe to retry. Bookkeeping
//! failures after a successful dispatch are reported as distinct orphan
//! errors rather than rolled back.

use crate::identity::IdentityMap;
use crate::paging;
use crate::registry::{Registry, ResourceDescriptor};
use crate::stats::{ApiStats, OpKind};
use crate::tracker::ConnectionTracker;
use confd_core::{
    ConfdError, ConfigObject, ObjectId, Result, Store, UpdateRequest,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One object returned to a caller, with its external identifier when one
/// is mapped.
#[derive(Debug, Clone)]
pub struct RetrievedObject {
    pub id: Option<ObjectId>,
    pub object: ConfigObject,
}

/// One page of a bulk read, objects paired with their identifiers.
#[derive(Debug, Clone, Default)]
pub struct BulkPage {
    pub objects: Vec<RetrievedObject>,
    pub count: i64,
    pub next_marker: i64,
    pub more_exists: bool,
}

/// CRUD/action state machine over the registry, tracker, store, and
/// identity map.
pub struct ObjectManager {
    registry: Arc<Registry>,
    tracker: Arc<ConnectionTracker>,
    store: Arc<dyn Store>,
    identity: IdentityMap,
    stats: Arc<ApiStats>,
}

impl ObjectManager {
    /// Create an orchestrator over its collaborators
    pub fn new(
        registry: Arc<Registry>,
        tracker: Arc<ConnectionTracker>,
        store: Arc<dyn Store>,
    ) -> Self {
        let identity = IdentityMap::new(store.clone());
        Self {
            registry,
            tracker,
            store,
            identity,
            stats: Arc::new(ApiStats::new()),
        }
    }

    /// Call statistics handle
    pub fn stats(&self) -> Arc<ApiStats> {
        self.stats.clone()
    }

    /// Identity map handle
    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    /// Readiness gate: the owner must be connected before any further
    /// stage runs.
    fn gate(&self, desc: &ResourceDescriptor) -> Result<()> {
        let owner = desc.owner.name();
        if !self.tracker.is_connected(owner) {
            return Err(ConfdError::subsystem_unavailable(owner));
        }
        Ok(())
    }

    /// Create a new object from a caller payload.
    pub async fn create(&self, resource: &str, payload: &Value) -> Result<ObjectId> {
        self.stats.attempted(OpKind::Create);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;

        let (obj, update_set) = desc.schema.decode(payload)?;
        if update_set.is_empty() {
            debug!(resource, "create carries no fields");
            return Err(ConfdError::NoContent);
        }
        let key = desc.schema.natural_key(&obj)?;
        if self.store.get(resource, &key).await?.is_some() {
            debug!(resource, key, "create against existing object");
            return Err(ConfdError::already_configured(&key));
        }

        desc.owner.create(&obj).await.map_err(dispatch_error)?;

        let id = self.persist_created(&key, &obj).await?;
        info!(resource, key, %id, "object created");
        self.stats.succeeded(OpKind::Create);
        Ok(id)
    }

    /// Fetch an object by its external identifier.
    pub async fn get_by_id(&self, resource: &str, id: ObjectId) -> Result<RetrievedObject> {
        self.stats.attempted(OpKind::Get);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;

        let key = self.identity.lookup_key(id).await?;
        let object = self
            .store
            .get(resource, &key)
            .await?
            .ok_or_else(|| ConfdError::not_found(resource, id.to_string()))?;
        self.stats.succeeded(OpKind::Get);
        Ok(RetrievedObject {
            id: Some(id),
            object,
        })
    }

    /// Fetch an object addressed by the key fields in the payload.
    pub async fn get_by_key(&self, resource: &str, payload: &Value) -> Result<RetrievedObject> {
        self.stats.attempted(OpKind::Get);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;

        let (template, _) = desc.schema.decode(payload)?;
        let key = desc.schema.natural_key(&template)?;
        let object = self
            .store
            .get(resource, &key)
            .await?
            .ok_or_else(|| ConfdError::not_found(resource, &key))?;
        let id = self.store.id_for_key(&key).await?;
        self.stats.succeeded(OpKind::Get);
        Ok(RetrievedObject { id, object })
    }

    /// Update an object addressed by external identifier.
    pub async fn update_by_id(&self, resource: &str, id: ObjectId, payload: &Value) -> Result<()> {
        self.stats.attempted(OpKind::Update);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;
        let key = self.identity.lookup_key(id).await?;
        self.update_inner(desc, &key, payload).await
    }

    /// Update an object addressed by the key fields in the payload.
    pub async fn update_by_key(&self, resource: &str, payload: &Value) -> Result<()> {
        self.stats.attempted(OpKind::Update);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;
        let (template, _) = desc.schema.decode(payload)?;
        let key = desc.schema.natural_key(&template)?;
        self.update_inner(desc, &key, payload).await
    }

    async fn update_inner(
        &self,
        desc: &ResourceDescriptor,
        key: &str,
        payload: &Value,
    ) -> Result<()> {
        let resource = desc.resource.as_str();
        let persisted = self
            .store
            .get(resource, key)
            .await?
            .ok_or_else(|| ConfdError::not_found(resource, key))?;

        let request = UpdateRequest::from_payload(payload)?;
        let (merged, diff, ops) = match request {
            UpdateRequest::Merge => {
                let (caller, update_set) = desc.schema.decode(payload)?;
                let (merged, diff) =
                    crate::merge::merge_update(&desc.schema, &caller, &persisted, &update_set)?;
                if !diff.any() {
                    debug!(resource, key, "update produced no dirty fields");
                    return Err(ConfdError::NoChange);
                }
                (merged, diff, Vec::new())
            }
            UpdateRequest::Patch(ops) => {
                let (merged, diff) = crate::merge::apply_patch(&desc.schema, &persisted, &ops)?;
                (merged, diff, ops)
            }
        };

        desc.owner
            .pre_validate(&merged)
            .await
            .map_err(validation_error)?;

        desc.owner
            .update(&persisted, &merged, &diff, &ops, key)
            .await
            .map_err(dispatch_error)?;

        // The identity pair is untouched by an update; only the merged
        // object itself is written back.
        if let Err(e) = self.store.put(key, &merged).await {
            warn!(resource, key, error = %e, "update applied but object write failed");
            return Err(ConfdError::ObjectPersistFailed(e.to_string()));
        }

        // Best-effort: post-processing never flips a success
        if let Err(e) = desc.owner.post_process(&merged).await {
            debug!(resource, key, error = %e, "post-processing hook failed");
        }

        info!(resource, key, "object updated");
        self.stats.succeeded(OpKind::Update);
        Ok(())
    }

    /// Delete an object addressed by external identifier.
    pub async fn delete_by_id(&self, resource: &str, id: ObjectId) -> Result<()> {
        self.stats.attempted(OpKind::Delete);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;
        let key = self.identity.lookup_key(id).await?;
        self.delete_inner(desc, &key, Some(id)).await
    }

    /// Delete an object addressed by the key fields in the payload.
    pub async fn delete_by_key(&self, resource: &str, payload: &Value) -> Result<()> {
        self.stats.attempted(OpKind::Delete);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;
        let (template, _) = desc.schema.decode(payload)?;
        let key = desc.schema.natural_key(&template)?;
        let id = self.store.id_for_key(&key).await?;
        self.delete_inner(desc, &key, id).await
    }

    async fn delete_inner(
        &self,
        desc: &ResourceDescriptor,
        key: &str,
        id: Option<ObjectId>,
    ) -> Result<()> {
        let resource = desc.resource.as_str();
        let persisted = self
            .store
            .get(resource, key)
            .await?
            .ok_or_else(|| ConfdError::not_found(resource, key))?;

        desc.owner
            .delete(&persisted, key)
            .await
            .map_err(dispatch_error)?;

        let bookkeeping: Result<()> = async {
            self.store.delete(resource, key).await?;
            if let Some(id) = id {
                self.identity.release(id, key).await?;
            }
            Ok(())
        }
        .await;
        if let Err(e) = bookkeeping {
            warn!(resource, key, error = %e, "delete applied but bookkeeping failed");
            return Err(ConfdError::IdentityReleaseFailed(e.to_string()));
        }

        info!(resource, key, "object deleted");
        self.stats.succeeded(OpKind::Delete);
        Ok(())
    }

    /// Read one page of persisted objects for a resource type.
    pub async fn bulk_get(&self, resource: &str, start_marker: i64, count: i64) -> Result<BulkPage> {
        self.stats.attempted(OpKind::Get);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;

        let slice = paging::page(self.store.as_ref(), resource, start_marker, count).await?;
        let mut objects = Vec::with_capacity(slice.objects.len());
        for object in slice.objects {
            let key = desc.schema.natural_key(&object)?;
            let id = self.store.id_for_key(&key).await?;
            objects.push(RetrievedObject { id, object });
        }
        self.stats.succeeded(OpKind::Get);
        Ok(BulkPage {
            objects,
            count: slice.count,
            next_marker: slice.next_marker,
            more_exists: slice.more_exists,
        })
    }

    /// Read live state for an object addressed by external identifier.
    ///
    /// Unlike the persisted-object reads, state reads dispatch to the
    /// owning subsystem; the persisted object supplies the key fields.
    pub async fn get_state_by_id(&self, resource: &str, id: ObjectId) -> Result<RetrievedObject> {
        self.stats.attempted(OpKind::Get);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;

        let key = self.identity.lookup_key(id).await?;
        let template = self
            .store
            .get(resource, &key)
            .await?
            .ok_or_else(|| ConfdError::not_found(resource, id.to_string()))?;
        let object = desc.owner.get(&template).await.map_err(dispatch_error)?;
        self.stats.succeeded(OpKind::Get);
        Ok(RetrievedObject {
            id: Some(id),
            object,
        })
    }

    /// Read live state for an object addressed by the key fields in the
    /// payload. State objects need no persisted counterpart; the decoded
    /// payload is the dispatch template.
    pub async fn get_state_by_key(&self, resource: &str, payload: &Value) -> Result<RetrievedObject> {
        self.stats.attempted(OpKind::Get);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;

        let (template, _) = desc.schema.decode(payload)?;
        let key = desc.schema.natural_key(&template)?;
        let object = desc.owner.get(&template).await.map_err(dispatch_error)?;
        let id = self.store.id_for_key(&key).await?;
        self.stats.succeeded(OpKind::Get);
        Ok(RetrievedObject { id, object })
    }

    /// Read one page of live state objects from the owning subsystem.
    pub async fn bulk_get_state(
        &self,
        resource: &str,
        start_marker: i64,
        count: i64,
    ) -> Result<BulkPage> {
        self.stats.attempted(OpKind::Get);
        let desc = self.registry.resolve(resource)?;
        self.gate(desc)?;
        if count > paging::MAX_BULK_OBJECTS {
            return Err(ConfdError::BulkTooLarge {
                requested: count,
                max: paging::MAX_BULK_OBJECTS,
            });
        }

        let template = desc.schema.zero_object();
        let slice = desc
            .owner
            .bulk_get(&template, start_marker, count)
            .await
            .map_err(dispatch_error)?;
        let mut objects = Vec::with_capacity(slice.objects.len());
        for object in slice.objects {
            let key = desc.schema.natural_key(&object)?;
            let id = self.store.id_for_key(&key).await?;
            objects.push(RetrievedObject { id, object });
        }
        self.stats.succeeded(OpKind::Get);
        Ok(BulkPage {
            objects,
            count: slice.count,
            next_marker: slice.next_marker,
            more_exists: slice.more_exists,
        })
    }

    /// Execute a non-CRUD action against its owning subsystem.
    pub async fn action(&self, action: &str, payload: &Value) -> Result<()> {
        self.stats.attempted(OpKind::Action);
        let desc = self.registry.resolve_action(action)?;
        let owner = desc.owner.name();
        if !self.tracker.is_connected(owner) {
            return Err(ConfdError::subsystem_unavailable(owner));
        }

        desc.owner
            .action(action, payload)
            .await
            .map_err(dispatch_error)?;
        info!(action, "action executed");
        self.stats.succeeded(OpKind::Action);
        Ok(())
    }

    /// Stage-7 bookkeeping for a successful create: persist the object and
    /// assign its identity. Failure leaves the object applied downstream
    /// but unindexed (orphan).
    async fn persist_created(&self, key: &str, obj: &ConfigObject) -> Result<ObjectId> {
        if let Err(e) = self.store.put(key, obj).await {
            warn!(key, error = %e, "create applied but object write failed");
            return Err(ConfdError::ObjectPersistFailed(e.to_string()));
        }
        self.identity.assign(key).await.map_err(|e| {
            warn!(key, error = %e, "create applied but identity write failed");
            ConfdError::IdentityPersistFailed(e.to_string())
        })
    }
}

/// Subsystem dispatch failures are reported verbatim and never retried.
fn dispatch_error(e: ConfdError) -> ConfdError {
    match e {
        ConfdError::Subsystem(_) => e,
        other => ConfdError::subsystem(other.to_string()),
    }
}

fn validation_error(e: ConfdError) -> ConfdError {
    match e {
        ConfdError::ValidationFailed(_) => e,
        other => ConfdError::validation_failed(other.to_string()),
    }
}
