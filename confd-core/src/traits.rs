//! Collaborator traits at the confd core boundary.
//!
//! The persistence engine and the backend subsystems live outside this
//! core; these capabilities are all the core ever sees of them. One
//! implementation exists per backend, and tests substitute fakes.

use crate::error::Result;
use crate::id::ObjectId;
use crate::object::{ConfigObject, DiffResult};
use crate::patch::PatchOp;
use async_trait::async_trait;
use serde_json::Value;

/// A bounded slice of a bulk read, plus continuation state.
#[derive(Debug, Clone, Default)]
pub struct BulkSlice {
    /// Objects in this page, in the collection's stable order
    pub objects: Vec<ConfigObject>,
    /// Number of objects returned
    pub count: i64,
    /// Marker to pass as the next page's start
    pub next_marker: i64,
    /// Whether objects remain past this page
    pub more_exists: bool,
}

/// Persistence collaborator: durable object storage plus the identity
/// map's own key/value pair storage.
///
/// `iterate` must return objects of a type in a stable order so that
/// pagination pages compose without omission or duplication when nothing
/// is written concurrently.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch one object by natural key
    async fn get(&self, resource: &str, key: &str) -> Result<Option<ConfigObject>>;

    /// Store an object under its natural key
    async fn put(&self, key: &str, obj: &ConfigObject) -> Result<()>;

    /// Remove an object by natural key
    async fn delete(&self, resource: &str, key: &str) -> Result<()>;

    /// All objects of a type, in stable order
    async fn iterate(&self, resource: &str) -> Result<Vec<ConfigObject>>;

    /// Persist one identity pair (both directions)
    async fn put_identity(&self, id: ObjectId, key: &str) -> Result<()>;

    /// External identifier for a natural key, if assigned
    async fn id_for_key(&self, key: &str) -> Result<Option<ObjectId>>;

    /// Natural key behind an external identifier, if live
    async fn key_for_id(&self, id: ObjectId) -> Result<Option<String>>;

    /// Remove one identity pair (both directions)
    async fn remove_identity(&self, id: ObjectId, key: &str) -> Result<()>;
}

/// Owning-subsystem collaborator: the backend authoritative for a set of
/// resource types.
///
/// Dispatch failures are surfaced verbatim and never retried by the core.
/// Connectivity is tracked separately by the connection tracker; a
/// dispatched call may still fail if the link drops after the readiness
/// check.
#[async_trait]
pub trait Subsystem: Send + Sync {
    /// Subsystem name as registered with the tracker
    fn name(&self) -> &str;

    /// Apply a validated create
    async fn create(&self, obj: &ConfigObject) -> Result<()>;

    /// Apply a validated update.
    ///
    /// `diff` marks the fields that actually changed; `ops` carries the
    /// patch list when the update came in patch form.
    async fn update(
        &self,
        before: &ConfigObject,
        merged: &ConfigObject,
        diff: &DiffResult,
        ops: &[PatchOp],
        key: &str,
    ) -> Result<()>;

    /// Apply a delete
    async fn delete(&self, obj: &ConfigObject, key: &str) -> Result<()>;

    /// Read live state for an object
    async fn get(&self, obj: &ConfigObject) -> Result<ConfigObject>;

    /// Read a bounded, ordered slice of objects from the subsystem
    async fn bulk_get(&self, template: &ConfigObject, start: i64, count: i64) -> Result<BulkSlice>;

    /// Execute a non-CRUD action
    async fn action(&self, action: &str, payload: &Value) -> Result<()>;

    /// Pre-dispatch validation hook for merged updates
    async fn pre_validate(&self, _obj: &ConfigObject) -> Result<()> {
        Ok(())
    }

    /// Best-effort post-update hook; failures never flip the result
    async fn post_process(&self, _obj: &ConfigObject) -> Result<()> {
        Ok(())
    }
}
