//! The configuration object record and diff bookkeeping.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A schema-typed record of named field values.
///
/// Objects are plain field maps; all shape knowledge (field order, key
/// fields, defaults) lives in the resource's [`Schema`](crate::Schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigObject {
    resource: String,
    values: BTreeMap<String, Value>,
}

impl ConfigObject {
    /// Create an empty object for a resource type
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            values: BTreeMap::new(),
        }
    }

    /// Resource type name
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Get a field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Set a field value
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Field names and values
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

/// The set of field names a caller intends to change.
///
/// Derived from which fields were present in the wire payload.
#[derive(Debug, Clone, Default)]
pub struct UpdateSet {
    names: Vec<String>,
}

impl UpdateSet {
    /// Create an update set from field names
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Whether the named field is in the set
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Field names in the set
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Per-field dirty vector, one entry per schema field in schema order.
///
/// True where the merged value differs from the persisted value. Passed to
/// the owning subsystem so it can react only to the fields that changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    dirty: Vec<bool>,
}

impl DiffResult {
    /// Create a clean diff over `len` fields
    pub fn new(len: usize) -> Self {
        Self {
            dirty: vec![false; len],
        }
    }

    /// Mark the field at `index` as changed
    pub fn mark(&mut self, index: usize) {
        if let Some(slot) = self.dirty.get_mut(index) {
            *slot = true;
        }
    }

    /// Whether the field at `index` changed
    pub fn is_dirty(&self, index: usize) -> bool {
        self.dirty.get(index).copied().unwrap_or(false)
    }

    /// Whether any field changed
    pub fn any(&self) -> bool {
        self.dirty.iter().any(|d| *d)
    }

    /// Number of fields covered
    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    /// Whether the diff covers zero fields
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Dirty flags in schema field order
    pub fn as_slice(&self) -> &[bool] {
        &self.dirty
    }
}
