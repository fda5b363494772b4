//! Typed patch operations.
//!
//! Update payloads come in two shapes: a whole-object merge payload, or a
//! payload carrying a `patch` member with an ordered list of operations.
//! The list is parsed once into typed records here; no component downstream
//! ever touches raw payload text.

use crate::error::{ConfdError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

/// One patch operation: kind, field path, and the new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    /// Field name addressed by this operation's path.
    ///
    /// Paths address top-level schema fields, with or without a leading
    /// slash.
    pub fn field_name(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }
}

/// Parsed update description: whole-object merge or ordered patch list.
#[derive(Debug, Clone)]
pub enum UpdateRequest {
    /// Merge the fields present in the payload into persisted state
    Merge,
    /// Apply the contained operations in order
    Patch(Vec<PatchOp>),
}

impl UpdateRequest {
    /// Extract the update mode from a wire payload.
    ///
    /// A `patch` member selects patch mode; its value must be an array of
    /// well-formed operations.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let map = payload
            .as_object()
            .ok_or_else(|| ConfdError::invalid_payload("payload is not a JSON object"))?;
        match map.get("patch") {
            None => Ok(Self::Merge),
            Some(patch) => {
                let ops: Vec<PatchOp> = serde_json::from_value(patch.clone())
                    .map_err(|e| ConfdError::patch_invalid(format!("malformed patch list: {}", e)))?;
                if ops.is_empty() {
                    return Err(ConfdError::patch_invalid("empty patch list"));
                }
                Ok(Self::Patch(ops))
            }
        }
    }
}
