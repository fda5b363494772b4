//! Per-resource schema descriptors.
//!
//! Each resource type carries an explicit, ordered list of field descriptors.
//! The descriptor list replaces runtime reflection: diff, merge, and key
//! derivation all walk the same ordered field set, and the designated key
//! fields define the object's natural key.

use crate::error::{ConfdError, Result};
use crate::object::ConfigObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptor for a single schema field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears in wire payloads
    pub name: String,
    /// Whether this field participates in the natural key
    pub key: bool,
    /// Zero value used for default-object synthesis and patch removes
    pub default: Value,
}

/// Ordered field-descriptor list for one resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    resource: String,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Create an empty schema for a resource type
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            fields: Vec::new(),
        }
    }

    /// Add a non-key field with a default value
    pub fn field(mut self, name: impl Into<String>, default: Value) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            key: false,
            default,
        });
        self
    }

    /// Add a key field with a default value
    pub fn key_field(mut self, name: impl Into<String>, default: Value) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            key: true,
            default,
        });
        self
    }

    /// Resource type name this schema describes
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Ordered field descriptors
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Position of a field in schema order
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Whether the named field is part of the natural key
    pub fn is_key_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.key && f.name == name)
    }

    /// Names of the key fields, in schema order
    pub fn key_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.key).map(|f| f.name.as_str())
    }

    /// Synthesize an object with every field at its default value
    pub fn zero_object(&self) -> ConfigObject {
        let mut obj = ConfigObject::new(&self.resource);
        for field in &self.fields {
            obj.set(&field.name, field.default.clone());
        }
        obj
    }

    /// Derive the object's natural key from its key-field values.
    ///
    /// The key is stable as long as no key field changes, and is derivable
    /// purely from the object itself. Singleton resources (no key fields)
    /// key on the type name alone.
    pub fn natural_key(&self, obj: &ConfigObject) -> Result<String> {
        let mut key = self.resource.clone();
        for field in &self.fields {
            if !field.key {
                continue;
            }
            let value = obj.get(&field.name).unwrap_or(&field.default);
            key.push('#');
            key.push_str(&render_key_component(value));
        }
        Ok(key)
    }

    /// Decode a wire payload into an object plus the set of fields present.
    ///
    /// Fields absent from the payload take their schema defaults. The
    /// reserved `patch` member is skipped here; patch extraction is handled
    /// separately. Unknown members fail the decode.
    pub fn decode(&self, payload: &Value) -> Result<(ConfigObject, crate::object::UpdateSet)> {
        let map = payload
            .as_object()
            .ok_or_else(|| ConfdError::invalid_payload("payload is not a JSON object"))?;

        for name in map.keys() {
            if name != "patch" && self.field_index(name).is_none() {
                return Err(ConfdError::invalid_payload(format!(
                    "unknown field {} for resource {}",
                    name, self.resource
                )));
            }
        }

        let mut obj = ConfigObject::new(&self.resource);
        let mut present = Vec::new();
        for field in &self.fields {
            match map.get(&field.name) {
                Some(value) => {
                    obj.set(&field.name, value.clone());
                    present.push(field.name.clone());
                }
                None => obj.set(&field.name, field.default.clone()),
            }
        }
        Ok((obj, crate::object::UpdateSet::new(present)))
    }
}

/// Render one key-field value as a key component.
fn render_key_component(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
