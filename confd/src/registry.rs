//! Resource and action registries.
//!
//! The registry is the static map from a resource type to its owning
//! subsystem, schema descriptor, and bootstrap flags. It is built once at
//! startup from declarative configuration and is read-only afterwards, so
//! lookups take no locks. It is an explicitly constructed context object,
//! never process-global state.

use confd_core::{ConfdError, Result, Schema, Subsystem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Declarative registry record for one resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type name
    pub resource: String,
    /// Name of the owning subsystem
    pub owner: String,
    /// Synthesize a default object when the owner connects
    #[serde(default)]
    pub auto_create: bool,
    /// Bulk-read this type from the owner and persist what it reports
    #[serde(default)]
    pub auto_discover: bool,
    /// Resource types whose defaults fan out per discovered component
    #[serde(default)]
    pub linked_objects: Vec<String>,
    /// Field whose value is recorded per discovered object and stamped
    /// into linked defaults (discovery resource only)
    #[serde(default)]
    pub link_field: Option<String>,
    /// Fill the default object from the external profile file instead of
    /// schema zero values
    #[serde(default)]
    pub uses_profile: bool,
}

/// Declarative registry record for one action type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Action type name
    pub action: String,
    /// Name of the owning subsystem
    pub owner: String,
}

/// Resolved registry entry for one resource type. Immutable after build.
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub resource: String,
    pub owner: Arc<dyn Subsystem>,
    pub schema: Arc<Schema>,
    pub auto_create: bool,
    pub auto_discover: bool,
    pub linked_objects: Vec<String>,
    pub link_field: Option<String>,
    pub uses_profile: bool,
}

impl std::fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("resource", &self.resource)
            .field("owner", &self.owner.name())
            .field("auto_create", &self.auto_create)
            .field("auto_discover", &self.auto_discover)
            .field("linked_objects", &self.linked_objects)
            .field("link_field", &self.link_field)
            .field("uses_profile", &self.uses_profile)
            .finish()
    }
}

/// Resolved registry entry for one action type.
#[derive(Clone)]
pub struct ActionDescriptor {
    pub action: String,
    pub owner: Arc<dyn Subsystem>,
}

impl std::fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("action", &self.action)
            .field("owner", &self.owner.name())
            .finish()
    }
}

/// Static resource-type → descriptor map.
pub struct Registry {
    resources: HashMap<String, ResourceDescriptor>,
    actions: HashMap<String, ActionDescriptor>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("resources", &self.resources)
            .field("actions", &self.actions)
            .finish()
    }
}

impl Registry {
    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Resolve a resource type to its descriptor
    pub fn resolve(&self, resource: &str) -> Result<&ResourceDescriptor> {
        self.resources
            .get(resource)
            .ok_or_else(|| ConfdError::not_found("resource type", resource))
    }

    /// Resource types registered as linked to the given type
    pub fn linked_objects(&self, resource: &str) -> &[String] {
        self.resources
            .get(resource)
            .map(|d| d.linked_objects.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve an action type to its descriptor
    pub fn resolve_action(&self, action: &str) -> Result<&ActionDescriptor> {
        self.actions
            .get(action)
            .ok_or_else(|| ConfdError::not_found("action type", action))
    }

    /// All registered descriptors
    pub fn descriptors(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values()
    }

    /// Auto-create resource types owned by the named subsystem
    pub fn auto_create_owned_by(&self, subsystem: &str) -> Vec<&ResourceDescriptor> {
        self.resources
            .values()
            .filter(|d| d.auto_create && d.owner.name() == subsystem)
            .collect()
    }

    /// Auto-discover resource types owned by the named subsystem
    pub fn auto_discover_owned_by(&self, subsystem: &str) -> Vec<&ResourceDescriptor> {
        self.resources
            .values()
            .filter(|d| d.auto_discover && d.owner.name() == subsystem)
            .collect()
    }

    /// Names of every subsystem that owns at least one resource
    pub fn subsystem_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .resources
            .values()
            .map(|d| d.owner.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Builder assembling subsystem handles, schemas, and declarative records
/// into an immutable [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    subsystems: HashMap<String, Arc<dyn Subsystem>>,
    schemas: HashMap<String, Arc<Schema>>,
    resources: Vec<ResourceConfig>,
    actions: Vec<ActionConfig>,
}

impl RegistryBuilder {
    /// Register an owning-subsystem handle
    pub fn subsystem(mut self, subsystem: Arc<dyn Subsystem>) -> Self {
        self.subsystems
            .insert(subsystem.name().to_string(), subsystem);
        self
    }

    /// Register a resource schema
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schemas
            .insert(schema.resource().to_string(), Arc::new(schema));
        self
    }

    /// Add one resource record
    pub fn resource(mut self, config: ResourceConfig) -> Self {
        self.resources.push(config);
        self
    }

    /// Add one action record
    pub fn action(mut self, config: ActionConfig) -> Self {
        self.actions.push(config);
        self
    }

    /// Load resource records from a JSON file
    pub fn resources_from_file(mut self, path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let mut configs: Vec<ResourceConfig> = serde_json::from_str(&data)?;
        self.resources.append(&mut configs);
        Ok(self)
    }

    /// Load action records from a JSON file
    pub fn actions_from_file(mut self, path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let mut configs: Vec<ActionConfig> = serde_json::from_str(&data)?;
        self.actions.append(&mut configs);
        Ok(self)
    }

    /// Resolve every record against its owner and schema
    pub fn build(self) -> Result<Registry> {
        let mut resources = HashMap::new();
        for config in self.resources {
            let owner = self.subsystems.get(&config.owner).cloned().ok_or_else(|| {
                ConfdError::config(format!(
                    "resource {} names unknown subsystem {}",
                    config.resource, config.owner
                ))
            })?;
            let schema = self.schemas.get(&config.resource).cloned().ok_or_else(|| {
                ConfdError::config(format!("no schema registered for {}", config.resource))
            })?;
            resources.insert(
                config.resource.clone(),
                ResourceDescriptor {
                    resource: config.resource,
                    owner,
                    schema,
                    auto_create: config.auto_create,
                    auto_discover: config.auto_discover,
                    linked_objects: config.linked_objects,
                    link_field: config.link_field,
                    uses_profile: config.uses_profile,
                },
            );
        }

        let mut actions = HashMap::new();
        for config in self.actions {
            let owner = self.subsystems.get(&config.owner).cloned().ok_or_else(|| {
                ConfdError::config(format!(
                    "action {} names unknown subsystem {}",
                    config.action, config.owner
                ))
            })?;
            actions.insert(
                config.action.clone(),
                ActionDescriptor {
                    action: config.action,
                    owner,
                },
            );
        }

        Ok(Registry { resources, actions })
    }
}
