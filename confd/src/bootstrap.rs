//! Bootstrap sequencing.
//!
//! One long-lived task consumes one event stream, one event per
//! subsystem-connected signal, strictly in arrival order: each event is
//! fully handled before the next is read, so no two subsystems' bring-up
//! interleaves. An `InitComplete` sentinel ends the sequencer permanently.
//!
//! On the discovery subsystem's connect, hardware-derived objects are
//! enumerated and persisted, and their link-field values are recorded for
//! resource types registered as linked. On any other subsystem's connect,
//! every auto-create type it owns gets its default objects: one per
//! recorded linked component where components are pending, otherwise
//! exactly one zero-value default, with one special-cased type filled from
//! an external profile file. A generic auto-discovery pass and a
//! component-logging create-if-absent round out each bring-up.
//!
//! Any single object's failure is logged and skipped; it never aborts the
//! sequencer or the subsystem's bring-up.

use crate::identity::IdentityMap;
use crate::registry::{Registry, ResourceDescriptor};
use confd_core::{ConfigObject, Result, Store};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Ceiling on objects pulled per resource type during auto-discovery.
pub const MAX_AUTO_DISCOVER_OBJECTS: i64 = 200;

/// One bootstrap notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapEvent {
    /// A subsystem finished connecting
    SubsystemConnected(String),
    /// No further bring-up events will arrive
    InitComplete,
}

/// Static bootstrap parameters.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Subsystem whose connect triggers hardware/resource discovery
    pub discovery_subsystem: String,
    /// Resource type enumerated during discovery
    pub discovery_resource: String,
    /// First marker passed to the discovery bulk read
    pub discovery_start: i64,
    /// Maximum objects pulled by the discovery bulk read
    pub discovery_count: i64,
    /// Profile file backing the special-cased default object
    pub profile_file: Option<PathBuf>,
    /// Resource type holding per-subsystem logging configuration
    pub logging_resource: String,
    /// Subsystem name that maps to the daemon's own module
    pub local_subsystem: String,
    /// The daemon's own module name for logging configuration
    pub daemon_name: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            discovery_subsystem: "asicd".to_string(),
            discovery_resource: "Port".to_string(),
            discovery_start: 0,
            discovery_count: 256,
            profile_file: None,
            logging_resource: "ComponentLogging".to_string(),
            local_subsystem: "local".to_string(),
            daemon_name: "confd".to_string(),
        }
    }
}

/// Key components recorded for one linked resource type, waiting for its
/// owner to connect. Consumed once, then discarded.
struct PendingLinkedKeys {
    field: String,
    components: Vec<Value>,
}

/// Single consumer of the bootstrap event stream.
pub struct BootstrapSequencer {
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    identity: IdentityMap,
    config: BootstrapConfig,
    pending: HashMap<String, PendingLinkedKeys>,
}

impl BootstrapSequencer {
    /// Create a sequencer over its collaborators
    pub fn new(registry: Arc<Registry>, store: Arc<dyn Store>, config: BootstrapConfig) -> Self {
        let identity = IdentityMap::new(store.clone());
        Self {
            registry,
            store,
            identity,
            config,
            pending: HashMap::new(),
        }
    }

    /// Consume events until `InitComplete` or the stream closes.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<BootstrapEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        info!("bootstrap sequencer finished");
    }

    /// Handle one event; returns false once initialization is complete.
    pub async fn handle_event(&mut self, event: BootstrapEvent) -> bool {
        match event {
            BootstrapEvent::InitComplete => false,
            BootstrapEvent::SubsystemConnected(name) => {
                info!(subsystem = %name, "bootstrapping connected subsystem");
                if name == self.config.discovery_subsystem {
                    self.discover_resources().await;
                } else {
                    self.auto_create_defaults(&name).await;
                }
                self.auto_discover(&name).await;
                self.ensure_component_logging(&name).await;
                true
            }
        }
    }

    /// Enumerate hardware-derived objects from the discovery subsystem,
    /// persist the new ones, and record linked-key components.
    async fn discover_resources(&mut self) {
        let resource = self.config.discovery_resource.clone();
        debug!(resource, "discovering resources");
        let desc = match self.registry.resolve(&resource) {
            Ok(desc) => desc.clone(),
            Err(e) => {
                warn!(resource, error = %e, "discovery resource not registered");
                return;
            }
        };

        let template = desc.schema.zero_object();
        let slice = match desc
            .owner
            .bulk_get(&template, self.config.discovery_start, self.config.discovery_count)
            .await
        {
            Ok(slice) => slice,
            Err(e) => {
                warn!(resource, error = %e, "discovery bulk read failed");
                return;
            }
        };

        let linked = self.registry.linked_objects(&resource).to_vec();
        let link_field = desc
            .link_field
            .clone()
            .or_else(|| desc.schema.key_fields().next().map(str::to_string));

        let mut discovered = 0usize;
        for object in slice.objects {
            if let Err(e) = self
                .store_discovered(&desc, &object, &linked, link_field.as_deref())
                .await
            {
                warn!(resource, error = %e, "failed to store discovered object");
                continue;
            }
            discovered += 1;
        }
        info!(resource, discovered, "discovery pass complete");
    }

    async fn store_discovered(
        &mut self,
        desc: &ResourceDescriptor,
        object: &ConfigObject,
        linked: &[String],
        link_field: Option<&str>,
    ) -> Result<()> {
        let key = desc.schema.natural_key(object)?;
        if self.store.get(&desc.resource, &key).await?.is_some() {
            return Ok(());
        }
        self.store.put(&key, object).await?;
        self.identity.confirm(&key).await?;

        if let Some(field) = link_field {
            if let Some(component) = object.get(field) {
                for linked_type in linked {
                    self.pending
                        .entry(linked_type.clone())
                        .or_insert_with(|| PendingLinkedKeys {
                            field: field.to_string(),
                            components: Vec::new(),
                        })
                        .components
                        .push(component.clone());
                }
            }
        }
        Ok(())
    }

    /// Create default objects for every auto-create type the subsystem
    /// owns.
    async fn auto_create_defaults(&mut self, subsystem: &str) {
        let descriptors: Vec<ResourceDescriptor> = self
            .registry
            .auto_create_owned_by(subsystem)
            .into_iter()
            .cloned()
            .collect();
        for desc in descriptors {
            if desc.uses_profile {
                match self.profile_object(&desc) {
                    Some(object) => self.create_default(&desc, object).await,
                    None => continue,
                }
            } else if let Some(pending) = self.pending.remove(&desc.resource) {
                // One default per discovered component, not one total
                for component in pending.components {
                    let mut object = desc.schema.zero_object();
                    object.set(&pending.field, component);
                    self.create_default(&desc, object).await;
                }
            } else {
                self.create_default(&desc, desc.schema.zero_object()).await;
            }
        }
    }

    /// Default object filled from the external profile file.
    fn profile_object(&self, desc: &ResourceDescriptor) -> Option<ConfigObject> {
        let path = match &self.config.profile_file {
            Some(path) => path,
            None => {
                warn!(resource = %desc.resource, "no profile file configured");
                return None;
            }
        };
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(resource = %desc.resource, path = %path.display(), error = %e, "failed to read profile file");
                return None;
            }
        };
        let payload: Value = match serde_json::from_str(&data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(resource = %desc.resource, error = %e, "malformed profile file");
                return None;
            }
        };
        match desc.schema.decode(&payload) {
            Ok((object, _)) => Some(object),
            Err(e) => {
                warn!(resource = %desc.resource, error = %e, "profile does not match schema");
                None
            }
        }
    }

    /// Create-if-absent for one default object; existing objects get their
    /// identity confirmed instead.
    async fn create_default(&self, desc: &ResourceDescriptor, object: ConfigObject) {
        let key = match desc.schema.natural_key(&object) {
            Ok(key) => key,
            Err(e) => {
                warn!(resource = %desc.resource, error = %e, "cannot derive key for default object");
                return;
            }
        };
        match self.store.get(&desc.resource, &key).await {
            Ok(Some(_)) => {
                if let Err(e) = self.identity.confirm(&key).await {
                    warn!(key, error = %e, "identity backfill failed");
                }
            }
            Ok(None) => {
                if let Err(e) = desc.owner.create(&object).await {
                    warn!(resource = %desc.resource, key, error = %e, "default create rejected");
                    return;
                }
                if let Err(e) = self.store.put(&key, &object).await {
                    warn!(key, error = %e, "failed to persist default object");
                    return;
                }
                if let Err(e) = self.identity.confirm(&key).await {
                    warn!(key, error = %e, "failed to assign identity to default object");
                }
                debug!(resource = %desc.resource, key, "default object created");
            }
            Err(e) => warn!(key, error = %e, "existence check failed for default object"),
        }
    }

    /// Bulk-read every other discoverable type the subsystem owns and
    /// persist what it reports, independent of the auto-create flow.
    async fn auto_discover(&self, subsystem: &str) {
        let descriptors: Vec<ResourceDescriptor> = self
            .registry
            .auto_discover_owned_by(subsystem)
            .into_iter()
            .cloned()
            .collect();
        for desc in descriptors {
            if desc.resource == self.config.discovery_resource {
                continue;
            }
            let template = desc.schema.zero_object();
            let slice = match desc
                .owner
                .bulk_get(&template, 0, MAX_AUTO_DISCOVER_OBJECTS)
                .await
            {
                Ok(slice) => slice,
                Err(e) => {
                    warn!(resource = %desc.resource, error = %e, "auto-discover bulk read failed");
                    continue;
                }
            };
            for object in slice.objects {
                let key = match desc.schema.natural_key(&object) {
                    Ok(key) => key,
                    Err(e) => {
                        warn!(resource = %desc.resource, error = %e, "cannot derive key for discovered object");
                        continue;
                    }
                };
                match self.store.get(&desc.resource, &key).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        if let Err(e) = self.store.put(&key, &object).await {
                            warn!(key, error = %e, "failed to store auto-discovered object");
                            continue;
                        }
                        if let Err(e) = self.identity.confirm(&key).await {
                            warn!(key, error = %e, "failed to assign identity to auto-discovered object");
                        }
                    }
                    Err(e) => warn!(key, error = %e, "existence check failed during auto-discover"),
                }
            }
        }
    }

    /// Ensure a per-subsystem logging-configuration object exists with the
    /// schema's default level.
    async fn ensure_component_logging(&self, subsystem: &str) {
        let desc = match self.registry.resolve(&self.config.logging_resource) {
            Ok(desc) => desc,
            Err(_) => return,
        };
        let module = if subsystem == self.config.local_subsystem {
            self.config.daemon_name.as_str()
        } else {
            subsystem
        };
        let module_field = match desc.schema.key_fields().next() {
            Some(field) => field.to_string(),
            None => {
                warn!(resource = %desc.resource, "logging resource has no key field");
                return;
            }
        };
        let mut object = desc.schema.zero_object();
        object.set(&module_field, Value::String(module.to_string()));
        let key = match desc.schema.natural_key(&object) {
            Ok(key) => key,
            Err(e) => {
                warn!(module, error = %e, "cannot derive logging key");
                return;
            }
        };
        match self.store.get(&desc.resource, &key).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = self.store.put(&key, &object).await {
                    warn!(module, error = %e, "failed to store logging configuration");
                    return;
                }
                if let Err(e) = self.identity.confirm(&key).await {
                    warn!(module, error = %e, "failed to assign identity to logging configuration");
                }
                debug!(module, "component logging configuration created");
            }
            Err(e) => warn!(module, error = %e, "logging existence check failed"),
        }
    }
}
