//! Object lifecycle and identity-resolution engine for the confd
//! configuration daemon.
//!
//! This crate hosts the control-plane core: the resource registry, the
//! identity map, the diff/merge engine, bulk pagination, the CRUD/action
//! orchestrator, subsystem connection tracking, and the bootstrap
//! sequencer that brings default and discovered objects into existence as
//! backend subsystems come online. Wire transport and durable persistence
//! stay behind the collaborator traits in `confd-core`.

pub mod bootstrap;
pub mod config;
pub mod identity;
pub mod lifecycle;
pub mod merge;
pub mod paging;
pub mod registry;
pub mod stats;
pub mod status;
pub mod store;
pub mod tracker;

pub use bootstrap::{BootstrapConfig, BootstrapEvent, BootstrapSequencer};
pub use config::DaemonConfig;
pub use identity::IdentityMap;
pub use lifecycle::{BulkPage, ObjectManager, RetrievedObject};
pub use paging::MAX_BULK_OBJECTS;
pub use registry::{ActionDescriptor, Registry, ResourceConfig, ResourceDescriptor};
pub use stats::{ApiStats, OpKind, StatsSnapshot};
pub use status::{StatusReporter, SystemStatus};
pub use store::MemoryStore;
pub use tracker::{ConnectionTracker, SubsystemState};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bootstrap::{BootstrapConfig, BootstrapEvent, BootstrapSequencer};
    pub use crate::config::DaemonConfig;
    pub use crate::identity::IdentityMap;
    pub use crate::lifecycle::{BulkPage, ObjectManager, RetrievedObject};
    pub use crate::paging::MAX_BULK_OBJECTS;
    pub use crate::registry::{ActionDescriptor, Registry, ResourceConfig, ResourceDescriptor};
    pub use crate::stats::{ApiStats, OpKind, StatsSnapshot};
    pub use crate::status::{StatusReporter, SystemStatus};
    pub use crate::store::MemoryStore;
    pub use crate::tracker::{ConnectionTracker, SubsystemState};
    pub use confd_core::prelude::*;
}
