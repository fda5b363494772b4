//! Core types and abstractions for the confd configuration daemon.
//!
//! This crate provides the object model, schema descriptors, collaborator
//! traits, and error handling shared by all confd components.

pub mod error;
pub mod id;
pub mod object;
pub mod patch;
pub mod schema;
pub mod traits;

pub use error::{ConfdError, Result};
pub use id::ObjectId;
pub use object::{ConfigObject, DiffResult, UpdateSet};
pub use patch::{PatchOp, PatchOpKind, UpdateRequest};
pub use schema::{FieldSpec, Schema};
pub use traits::{BulkSlice, Store, Subsystem};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ConfdError, Result};
    pub use crate::id::ObjectId;
    pub use crate::object::{ConfigObject, DiffResult, UpdateSet};
    pub use crate::patch::{PatchOp, PatchOpKind, UpdateRequest};
    pub use crate::schema::{FieldSpec, Schema};
    pub use crate::traits::{BulkSlice, Store, Subsystem};
}
