//! Error types for the confd system.

/// Result type alias for confd operations.
pub type Result<T> = std::result::Result<T, ConfdError>;

/// Main error type for the confd system.
#[derive(Debug, thiserror::Error)]
pub enum ConfdError {
    /// Resource type, identifier, or natural key absent
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Create issued against an existing natural key
    #[error("Already configured: {key}. Delete and Update operations are allowed")]
    AlreadyConfigured { key: String },

    /// Readiness gate failed; names the unreachable subsystem
    #[error("Not connected to {subsystem}")]
    SubsystemUnavailable { subsystem: String },

    /// Owning subsystem rejected the dispatched operation
    #[error("Backend subsystem failed to apply configuration: {0}")]
    Subsystem(String),

    /// Merge would change a key field
    #[error("Cannot update key in an object")]
    KeyImmutable,

    /// Update produced no dirty fields
    #[error("Nothing to be updated")]
    NoChange,

    /// Malformed or unresolvable patch operation
    #[error("Invalid patch: {0}")]
    PatchInvalid(String),

    /// Pre-dispatch validation hook rejected the merged object
    #[error("Config validation failed: {0}")]
    ValidationFailed(String),

    /// Requested page exceeds the hard ceiling
    #[error("More than maximum number of objects requested in a bulk get: {requested} > {max}")]
    BulkTooLarge { requested: i64, max: i64 },

    /// Create payload names no fields
    #[error("Insufficient information: nothing to configure")]
    NoContent,

    /// Post-dispatch identity write failed; configuration has been applied
    #[error("Failed to store id mapping: {0}. However, configuration has been applied")]
    IdentityPersistFailed(String),

    /// Post-dispatch persisted-object write failed; configuration has been applied
    #[error("Failed to store object: {0}. However, configuration has been applied")]
    ObjectPersistFailed(String),

    /// Post-dispatch identity removal failed; configuration has been removed
    #[error("Failed to delete id mapping: {0}. However, configuration has been removed")]
    IdentityReleaseFailed(String),

    /// Internal invariant violation: natural key already identity-mapped
    #[error("Identity conflict: key {key} already has an assigned identifier")]
    IdentityConflict { key: String },

    /// Payload could not be decoded against the resource schema
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Persistence collaborator errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapped anyhow errors for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConfdError {
    /// Create a new not found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a new already-configured error
    pub fn already_configured(key: impl Into<String>) -> Self {
        Self::AlreadyConfigured { key: key.into() }
    }

    /// Create a new subsystem-unavailable error
    pub fn subsystem_unavailable(subsystem: impl Into<String>) -> Self {
        Self::SubsystemUnavailable {
            subsystem: subsystem.into(),
        }
    }

    /// Create a new subsystem dispatch error
    pub fn subsystem(msg: impl Into<String>) -> Self {
        Self::Subsystem(msg.into())
    }

    /// Create a new invalid-patch error
    pub fn patch_invalid(msg: impl Into<String>) -> Self {
        Self::PatchInvalid(msg.into())
    }

    /// Create a new validation error
    pub fn validation_failed(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Create a new identity conflict error
    pub fn identity_conflict(key: impl Into<String>) -> Self {
        Self::IdentityConflict { key: key.into() }
    }

    /// Create a new invalid-payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a readiness gate failure
    pub fn is_subsystem_unavailable(&self) -> bool {
        matches!(self, Self::SubsystemUnavailable { .. })
    }

    /// Check if this is a subsystem dispatch failure
    pub fn is_subsystem(&self) -> bool {
        matches!(self, Self::Subsystem(_))
    }

    /// Check if this is the no-change update outcome
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }

    /// Check if this is a post-dispatch bookkeeping (orphan) failure
    pub fn is_orphan(&self) -> bool {
        matches!(
            self,
            Self::IdentityPersistFailed(_)
                | Self::ObjectPersistFailed(_)
                | Self::IdentityReleaseFailed(_)
        )
    }
}
