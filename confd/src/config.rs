//! Daemon configuration.
//!
//! Loaded once at startup from a JSON file under the params directory and
//! validated before anything else spins up. The loaded values feed the
//! registry builder and the bootstrap sequencer.

use crate::bootstrap::BootstrapConfig;
use confd_core::{ConfdError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

fn default_registry_file() -> String {
    "objectconfig.json".to_string()
}

fn default_actions_file() -> String {
    "actionconfig.json".to_string()
}

fn default_profile_file() -> String {
    "systemProfile.json".to_string()
}

fn default_discovery_subsystem() -> String {
    "asicd".to_string()
}

fn default_discovery_resource() -> String {
    "Port".to_string()
}

fn default_discovery_count() -> i64 {
    256
}

fn default_logging_resource() -> String {
    "ComponentLogging".to_string()
}

fn default_local_subsystem() -> String {
    "local".to_string()
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the declarative configuration files
    pub params_dir: PathBuf,
    /// Resource registry records, relative to `params_dir`
    #[serde(default = "default_registry_file")]
    pub registry_file: String,
    /// Action registry records, relative to `params_dir`
    #[serde(default = "default_actions_file")]
    pub actions_file: String,
    /// System profile backing profile-filled defaults, relative to
    /// `params_dir`
    #[serde(default = "default_profile_file")]
    pub profile_file: String,
    /// Subsystem whose connect triggers resource discovery
    #[serde(default = "default_discovery_subsystem")]
    pub discovery_subsystem: String,
    /// Resource type enumerated during discovery
    #[serde(default = "default_discovery_resource")]
    pub discovery_resource: String,
    /// Maximum objects pulled by the discovery bulk read
    #[serde(default = "default_discovery_count")]
    pub discovery_count: i64,
    /// Resource type holding per-subsystem logging configuration
    #[serde(default = "default_logging_resource")]
    pub logging_resource: String,
    /// Subsystem name aliased to the daemon itself
    #[serde(default = "default_local_subsystem")]
    pub local_subsystem: String,
}

impl DaemonConfig {
    /// Configuration rooted at a params directory, all files at their
    /// default names
    pub fn new(params_dir: impl Into<PathBuf>) -> Self {
        Self {
            params_dir: params_dir.into(),
            registry_file: default_registry_file(),
            actions_file: default_actions_file(),
            profile_file: default_profile_file(),
            discovery_subsystem: default_discovery_subsystem(),
            discovery_resource: default_discovery_resource(),
            discovery_count: default_discovery_count(),
            logging_resource: default_logging_resource(),
            local_subsystem: default_local_subsystem(),
        }
    }

    /// Load and validate configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        info!(path = %path.display(), "loaded daemon configuration");
        Ok(config)
    }

    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.params_dir.as_os_str().is_empty() {
            return Err(ConfdError::config("params_dir must not be empty"));
        }
        if self.discovery_count <= 0 {
            return Err(ConfdError::config(format!(
                "discovery_count must be positive, got {}",
                self.discovery_count
            )));
        }
        if self.discovery_subsystem.is_empty() {
            return Err(ConfdError::config("discovery_subsystem must not be empty"));
        }
        if self.discovery_resource.is_empty() {
            return Err(ConfdError::config("discovery_resource must not be empty"));
        }
        Ok(())
    }

    /// Absolute path of the resource registry file
    pub fn registry_path(&self) -> PathBuf {
        self.params_dir.join(&self.registry_file)
    }

    /// Absolute path of the action registry file
    pub fn actions_path(&self) -> PathBuf {
        self.params_dir.join(&self.actions_file)
    }

    /// Absolute path of the system profile file
    pub fn profile_path(&self) -> PathBuf {
        self.params_dir.join(&self.profile_file)
    }

    /// Bootstrap parameters derived from this configuration
    pub fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            discovery_subsystem: self.discovery_subsystem.clone(),
            discovery_resource: self.discovery_resource.clone(),
            discovery_start: 0,
            discovery_count: self.discovery_count,
            profile_file: Some(self.profile_path()),
            logging_resource: self.logging_resource.clone(),
            local_subsystem: self.local_subsystem.clone(),
            daemon_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}
