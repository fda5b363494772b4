//! Subsystem connection tracking.
//!
//! One state per registered subsystem, written by the transport-side
//! updater and read lock-free by the orchestrator and the bootstrap
//! sequencer. Readers take a single snapshot per check; a subsystem may
//! disconnect between the check and a dispatch, in which case the dispatch
//! itself fails with a subsystem error.

use crate::bootstrap::BootstrapEvent;
use confd_core::{ConfdError, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Connection state of one backend subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsystemState {
    Disconnected,
    Connecting,
    Connected,
}

/// Tracks liveness of every registered subsystem and publishes a bootstrap
/// event each time one reaches `Connected`.
pub struct ConnectionTracker {
    states: DashMap<String, SubsystemState>,
    events: Option<mpsc::UnboundedSender<BootstrapEvent>>,
}

impl ConnectionTracker {
    /// Create a tracker with no registered subsystems
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            events: None,
        }
    }

    /// Publish connect events to the bootstrap sequencer's stream
    pub fn with_events(mut self, events: mpsc::UnboundedSender<BootstrapEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Register a subsystem in the `Disconnected` state
    pub fn register(&self, name: impl Into<String>) {
        self.states
            .insert(name.into(), SubsystemState::Disconnected);
    }

    /// Apply one state transition.
    ///
    /// Legal edges: `Disconnected → Connecting → Connected`, plus
    /// `Connected → Disconnected` on link loss. Anything else is rejected.
    pub fn set_state(&self, name: &str, next: SubsystemState) -> Result<()> {
        let mut entry = self
            .states
            .get_mut(name)
            .ok_or_else(|| ConfdError::not_found("subsystem", name))?;
        let current = *entry;
        if current == next {
            return Ok(());
        }
        let legal = matches!(
            (current, next),
            (SubsystemState::Disconnected, SubsystemState::Connecting)
                | (SubsystemState::Connecting, SubsystemState::Connected)
                | (SubsystemState::Connected, SubsystemState::Disconnected)
        );
        if !legal {
            return Err(ConfdError::internal(format!(
                "illegal transition {:?} -> {:?} for subsystem {}",
                current, next, name
            )));
        }
        *entry = next;
        drop(entry);
        debug!(subsystem = name, ?current, ?next, "subsystem state change");

        if next == SubsystemState::Connected {
            if let Some(events) = &self.events {
                if events
                    .send(BootstrapEvent::SubsystemConnected(name.to_string()))
                    .is_err()
                {
                    // Sequencer has already finished; connects after init
                    // complete need no bring-up.
                    warn!(subsystem = name, "bootstrap stream closed, connect event dropped");
                }
            }
        }
        Ok(())
    }

    /// Drive a subsystem through `Connecting` to `Connected`
    pub fn mark_connected(&self, name: &str) -> Result<()> {
        let current = self.state(name);
        if current == Some(SubsystemState::Disconnected) {
            self.set_state(name, SubsystemState::Connecting)?;
        }
        self.set_state(name, SubsystemState::Connected)
    }

    /// Current state of a subsystem
    pub fn state(&self, name: &str) -> Option<SubsystemState> {
        self.states.get(name).map(|s| *s)
    }

    /// Whether a subsystem is currently connected
    pub fn is_connected(&self, name: &str) -> bool {
        self.state(name) == Some(SubsystemState::Connected)
    }

    /// System-wide readiness: every registered subsystem is connected
    pub fn is_ready(&self) -> bool {
        self.states
            .iter()
            .all(|entry| *entry.value() == SubsystemState::Connected)
    }

    /// Names of subsystems not currently connected, sorted
    pub fn unconnected(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .states
            .iter()
            .filter(|entry| *entry.value() != SubsystemState::Connected)
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
