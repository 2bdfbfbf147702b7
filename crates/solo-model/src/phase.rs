//! Lifecycle phases
//!
//! - [`DeploymentPhase`]: per-component lifecycle
//! - [`LedgerPhase`]: ledger-wide state of a deployment
//!
//! Both are explicit state machines; [`DeploymentPhase::validate_transition`]
//! and [`LedgerPhase::validate_transition`] are the only accepted way to move
//! between states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::components::ComponentType;
use crate::error::ModelError;
use crate::types::ComponentId;

/// Component lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    /// Recorded, nothing deployed yet
    Requested,
    /// Resources installed
    Deployed,
    /// Keys and settings applied
    Configured,
    /// Running
    Started,
    /// Paused by a network freeze
    Frozen,
    /// Torn down
    Stopped,
}

impl DeploymentPhase {
    /// All phases in lifecycle order
    pub const ALL: [Self; 6] = [
        Self::Requested,
        Self::Deployed,
        Self::Configured,
        Self::Started,
        Self::Frozen,
        Self::Stopped,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Deployed => "deployed",
            Self::Configured => "configured",
            Self::Started => "started",
            Self::Frozen => "frozen",
            Self::Stopped => "stopped",
        }
    }

    /// Phases reachable in one step
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Requested => &[Self::Deployed, Self::Stopped],
            Self::Deployed => &[Self::Configured, Self::Stopped],
            Self::Configured => &[Self::Started, Self::Stopped],
            Self::Started => &[Self::Frozen, Self::Stopped],
            Self::Frozen => &[Self::Started, Self::Stopped],
            Self::Stopped => &[],
        }
    }

    /// Check a single step
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Validate a single step of one component
    ///
    /// # Errors
    /// Returns `IllegalPhaseTransition` if `next` is not reachable
    pub fn validate_transition(
        self,
        next: Self,
        component_type: ComponentType,
        id: ComponentId,
    ) -> Result<(), ModelError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(ModelError::IllegalPhaseTransition {
                component_type,
                id,
                from: self,
                to: next,
            })
        }
    }

    /// Check if no transition leaves this phase
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Check if pods are expected to exist in this phase
    #[inline]
    #[must_use]
    pub fn expects_pods(self) -> bool {
        !matches!(self, Self::Requested | Self::Stopped)
    }
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentPhase {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ModelError::UnknownPhase(s.to_string()))
    }
}

/// Ledger-wide phase of a deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerPhase {
    /// No genesis yet
    #[default]
    Uninitialized,
    /// Ledger is live
    Initialized,
    /// Restoring state from a snapshot
    SnapshotRestoring,
    /// Snapshot restore finished
    SnapshotRestored,
    /// Recovering from a failure
    Recovering,
    /// Recovery finished
    Recovered,
    /// Freeze in progress
    Freezing,
    /// Network frozen
    Frozen,
}

impl LedgerPhase {
    /// All phases
    pub const ALL: [Self; 8] = [
        Self::Uninitialized,
        Self::Initialized,
        Self::SnapshotRestoring,
        Self::SnapshotRestored,
        Self::Recovering,
        Self::Recovered,
        Self::Freezing,
        Self::Frozen,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::SnapshotRestoring => "snapshot_restoring",
            Self::SnapshotRestored => "snapshot_restored",
            Self::Recovering => "recovering",
            Self::Recovered => "recovered",
            Self::Freezing => "freezing",
            Self::Frozen => "frozen",
        }
    }

    /// Phases reachable in one step
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Uninitialized => &[Self::Initialized],
            Self::Initialized => &[Self::SnapshotRestoring, Self::Recovering, Self::Freezing],
            Self::SnapshotRestoring => &[Self::SnapshotRestored],
            Self::Recovering => &[Self::Recovered],
            Self::Freezing => &[Self::Frozen],
            Self::SnapshotRestored | Self::Recovered | Self::Frozen => &[Self::Initialized],
        }
    }

    /// Check a single step
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Check if the ledger has been initialized at least once
    #[inline]
    #[must_use]
    pub fn is_initialized(self) -> bool {
        self != Self::Uninitialized
    }

    /// Validate a single step
    ///
    /// # Errors
    /// Returns `IllegalLedgerTransition` if `next` is not reachable
    pub fn validate_transition(self, next: Self) -> Result<(), ModelError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(ModelError::IllegalLedgerTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for LedgerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerPhase {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ModelError::UnknownPhase(s.to_string()))
    }
}
