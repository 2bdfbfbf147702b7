//! Error types for the configuration model

use solo_mapper::MapperError;

use crate::components::ComponentType;
use crate::phase::{DeploymentPhase, LedgerPhase};
use crate::types::{ClusterRef, ComponentId};
use crate::validation::ValidationErrors;

/// Model errors
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Component with the same type and id already exists
    #[error("{component_type} component {id} already exists")]
    DuplicateComponent {
        /// Component type
        component_type: ComponentType,
        /// Component id
        id: ComponentId,
    },

    /// No component with this type and id
    #[error("{component_type} component {id} not found")]
    ComponentNotFound {
        /// Component type
        component_type: ComponentType,
        /// Component id
        id: ComponentId,
    },

    /// Component phase change not allowed
    #[error("{component_type} component {id}: illegal phase transition {from} -> {to}")]
    IllegalPhaseTransition {
        /// Component type
        component_type: ComponentType,
        /// Component id
        id: ComponentId,
        /// Current phase
        from: DeploymentPhase,
        /// Requested phase
        to: DeploymentPhase,
    },

    /// Ledger phase change not allowed
    #[error("illegal ledger phase transition {from} -> {to}")]
    IllegalLedgerTransition {
        /// Current phase
        from: LedgerPhase,
        /// Requested phase
        to: LedgerPhase,
    },

    /// Unrecognized component type name
    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    /// Unrecognized phase name
    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    /// Named deployment absent from local config
    #[error("deployment not found: {0}")]
    DeploymentNotFound(String),

    /// Cluster ref absent from a document
    #[error("cluster not found: {0}")]
    ClusterNotFound(ClusterRef),

    /// Cluster ref has no kube context mapping
    #[error("no context mapped for cluster {0}")]
    ContextNotMapped(ClusterRef),

    /// Document failed validation
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Property path access failed
    #[error(transparent)]
    Mapping(#[from] MapperError),
}

impl ModelError {
    /// Check if error is a not-found condition
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ComponentNotFound { .. }
                | Self::DeploymentNotFound(_)
                | Self::ClusterNotFound(_)
                | Self::ContextNotMapped(_)
        )
    }

    /// Validation violations, if this is a validation failure
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
