//! Domain failure taxonomy for the colony decision engine.
//!
//! None of these are fatal. Each one resolves to "retry next tick" or "idle
//! this tick" inside the component that raised it; the tick cycle only
//! tallies them by [`ErrorKind`] for the tick summary.

use colony_types::{ActionCode, AgentId, EntityRef, NodeId, Role};
use serde::{Deserialize, Serialize};

/// A recoverable failure raised by a colony component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColonyError {
    /// A cached target no longer resolves in the world.
    #[error("cached target {target:?} no longer exists")]
    ReferenceStale {
        /// The stale reference.
        target: EntityRef,
    },

    /// A resource node has no free slot.
    #[error("resource node {node} has no free slot")]
    CapacityExceeded {
        /// The full node.
        node: NodeId,
    },

    /// The production facility did not start an agent.
    #[error("production denied: {0}")]
    ProductionDenied(DenialReason),

    /// A hostile is within the danger radius.
    #[error("agent {agent} is inside a danger zone")]
    UnsafeZone {
        /// The threatened agent.
        agent: AgentId,
    },

    /// Nothing suitable was found for the agent this tick.
    #[error("no eligible target for agent {agent}")]
    NoEligibleTarget {
        /// The agent left idle.
        agent: AgentId,
    },
}

/// Why a production attempt did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenialReason {
    /// The available budget is below the role's cost.
    #[error("{role} costs {cost}, budget is {budget}")]
    InsufficientBudget {
        /// Role at the queue head.
        role: Role,
        /// Cost of that role.
        cost: u32,
        /// Budget available this tick.
        budget: u32,
    },

    /// An agent is already being produced.
    #[error("facility busy")]
    FacilityBusy,

    /// Nothing is queued.
    #[error("queue empty")]
    EmptyQueue,

    /// The world refused the command.
    #[error("{role} rejected with {code:?}")]
    Rejected {
        /// Role at the queue head.
        role: Role,
        /// Result code returned by the world.
        code: ActionCode,
    },
}

/// Category of a [`ColonyError`], used for tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ColonyError::ReferenceStale`].
    ReferenceStale,
    /// See [`ColonyError::CapacityExceeded`].
    CapacityExceeded,
    /// See [`ColonyError::ProductionDenied`].
    ProductionDenied,
    /// See [`ColonyError::UnsafeZone`].
    UnsafeZone,
    /// See [`ColonyError::NoEligibleTarget`].
    NoEligibleTarget,
}

impl ColonyError {
    /// The category of this failure.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ReferenceStale { .. } => ErrorKind::ReferenceStale,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::ProductionDenied(_) => ErrorKind::ProductionDenied,
            Self::UnsafeZone { .. } => ErrorKind::UnsafeZone,
            Self::NoEligibleTarget { .. } => ErrorKind::NoEligibleTarget,
        }
    }
}
