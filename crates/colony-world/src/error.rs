//! Error types for the `colony-world` crate.
//!
//! All fallible registry operations return [`WorldError`].

use colony_types::{AgentId, NodeId};

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A node was not found in the registry.
    #[error("resource node not found: {0}")]
    NodeNotFound(NodeId),

    /// The node has no free slot.
    #[error("resource node {node} is at capacity ({capacity})")]
    NodeAtCapacity {
        /// The full node.
        node: NodeId,
        /// Maximum concurrent occupants.
        capacity: u32,
    },

    /// An occupancy invariant does not hold.
    #[error("registry invariant violated at node {node}: {reason}")]
    InvariantViolated {
        /// The node where the violation was found.
        node: NodeId,
        /// What is wrong.
        reason: String,
    },

    /// The agent is listed at more than one node.
    #[error("agent {0} occupies more than one resource node")]
    DuplicateOccupant(AgentId),

    /// The agent has no memory record.
    #[error("agent {0} is not tracked by the colony")]
    UnknownAgent(AgentId),

    /// An agent's assigned node disagrees with the registry.
    #[error("agent {agent} records node {recorded:?} but the registry holds it at {held:?}")]
    AssignmentMismatch {
        /// The agent.
        agent: AgentId,
        /// Node stored in the agent's memory.
        recorded: Option<NodeId>,
        /// Node whose occupant list holds the agent.
        held: Option<NodeId>,
    },
}
