//! Resource node registry with capacity-bounded occupant tracking.
//!
//! Each [`NodeRecord`] holds the node's identity plus the mutable runtime
//! state: the ordered list of agents currently assigned to it. Capacity and
//! distance-to-base are computed once when the node is registered; after
//! bootstrap only occupancy changes.
//!
//! # Invariants
//!
//! - `occupants.len() <= capacity` for every node at all times.
//! - An agent appears in at most one node's occupant list, at most once.
//!
//! The agent-side half of the bidirectional assignment (the agent's
//! `assigned_node`) lives in colony memory, which routes every change
//! through this registry.

use std::collections::BTreeSet;

use colony_types::{AgentId, NodeId, NodeView, Position, Terrain};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::WorldError;

/// A registered resource node and its occupants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node identifier.
    pub id: NodeId,
    /// Node tile.
    pub pos: Position,
    /// Number of walkable tiles adjacent to the node.
    pub capacity: u32,
    /// Assigned agents, in assignment order.
    pub occupants: Vec<AgentId>,
    /// Range from the colony base, computed at registration.
    pub distance: u32,
}

impl NodeRecord {
    /// Number of agents currently assigned.
    pub fn occupant_count(&self) -> u32 {
        u32::try_from(self.occupants.len()).unwrap_or(u32::MAX)
    }

    /// Whether another agent can be assigned.
    pub fn has_free_slot(&self) -> bool {
        self.occupant_count() < self.capacity
    }

    /// Whether every slot is taken.
    pub fn is_full(&self) -> bool {
        !self.has_free_slot()
    }

    /// Whether `agent` is assigned here.
    pub fn contains(&self, agent: AgentId) -> bool {
        self.occupants.contains(&agent)
    }
}

/// Registry of every resource node the colony knows about.
///
/// Nodes keep registration order; [`nodes_by_distance`] sorts stably so
/// equally distant nodes keep that order.
///
/// [`nodes_by_distance`]: NodeRegistry::nodes_by_distance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistry {
    nodes: Vec<NodeRecord>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Register nodes seen in the snapshot.
    ///
    /// Idempotent: nodes already known are skipped, so their occupancy is
    /// untouched. Returns the number of newly registered nodes.
    pub fn register(&mut self, nodes: &[NodeView], base: Position, terrain: &Terrain) -> usize {
        let mut added = 0_usize;
        for node in nodes {
            if self.query(node.id).is_some() {
                continue;
            }
            let record = NodeRecord {
                id: node.id,
                pos: node.pos,
                capacity: terrain.open_neighbors(node.pos),
                occupants: Vec::new(),
                distance: base.range_to(node.pos),
            };
            info!(
                node = %record.id,
                pos = %record.pos,
                capacity = record.capacity,
                distance = record.distance,
                "Resource node registered"
            );
            self.nodes.push(record);
            added = added.saturating_add(1);
        }
        added
    }

    /// Assign `agent` to `node`.
    ///
    /// A no-op if the agent is already an occupant of that node.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NodeNotFound`] for an unknown node, or
    /// [`WorldError::NodeAtCapacity`] if every slot is taken.
    pub fn assign(&mut self, agent: AgentId, node: NodeId) -> Result<(), WorldError> {
        let record = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node)
            .ok_or(WorldError::NodeNotFound(node))?;
        if record.contains(agent) {
            return Ok(());
        }
        if record.is_full() {
            return Err(WorldError::NodeAtCapacity {
                node,
                capacity: record.capacity,
            });
        }
        record.occupants.push(agent);
        Ok(())
    }

    /// Remove `agent` from whichever node holds it.
    ///
    /// Returns the node it was removed from, or `None` if it held none.
    pub fn release(&mut self, agent: AgentId) -> Option<NodeId> {
        let mut released = None;
        for record in &mut self.nodes {
            let before = record.occupants.len();
            record.occupants.retain(|a| *a != agent);
            if record.occupants.len() != before && released.is_none() {
                released = Some(record.id);
            }
        }
        released
    }

    /// Read-only view of a node.
    pub fn query(&self, node: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == node)
    }

    /// The node `agent` is assigned to, if any.
    pub fn node_of(&self, agent: AgentId) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.contains(agent)).map(|n| n.id)
    }

    /// Number of occupants of `node` for which `pred` holds.
    ///
    /// Colony memory uses this to count occupants of a given role.
    pub fn count_occupants(&self, node: NodeId, pred: impl Fn(AgentId) -> bool) -> u32 {
        self.query(node).map_or(0, |record| {
            let count = record.occupants.iter().filter(|a| pred(**a)).count();
            u32::try_from(count).unwrap_or(u32::MAX)
        })
    }

    /// Every node, nearest to the base first.
    pub fn nodes_by_distance(&self) -> Vec<&NodeRecord> {
        let mut sorted: Vec<&NodeRecord> = self.nodes.iter().collect();
        sorted.sort_by_key(|n| n.distance);
        sorted
    }

    /// Every node in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop occupants that are not in `live`.
    ///
    /// Returns each removed `(agent, node)` pair.
    pub fn prune(&mut self, live: &BTreeSet<AgentId>) -> Vec<(AgentId, NodeId)> {
        let mut removed = Vec::new();
        for record in &mut self.nodes {
            let node = record.id;
            record.occupants.retain(|agent| {
                let keep = live.contains(agent);
                if !keep {
                    removed.push((*agent, node));
                }
                keep
            });
        }
        removed
    }

    /// Verify the occupancy invariants.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvariantViolated`] if a node holds more
    /// occupants than its capacity or lists an agent twice, and
    /// [`WorldError::DuplicateOccupant`] if an agent sits at two nodes.
    pub fn check_invariants(&self) -> Result<(), WorldError> {
        let mut seen = BTreeSet::new();
        for record in &self.nodes {
            if record.occupant_count() > record.capacity {
                return Err(WorldError::InvariantViolated {
                    node: record.id,
                    reason: format!(
                        "{} occupants exceed capacity {}",
                        record.occupants.len(),
                        record.capacity
                    ),
                });
            }
            let mut local = BTreeSet::new();
            for agent in &record.occupants {
                if !local.insert(*agent) {
                    return Err(WorldError::InvariantViolated {
                        node: record.id,
                        reason: format!("agent {agent} listed twice"),
                    });
                }
                if !seen.insert(*agent) {
                    return Err(WorldError::DuplicateOccupant(*agent));
                }
            }
        }
        Ok(())
    }
}
