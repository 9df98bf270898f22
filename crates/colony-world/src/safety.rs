//! Threat detection around agents and resource nodes.
//!
//! A position is unsafe when any hostile lies within the danger radius
//! (Chebyshev range, inclusive). The monitor is rebuilt from every
//! snapshot, so it carries no state between ticks.

use std::collections::BTreeSet;

use colony_types::{AgentId, NodeId, Position, WorldSnapshot};

use crate::registry::NodeRegistry;

/// Range within which a hostile makes a tile unsafe.
pub const DEFAULT_DANGER_RADIUS: u32 = 5;

/// Hostile positions for the current tick.
#[derive(Debug, Clone, Default)]
pub struct SafetyMonitor {
    hostiles: Vec<Position>,
    radius: u32,
}

/// Result of a full threat assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyReport {
    /// Registered nodes with a hostile in range.
    pub unsafe_nodes: BTreeSet<NodeId>,
    /// Agents with a hostile in range.
    pub threatened_agents: BTreeSet<AgentId>,
}

impl SafetyReport {
    /// Whether nothing is threatened.
    pub fn is_clear(&self) -> bool {
        self.unsafe_nodes.is_empty() && self.threatened_agents.is_empty()
    }
}

impl SafetyMonitor {
    /// Monitor over the given hostile positions.
    pub const fn new(hostiles: Vec<Position>, radius: u32) -> Self {
        Self { hostiles, radius }
    }

    /// Monitor over the snapshot's hostiles.
    pub fn from_snapshot(snapshot: &WorldSnapshot, radius: u32) -> Self {
        Self::new(snapshot.hostiles.iter().map(|h| h.pos).collect(), radius)
    }

    /// Danger radius in use.
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Whether any hostile is present at all.
    pub fn has_hostiles(&self) -> bool {
        !self.hostiles.is_empty()
    }

    /// Whether no hostile lies within the danger radius of `pos`.
    pub fn is_safe(&self, pos: Position) -> bool {
        !self
            .hostiles
            .iter()
            .any(|h| h.in_range_to(pos, self.radius))
    }

    /// Registered nodes that are currently unsafe.
    pub fn unsafe_nodes(&self, registry: &NodeRegistry) -> BTreeSet<NodeId> {
        registry
            .iter()
            .filter(|n| !self.is_safe(n.pos))
            .map(|n| n.id)
            .collect()
    }

    /// Assess every registered node and every agent in the snapshot.
    pub fn assess(&self, registry: &NodeRegistry, snapshot: &WorldSnapshot) -> SafetyReport {
        if !self.has_hostiles() {
            return SafetyReport::default();
        }
        SafetyReport {
            unsafe_nodes: self.unsafe_nodes(registry),
            threatened_agents: snapshot
                .agents
                .iter()
                .filter(|a| !self.is_safe(a.pos))
                .map(|a| a.id)
                .collect(),
        }
    }
}
