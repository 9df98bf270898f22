//! Resource-node allocation with single-hop eviction.
//!
//! The allocation phase runs once per tick, after the memory sync and
//! before production:
//!
//! 1. **Safety release** -- every agent whose node is now within the
//!    danger radius of a hostile loses its slot.
//! 2. **Allocation** -- released agents first, then every other unassigned
//!    extractor, miners before harvesters, oldest first.
//!
//! Nodes are considered nearest-to-base first. A miner that finds no free
//! slot may evict the first occupant of a full node held only by
//! harvesters. The evicted agent gets exactly one further selection in the
//! same tick, without eviction rights; if that fails it idles until the
//! next tick.

use std::collections::BTreeSet;

use colony_types::{AgentId, NodeId, Role};
use colony_world::SafetyMonitor;
use tracing::{debug, info};

use crate::error::ColonyError;
use crate::memory::ColonyMemory;

/// Eviction hops allowed per allocation request.
pub const MAX_EVICTION_HOPS: u32 = 1;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// One agent displaced by a miner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    /// The displaced occupant.
    pub evicted: AgentId,
    /// The node it was displaced from.
    pub node: NodeId,
    /// The miner that took the slot.
    pub by: AgentId,
}

/// A successful node selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// The node the agent now occupies.
    pub node: NodeId,
    /// The occupant displaced to make room, if any.
    pub evicted: Option<AgentId>,
}

/// What the allocation phase did this tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationReport {
    /// Agents whose node became unsafe, with the node they left.
    pub released: Vec<(AgentId, NodeId)>,
    /// New assignments, in the order they were made.
    pub assigned: Vec<(AgentId, NodeId)>,
    /// Evictions performed.
    pub evicted: Vec<Eviction>,
    /// Extractors left without a node this tick.
    pub idle: Vec<AgentId>,
}

impl AllocationReport {
    /// Whether `agent` lost its node to the safety release this tick.
    pub fn was_released(&self, agent: AgentId) -> bool {
        self.released.iter().any(|(a, _)| *a == agent)
    }
}

// ---------------------------------------------------------------------------
// Safety release
// ---------------------------------------------------------------------------

/// Release every agent assigned to a node in `unsafe_nodes`.
pub fn release_unsafe(
    memory: &mut ColonyMemory,
    unsafe_nodes: &BTreeSet<NodeId>,
) -> Vec<(AgentId, NodeId)> {
    let threatened: Vec<(AgentId, NodeId)> = memory
        .registry
        .iter()
        .filter(|record| unsafe_nodes.contains(&record.id))
        .flat_map(|record| record.occupants.iter().map(move |agent| (*agent, record.id)))
        .collect();
    for (agent, node) in &threatened {
        memory.release(*agent);
        info!(agent_id = %agent, node = %node, "Released from unsafe node");
    }
    threatened
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Pick and assign a node for `agent`.
///
/// Unsafe nodes are never considered. The nearest safe node with a free
/// slot wins; failing that, and only when `may_evict` is set and the agent's
/// role has eviction rights, the nearest safe full node occupied solely by
/// harvesters gives up its first occupant.
///
/// # Errors
///
/// Returns [`ColonyError::NoEligibleTarget`] if no node qualifies, or
/// [`ColonyError::CapacityExceeded`] if the registry refuses the slot.
pub fn select_node(
    memory: &mut ColonyMemory,
    agent: AgentId,
    unsafe_nodes: &BTreeSet<NodeId>,
    may_evict: bool,
) -> Result<Selection, ColonyError> {
    let role = memory
        .role_of(agent)
        .ok_or(ColonyError::NoEligibleTarget { agent })?;

    let (free, evictable) = {
        let candidates: Vec<_> = memory
            .registry
            .nodes_by_distance()
            .into_iter()
            .filter(|record| !unsafe_nodes.contains(&record.id))
            .collect();
        let free = candidates
            .iter()
            .find(|record| record.has_free_slot())
            .map(|record| record.id);
        let evictable = candidates
            .iter()
            .find(|record| {
                record.is_full()
                    && !record.occupants.is_empty()
                    && memory.count_role_at(record.id, Role::Harvester) == record.occupant_count()
            })
            .and_then(|record| record.occupants.first().map(|first| (record.id, *first)));
        (free, evictable)
    };

    if let Some(node) = free {
        memory.assign(agent, node).map_err(|error| {
            debug!(agent_id = %agent, %error, "Free slot refused");
            ColonyError::CapacityExceeded { node }
        })?;
        return Ok(Selection {
            node,
            evicted: None,
        });
    }

    let (node, victim) = evictable
        .filter(|_| may_evict && role.may_evict())
        .ok_or(ColonyError::NoEligibleTarget { agent })?;
    memory.release(victim);
    memory.assign(agent, node).map_err(|error| {
        debug!(agent_id = %agent, %error, "Evicted slot refused");
        ColonyError::CapacityExceeded { node }
    })?;
    info!(agent_id = %agent, evicted = %victim, node = %node, "Occupant evicted");
    Ok(Selection {
        node,
        evicted: Some(victim),
    })
}

/// Allocate `agent`, following an eviction with at most one further
/// selection for the displaced occupant.
///
/// Every agent touched is added to `handled`.
fn allocate(
    memory: &mut ColonyMemory,
    agent: AgentId,
    unsafe_nodes: &BTreeSet<NodeId>,
    handled: &mut BTreeSet<AgentId>,
    report: &mut AllocationReport,
) {
    let mut next = Some((agent, 0_u32));
    while let Some((current, hops)) = next.take() {
        handled.insert(current);
        match select_node(memory, current, unsafe_nodes, hops < MAX_EVICTION_HOPS) {
            Ok(selection) => {
                debug!(agent_id = %current, node = %selection.node, hops, "Node assigned");
                report.assigned.push((current, selection.node));
                if let Some(evicted) = selection.evicted {
                    report.evicted.push(Eviction {
                        evicted,
                        node: selection.node,
                        by: current,
                    });
                    next = Some((evicted, hops.saturating_add(1)));
                }
            }
            Err(error) => {
                debug!(agent_id = %current, %error, hops, "Agent left without a node");
                report.idle.push(current);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Run the safety release and allocation for one tick.
pub fn run_allocation(memory: &mut ColonyMemory, safety: &SafetyMonitor) -> AllocationReport {
    let unsafe_nodes = safety.unsafe_nodes(&memory.registry);
    let mut report = AllocationReport {
        released: release_unsafe(memory, &unsafe_nodes),
        ..AllocationReport::default()
    };

    let mut handled = BTreeSet::new();
    let released: Vec<AgentId> = report.released.iter().map(|(a, _)| *a).collect();
    for agent in released {
        if !handled.contains(&agent) {
            allocate(memory, agent, &unsafe_nodes, &mut handled, &mut report);
        }
    }

    let mut extractors: Vec<Role> = Role::ALL.into_iter().filter(|r| r.is_extractor()).collect();
    extractors.sort_by_key(|r| !r.may_evict());
    for role in extractors {
        for agent in memory.agents_by_age(role) {
            let assigned = memory
                .agents
                .get(&agent)
                .is_some_and(|m| m.assigned_node.is_some());
            if assigned || handled.contains(&agent) {
                continue;
            }
            allocate(memory, agent, &unsafe_nodes, &mut handled, &mut report);
        }
    }
    report
}
