//! Persistent colony memory: everything the engine remembers between ticks.
//!
//! [`ColonyMemory`] is loaded at tick start, passed by `&mut` through every
//! phase, and persisted at tick end. It owns both halves of the agent/node
//! assignment, so [`ColonyMemory::assign`] and [`ColonyMemory::release`]
//! are the only ways to change occupancy.
//!
//! # Invariants
//!
//! - `agent.assigned_node == Some(n)` exactly when the agent is listed in
//!   node `n`'s occupant list.
//! - Only agents present in the latest snapshot have memory records.

use std::collections::{BTreeMap, BTreeSet};

use colony_types::{AgentId, ColonyId, EntityRef, NodeId, Role, TaskMode, WorldSnapshot};
use colony_world::{NodeRegistry, WorldError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ColonyConfig;
use crate::production::ProductionQueue;

// ---------------------------------------------------------------------------
// Agent memory
// ---------------------------------------------------------------------------

/// What the colony remembers about one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMemory {
    /// Current role. Authoritative over the role reported by the world.
    pub role: Role,
    /// Current state of the role's state machine.
    pub task: TaskMode,
    /// Cached target, if any.
    #[serde(default)]
    pub target: Option<EntityRef>,
    /// Resource node the agent holds a slot at.
    #[serde(default)]
    pub assigned_node: Option<NodeId>,
    /// Whether the agent is retreating from a hostile.
    #[serde(default)]
    pub avoiding: bool,
    /// Tick the colony first saw this agent; orders agents by age.
    pub first_seen_tick: u64,
}

impl AgentMemory {
    /// Fresh memory for an agent of `role` first seen at `tick`.
    pub const fn new(role: Role, tick: u64) -> Self {
        Self {
            role,
            task: role.initial_task(),
            target: None,
            assigned_node: None,
            avoiding: false,
            first_seen_tick: tick,
        }
    }

    /// Switch to `role`, resetting the task and cached target.
    ///
    /// The node assignment is left alone; release it first.
    pub const fn reclassify(&mut self, role: Role) {
        self.role = role;
        self.task = role.initial_task();
        self.target = None;
    }
}

// ---------------------------------------------------------------------------
// Colony state
// ---------------------------------------------------------------------------

/// Colony-wide flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyState {
    /// Bootstrap period flag. Once cleared it is never set again.
    pub early_phase: bool,
    /// Role currently being produced, if any.
    #[serde(default)]
    pub in_flight: Option<Role>,
    /// Colony tier from the last snapshot.
    #[serde(default)]
    pub tier: u32,
}

impl Default for ColonyState {
    fn default() -> Self {
        Self {
            early_phase: true,
            in_flight: None,
            tier: 0,
        }
    }
}

impl ColonyState {
    /// Whether the single production slot is taken.
    pub const fn production_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// End the early phase. Returns `true` only on the call that ends it.
    pub const fn end_early_phase(&mut self) -> bool {
        let was_early = self.early_phase;
        self.early_phase = false;
        was_early
    }
}

/// The colony-level half of [`ColonyMemory`], persisted as one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyRecord {
    /// Colony identifier.
    pub colony_id: ColonyId,
    /// Resource node registry.
    pub registry: NodeRegistry,
    /// Pending production orders.
    pub queue: ProductionQueue,
    /// Colony flags.
    pub state: ColonyState,
    /// Whether nodes were registered and the queue seeded.
    #[serde(default)]
    pub bootstrapped: bool,
    /// Last tick processed.
    #[serde(default)]
    pub last_tick: Option<u64>,
}

// ---------------------------------------------------------------------------
// Colony memory
// ---------------------------------------------------------------------------

/// Agents adopted and pruned while syncing memory to a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Agents seen for the first time.
    pub adopted: Vec<AgentId>,
    /// Agents that vanished from the world.
    pub pruned: Vec<AgentId>,
    /// Agents whose assignment had to be repaired.
    pub repaired: Vec<AgentId>,
}

/// All persisted state of one colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyMemory {
    /// Colony identifier.
    pub colony_id: ColonyId,
    /// Resource node registry.
    pub registry: NodeRegistry,
    /// Pending production orders.
    pub queue: ProductionQueue,
    /// Colony flags.
    pub state: ColonyState,
    /// Whether nodes were registered and the queue seeded.
    #[serde(default)]
    pub bootstrapped: bool,
    /// Last tick processed.
    #[serde(default)]
    pub last_tick: Option<u64>,
    /// Per-agent memory, keyed (and processed) in id order.
    #[serde(default)]
    pub agents: BTreeMap<AgentId, AgentMemory>,
}

impl ColonyMemory {
    /// Empty memory for a colony that has never run.
    pub fn new(colony_id: ColonyId) -> Self {
        Self {
            colony_id,
            registry: NodeRegistry::new(),
            queue: ProductionQueue::new(),
            state: ColonyState::default(),
            bootstrapped: false,
            last_tick: None,
            agents: BTreeMap::new(),
        }
    }

    /// Reassemble memory from its persisted halves.
    pub fn from_parts(record: ColonyRecord, agents: BTreeMap<AgentId, AgentMemory>) -> Self {
        Self {
            colony_id: record.colony_id,
            registry: record.registry,
            queue: record.queue,
            state: record.state,
            bootstrapped: record.bootstrapped,
            last_tick: record.last_tick,
            agents,
        }
    }

    /// The colony-level record.
    pub fn record(&self) -> ColonyRecord {
        ColonyRecord {
            colony_id: self.colony_id,
            registry: self.registry.clone(),
            queue: self.queue.clone(),
            state: self.state.clone(),
            bootstrapped: self.bootstrapped,
            last_tick: self.last_tick,
        }
    }

    /// Register the snapshot's nodes and seed the production queue.
    ///
    /// Runs once per colony; later calls return `0` without touching state.
    pub fn bootstrap(&mut self, snapshot: &WorldSnapshot, config: &ColonyConfig) -> usize {
        if self.bootstrapped {
            return 0;
        }
        let added = self
            .registry
            .register(&snapshot.nodes, snapshot.base, &snapshot.terrain);
        self.queue.seed(&config.production.bootstrap_queue);
        self.bootstrapped = true;
        info!(
            colony_id = %self.colony_id,
            nodes = added,
            queue = self.queue.len(),
            "Colony bootstrapped"
        );
        added
    }

    /// Bring memory in line with the snapshot.
    ///
    /// Prunes agents that no longer exist (releasing their slots), adopts
    /// new agents, repairs any one-sided assignment, and records the tier.
    pub fn sync(&mut self, snapshot: &WorldSnapshot) -> SyncReport {
        let mut report = SyncReport::default();
        let live: BTreeSet<AgentId> = snapshot.agents.iter().map(|a| a.id).collect();

        let dead: Vec<AgentId> = self
            .agents
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for agent in dead {
            self.registry.release(agent);
            self.agents.remove(&agent);
            info!(agent_id = %agent, "Agent memory pruned");
            report.pruned.push(agent);
        }
        for (agent, node) in self.registry.prune(&live) {
            warn!(agent_id = %agent, node = %node, "Stray occupant removed from node");
        }

        for view in &snapshot.agents {
            if !self.agents.contains_key(&view.id) {
                self.agents
                    .insert(view.id, AgentMemory::new(view.role, snapshot.tick));
                info!(agent_id = %view.id, role = %view.role, "Agent adopted");
                report.adopted.push(view.id);
            }
        }

        for (id, mem) in &mut self.agents {
            let held = self.registry.node_of(*id);
            if mem.assigned_node != held {
                warn!(
                    agent_id = %id,
                    recorded = ?mem.assigned_node,
                    held = ?held,
                    "Repairing one-sided node assignment"
                );
                mem.assigned_node = held;
                report.repaired.push(*id);
            }
        }

        self.state.tier = snapshot.controller.tier;
        report
    }

    /// Give `agent` a slot at `node`, releasing any slot it held before.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownAgent`] for an untracked agent, or the
    /// registry's error if the node is unknown or full.
    pub fn assign(&mut self, agent: AgentId, node: NodeId) -> Result<(), WorldError> {
        let current = self
            .agents
            .get(&agent)
            .ok_or(WorldError::UnknownAgent(agent))?
            .assigned_node;
        if current == Some(node) {
            return Ok(());
        }
        self.release(agent);
        self.registry.assign(agent, node)?;
        if let Some(mem) = self.agents.get_mut(&agent) {
            mem.assigned_node = Some(node);
        }
        Ok(())
    }

    /// Free the slot `agent` holds, if any.
    pub fn release(&mut self, agent: AgentId) -> Option<NodeId> {
        let released = self.registry.release(agent);
        if let Some(mem) = self.agents.get_mut(&agent) {
            mem.assigned_node = None;
            if matches!(mem.target, Some(EntityRef::Node(_))) {
                mem.target = None;
            }
        }
        released
    }

    /// Role of a tracked agent.
    pub fn role_of(&self, agent: AgentId) -> Option<Role> {
        self.agents.get(&agent).map(|m| m.role)
    }

    /// Number of live agents with `role`.
    pub fn count_role(&self, role: Role) -> u32 {
        let count = self.agents.values().filter(|m| m.role == role).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Number of occupants of `node` with `role`.
    pub fn count_role_at(&self, node: NodeId, role: Role) -> u32 {
        self.registry
            .count_occupants(node, |agent| self.role_of(agent) == Some(role))
    }

    /// The longest-lived agent with `role`; ties go to the lower id.
    pub fn oldest(&self, role: Role) -> Option<AgentId> {
        self.agents
            .iter()
            .filter(|(_, m)| m.role == role)
            .min_by_key(|(id, m)| (m.first_seen_tick, **id))
            .map(|(id, _)| *id)
    }

    /// Agents with `role`, oldest first.
    pub fn agents_by_age(&self, role: Role) -> Vec<AgentId> {
        let mut agents: Vec<(u64, AgentId)> = self
            .agents
            .iter()
            .filter(|(_, m)| m.role == role)
            .map(|(id, m)| (m.first_seen_tick, *id))
            .collect();
        agents.sort_unstable();
        agents.into_iter().map(|(_, id)| id).collect()
    }

    /// Verify registry capacity limits and the bidirectional assignment.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), WorldError> {
        self.registry.check_invariants()?;
        for (id, mem) in &self.agents {
            let held = self.registry.node_of(*id);
            if mem.assigned_node != held {
                return Err(WorldError::AssignmentMismatch {
                    agent: *id,
                    recorded: mem.assigned_node,
                    held,
                });
            }
        }
        for record in self.registry.iter() {
            for occupant in &record.occupants {
                if !self.agents.contains_key(occupant) {
                    return Err(WorldError::UnknownAgent(*occupant));
                }
            }
        }
        Ok(())
    }
}
