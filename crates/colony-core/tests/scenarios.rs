//! Multi-tick scenario tests for the colony decision engine.
//!
//! Each test drives [`run_tick`] over hand-built snapshots with the
//! [`PredictiveActuator`], the same pairing the engine binary uses, and
//! checks the occupancy invariants after every tick.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::missing_panics_doc
)]

use colony_core::controller::StepOutcome;
use colony_core::error::DenialReason;
use colony_core::{ColonyConfig, ColonyMemory, ErrorKind, PredictiveActuator, TickSummary, run_tick};
use colony_types::{
    AgentId, AgentView, ColonyId, ControllerId, ControllerView, FacilityView, HostileId,
    HostileView, NodeId, NodeView, Position, Role, Store, StructureId, Terrain, WorldSnapshot,
};

// =============================================================================
// Helper: a mutable world that produces one snapshot per tick
// =============================================================================

struct World {
    snapshot: WorldSnapshot,
    memory: ColonyMemory,
    config: ColonyConfig,
}

impl World {
    fn new() -> Self {
        let colony_id = ColonyId::new();
        Self {
            snapshot: WorldSnapshot {
                tick: 0,
                colony_id,
                base: Position::new(25, 25),
                budget: 300,
                agents: Vec::new(),
                nodes: Vec::new(),
                structures: Vec::new(),
                sites: Vec::new(),
                hostiles: Vec::new(),
                dropped: Vec::new(),
                facility: FacilityView {
                    id: StructureId::new(),
                    pos: Position::new(25, 25),
                    busy: false,
                    producing: None,
                },
                controller: ControllerView {
                    id: ControllerId::new(),
                    pos: Position::new(20, 20),
                    tier: 1,
                },
                terrain: Terrain::default(),
            },
            memory: ColonyMemory::new(colony_id),
            config: ColonyConfig::default(),
        }
    }

    fn node(&mut self, x: i32, y: i32) -> NodeId {
        let id = NodeId::new();
        self.snapshot.nodes.push(NodeView {
            id,
            pos: Position::new(x, y),
            available: 3000,
        });
        id
    }

    fn wall(&mut self, x: i32, y: i32) {
        self.snapshot.terrain.walls.insert(Position::new(x, y));
    }

    fn agent(&mut self, role: Role, x: i32, y: i32) -> AgentId {
        let id = AgentId::new();
        self.snapshot.agents.push(AgentView {
            id,
            role,
            pos: Position::new(x, y),
            store: Store::new(0, 50),
        });
        id
    }

    fn remove_role(&mut self, role: Role) {
        let memory = &self.memory;
        self.snapshot
            .agents
            .retain(|a| memory.role_of(a.id).unwrap_or(a.role) != role);
    }

    fn tick(&mut self) -> TickSummary {
        self.snapshot.tick += 1;
        let mut actuator = PredictiveActuator::new(&self.snapshot);
        let summary = run_tick(&mut self.memory, &self.snapshot, &self.config, &mut actuator).unwrap();
        assert!(self.memory.check_invariants().is_ok());
        summary
    }

    fn node_of(&self, agent: AgentId) -> Option<NodeId> {
        self.memory.agents.get(&agent).and_then(|m| m.assigned_node)
    }
}

// =============================================================================
// Allocation
// =============================================================================

#[test]
fn four_requests_for_three_slots() {
    let mut world = World::new();
    // Corner node: three open neighbours.
    let node = world.node(0, 0);
    for _ in 0..4 {
        world.agent(Role::Harvester, 5, 5);
    }
    let summary = world.tick();

    assert_eq!(summary.allocation.assigned.len(), 3);
    assert_eq!(summary.allocation.idle.len(), 1);
    // Once in allocation, once more when the idle harvester finds nothing
    // to pick up.
    assert_eq!(summary.error_count(ErrorKind::NoEligibleTarget), 2);
    assert_eq!(world.memory.registry.query(node).unwrap().occupant_count(), 3);
}

#[test]
fn saturated_nodes_evict_at_most_one_hop() {
    let mut world = World::new();
    // Two single-slot nodes.
    world.node(0, 0);
    world.wall(1, 0);
    world.wall(1, 1);
    world.node(49, 49);
    world.wall(48, 49);
    world.wall(48, 48);
    let harvesters = [world.agent(Role::Harvester, 5, 5), world.agent(Role::Harvester, 44, 44)];
    let first = world.tick();
    assert_eq!(first.allocation.assigned.len(), 2);

    let miners = [
        world.agent(Role::Miner, 5, 5),
        world.agent(Role::Miner, 44, 44),
        world.agent(Role::Miner, 30, 30),
    ];
    let second = world.tick();
    let evictions = &second.allocation.evicted;
    assert_eq!(evictions.len(), 2);
    for eviction in evictions {
        assert!(harvesters.contains(&eviction.evicted));
        assert!(miners.contains(&eviction.by));
        assert!(second.allocation.idle.contains(&eviction.evicted));
    }
    // Three miners, two slots: one miner idles rather than evicting a miner.
    assert_eq!(second.allocation.idle.len(), 3);
    assert!(harvesters.iter().all(|h| world.node_of(*h).is_none()));

    // Nodes now hold only miners; nothing further is evicted.
    let third = world.tick();
    assert!(third.allocation.evicted.is_empty());
}

#[test]
fn hostile_near_node_releases_before_the_agent_acts() {
    let mut world = World::new();
    let near = world.node(30, 30);
    let far = world.node(10, 40);
    let miner = world.agent(Role::Miner, 31, 31);
    world.tick();
    assert_eq!(world.node_of(miner), Some(near));

    // Within five of the node but more than five from the miner.
    world.snapshot.hostiles.push(HostileView {
        id: HostileId::new(),
        pos: Position::new(27, 27),
    });
    world.snapshot.agents[0].pos = Position::new(33, 33);
    let summary = world.tick();

    assert_eq!(summary.allocation.released, vec![(miner, near)]);
    assert_eq!(world.node_of(miner), Some(far));
    let step = summary.steps.iter().find(|s| s.agent == miner).unwrap();
    assert_eq!(step.outcome, StepOutcome::Skipped);
}

#[test]
fn threatened_agent_retreats_and_recovers() {
    let mut world = World::new();
    let hauler = world.agent(Role::Hauler, 40, 40);
    world.snapshot.hostiles.push(HostileView {
        id: HostileId::new(),
        pos: Position::new(42, 42),
    });
    let summary = world.tick();
    assert_eq!(summary.outcome_count(StepOutcome::Avoiding), 1);
    assert!(world.memory.agents[&hauler].avoiding);

    world.snapshot.hostiles.clear();
    let summary = world.tick();
    assert_eq!(summary.outcome_count(StepOutcome::Avoiding), 0);
    assert!(!world.memory.agents[&hauler].avoiding);
}

// =============================================================================
// Production
// =============================================================================

#[test]
fn budget_shortfall_defers_then_produces() {
    let mut world = World::new();
    world.snapshot.budget = 150;
    let summary = world.tick();
    assert_eq!(summary.production.produced, None);
    assert!(matches!(
        summary.production.denied,
        Some(DenialReason::InsufficientBudget { cost: 200, budget: 150, .. })
    ));
    assert_eq!(world.memory.queue.head(), Some(Role::Harvester));

    world.snapshot.budget = 200;
    let summary = world.tick();
    assert_eq!(summary.production.produced, Some(Role::Harvester));
    assert_eq!(world.memory.queue.head(), Some(Role::Miner));
}

#[test]
fn single_production_slot_waits_for_facility() {
    let mut world = World::new();
    let summary = world.tick();
    assert_eq!(summary.production.produced, Some(Role::Harvester));

    world.snapshot.facility.busy = true;
    world.snapshot.facility.producing = Some(Role::Harvester);
    let summary = world.tick();
    assert_eq!(summary.production.denied, Some(DenialReason::FacilityBusy));

    world.snapshot.facility.busy = false;
    world.snapshot.facility.producing = None;
    world.agent(Role::Harvester, 25, 26);
    let summary = world.tick();
    assert_eq!(summary.production.produced, Some(Role::Miner));
}

#[test]
fn early_phase_never_returns() {
    let mut world = World::new();
    world.node(30, 30);
    let oldest = world.agent(Role::Harvester, 30, 31);
    world.tick();
    assert!(world.memory.state.early_phase);
    let younger = world.agent(Role::Harvester, 31, 31);

    for _ in 0..3 {
        world.agent(Role::Miner, 29, 29);
    }
    for _ in 0..2 {
        world.agent(Role::Hauler, 25, 26);
        world.agent(Role::Upgrader, 21, 21);
    }
    let summary = world.tick();
    let transition = summary.production.transition.unwrap();
    assert_eq!(transition.retired, Some(oldest));
    assert!(!world.memory.state.early_phase);
    assert_eq!(world.memory.role_of(oldest), Some(Role::Builder));
    assert_eq!(world.node_of(oldest), None);
    assert_eq!(world.memory.role_of(younger), Some(Role::Harvester));

    // The staffing collapses; the phase stays over and harvesters are no
    // longer produced.
    world.remove_role(Role::Miner);
    world.remove_role(Role::Hauler);
    world.remove_role(Role::Harvester);
    for _ in 0..3 {
        let summary = world.tick();
        assert!(summary.production.transition.is_none());
        assert!(!world.memory.state.early_phase);
        assert!(!summary.production.enqueued.contains(&Role::Harvester));
    }
}
