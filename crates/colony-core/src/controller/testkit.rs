//! Builders for controller tests: a small snapshot plus matching memory.

use colony_types::{
    ActionCode, Actor, AgentId, AgentView, ColonyId, Command, ControllerId, ControllerView, DropId,
    DroppedView, EntityRef, FacilityView, HostileId, HostileView, NodeId, NodeView, Position, Role,
    SiteId, SiteView, Store, StructureId, StructureKind, StructureView, Terrain, WorldSnapshot,
};
use colony_world::{SafetyMonitor, WorldView};

use super::hauler::{DeliveryChoice, choose_delivery};
use super::{StepContext, StepReport, run_agent};
use crate::actuator::Actuator;
use crate::config::ColonyConfig;
use crate::memory::{AgentMemory, ColonyMemory};
use crate::scheduler::{AllocationReport, run_allocation};

/// A colony with its facility at (25, 25) and a tier-2 controller at (20, 20).
pub struct Fixture {
    pub snapshot: WorldSnapshot,
    pub memory: ColonyMemory,
    pub config: ColonyConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let colony_id = ColonyId::new();
        let snapshot = WorldSnapshot {
            tick: 1,
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
                tier: 2,
            },
            terrain: Terrain::default(),
        };
        Self {
            snapshot,
            memory: ColonyMemory::new(colony_id),
            config: ColonyConfig::default(),
        }
    }

    pub fn agent(&mut self, role: Role, x: i32, y: i32, used: u32, capacity: u32) -> AgentId {
        let id = AgentId::new();
        self.snapshot.agents.push(AgentView {
            id,
            role,
            pos: Position::new(x, y),
            store: Store::new(used, capacity),
        });
        self.memory.agents.insert(id, AgentMemory::new(role, 0));
        id
    }

    pub fn structure(
        &mut self,
        kind: StructureKind,
        x: i32,
        y: i32,
        used: u32,
        capacity: u32,
    ) -> StructureId {
        let id = StructureId::new();
        self.snapshot.structures.push(StructureView {
            id,
            kind,
            pos: Position::new(x, y),
            store: Some(Store::new(used, capacity)),
            hits: 100,
        });
        id
    }

    pub fn site(&mut self, kind: StructureKind, x: i32, y: i32) -> SiteId {
        let id = SiteId::new();
        self.snapshot.sites.push(SiteView {
            id,
            kind,
            pos: Position::new(x, y),
            progress: 0,
            total: 100,
        });
        id
    }

    pub fn node(&mut self, x: i32, y: i32) -> NodeId {
        let id = NodeId::new();
        self.snapshot.nodes.push(NodeView {
            id,
            pos: Position::new(x, y),
            available: 3000,
        });
        id
    }

    pub fn dropped(&mut self, x: i32, y: i32, amount: u32) -> DropId {
        let id = DropId::new();
        self.snapshot.dropped.push(DroppedView {
            id,
            pos: Position::new(x, y),
            amount,
        });
        id
    }

    pub fn hostile(&mut self, x: i32, y: i32) {
        self.snapshot.hostiles.push(HostileView {
            id: HostileId::new(),
            pos: Position::new(x, y),
        });
    }

    pub fn bootstrap(&mut self) {
        self.memory.bootstrap(&self.snapshot, &self.config);
    }

    /// Run the allocation phase against the snapshot's hostiles.
    pub fn allocate(&mut self) -> AllocationReport {
        let safety = SafetyMonitor::from_snapshot(&self.snapshot, self.config.safety.danger_radius);
        let report = run_allocation(&mut self.memory, &safety);
        assert!(self.memory.check_invariants().is_ok());
        report
    }

    /// Step one agent. Memory must be consistent going in.
    pub fn step(&mut self, agent: AgentId, actuator: &mut dyn Actuator) -> Option<StepReport> {
        assert!(self.memory.check_invariants().is_ok());
        let view = WorldView::new(&self.snapshot);
        let safety = SafetyMonitor::from_snapshot(&self.snapshot, self.config.safety.danger_radius);
        let agent = view.agent(agent)?;
        run_agent(
            &mut self.memory,
            agent,
            &view,
            &safety,
            &self.config,
            actuator,
            false,
        )
    }

    pub fn delivery(&self) -> Option<DeliveryChoice> {
        let view = WorldView::new(&self.snapshot);
        let safety = SafetyMonitor::from_snapshot(&self.snapshot, self.config.safety.danger_radius);
        let ctx = StepContext {
            view: &view,
            safety: &safety,
            config: &self.config,
            memory: &self.memory,
        };
        choose_delivery(&ctx)
    }
}

/// Records every command and answers each with the same code.
pub struct ScriptedActuator {
    pub commands: Vec<(Actor, Command)>,
    pub code: ActionCode,
}

impl ScriptedActuator {
    pub const fn always(code: ActionCode) -> Self {
        Self {
            commands: Vec::new(),
            code,
        }
    }

    /// Structures and agents named by transfer or withdraw commands.
    pub fn targets(&self) -> Vec<EntityRef> {
        self.commands
            .iter()
            .filter_map(|(_, command)| match command {
                Command::Transfer { target, .. } | Command::Withdraw { target, .. } => {
                    Some(*target)
                }
                _ => None,
            })
            .collect()
    }
}

impl Actuator for ScriptedActuator {
    fn execute(&mut self, actor: Actor, command: Command) -> ActionCode {
        self.commands.push((actor, command));
        self.code
    }
}
