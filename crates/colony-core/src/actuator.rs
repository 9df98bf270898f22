//! The seam through which commands reach the world.
//!
//! Every state machine issues commands through an [`Actuator`] and reacts
//! to the returned [`ActionCode`] in the same tick. The engine binary uses
//! [`PredictiveActuator`], which answers from the snapshot and records the
//! commands for emission; tests substitute scripted actuators.

use colony_types::{
    ActionCode, Actor, AgentId, Command, EntityRef, IssuedCommand, Position, Store,
    StructureKind, WorldSnapshot,
};
use colony_world::WorldView;

/// Range at which harvest, transfer, withdraw, and pickup succeed.
pub const INTERACT_RANGE: u32 = 1;

/// Range at which build and upgrade succeed.
pub const WORK_RANGE: u32 = 3;

/// A sink for commands that answers each one immediately.
pub trait Actuator {
    /// Issue `command` on behalf of `actor` and return the world's answer.
    fn execute(&mut self, actor: Actor, command: Command) -> ActionCode;
}

/// Answers commands by checking them against the tick's snapshot.
///
/// Tracks the effects that matter within a single tick: the facility
/// becomes busy after a successful production and the budget shrinks by the
/// role's cost. Every command, accepted or not, is recorded.
#[derive(Debug)]
pub struct PredictiveActuator<'a> {
    view: WorldView<'a>,
    budget: u32,
    facility_busy: bool,
    issued: Vec<IssuedCommand>,
}

impl<'a> PredictiveActuator<'a> {
    /// Actuator over one tick's snapshot.
    pub fn new(snapshot: &'a WorldSnapshot) -> Self {
        Self {
            view: WorldView::new(snapshot),
            budget: snapshot.budget,
            facility_busy: snapshot.facility.busy,
            issued: Vec::new(),
        }
    }

    /// Commands issued so far.
    pub fn issued(&self) -> &[IssuedCommand] {
        &self.issued
    }

    /// Consume the actuator, returning every issued command.
    pub fn into_issued(self) -> Vec<IssuedCommand> {
        self.issued
    }

    fn agent_state(&self, actor: Actor) -> Option<(AgentId, Position, Store)> {
        match actor {
            Actor::Agent(id) => self.view.agent(id).map(|a| (id, a.pos, a.store)),
            Actor::Colony => None,
        }
    }

    fn target_store(&self, target: EntityRef) -> Result<(Position, Store), ActionCode> {
        match target {
            EntityRef::Agent(id) => self
                .view
                .agent(id)
                .map(|a| (a.pos, a.store))
                .ok_or(ActionCode::NotFound),
            EntityRef::Structure(id) => {
                let structure = self.view.structure(id).ok_or(ActionCode::NotFound)?;
                structure
                    .store
                    .map(|store| (structure.pos, store))
                    .ok_or(ActionCode::InvalidTarget)
            }
            EntityRef::Node(_)
            | EntityRef::Site(_)
            | EntityRef::Dropped(_)
            | EntityRef::Controller(_) => {
                if self.view.resolves(target) {
                    Err(ActionCode::InvalidTarget)
                } else {
                    Err(ActionCode::NotFound)
                }
            }
        }
    }

    fn evaluate(&mut self, actor: Actor, command: &Command) -> ActionCode {
        match *command {
            Command::Move { destination } => {
                if self.agent_state(actor).is_none() {
                    ActionCode::InvalidTarget
                } else if destination.is_in_bounds() {
                    ActionCode::Ok
                } else {
                    ActionCode::InvalidTarget
                }
            }
            Command::ProduceAgent { facility, role } => {
                if facility != self.view.facility().id {
                    return ActionCode::NotFound;
                }
                if self.facility_busy {
                    return ActionCode::Busy;
                }
                let cost = role.cost();
                if self.budget < cost {
                    return ActionCode::NotEnoughResources;
                }
                self.facility_busy = true;
                self.budget = self.budget.saturating_sub(cost);
                ActionCode::Ok
            }
            Command::CreateConstructionSite { pos, kind } => self.evaluate_site(pos, kind),
            _ => self.evaluate_agent(actor, command),
        }
    }

    fn evaluate_site(&self, pos: Position, _kind: StructureKind) -> ActionCode {
        let occupied = self.view.structures().any(|s| s.pos == pos)
            || self.view.sites().any(|s| s.pos == pos);
        if !self.view.terrain().is_walkable(pos) || occupied {
            ActionCode::InvalidTarget
        } else {
            ActionCode::Ok
        }
    }

    fn evaluate_agent(&self, actor: Actor, command: &Command) -> ActionCode {
        let Some((_, pos, store)) = self.agent_state(actor) else {
            return ActionCode::InvalidTarget;
        };
        let in_range = |target: Position, range: u32| {
            if pos.in_range_to(target, range) {
                ActionCode::Ok
            } else {
                ActionCode::NotInRange
            }
        };
        match *command {
            Command::Harvest { node } => match self.view.node(node) {
                None => ActionCode::NotFound,
                Some(n) if n.available == 0 => ActionCode::NotEnoughResources,
                Some(n) => in_range(n.pos, INTERACT_RANGE),
            },
            Command::Transfer { target, .. } => match self.target_store(target) {
                Err(code) => code,
                Ok(_) if store.is_empty() => ActionCode::NotEnoughResources,
                Ok((_, target_store)) if target_store.is_full() => ActionCode::Full,
                Ok((target_pos, _)) => in_range(target_pos, INTERACT_RANGE),
            },
            Command::Withdraw { target, .. } => match self.target_store(target) {
                Err(code) => code,
                Ok(_) if store.is_full() => ActionCode::Full,
                Ok((_, source)) if source.is_empty() => ActionCode::NotEnoughResources,
                Ok((source_pos, _)) => in_range(source_pos, INTERACT_RANGE),
            },
            Command::Pickup { resource } => match self.view.dropped(resource) {
                None => ActionCode::NotFound,
                Some(_) if store.is_full() => ActionCode::Full,
                Some(pile) => in_range(pile.pos, INTERACT_RANGE),
            },
            Command::Build { site } => match self.view.site(site) {
                None => ActionCode::NotFound,
                Some(_) if store.is_empty() => ActionCode::NotEnoughResources,
                Some(s) => in_range(s.pos, WORK_RANGE),
            },
            Command::UpgradeController { controller } => {
                let target = self.view.controller();
                if target.id != controller {
                    ActionCode::NotFound
                } else if store.is_empty() {
                    ActionCode::NotEnoughResources
                } else {
                    in_range(target.pos, WORK_RANGE)
                }
            }
            Command::Move { .. }
            | Command::ProduceAgent { .. }
            | Command::CreateConstructionSite { .. } => ActionCode::InvalidTarget,
        }
    }
}

impl Actuator for PredictiveActuator<'_> {
    fn execute(&mut self, actor: Actor, command: Command) -> ActionCode {
        let code = self.evaluate(actor, &command);
        self.issued.push(IssuedCommand {
            actor,
            command,
            code,
        });
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_types::{
        AgentView, ColonyId, ControllerId, ControllerView, FacilityView, NodeId, NodeView, Role,
        SiteId, SiteView, StructureId, StructureView, Terrain,
    };

    fn snapshot(agent: AgentView) -> WorldSnapshot {
        WorldSnapshot {
            tick: 1,
            colony_id: ColonyId::new(),
            base: Position::new(25, 25),
            budget: 300,
            agents: vec![agent],
            nodes: vec![NodeView {
                id: NodeId::new(),
                pos: Position::new(10, 10),
                available: 1000,
            }],
            structures: vec![StructureView {
                id: StructureId::new(),
                kind: StructureKind::Extension,
                pos: Position::new(12, 10),
                store: Some(Store::new(50, 50)),
                hits: 1000,
            }],
            sites: vec![SiteView {
                id: SiteId::new(),
                kind: StructureKind::Road,
                pos: Position::new(13, 10),
                progress: 0,
                total: 300,
            }],
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
                pos: Position::new(40, 40),
                tier: 1,
            },
            terrain: Terrain::default(),
        }
    }

    fn agent_at(x: i32, y: i32, used: u32) -> AgentView {
        AgentView {
            id: AgentId::new(),
            role: Role::Harvester,
            pos: Position::new(x, y),
            store: Store::new(used, 50),
        }
    }

    #[test]
    fn harvest_checks_range() {
        let near = agent_at(11, 11, 0);
        let snap = snapshot(near.clone());
        let node = snap.nodes.first().map(|n| n.id).unwrap_or_default();
        let mut actuator = PredictiveActuator::new(&snap);
        assert_eq!(
            actuator.execute(Actor::Agent(near.id), Command::Harvest { node }),
            ActionCode::Ok
        );

        let far = agent_at(20, 20, 0);
        let snap = snapshot(far.clone());
        let node = snap.nodes.first().map(|n| n.id).unwrap_or_default();
        let mut actuator = PredictiveActuator::new(&snap);
        assert_eq!(
            actuator.execute(Actor::Agent(far.id), Command::Harvest { node }),
            ActionCode::NotInRange
        );
        assert_eq!(
            actuator.execute(Actor::Agent(far.id), Command::Harvest { node: NodeId::new() }),
            ActionCode::NotFound
        );
        assert_eq!(actuator.issued().len(), 2);
    }

    #[test]
    fn transfer_into_full_structure_is_full() {
        let a = agent_at(11, 10, 50);
        let snap = snapshot(a.clone());
        let ext = snap.structures.first().map(|s| s.id).unwrap_or_default();
        let mut actuator = PredictiveActuator::new(&snap);
        let code = actuator.execute(
            Actor::Agent(a.id),
            Command::Transfer {
                target: EntityRef::Structure(ext),
                amount: 50,
            },
        );
        assert_eq!(code, ActionCode::Full);
    }

    #[test]
    fn build_uses_work_range() {
        let a = agent_at(10, 10, 20);
        let snap = snapshot(a.clone());
        let site = snap.sites.first().map(|s| s.id).unwrap_or_default();
        let mut actuator = PredictiveActuator::new(&snap);
        assert_eq!(
            actuator.execute(Actor::Agent(a.id), Command::Build { site }),
            ActionCode::Ok
        );
    }

    #[test]
    fn production_consumes_slot_and_budget() {
        let snap = snapshot(agent_at(1, 1, 0));
        let facility = snap.facility.id;
        let mut actuator = PredictiveActuator::new(&snap);
        let produce = |role| Command::ProduceAgent { facility, role };
        assert_eq!(actuator.execute(Actor::Colony, produce(Role::Miner)), ActionCode::Ok);
        assert_eq!(actuator.execute(Actor::Colony, produce(Role::Miner)), ActionCode::Busy);

        let mut poor = snap.clone();
        poor.budget = 100;
        let mut actuator = PredictiveActuator::new(&poor);
        assert_eq!(
            actuator.execute(Actor::Colony, produce(Role::Hauler)),
            ActionCode::NotEnoughResources
        );
    }

    #[test]
    fn site_on_occupied_tile_is_invalid() {
        let snap = snapshot(agent_at(1, 1, 0));
        let mut actuator = PredictiveActuator::new(&snap);
        let code = actuator.execute(
            Actor::Colony,
            Command::CreateConstructionSite {
                pos: Position::new(12, 10),
                kind: StructureKind::Container,
            },
        );
        assert_eq!(code, ActionCode::InvalidTarget);
        let code = actuator.execute(
            Actor::Colony,
            Command::CreateConstructionSite {
                pos: Position::new(26, 25),
                kind: StructureKind::Container,
            },
        );
        assert_eq!(code, ActionCode::Ok);
    }
}
