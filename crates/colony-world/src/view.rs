//! Indexed, read-only access to a [`WorldSnapshot`].
//!
//! The snapshot arrives as flat lists; [`WorldView`] builds id lookups once
//! per tick so state machines can resolve cached targets cheaply.

use std::collections::BTreeMap;

use colony_types::{
    AgentId, AgentView, ControllerView, DropId, DroppedView, EntityRef, FacilityView, NodeId,
    NodeView, Position, SiteId, SiteView, StructureId, StructureKind, StructureView, Terrain,
    WorldSnapshot,
};

/// Id-indexed view over one tick's snapshot.
#[derive(Debug)]
pub struct WorldView<'a> {
    snapshot: &'a WorldSnapshot,
    agents: BTreeMap<AgentId, &'a AgentView>,
    nodes: BTreeMap<NodeId, &'a NodeView>,
    structures: BTreeMap<StructureId, &'a StructureView>,
    sites: BTreeMap<SiteId, &'a SiteView>,
    dropped: BTreeMap<DropId, &'a DroppedView>,
}

impl<'a> WorldView<'a> {
    /// Index a snapshot.
    pub fn new(snapshot: &'a WorldSnapshot) -> Self {
        Self {
            snapshot,
            agents: snapshot.agents.iter().map(|a| (a.id, a)).collect(),
            nodes: snapshot.nodes.iter().map(|n| (n.id, n)).collect(),
            structures: snapshot.structures.iter().map(|s| (s.id, s)).collect(),
            sites: snapshot.sites.iter().map(|s| (s.id, s)).collect(),
            dropped: snapshot.dropped.iter().map(|d| (d.id, d)).collect(),
        }
    }

    /// The underlying snapshot.
    pub const fn snapshot(&self) -> &'a WorldSnapshot {
        self.snapshot
    }

    /// Colony base position.
    pub const fn base(&self) -> Position {
        self.snapshot.base
    }

    /// Terrain walls.
    pub const fn terrain(&self) -> &'a Terrain {
        &self.snapshot.terrain
    }

    /// The production facility.
    pub const fn facility(&self) -> &'a FacilityView {
        &self.snapshot.facility
    }

    /// The colony controller.
    pub const fn controller(&self) -> &'a ControllerView {
        &self.snapshot.controller
    }

    /// Look up an agent.
    pub fn agent(&self, id: AgentId) -> Option<&'a AgentView> {
        self.agents.get(&id).copied()
    }

    /// Look up a resource node.
    pub fn node(&self, id: NodeId) -> Option<&'a NodeView> {
        self.nodes.get(&id).copied()
    }

    /// Look up a structure.
    pub fn structure(&self, id: StructureId) -> Option<&'a StructureView> {
        self.structures.get(&id).copied()
    }

    /// Look up a construction site.
    pub fn site(&self, id: SiteId) -> Option<&'a SiteView> {
        self.sites.get(&id).copied()
    }

    /// Look up a dropped pile.
    pub fn dropped(&self, id: DropId) -> Option<&'a DroppedView> {
        self.dropped.get(&id).copied()
    }

    /// Agents in snapshot order.
    pub fn agents(&self) -> impl Iterator<Item = &'a AgentView> {
        self.snapshot.agents.iter()
    }

    /// Structures in snapshot order.
    pub fn structures(&self) -> impl Iterator<Item = &'a StructureView> {
        self.snapshot.structures.iter()
    }

    /// Construction sites in snapshot order.
    pub fn sites(&self) -> impl Iterator<Item = &'a SiteView> {
        self.snapshot.sites.iter()
    }

    /// Dropped piles in snapshot order.
    pub fn dropped_piles(&self) -> impl Iterator<Item = &'a DroppedView> {
        self.snapshot.dropped.iter()
    }

    /// Containers in snapshot order.
    pub fn containers(&self) -> impl Iterator<Item = &'a StructureView> {
        self.structures()
            .filter(|s| s.kind == StructureKind::Container)
    }

    /// The colony storage, if built.
    pub fn storage(&self) -> Option<&'a StructureView> {
        self.structures()
            .find(|s| s.kind == StructureKind::Storage)
    }

    /// Whether any construction site is pending.
    pub fn has_pending_sites(&self) -> bool {
        self.sites().any(|s| !s.is_complete())
    }

    /// Position of a referenced entity, if it still exists.
    pub fn position_of(&self, target: EntityRef) -> Option<Position> {
        match target {
            EntityRef::Agent(id) => self.agent(id).map(|a| a.pos),
            EntityRef::Node(id) => self.node(id).map(|n| n.pos),
            EntityRef::Structure(id) => self.structure(id).map(|s| s.pos),
            EntityRef::Site(id) => self.site(id).map(|s| s.pos),
            EntityRef::Dropped(id) => self.dropped(id).map(|d| d.pos),
            EntityRef::Controller(id) => {
                (self.snapshot.controller.id == id).then_some(self.snapshot.controller.pos)
            }
        }
    }

    /// Whether a referenced entity still exists.
    pub fn resolves(&self, target: EntityRef) -> bool {
        self.position_of(target).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_types::{ColonyId, ControllerId, Store};

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            tick: 7,
            colony_id: ColonyId::new(),
            base: Position::new(25, 25),
            budget: 300,
            agents: Vec::new(),
            nodes: Vec::new(),
            structures: vec![
                StructureView {
                    id: StructureId::new(),
                    kind: StructureKind::Container,
                    pos: Position::new(26, 25),
                    store: Some(Store::new(0, 2000)),
                    hits: 250,
                },
                StructureView {
                    id: StructureId::new(),
                    kind: StructureKind::Storage,
                    pos: Position::new(24, 25),
                    store: Some(Store::new(0, 1_000_000)),
                    hits: 10_000,
                },
            ],
            sites: Vec::new(),
            hostiles: Vec::new(),
            dropped: vec![DroppedView {
                id: DropId::new(),
                pos: Position::new(30, 30),
                amount: 50,
            }],
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
        }
    }

    #[test]
    fn resolves_known_and_unknown_refs() {
        let snap = snapshot();
        let view = WorldView::new(&snap);
        let pile = snap.dropped.first().map(|d| d.id);
        assert!(pile.is_some_and(|id| view.resolves(EntityRef::Dropped(id))));
        assert!(!view.resolves(EntityRef::Dropped(DropId::new())));
        assert_eq!(
            view.position_of(EntityRef::Controller(snap.controller.id)),
            Some(Position::new(20, 20))
        );
        assert!(!view.resolves(EntityRef::Controller(ControllerId::new())));
    }

    #[test]
    fn storage_and_containers_are_separated() {
        let snap = snapshot();
        let view = WorldView::new(&snap);
        assert_eq!(view.containers().count(), 1);
        assert!(view.storage().is_some());
        assert!(!view.has_pending_sites());
    }
}
