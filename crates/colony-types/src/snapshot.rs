//! The per-tick world snapshot consumed by the decision engine.
//!
//! The snapshot is produced by the external world provider once per tick
//! and is read-only for the whole tick. Everything the engine knows about
//! the world arrives through it; everything it wants to change leaves as a
//! [`Command`](crate::commands::Command).

use serde::{Deserialize, Serialize};

use crate::enums::{Role, StructureKind};
use crate::ids::{AgentId, ColonyId, ControllerId, DropId, HostileId, NodeId, SiteId, StructureId};
use crate::structs::{Position, Store, Terrain};

/// One of the colony's own agents as the world sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    /// Agent identifier.
    pub id: AgentId,
    /// Role the agent was produced with. The colony memory is authoritative
    /// once the agent is known; this only seeds memory for new agents.
    pub role: Role,
    /// Current tile.
    pub pos: Position,
    /// Carried resource.
    pub store: Store,
}

/// A resource node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    /// Node identifier.
    pub id: NodeId,
    /// Node tile.
    pub pos: Position,
    /// Resource currently left in the node.
    pub available: u32,
}

/// A built structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureView {
    /// Structure identifier.
    pub id: StructureId,
    /// Structure type.
    pub kind: StructureKind,
    /// Structure tile.
    pub pos: Position,
    /// Held resource, for structures that hold any.
    #[serde(default)]
    pub store: Option<Store>,
    /// Remaining hit points.
    pub hits: u32,
}

/// A construction site awaiting work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteView {
    /// Site identifier.
    pub id: SiteId,
    /// Structure type that will be built.
    pub kind: StructureKind,
    /// Site tile.
    pub pos: Position,
    /// Work done so far.
    pub progress: u32,
    /// Work required in total.
    pub total: u32,
}

impl SiteView {
    /// Whether the site has received all the work it needs.
    pub const fn is_complete(&self) -> bool {
        self.progress >= self.total
    }
}

/// A hostile unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostileView {
    /// Hostile identifier.
    pub id: HostileId,
    /// Hostile tile.
    pub pos: Position,
}

/// A pile of resource lying on the ground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedView {
    /// Pile identifier.
    pub id: DropId,
    /// Pile tile.
    pub pos: Position,
    /// Units in the pile.
    pub amount: u32,
}

/// The single production facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityView {
    /// Facility structure identifier.
    pub id: StructureId,
    /// Facility tile.
    pub pos: Position,
    /// Whether an agent is being produced right now.
    pub busy: bool,
    /// Role being produced, when the world reports it.
    #[serde(default)]
    pub producing: Option<Role>,
}

/// The colony controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerView {
    /// Controller identifier.
    pub id: ControllerId,
    /// Controller tile.
    pub pos: Position,
    /// Colony tier.
    pub tier: u32,
}

/// Everything the engine sees for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// World tick number.
    pub tick: u64,
    /// Colony the snapshot belongs to.
    pub colony_id: ColonyId,
    /// Colony base location (distance origin for resource nodes).
    pub base: Position,
    /// Budget available to the production facility.
    pub budget: u32,
    /// The colony's agents.
    #[serde(default)]
    pub agents: Vec<AgentView>,
    /// Resource nodes.
    #[serde(default)]
    pub nodes: Vec<NodeView>,
    /// Built structures (facility included).
    #[serde(default)]
    pub structures: Vec<StructureView>,
    /// Construction sites.
    #[serde(default)]
    pub sites: Vec<SiteView>,
    /// Hostile units.
    #[serde(default)]
    pub hostiles: Vec<HostileView>,
    /// Dropped resource piles.
    #[serde(default)]
    pub dropped: Vec<DroppedView>,
    /// The production facility.
    pub facility: FacilityView,
    /// The colony controller.
    pub controller: ControllerView,
    /// Impassable tiles.
    #[serde(default)]
    pub terrain: Terrain,
}
