//! Commands the engine issues to the world, and the record of each issue.
//!
//! Commands are fire-and-forget: the world answers with an
//! [`ActionCode`] immediately and the issuing state machine reacts within
//! the same tick.

use serde::{Deserialize, Serialize};

use crate::enums::{ActionCode, Role, StructureKind};
use crate::ids::{AgentId, ControllerId, DropId, NodeId, SiteId, StructureId};
use crate::structs::Position;

/// Something an agent can hand resource to or take it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    /// Another of the colony's agents.
    Agent(AgentId),
    /// A resource node.
    Node(NodeId),
    /// A structure.
    Structure(StructureId),
    /// A construction site.
    Site(SiteId),
    /// A dropped resource pile.
    Dropped(DropId),
    /// The colony controller.
    Controller(ControllerId),
}

/// A command sent to the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Extract from a resource node.
    Harvest {
        /// Node to harvest.
        node: NodeId,
    },
    /// Step toward a tile.
    Move {
        /// Destination tile.
        destination: Position,
    },
    /// Hand carried resource to a structure or agent.
    Transfer {
        /// Receiver.
        target: EntityRef,
        /// Units to hand over.
        amount: u32,
    },
    /// Take resource out of a structure.
    Withdraw {
        /// Source structure.
        target: EntityRef,
        /// Units to take.
        amount: u32,
    },
    /// Pick up a dropped pile.
    Pickup {
        /// Pile to pick up.
        resource: DropId,
    },
    /// Spend carried resource on a construction site.
    Build {
        /// Site to work on.
        site: SiteId,
    },
    /// Spend carried resource on the colony controller.
    UpgradeController {
        /// The controller.
        controller: ControllerId,
    },
    /// Ask the world to place a new construction site.
    CreateConstructionSite {
        /// Tile for the site.
        pos: Position,
        /// Structure type to build there.
        kind: StructureKind,
    },
    /// Ask the production facility for a new agent.
    ProduceAgent {
        /// Facility to use.
        facility: StructureId,
        /// Role of the new agent.
        role: Role,
    },
}

/// Who issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "actor", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// One of the colony's agents.
    Agent(AgentId),
    /// The colony itself (production, site requests).
    Colony,
}

/// A command together with its issuer and the world's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCommand {
    /// Issuer.
    pub actor: Actor,
    /// The command.
    pub command: Command,
    /// The world's result code.
    pub code: ActionCode,
}
