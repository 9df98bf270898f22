//! Enumeration types for the colony decision engine.
//!
//! Roles and task modes form a closed set: every state machine is selected
//! by an exhaustive `match` on [`Role`], so adding a role is a compile error
//! until every dispatch site handles it.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The job an agent performs for the colony.
///
/// Ordering of the variants is the enqueue order used by the production
/// queue when several roles fall below their population targets in the
/// same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Low-priority extractor: harvests, then delivers, builds, or upgrades
    /// through a fallback cascade. Yields node slots to miners.
    Harvester,
    /// High-priority extractor: stays on its node and mines. May evict a
    /// harvester to claim a slot.
    Miner,
    /// Delivery agent: moves resource between piles, containers,
    /// structures, and other agents.
    Hauler,
    /// Maintenance agent: feeds carried resource into the colony controller.
    Upgrader,
    /// Construction agent: turns carried resource into structures.
    Builder,
}

impl Role {
    /// Every role, in enqueue order.
    pub const ALL: [Self; 5] = [
        Self::Harvester,
        Self::Miner,
        Self::Hauler,
        Self::Upgrader,
        Self::Builder,
    ];

    /// Whether this role occupies a resource node slot.
    pub const fn is_extractor(self) -> bool {
        matches!(self, Self::Miner | Self::Harvester)
    }

    /// Whether this role may evict lower-priority occupants from a node.
    pub const fn may_evict(self) -> bool {
        matches!(self, Self::Miner)
    }

    /// The body the production facility builds for this role.
    pub const fn body(self) -> &'static [BodyPart] {
        match self {
            Self::Harvester | Self::Upgrader | Self::Builder => {
                &[BodyPart::Work, BodyPart::Carry, BodyPart::Move]
            }
            Self::Miner => &[BodyPart::Work, BodyPart::Work, BodyPart::Move],
            Self::Hauler => &[
                BodyPart::Carry,
                BodyPart::Carry,
                BodyPart::Move,
                BodyPart::Move,
            ],
        }
    }

    /// Budget required to produce an agent of this role.
    pub fn cost(self) -> u32 {
        self.body()
            .iter()
            .fold(0_u32, |total, part| total.saturating_add(part.cost()))
    }

    /// The task mode a freshly produced (or reclassified) agent starts in.
    pub const fn initial_task(self) -> TaskMode {
        match self {
            Self::Miner => TaskMode::Mine,
            Self::Harvester => TaskMode::Harvest,
            Self::Hauler | Self::Builder => TaskMode::Collect,
            Self::Upgrader => TaskMode::Fetch,
        }
    }

    /// Short lowercase label used in logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Harvester => "harvester",
            Self::Miner => "miner",
            Self::Hauler => "hauler",
            Self::Upgrader => "upgrader",
            Self::Builder => "builder",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// A body part of a produced agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    /// Locomotion.
    Move,
    /// Harvesting, building, and upgrading.
    Work,
    /// Carry capacity.
    Carry,
}

impl BodyPart {
    /// Production cost of this part.
    pub const fn cost(self) -> u32 {
        match self {
            Self::Move | Self::Carry => 50,
            Self::Work => 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Task modes
// ---------------------------------------------------------------------------

/// The current state of an agent's role state machine.
///
/// Each role uses a subset:
///
/// | Role | Modes |
/// |------|-------|
/// | Miner | `Mine` |
/// | Harvester | `Harvest`, `Deliver` |
/// | Hauler | `Collect`, `Deliver` |
/// | Upgrader | `Fetch`, `Upgrade` |
/// | Builder | `Collect`, `Build` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    /// Extract from the assigned node.
    Mine,
    /// Fill up from the assigned node.
    Harvest,
    /// Hand carried resource to a consumer.
    Deliver,
    /// Gather resource from piles or containers.
    Collect,
    /// Feed the colony controller.
    Upgrade,
    /// Gather resource near the colony controller.
    Fetch,
    /// Spend carried resource on a construction site.
    Build,
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// A type of structure (or construction site) in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Defensive tower; first in line for resource.
    Tower,
    /// The production facility.
    Spawn,
    /// Capacity structure that extends the production budget.
    Extension,
    /// Small general-purpose storage.
    Container,
    /// The colony's large storage.
    Storage,
    /// Road tile.
    Road,
    /// Defensive rampart.
    Rampart,
    /// Constructed wall.
    Wall,
}

impl StructureKind {
    /// Rank among structures that consume resource directly, lower first.
    ///
    /// Defense before the production facility before capacity structures.
    /// Storage-type and passive structures return `None`.
    pub const fn energy_priority(self) -> Option<u8> {
        match self {
            Self::Tower => Some(1),
            Self::Spawn => Some(2),
            Self::Extension => Some(3),
            Self::Container | Self::Storage | Self::Road | Self::Rampart | Self::Wall => None,
        }
    }

    /// Whether the structure is a storage-type structure agents may withdraw from.
    pub const fn is_storage(self) -> bool {
        matches!(self, Self::Container | Self::Storage)
    }
}

// ---------------------------------------------------------------------------
// Command results
// ---------------------------------------------------------------------------

/// Result code returned by the world for an issued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCode {
    /// The command was accepted.
    Ok,
    /// The actor is too far from the target.
    NotInRange,
    /// The target cannot receive this command.
    InvalidTarget,
    /// The target no longer exists.
    NotFound,
    /// The target or facility is busy.
    Busy,
    /// The target has no free capacity.
    Full,
    /// The actor or colony lacks the resource for this command.
    NotEnoughResources,
    /// Any other world-specific code.
    Other(i32),
}

/// What the issuing state machine does with an [`ActionCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionDisposition {
    /// The action happened.
    Done,
    /// Move toward the target and try again next tick.
    MoveCloser,
    /// Drop the cached target; reselect next tick.
    ClearTarget,
    /// Leave state unchanged; the action repeats next tick.
    Defer,
    /// Log only.
    Log,
}

impl ActionCode {
    /// Classify the code into the controller's reaction.
    pub const fn disposition(self) -> ActionDisposition {
        match self {
            Self::Ok => ActionDisposition::Done,
            Self::NotInRange => ActionDisposition::MoveCloser,
            Self::InvalidTarget | Self::NotFound => ActionDisposition::ClearTarget,
            Self::Busy | Self::Full | Self::NotEnoughResources => ActionDisposition::Defer,
            Self::Other(_) => ActionDisposition::Log,
        }
    }

    /// Whether the command was accepted.
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}
