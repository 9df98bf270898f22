//! Shared type definitions for the colony decision engine.
//!
//! This crate is the single source of truth for the values that cross
//! crate boundaries: identifiers, roles and task modes, the per-tick world
//! snapshot, and the commands sent back to the world.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for every world object
//! - [`enums`] -- Roles, task modes, structure kinds, action result codes
//! - [`structs`] -- Positions, stores, terrain
//! - [`snapshot`] -- The read-only world snapshot
//! - [`commands`] -- Commands issued to the world

pub mod commands;
pub mod enums;
pub mod ids;
pub mod snapshot;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use commands::{Actor, Command, EntityRef, IssuedCommand};
pub use enums::{ActionCode, ActionDisposition, BodyPart, Role, StructureKind, TaskMode};
pub use ids::{AgentId, ColonyId, ControllerId, DropId, HostileId, NodeId, SiteId, StructureId};
pub use snapshot::{
    AgentView, ControllerView, DroppedView, FacilityView, HostileView, NodeView, SiteView,
    StructureView, WorldSnapshot,
};
pub use structs::{GRID_SIZE, Position, Store, Terrain};
