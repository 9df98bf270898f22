//! World-facing services for the colony decision engine.
//!
//! This crate wraps the per-tick snapshot in an indexed read-only view,
//! tracks resource node occupancy across ticks, and detects hostile
//! threats near agents and nodes.
//!
//! # Modules
//!
//! - [`error`] -- Error types for registry operations.
//! - [`registry`] -- [`NodeRegistry`] of resource nodes with
//!   capacity-bounded occupant lists.
//! - [`safety`] -- [`SafetyMonitor`] danger-radius checks.
//! - [`view`] -- [`WorldView`] id lookups over a snapshot.

pub mod error;
pub mod registry;
pub mod safety;
pub mod view;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use registry::{NodeRecord, NodeRegistry};
pub use safety::{DEFAULT_DANGER_RADIUS, SafetyMonitor, SafetyReport};
pub use view::WorldView;
