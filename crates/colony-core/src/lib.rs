//! Decision engine for a persistent multi-agent colony.
//!
//! This crate owns everything the colony remembers between ticks and the
//! tick cycle that acts on it: node allocation with eviction, the
//! budget-gated production queue with its one-way early phase, and the
//! five per-role agent state machines.
//!
//! # Modules
//!
//! - [`actuator`] -- [`Actuator`] seam for commands and
//!   [`PredictiveActuator`], which answers from the snapshot.
//! - [`config`] -- Configuration loading from `colony-config.yaml` into
//!   strongly-typed structs.
//! - [`controller`] -- Per-role state machines and the shared pre-step.
//! - [`error`] -- [`ColonyError`] taxonomy of recoverable failures.
//! - [`memory`] -- [`ColonyMemory`], the persisted per-colony state.
//! - [`production`] -- [`ProductionQueue`], population thresholds, and
//!   the phase transition.
//! - [`scheduler`] -- Safety release and node allocation.
//! - [`tick`] -- The tick cycle.
//!
//! [`Actuator`]: actuator::Actuator
//! [`PredictiveActuator`]: actuator::PredictiveActuator

pub mod actuator;
pub mod config;
pub mod controller;
pub mod error;
pub mod memory;
pub mod production;
pub mod scheduler;
pub mod tick;

// Re-export primary types at crate root.
pub use actuator::{Actuator, PredictiveActuator};
pub use config::{ColonyConfig, ConfigError};
pub use error::{ColonyError, DenialReason, ErrorKind};
pub use memory::{AgentMemory, ColonyMemory, ColonyRecord, ColonyState};
pub use production::ProductionQueue;
pub use tick::{TickError, TickOutput, TickSummary, run_tick};
