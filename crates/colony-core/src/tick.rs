//! Tick cycle: one synchronous pass of the colony decision engine.
//!
//! Each tick runs these phases in a fixed order over the same snapshot:
//!
//! 1. **Bootstrap** -- on the colony's first tick, register its resource
//!    nodes and seed the production queue.
//!
//! 2. **Sync** -- prune memory for agents the world no longer reports,
//!    adopt new agents, and repair one-sided node assignments.
//!
//! 3. **Safety release and allocation** -- release agents from nodes near
//!    hostiles, then assign unassigned extractors (see [`scheduler`]).
//!
//! 4. **Production** -- update the early-phase flag, enqueue roles below
//!    target, and attempt one production (see [`production`]).
//!
//! 5. **Agents** -- run every agent's state machine in [`AgentId`] order.
//!    Agents released for safety this tick skip their step.
//!
//! No domain failure aborts a tick; failures are tallied by kind in the
//! [`TickSummary`] and retried next tick.
//!
//! [`scheduler`]: crate::scheduler
//! [`production`]: crate::production

use std::collections::BTreeMap;

use colony_types::{AgentId, ColonyId, IssuedCommand, Role, WorldSnapshot};
use colony_world::{SafetyMonitor, SafetyReport, WorldView};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::config::ColonyConfig;
use crate::controller::{StepOutcome, StepReport, run_agent};
use crate::error::ErrorKind;
use crate::memory::{ColonyMemory, SyncReport};
use crate::production::{ProductionReport, run_production};
use crate::scheduler::{AllocationReport, run_allocation};

/// Errors that stop a tick before any phase runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    /// The snapshot belongs to another colony.
    #[error("snapshot for colony {found} given to colony {expected}")]
    ColonyMismatch {
        /// The colony this memory belongs to.
        expected: ColonyId,
        /// The colony named by the snapshot.
        found: ColonyId,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Live agents at the end of the tick.
    pub agents: u32,
    /// Nodes registered by this tick's bootstrap.
    pub nodes_registered: usize,
    /// Memory changes made by the sync phase.
    pub sync: SyncReport,
    /// Nodes and agents with a hostile in range.
    pub safety: SafetyReport,
    /// What the allocation phase did.
    pub allocation: AllocationReport,
    /// What the production phase did.
    pub production: ProductionReport,
    /// Every agent step, in processing order.
    pub steps: Vec<StepReport>,
    /// Step outcomes by kind.
    pub outcomes: BTreeMap<StepOutcome, u32>,
    /// Recoverable failures by kind.
    pub errors: BTreeMap<ErrorKind, u32>,
}

impl TickSummary {
    fn tally_error(&mut self, kind: ErrorKind) {
        self.tally_errors(kind, 1);
    }

    fn tally_errors(&mut self, kind: ErrorKind, n: usize) {
        if n == 0 {
            return;
        }
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        let count = self.errors.entry(kind).or_insert(0);
        *count = count.saturating_add(n);
    }

    fn record_step(&mut self, report: StepReport) {
        let count = self.outcomes.entry(report.outcome).or_insert(0);
        *count = count.saturating_add(1);
        if let Some(error) = &report.error {
            self.tally_error(error.kind());
        }
        self.steps.push(report);
    }

    /// Number of steps that ended with `outcome`.
    pub fn outcome_count(&self, outcome: StepOutcome) -> u32 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Number of failures of `kind`.
    pub fn error_count(&self, kind: ErrorKind) -> u32 {
        self.errors.get(&kind).copied().unwrap_or(0)
    }
}

/// Execute one tick against `snapshot`.
///
/// Every command goes through `actuator`; the caller collects them from
/// it afterwards.
pub fn run_tick(
    memory: &mut ColonyMemory,
    snapshot: &WorldSnapshot,
    config: &ColonyConfig,
    actuator: &mut dyn Actuator,
) -> Result<TickSummary, TickError> {
    if snapshot.colony_id != memory.colony_id {
        return Err(TickError::ColonyMismatch {
            expected: memory.colony_id,
            found: snapshot.colony_id,
        });
    }
    let tick = snapshot.tick;
    debug!(tick, colony_id = %memory.colony_id, "Tick started");
    if memory.last_tick.is_some_and(|last| last >= tick) {
        warn!(tick, last_tick = ?memory.last_tick, "Snapshot tick did not advance");
    }

    let mut summary = TickSummary {
        tick,
        ..TickSummary::default()
    };

    // --- Phase 1: Bootstrap ---
    summary.nodes_registered = memory.bootstrap(snapshot, config);

    // --- Phase 2: Sync ---
    summary.sync = memory.sync(snapshot);

    // --- Phase 3: Safety release and allocation ---
    let safety = SafetyMonitor::from_snapshot(snapshot, config.safety.danger_radius);
    summary.safety = safety.assess(&memory.registry, snapshot);
    if !summary.safety.is_clear() {
        info!(
            tick,
            radius = safety.radius(),
            unsafe_nodes = summary.safety.unsafe_nodes.len(),
            threatened_agents = summary.safety.threatened_agents.len(),
            "Hostiles in range"
        );
    }
    summary.allocation = run_allocation(memory, &safety);
    let idle = summary.allocation.idle.len();
    summary.tally_errors(ErrorKind::NoEligibleTarget, idle);

    // --- Phase 4: Production ---
    let view = WorldView::new(snapshot);
    summary.production = run_production(memory, &view, &config.population, actuator);
    if summary.production.denied.is_some() {
        summary.tally_error(ErrorKind::ProductionDenied);
    }

    // --- Phase 5: Agents ---
    let agents: Vec<AgentId> = memory.agents.keys().copied().collect();
    for id in agents {
        let Some(agent) = view.agent(id) else {
            continue;
        };
        let skip = summary.allocation.was_released(id);
        if let Some(report) = run_agent(memory, agent, &view, &safety, config, actuator, skip) {
            summary.record_step(report);
        }
    }

    if let Err(error) = memory.check_invariants() {
        warn!(tick, %error, "Colony memory invariant violated");
    }
    memory.last_tick = Some(tick);
    summary.agents = u32::try_from(memory.agents.len()).unwrap_or(u32::MAX);

    info!(
        tick,
        agents = summary.agents,
        assigned = summary.allocation.assigned.len(),
        produced = ?summary.production.produced,
        early_phase = memory.state.early_phase,
        "Tick complete"
    );
    Ok(summary)
}

/// One line of engine output: the tick's commands plus headline counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutput {
    /// The tick number.
    pub tick: u64,
    /// The colony that acted.
    pub colony_id: ColonyId,
    /// Every command issued, in issue order.
    pub commands: Vec<IssuedCommand>,
    /// Live agents at the end of the tick.
    pub agents: u32,
    /// Node assignments made.
    pub assigned: u32,
    /// Occupants evicted.
    pub evicted: u32,
    /// Agents released from unsafe nodes.
    pub released: u32,
    /// Role whose production started, if any.
    pub produced: Option<Role>,
    /// Whether the colony is still in its early phase.
    pub early_phase: bool,
    /// Recoverable failures by kind.
    pub errors: BTreeMap<ErrorKind, u32>,
}

impl TickOutput {
    /// Assemble the output line for a finished tick.
    pub fn new(summary: &TickSummary, memory: &ColonyMemory, commands: Vec<IssuedCommand>) -> Self {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        Self {
            tick: summary.tick,
            colony_id: memory.colony_id,
            commands,
            agents: summary.agents,
            assigned: count(summary.allocation.assigned.len()),
            evicted: count(summary.allocation.evicted.len()),
            released: count(summary.allocation.released.len()),
            produced: summary.production.produced,
            early_phase: memory.state.early_phase,
            errors: summary.errors.clone(),
        }
    }
}
