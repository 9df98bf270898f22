//! Population thresholds, the production queue, and the early-phase flip.
//!
//! Once per tick, after allocation:
//!
//! 1. The facility's busy flag clears or keeps the in-flight slot.
//! 2. The early phase ends (for good) once the core roles are staffed, and
//!    the oldest harvester is retired into a builder.
//! 3. Every role below its population target is enqueued, in
//!    [`Role::ALL`] order, unless already pending or in flight.
//! 4. One production attempt is made for the queue head.
//!
//! A denied attempt leaves the queue untouched; it simply repeats next tick.

use std::collections::{BTreeMap, VecDeque};

use colony_types::{Actor, AgentId, Command, FacilityView, Role};
use colony_world::WorldView;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::config::PopulationConfig;
use crate::error::{ColonyError, DenialReason};
use crate::memory::{ColonyMemory, ColonyState};

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// FIFO of roles waiting to be produced. A role is pending at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionQueue {
    pending: VecDeque<Role>,
}

impl ProductionQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Append each role not already pending, in order.
    pub fn seed(&mut self, roles: &[Role]) {
        for role in roles {
            if !self.contains(*role) {
                self.pending.push_back(*role);
            }
        }
    }

    /// Enqueue `role` if it is not pending, not in flight, and below its
    /// population target. Returns whether it was added.
    pub fn enqueue(
        &mut self,
        role: Role,
        state: &ColonyState,
        census: &Census,
        limits: &PopulationConfig,
    ) -> bool {
        if self.contains(role) || state.in_flight == Some(role) {
            return false;
        }
        if !below_target(role, census, state, limits) {
            return false;
        }
        self.pending.push_back(role);
        true
    }

    /// Whether `role` is pending.
    pub fn contains(&self, role: Role) -> bool {
        self.pending.contains(&role)
    }

    /// The next role to produce.
    pub fn head(&self) -> Option<Role> {
        self.pending.front().copied()
    }

    /// Remove and return the head.
    pub fn pop(&mut self) -> Option<Role> {
        self.pending.pop_front()
    }

    /// Pending roles, head first.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.pending.iter().copied()
    }

    /// Number of pending roles.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Census and thresholds
// ---------------------------------------------------------------------------

/// Live role counts plus the world facts the thresholds depend on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Census {
    counts: BTreeMap<Role, u32>,
    /// Colony tier.
    pub tier: u32,
    /// Whether any construction site is unfinished.
    pub pending_sites: bool,
}

impl Census {
    /// Count live agents by role from memory.
    pub fn take(memory: &ColonyMemory, view: &WorldView<'_>) -> Self {
        let counts = Role::ALL
            .into_iter()
            .map(|role| (role, memory.count_role(role)))
            .collect();
        Self {
            counts,
            tier: view.controller().tier,
            pending_sites: view.has_pending_sites(),
        }
    }

    /// Census from explicit counts.
    pub fn from_counts(counts: &[(Role, u32)], tier: u32, pending_sites: bool) -> Self {
        Self {
            counts: counts.iter().copied().collect(),
            tier,
            pending_sites,
        }
    }

    /// Live agents with `role`.
    pub fn count(&self, role: Role) -> u32 {
        self.counts.get(&role).copied().unwrap_or(0)
    }
}

/// Whether `role` is below its population target.
pub fn below_target(
    role: Role,
    census: &Census,
    state: &ColonyState,
    limits: &PopulationConfig,
) -> bool {
    let count = census.count(role);
    match role {
        Role::Harvester => state.early_phase && count <= limits.harvester_limit,
        Role::Miner => count <= limits.miner_target,
        Role::Hauler => count <= limits.hauler_limit,
        Role::Upgrader => count <= limits.upgrader_limit,
        Role::Builder => {
            census.tier >= limits.builder_min_tier
                && census.pending_sites
                && count < limits.builder_limit
        }
    }
}

// ---------------------------------------------------------------------------
// Phase transition
// ---------------------------------------------------------------------------

/// The one-time end of the early phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    /// Harvester reclassified into a builder, if one was alive.
    pub retired: Option<AgentId>,
}

/// End the early phase once the core roles are staffed.
///
/// Returns `Some` only on the tick the flag flips.
pub fn check_phase_transition(
    memory: &mut ColonyMemory,
    census: &Census,
    limits: &PopulationConfig,
) -> Option<PhaseTransition> {
    if !memory.state.early_phase {
        return None;
    }
    let staffed = census.count(Role::Miner) >= limits.phase_miners
        && census.count(Role::Hauler) >= limits.phase_haulers
        && census.count(Role::Upgrader) >= limits.phase_upgraders;
    if !staffed || !memory.state.end_early_phase() {
        return None;
    }
    info!(colony_id = %memory.colony_id, "Early phase ended");

    let retired = memory.oldest(Role::Harvester);
    if let Some(agent) = retired {
        let node = memory.release(agent);
        if let Some(mem) = memory.agents.get_mut(&agent) {
            mem.reclassify(Role::Builder);
        }
        info!(agent_id = %agent, released = ?node, "Harvester retired to builder");
    }
    Some(PhaseTransition { retired })
}

// ---------------------------------------------------------------------------
// Production
// ---------------------------------------------------------------------------

/// Clear the in-flight slot once the facility is idle again.
pub fn sync_facility(state: &mut ColonyState, facility: &FacilityView) {
    if facility.busy {
        if state.in_flight.is_none() {
            state.in_flight = facility.producing;
        }
    } else if let Some(role) = state.in_flight.take() {
        debug!(role = %role, "Production slot freed");
    }
}

/// Try to produce the queue head.
///
/// # Errors
///
/// Returns [`ColonyError::ProductionDenied`] if the queue is empty, the
/// facility is busy, the budget is short, or the world rejects the
/// command. The queue is left unchanged in every case.
pub fn try_produce(
    memory: &mut ColonyMemory,
    facility: &FacilityView,
    budget: u32,
    actuator: &mut dyn Actuator,
) -> Result<Role, ColonyError> {
    let role = memory
        .queue
        .head()
        .ok_or(ColonyError::ProductionDenied(DenialReason::EmptyQueue))?;
    if memory.state.production_in_flight() || facility.busy {
        return Err(ColonyError::ProductionDenied(DenialReason::FacilityBusy));
    }
    let cost = role.cost();
    if budget < cost {
        return Err(ColonyError::ProductionDenied(
            DenialReason::InsufficientBudget { role, cost, budget },
        ));
    }

    let code = actuator.execute(
        Actor::Colony,
        Command::ProduceAgent {
            facility: facility.id,
            role,
        },
    );
    if !code.is_ok() {
        return Err(ColonyError::ProductionDenied(DenialReason::Rejected {
            role,
            code,
        }));
    }
    memory.queue.pop();
    memory.state.in_flight = Some(role);
    info!(role = %role, cost, budget, "Production started");
    Ok(role)
}

/// What the production phase did this tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductionReport {
    /// Set on the tick the early phase ended.
    pub transition: Option<PhaseTransition>,
    /// Roles enqueued this tick.
    pub enqueued: Vec<Role>,
    /// Role whose production started.
    pub produced: Option<Role>,
    /// Why nothing was produced.
    pub denied: Option<DenialReason>,
}

/// Run the whole production phase.
pub fn run_production(
    memory: &mut ColonyMemory,
    view: &WorldView<'_>,
    limits: &PopulationConfig,
    actuator: &mut dyn Actuator,
) -> ProductionReport {
    let mut report = ProductionReport::default();
    sync_facility(&mut memory.state, view.facility());

    let census = Census::take(memory, view);
    report.transition = check_phase_transition(memory, &census, limits);
    let census = if report.transition.is_some() {
        Census::take(memory, view)
    } else {
        census
    };

    for role in Role::ALL {
        if memory.queue.enqueue(role, &memory.state, &census, limits) {
            info!(role = %role, count = census.count(role), "Role enqueued");
            report.enqueued.push(role);
        }
    }

    match try_produce(memory, view.facility(), view.snapshot().budget, actuator) {
        Ok(role) => report.produced = Some(role),
        Err(ColonyError::ProductionDenied(reason)) => {
            match reason {
                DenialReason::Rejected { .. } => warn!(%reason, "Production rejected"),
                _ => debug!(%reason, "Production deferred"),
            }
            report.denied = Some(reason);
        }
        Err(other) => warn!(error = %other, "Unexpected production failure"),
    }
    report
}
