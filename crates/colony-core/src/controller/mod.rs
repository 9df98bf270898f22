//! Per-role agent state machines.
//!
//! [`run_agent`] performs the common pre-step for every agent (threat
//! retreat, stale-target check), toggles the role's fill/work mode on the
//! carried amount, and then dispatches to exactly one role module by an
//! exhaustive match on [`Role`].
//!
//! Failures never escape a step: each one becomes a [`StepReport`] with
//! an idle or deferred outcome and is retried next tick.

pub mod builder;
pub mod harvester;
pub mod hauler;
pub mod miner;
#[cfg(test)]
pub(crate) mod testkit;
pub mod upgrader;

use colony_types::{
    ActionCode, ActionDisposition, Actor, AgentId, AgentView, Command, EntityRef, Position, Role,
    Store, TaskMode,
};
use colony_world::{SafetyMonitor, WorldView};
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::config::ColonyConfig;
use crate::error::ColonyError;
use crate::memory::{AgentMemory, ColonyMemory};

/// What an agent did this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepOutcome {
    /// A work command was accepted.
    Acted,
    /// The agent moved toward a target.
    Moved,
    /// The world deferred the command (busy or full); it repeats next tick.
    Deferred,
    /// Nothing to do this tick.
    Idle,
    /// The agent retreated from a hostile.
    Avoiding,
    /// The step was skipped (node released for safety this tick).
    Skipped,
}

/// Result of one agent's step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// The agent.
    pub agent: AgentId,
    /// Its role during the step.
    pub role: Role,
    /// What happened.
    pub outcome: StepOutcome,
    /// The recoverable failure behind an idle outcome, if any.
    pub error: Option<ColonyError>,
}

/// Read-only inputs shared by every step of a tick.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// The indexed snapshot.
    pub view: &'a WorldView<'a>,
    /// Threat detection for the tick.
    pub safety: &'a SafetyMonitor,
    /// Colony configuration.
    pub config: &'a ColonyConfig,
    /// Colony memory as of this agent's turn.
    pub memory: &'a ColonyMemory,
}

impl StepContext<'_> {
    /// Where threatened agents retreat to.
    pub const fn rally_point(&self) -> Position {
        self.view.controller().pos
    }

    /// Live agents whose remembered role is `role`, in snapshot order.
    pub fn agents_with_role(&self, role: Role) -> impl Iterator<Item = &AgentView> + '_ {
        self.view
            .agents()
            .filter(move |a| self.memory.role_of(a.id) == Some(role))
    }
}

/// One agent's hands on the actuator for the duration of its step.
pub struct AgentHandle<'h> {
    /// The acting agent.
    pub id: AgentId,
    /// Its current tile.
    pub pos: Position,
    /// Its carried resource.
    pub store: Store,
    actuator: &'h mut dyn Actuator,
}

impl<'h> AgentHandle<'h> {
    /// Handle for `agent`.
    pub fn new(agent: &AgentView, actuator: &'h mut dyn Actuator) -> Self {
        Self {
            id: agent.id,
            pos: agent.pos,
            store: agent.store,
            actuator,
        }
    }

    /// Issue a work command and react to the result code.
    ///
    /// Out of range moves toward `target_pos`; a vanished target clears the
    /// cached target; busy or full defers; anything else is logged.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError::ReferenceStale`] when the world says the
    /// target no longer exists.
    pub fn act(
        &mut self,
        command: Command,
        target: EntityRef,
        target_pos: Position,
        mem: &mut AgentMemory,
    ) -> Result<StepOutcome, ColonyError> {
        let code = self.actuator.execute(Actor::Agent(self.id), command);
        match code.disposition() {
            ActionDisposition::Done => Ok(StepOutcome::Acted),
            ActionDisposition::MoveCloser => Ok(self.move_to(target_pos)),
            ActionDisposition::ClearTarget => {
                mem.target = None;
                Err(ColonyError::ReferenceStale { target })
            }
            ActionDisposition::Defer => {
                debug!(agent_id = %self.id, ?code, ?target, "Action deferred");
                Ok(StepOutcome::Deferred)
            }
            ActionDisposition::Log => {
                warn!(agent_id = %self.id, ?code, ?target, "Unexpected action result");
                Ok(StepOutcome::Idle)
            }
        }
    }

    /// Step toward `destination`.
    pub fn move_to(&mut self, destination: Position) -> StepOutcome {
        let code = self
            .actuator
            .execute(Actor::Agent(self.id), Command::Move { destination });
        if code != ActionCode::Ok {
            debug!(agent_id = %self.id, ?code, %destination, "Move refused");
        }
        StepOutcome::Moved
    }

    /// Issue a command whose result needs no movement follow-up.
    pub fn request(&mut self, command: Command) -> ActionCode {
        self.actuator.execute(Actor::Agent(self.id), command)
    }
}

/// Switch between a role's fill and work modes on the carried amount.
///
/// Fill ends when the store is full; work ends when it is empty. The
/// cached target is dropped on every switch.
pub fn toggle_mode(mem: &mut AgentMemory, store: Store, fill: TaskMode, work: TaskMode) {
    if mem.task != fill && mem.task != work {
        mem.task = fill;
        mem.target = None;
    }
    if mem.task == fill && store.is_full() {
        mem.task = work;
        mem.target = None;
    } else if mem.task == work && store.is_empty() {
        mem.task = fill;
        mem.target = None;
    }
}

/// Units moved by a transfer from `from` into `into`.
pub const fn transfer_amount(from: Store, into: Store) -> u32 {
    let free = into.free();
    if from.used < free { from.used } else { free }
}

/// Run one agent's step for this tick.
///
/// `skip` is set for agents whose node was released for safety this tick;
/// they re-entered allocation and do not act.
pub fn run_agent(
    memory: &mut ColonyMemory,
    agent: &AgentView,
    view: &WorldView<'_>,
    safety: &SafetyMonitor,
    config: &ColonyConfig,
    actuator: &mut dyn Actuator,
    skip: bool,
) -> Option<StepReport> {
    let mut mem = *memory.agents.get(&agent.id)?;
    let role = mem.role;
    let ctx = StepContext {
        view,
        safety,
        config,
        memory,
    };
    let mut hands = AgentHandle::new(agent, actuator);

    let result = if skip {
        Ok(StepOutcome::Skipped)
    } else {
        step(&ctx, &mut hands, &mut mem)
    };

    memory.agents.insert(agent.id, mem);
    let report = match result {
        Ok(outcome) => StepReport {
            agent: agent.id,
            role,
            outcome,
            error: None,
        },
        Err(error) => {
            debug!(agent_id = %agent.id, role = %role, %error, "Agent idle");
            let outcome = if matches!(error, ColonyError::UnsafeZone { .. }) {
                StepOutcome::Avoiding
            } else {
                StepOutcome::Idle
            };
            StepReport {
                agent: agent.id,
                role,
                outcome,
                error: Some(error),
            }
        }
    };
    Some(report)
}

fn step(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    if !ctx.safety.is_safe(hands.pos) {
        if !mem.avoiding {
            info!(agent_id = %hands.id, pos = %hands.pos, "Agent retreating from hostiles");
        }
        mem.avoiding = true;
        let rally = ctx.rally_point();
        if hands.pos != rally {
            hands.move_to(rally);
        }
        return Err(ColonyError::UnsafeZone { agent: hands.id });
    }
    if mem.avoiding {
        info!(agent_id = %hands.id, "Agent no longer avoiding hostiles");
        mem.avoiding = false;
    }

    if let Some(target) = mem.target.filter(|t| !ctx.view.resolves(*t)) {
        mem.target = None;
        return Err(ColonyError::ReferenceStale { target });
    }

    match mem.role {
        Role::Miner => miner::step(ctx, hands, mem),
        Role::Harvester => harvester::step(ctx, hands, mem),
        Role::Hauler => hauler::step(ctx, hands, mem),
        Role::Upgrader => upgrader::step(ctx, hands, mem),
        Role::Builder => builder::step(ctx, hands, mem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_switches_on_full_and_empty() {
        let mut mem = AgentMemory::new(Role::Hauler, 0);
        toggle_mode(&mut mem, Store::new(10, 50), TaskMode::Collect, TaskMode::Deliver);
        assert_eq!(mem.task, TaskMode::Collect);
        toggle_mode(&mut mem, Store::new(50, 50), TaskMode::Collect, TaskMode::Deliver);
        assert_eq!(mem.task, TaskMode::Deliver);
        toggle_mode(&mut mem, Store::new(10, 50), TaskMode::Collect, TaskMode::Deliver);
        assert_eq!(mem.task, TaskMode::Deliver);
        toggle_mode(&mut mem, Store::new(0, 50), TaskMode::Collect, TaskMode::Deliver);
        assert_eq!(mem.task, TaskMode::Collect);
    }

    #[test]
    fn toggle_resets_foreign_mode() {
        let mut mem = AgentMemory::new(Role::Builder, 0);
        mem.task = TaskMode::Mine;
        toggle_mode(&mut mem, Store::new(0, 50), TaskMode::Collect, TaskMode::Build);
        assert_eq!(mem.task, TaskMode::Collect);
    }

    #[test]
    fn transfer_amount_is_bounded_by_both_sides() {
        assert_eq!(transfer_amount(Store::new(50, 50), Store::new(280, 300)), 20);
        assert_eq!(transfer_amount(Store::new(10, 50), Store::new(0, 300)), 10);
    }
}
