//! Miner: stays on its assigned node and mines.
//!
//! Reassignment happens in the allocation phase, never here; a miner left
//! without a node idles until the next tick's allocation.

use colony_types::{Command, EntityRef};

use super::{AgentHandle, StepContext, StepOutcome};
use crate::error::ColonyError;
use crate::memory::AgentMemory;

/// Run one miner step.
pub fn step(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    let Some(node) = mem.assigned_node else {
        return Err(ColonyError::NoEligibleTarget { agent: hands.id });
    };
    let target = EntityRef::Node(node);
    let pos = ctx
        .view
        .node(node)
        .map(|n| n.pos)
        .or_else(|| ctx.memory.registry.query(node).map(|n| n.pos))
        .ok_or(ColonyError::ReferenceStale { target })?;
    hands.act(Command::Harvest { node }, target, pos, mem)
}
