//! Upgrader: feeds the colony controller, refilling from resource near it.

use colony_types::{Command, EntityRef, Position, TaskMode};

use super::{AgentHandle, StepContext, StepOutcome, toggle_mode, transfer_amount};
use crate::error::ColonyError;
use crate::memory::AgentMemory;

/// Run one upgrader step.
pub fn step(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    toggle_mode(mem, hands.store, TaskMode::Fetch, TaskMode::Upgrade);
    let controller = ctx.view.controller();
    if mem.task == TaskMode::Upgrade {
        return hands.act(
            Command::UpgradeController {
                controller: controller.id,
            },
            EntityRef::Controller(controller.id),
            controller.pos,
            mem,
        );
    }

    let radius = &ctx.config.upgrader;
    let near_controller = |pos: Position| controller.pos.in_range_to(pos, radius.fetch_radius);
    let stocked = ctx.view.structures().find(|s| {
        s.kind.is_storage() && near_controller(s.pos) && s.store.is_some_and(|st| !st.is_empty())
    });
    if let Some(s) = stocked {
        let amount = s.store.map_or(0, |st| transfer_amount(st, hands.store));
        let target = EntityRef::Structure(s.id);
        return hands.act(Command::Withdraw { target, amount }, target, s.pos, mem);
    }
    if let Some(pile) = ctx.view.dropped_piles().find(|d| near_controller(d.pos)) {
        return hands.act(
            Command::Pickup { resource: pile.id },
            EntityRef::Dropped(pile.id),
            pile.pos,
            mem,
        );
    }
    if hands.pos.in_range_to(controller.pos, radius.wait_radius) {
        Ok(StepOutcome::Idle)
    } else {
        Ok(hands.move_to(controller.pos))
    }
}
