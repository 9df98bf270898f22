//! Harvester: fills up at its node, then works through a fixed cascade.
//!
//! Harvesters never contest miners for a node. Allocation gives them no
//! eviction rights and lets a miner evict one from a node held only by
//! harvesters; a harvester left without a node scoops up dropped resource
//! instead. When full it delivers to the highest-priority energy
//! structure with room, else builds the first pending site, else upgrades
//! the controller.

use colony_types::{Command, EntityRef, StructureView, TaskMode};

use super::{AgentHandle, StepContext, StepOutcome, toggle_mode, transfer_amount};
use crate::error::ColonyError;
use crate::memory::AgentMemory;

/// Run one harvester step.
pub fn step(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    toggle_mode(mem, hands.store, TaskMode::Harvest, TaskMode::Deliver);
    if mem.task == TaskMode::Harvest {
        harvest(ctx, hands, mem)
    } else {
        deliver(ctx, hands, mem)
    }
}

fn harvest(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    let held = mem
        .assigned_node
        .and_then(|n| ctx.view.node(n).map(|view| (n, view.pos)));
    match held {
        Some((node, pos)) => hands.act(Command::Harvest { node }, EntityRef::Node(node), pos, mem),
        None => collect_dropped(ctx, hands, mem),
    }
}

fn collect_dropped(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    let pile = ctx
        .view
        .dropped_piles()
        .next()
        .ok_or(ColonyError::NoEligibleTarget { agent: hands.id })?;
    hands.act(
        Command::Pickup { resource: pile.id },
        EntityRef::Dropped(pile.id),
        pile.pos,
        mem,
    )
}

fn deliver(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    if let Some(structure) = energy_structure_with_room(ctx) {
        let amount = structure
            .store
            .map_or(hands.store.used, |s| transfer_amount(hands.store, s));
        let target = EntityRef::Structure(structure.id);
        return hands.act(
            Command::Transfer { target, amount },
            target,
            structure.pos,
            mem,
        );
    }
    if let Some(site) = ctx.view.sites().find(|s| !s.is_complete()) {
        return hands.act(
            Command::Build { site: site.id },
            EntityRef::Site(site.id),
            site.pos,
            mem,
        );
    }
    let controller = ctx.view.controller();
    hands.act(
        Command::UpgradeController {
            controller: controller.id,
        },
        EntityRef::Controller(controller.id),
        controller.pos,
        mem,
    )
}

/// Defense, then the facility, then capacity structures; first with room.
fn energy_structure_with_room<'a>(ctx: &StepContext<'a>) -> Option<&'a StructureView> {
    let mut candidates: Vec<(u8, &StructureView)> = ctx
        .view
        .structures()
        .filter(|s| s.store.is_some_and(|store| store.free() > 0))
        .filter_map(|s| s.kind.energy_priority().map(|p| (p, s)))
        .collect();
    candidates.sort_by_key(|(priority, _)| *priority);
    candidates.into_iter().next().map(|(_, s)| s)
}
