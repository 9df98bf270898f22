//! Builder: turns carried resource into structures.
//!
//! A builder holds one site until the site completes or disappears. When
//! empty it refills from containers serving construction, then any
//! container, then dropped piles, and otherwise waits beside a hauler.

use colony_types::{Command, EntityRef, Role, SiteId, SiteView, TaskMode};

use super::{AgentHandle, StepContext, StepOutcome, toggle_mode, transfer_amount};
use crate::error::ColonyError;
use crate::memory::AgentMemory;

/// Run one builder step.
pub fn step(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    toggle_mode(mem, hands.store, TaskMode::Collect, TaskMode::Build);
    if mem.task == TaskMode::Build {
        build(ctx, hands, mem)
    } else {
        collect(ctx, hands, mem)
    }
}

fn build(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    let site = held_site(ctx, mem)
        .or_else(|| ctx.view.sites().find(|s| !s.is_complete()))
        .ok_or(ColonyError::NoEligibleTarget { agent: hands.id })?;
    let target = EntityRef::Site(site.id);
    mem.target = Some(target);
    hands.act(Command::Build { site: site.id }, target, site.pos, mem)
}

/// The cached site, while it still exists and needs work.
fn held_site<'a>(ctx: &StepContext<'a>, mem: &AgentMemory) -> Option<&'a SiteView> {
    let id: SiteId = match mem.target {
        Some(EntityRef::Site(id)) => id,
        _ => return None,
    };
    ctx.view.site(id).filter(|s| !s.is_complete())
}

fn collect(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    let radius = ctx.config.builder.site_container_radius;
    let stocked = || {
        ctx.view
            .containers()
            .filter(|c| c.store.is_some_and(|s| !s.is_empty()))
    };
    let serving_site = stocked()
        .filter(|c| {
            ctx.view
                .sites()
                .any(|s| !s.is_complete() && s.pos.in_range_to(c.pos, radius))
        })
        .min_by_key(|c| hands.pos.range_to(c.pos));
    let container =
        serving_site.or_else(|| stocked().min_by_key(|c| hands.pos.range_to(c.pos)));
    if let Some(c) = container {
        let amount = c.store.map_or(0, |s| transfer_amount(s, hands.store));
        let target = EntityRef::Structure(c.id);
        return hands.act(Command::Withdraw { target, amount }, target, c.pos, mem);
    }

    let pile = ctx
        .view
        .dropped_piles()
        .min_by_key(|d| hands.pos.range_to(d.pos));
    if let Some(d) = pile {
        return hands.act(
            Command::Pickup { resource: d.id },
            EntityRef::Dropped(d.id),
            d.pos,
            mem,
        );
    }

    let hauler = ctx
        .agents_with_role(Role::Hauler)
        .next()
        .ok_or(ColonyError::NoEligibleTarget { agent: hands.id })?;
    if hands.pos.in_range_to(hauler.pos, 1) {
        Ok(StepOutcome::Idle)
    } else {
        Ok(hands.move_to(hauler.pos))
    }
}

#[cfg(test)]
mod tests {
    use colony_types::{ActionCode, Position, StructureKind};

    use super::*;
    use crate::controller::testkit::{Fixture, ScriptedActuator};

    #[test]
    fn collect_prefers_container_serving_a_site() {
        let mut fx = Fixture::new();
        fx.structure(StructureKind::Container, 26, 26, 500, 2000);
        let serving = fx.structure(StructureKind::Container, 40, 40, 500, 2000);
        fx.site(StructureKind::Extension, 41, 41);
        let me = fx.agent(Role::Builder, 25, 25, 0, 50);
        let mut actuator = ScriptedActuator::always(ActionCode::Ok);
        fx.step(me, &mut actuator);
        assert_eq!(
            actuator.commands.first().map(|c| c.1.clone()),
            Some(Command::Withdraw {
                target: EntityRef::Structure(serving),
                amount: 50,
            })
        );
    }

    #[test]
    fn collect_falls_back_to_pile_then_hauler() {
        let mut fx = Fixture::new();
        fx.structure(StructureKind::Container, 26, 26, 0, 2000);
        let pile = fx.dropped(30, 30, 20);
        let me = fx.agent(Role::Builder, 25, 25, 0, 50);
        let mut actuator = ScriptedActuator::always(ActionCode::Ok);
        fx.step(me, &mut actuator);
        assert_eq!(
            actuator.commands.first().map(|c| c.1.clone()),
            Some(Command::Pickup { resource: pile })
        );

        let mut fx = Fixture::new();
        fx.agent(Role::Hauler, 10, 10, 0, 100);
        let me = fx.agent(Role::Builder, 25, 25, 0, 50);
        let mut actuator = ScriptedActuator::always(ActionCode::Ok);
        fx.step(me, &mut actuator);
        assert_eq!(
            actuator.commands.first().map(|c| c.1.clone()),
            Some(Command::Move {
                destination: Position::new(10, 10)
            })
        );
    }

    #[test]
    fn build_holds_target_until_complete() {
        let mut fx = Fixture::new();
        let first = fx.site(StructureKind::Road, 26, 26);
        let held = fx.site(StructureKind::Extension, 27, 27);
        let me = fx.agent(Role::Builder, 25, 25, 50, 50);
        if let Some(m) = fx.memory.agents.get_mut(&me) {
            m.task = TaskMode::Build;
            m.target = Some(EntityRef::Site(held));
        }
        let mut actuator = ScriptedActuator::always(ActionCode::Ok);
        fx.step(me, &mut actuator);
        assert_eq!(
            actuator.commands.first().map(|c| c.1.clone()),
            Some(Command::Build { site: held })
        );
        assert_ne!(first, held);
        assert_eq!(
            fx.memory.agents.get(&me).and_then(|m| m.target),
            Some(EntityRef::Site(held))
        );
    }

    #[test]
    fn completed_held_site_is_replaced() {
        let mut fx = Fixture::new();
        let done = fx.site(StructureKind::Extension, 26, 26);
        let next = fx.site(StructureKind::Road, 27, 27);
        if let Some(site) = fx.snapshot.sites.iter_mut().find(|s| s.id == done) {
            site.progress = site.total;
        }
        let me = fx.agent(Role::Builder, 25, 25, 50, 50);
        if let Some(m) = fx.memory.agents.get_mut(&me) {
            m.task = TaskMode::Build;
            m.target = Some(EntityRef::Site(done));
        }
        let mut actuator = ScriptedActuator::always(ActionCode::Ok);
        fx.step(me, &mut actuator);
        assert_eq!(
            actuator.commands.first().map(|c| c.1.clone()),
            Some(Command::Build { site: next })
        );
        assert_eq!(
            fx.memory.agents.get(&me).and_then(|m| m.target),
            Some(EntityRef::Site(next))
        );
    }

    #[test]
    fn vanished_site_clears_target() {
        let mut fx = Fixture::new();
        let me = fx.agent(Role::Builder, 25, 25, 50, 50);
        if let Some(m) = fx.memory.agents.get_mut(&me) {
            m.task = TaskMode::Build;
            m.target = Some(EntityRef::Site(SiteId::new()));
        }
        let mut actuator = ScriptedActuator::always(ActionCode::Ok);
        let report = fx.step(me, &mut actuator);
        assert!(matches!(
            report.and_then(|r| r.error),
            Some(ColonyError::ReferenceStale { .. })
        ));
        assert_eq!(fx.memory.agents.get(&me).and_then(|m| m.target), None);
    }
}
