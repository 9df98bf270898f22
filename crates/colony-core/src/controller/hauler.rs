//! Hauler: collects loose resource and delivers it through a fixed cascade.
//!
//! Delivery classes, first match wins:
//!
//! | Class | Target |
//! |-------|--------|
//! | `Primary` | energy structure with more than the primary free ratio, by priority |
//! | `Upgrader` | upgrader with room, least carried first |
//! | `Builder` | builder with room, least carried first |
//! | `Container` | first container with room |
//! | `Relaxed` | energy structure with more than the relaxed free ratio |
//! | `Storage` | colony storage with room |
//! | `RequestSite` | container site one tile east of the facility |
//!
//! Collection takes the nearest dropped pile no other hauler is heading
//! for, else the nearest container holding resource, else waits beside the
//! other haulers.

use colony_types::{
    AgentView, Command, DropId, EntityRef, Position, Role, Store, StructureKind, StructureView,
    TaskMode,
};
use tracing::info;

use super::{AgentHandle, StepContext, StepOutcome, toggle_mode, transfer_amount};
use crate::error::ColonyError;
use crate::memory::AgentMemory;

/// Which cascade class a delivery fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeliveryClass {
    /// Energy structure above the primary free ratio.
    Primary,
    /// An upgrader with room.
    Upgrader,
    /// A builder with room.
    Builder,
    /// A container with room.
    Container,
    /// Energy structure above the relaxed free ratio.
    Relaxed,
    /// Colony storage.
    Storage,
    /// No sink exists; ask for a container site.
    RequestSite,
}

/// The chosen delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryChoice {
    /// Cascade class.
    pub class: DeliveryClass,
    /// Receiver, or `None` for a site request.
    pub target: Option<EntityRef>,
    /// Receiver tile, or the requested site tile.
    pub pos: Position,
    /// Receiver's store, when it has one.
    pub store: Option<Store>,
}

impl DeliveryChoice {
    fn structure(class: DeliveryClass, s: &StructureView) -> Self {
        Self {
            class,
            target: Some(EntityRef::Structure(s.id)),
            pos: s.pos,
            store: s.store,
        }
    }

    fn agent(class: DeliveryClass, a: &AgentView) -> Self {
        Self {
            class,
            target: Some(EntityRef::Agent(a.id)),
            pos: a.pos,
            store: Some(a.store),
        }
    }
}

/// Run one hauler step.
pub fn step(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    toggle_mode(mem, hands.store, TaskMode::Collect, TaskMode::Deliver);
    if mem.task == TaskMode::Collect {
        collect(ctx, hands, mem)
    } else {
        deliver(ctx, hands, mem)
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Pick the delivery target by walking the cascade in order.
pub fn choose_delivery(ctx: &StepContext<'_>) -> Option<DeliveryChoice> {
    let delivery = &ctx.config.delivery;
    if let Some(s) = energy_structure_above(ctx, delivery.primary_free_percent) {
        return Some(DeliveryChoice::structure(DeliveryClass::Primary, s));
    }
    if let Some(a) = neediest_agent(ctx, Role::Upgrader) {
        return Some(DeliveryChoice::agent(DeliveryClass::Upgrader, a));
    }
    if let Some(a) = neediest_agent(ctx, Role::Builder) {
        return Some(DeliveryChoice::agent(DeliveryClass::Builder, a));
    }
    if let Some(c) = ctx.view.containers().find(|c| has_room(c)) {
        return Some(DeliveryChoice::structure(DeliveryClass::Container, c));
    }
    if let Some(s) = energy_structure_above(ctx, delivery.relaxed_free_percent) {
        return Some(DeliveryChoice::structure(DeliveryClass::Relaxed, s));
    }
    if let Some(s) = ctx.view.storage().filter(|s| has_room(s)) {
        return Some(DeliveryChoice::structure(DeliveryClass::Storage, s));
    }
    container_site_request(ctx).map(|pos| DeliveryChoice {
        class: DeliveryClass::RequestSite,
        target: None,
        pos,
        store: None,
    })
}

fn deliver(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    let choice = choose_delivery(ctx)
        .ok_or(ColonyError::NoEligibleTarget { agent: hands.id })?;
    match choice.target {
        Some(target) => {
            let amount = choice
                .store
                .map_or(hands.store.used, |s| transfer_amount(hands.store, s));
            hands.act(Command::Transfer { target, amount }, target, choice.pos, mem)
        }
        None => {
            let code = hands.request(Command::CreateConstructionSite {
                pos: choice.pos,
                kind: StructureKind::Container,
            });
            info!(agent_id = %hands.id, pos = %choice.pos, ?code, "Container site requested");
            Ok(StepOutcome::Acted)
        }
    }
}

fn has_room(s: &StructureView) -> bool {
    s.store.is_some_and(|store| store.free() > 0)
}

fn energy_structure_above<'a>(ctx: &StepContext<'a>, percent: u32) -> Option<&'a StructureView> {
    let mut candidates: Vec<(u8, &StructureView)> = ctx
        .view
        .structures()
        .filter(|s| {
            s.store
                .is_some_and(|store| store.free() > 0 && store.free_ratio_exceeds(percent))
        })
        .filter_map(|s| s.kind.energy_priority().map(|p| (p, s)))
        .collect();
    candidates.sort_by_key(|(priority, _)| *priority);
    candidates.into_iter().next().map(|(_, s)| s)
}

fn neediest_agent<'a>(ctx: &StepContext<'a>, role: Role) -> Option<&'a AgentView> {
    ctx.view
        .agents()
        .filter(|a| ctx.memory.role_of(a.id) == Some(role) && a.store.free() > 0)
        .min_by_key(|a| a.store.used)
}

/// Tile for a new container site, unless one exists near the facility.
fn container_site_request(ctx: &StepContext<'_>) -> Option<Position> {
    let facility = ctx.view.facility().pos;
    let near = |pos: Position| pos.in_range_to(facility, 1);
    let existing = ctx.view.containers().any(|c| near(c.pos))
        || ctx
            .view
            .sites()
            .any(|s| s.kind == StructureKind::Container && near(s.pos));
    if existing {
        return None;
    }
    facility.offset(1, 0).filter(|p| p.is_in_bounds())
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

fn collect(
    ctx: &StepContext<'_>,
    hands: &mut AgentHandle<'_>,
    mem: &mut AgentMemory,
) -> Result<StepOutcome, ColonyError> {
    if let Some(pile) = claimed_or_nearest_pile(ctx, hands, mem) {
        let target = EntityRef::Dropped(pile.0);
        mem.target = Some(target);
        return hands.act(Command::Pickup { resource: pile.0 }, target, pile.1, mem);
    }
    let container = ctx
        .view
        .containers()
        .filter(|c| c.store.is_some_and(|s| !s.is_empty()))
        .min_by_key(|c| hands.pos.range_to(c.pos));
    if let Some(c) = container {
        let amount = c.store.map_or(0, |s| transfer_amount(s, hands.store));
        let target = EntityRef::Structure(c.id);
        return hands.act(Command::Withdraw { target, amount }, target, c.pos, mem);
    }
    if !hands.store.is_empty() {
        mem.task = TaskMode::Deliver;
        mem.target = None;
        return deliver(ctx, hands, mem);
    }
    let peer = ctx
        .agents_with_role(Role::Hauler)
        .find(|a| a.id != hands.id)
        .ok_or(ColonyError::NoEligibleTarget { agent: hands.id })?;
    if hands.pos.in_range_to(peer.pos, 1) {
        Ok(StepOutcome::Idle)
    } else {
        Ok(hands.move_to(peer.pos))
    }
}

/// Keep the cached pile if it still exists; otherwise the nearest pile no
/// other hauler has cached.
fn claimed_or_nearest_pile(
    ctx: &StepContext<'_>,
    hands: &AgentHandle<'_>,
    mem: &AgentMemory,
) -> Option<(DropId, Position)> {
    let cached = match mem.target {
        Some(EntityRef::Dropped(id)) => ctx.view.dropped(id),
        _ => None,
    };
    if let Some(pile) = cached {
        return Some((pile.id, pile.pos));
    }
    let claimed: Vec<EntityRef> = ctx
        .memory
        .agents
        .iter()
        .filter(|(id, m)| **id != hands.id && m.role == Role::Hauler)
        .filter_map(|(_, m)| m.target)
        .collect();
    ctx.view
        .dropped_piles()
        .filter(|d| !claimed.contains(&EntityRef::Dropped(d.id)))
        .min_by_key(|d| hands.pos.range_to(d.pos))
        .map(|d| (d.id, d.pos))
}
