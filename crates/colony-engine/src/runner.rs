//! The snapshot loop: one line in, one tick, one line out.
//!
//! Each input line is a JSON [`WorldSnapshot`]. For each one the runner
//! loads the colony's memory (fresh memory for a colony never seen),
//! runs the tick through a [`PredictiveActuator`], writes the resulting
//! [`TickOutput`] as one JSON line, and saves the memory.
//!
//! Lines that fail to parse, snapshots for a colony other than the
//! configured one, ticks the core rejects, and store load failures are
//! logged and skipped; the loop only stops at end of
//! input or when output can no longer be written.

use colony_core::{ColonyConfig, ColonyMemory, PredictiveActuator, TickOutput, run_tick};
use colony_db::ColonyStore;
use colony_types::WorldSnapshot;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Lines read.
    pub lines: u64,
    /// Ticks run and emitted.
    pub ticks: u64,
    /// Lines skipped.
    pub skipped: u64,
}

/// Run one snapshot line through the engine.
///
/// Returns `None` when the line was skipped.
pub async fn process_line<S: ColonyStore>(
    store: &S,
    config: &ColonyConfig,
    line: &str,
) -> Option<TickOutput> {
    let snapshot: WorldSnapshot = match serde_json::from_str(line) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "Malformed snapshot line skipped");
            return None;
        }
    };
    let colony_id = snapshot.colony_id;
    if let Some(served) = config.colony.id.filter(|id| *id != colony_id) {
        warn!(colony_id = %colony_id, served = %served, "Snapshot for another colony skipped");
        return None;
    }

    let mut memory = match store.load(colony_id).await {
        Ok(Some(memory)) => memory,
        Ok(None) => {
            info!(colony_id = %colony_id, "New colony");
            ColonyMemory::new(colony_id)
        }
        Err(e) => {
            warn!(colony_id = %colony_id, error = %e, "Colony memory load failed, tick skipped");
            return None;
        }
    };

    let mut actuator = PredictiveActuator::new(&snapshot);
    let summary = match run_tick(&mut memory, &snapshot, config, &mut actuator) {
        Ok(summary) => summary,
        Err(e) => {
            warn!(tick = snapshot.tick, error = %e, "Tick rejected");
            return None;
        }
    };
    let output = TickOutput::new(&summary, &memory, actuator.into_issued());

    if let Err(e) = store.save(&memory).await {
        warn!(colony_id = %colony_id, tick = snapshot.tick, error = %e, "Colony memory save failed");
    }
    Some(output)
}

/// Read snapshot lines from `input` until end of input, writing one output
/// line per tick to `output`.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if reading input or writing output fails,
/// and [`EngineError::Serialization`] if an output cannot be encoded.
pub async fn run<S, R, W>(
    store: &S,
    config: &ColonyConfig,
    input: R,
    mut output: W,
) -> Result<RunStats, EngineError>
where
    S: ColonyStore,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = RunStats::default();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        stats.lines = stats.lines.saturating_add(1);
        let Some(tick_output) = process_line(store, config, &line).await else {
            stats.skipped = stats.skipped.saturating_add(1);
            continue;
        };
        let mut encoded = serde_json::to_vec(&tick_output)?;
        encoded.push(b'\n');
        output.write_all(&encoded).await?;
        output.flush().await?;
        stats.ticks = stats.ticks.saturating_add(1);
        debug!(
            tick = tick_output.tick,
            commands = tick_output.commands.len(),
            "Tick output written"
        );
    }
    Ok(stats)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colony_db::InMemoryStore;
    use colony_types::{
        AgentId, AgentView, ColonyId, ControllerId, ControllerView, FacilityView, NodeId, NodeView,
        Position, Role, Store, StructureId, Terrain,
    };

    use super::*;

    fn snapshot(colony_id: ColonyId, tick: u64, agents: Vec<AgentView>) -> WorldSnapshot {
        WorldSnapshot {
            tick,
            colony_id,
            base: Position::new(25, 25),
            budget: 300,
            agents,
            nodes: vec![NodeView {
                id: NodeId::new(),
                pos: Position::new(30, 30),
                available: 3000,
            }],
            structures: Vec::new(),
            sites: Vec::new(),
            hostiles: Vec::new(),
            dropped: Vec::new(),
            facility: FacilityView {
                id: StructureId::new(),
                pos: Position::new(25, 25),
                busy: false,
                producing: None,
            },
            controller: ControllerView {
                id: ControllerId::new(),
                pos: Position::new(20, 20),
                tier: 1,
            },
            terrain: Terrain::default(),
        }
    }

    #[tokio::test]
    async fn memory_persists_between_lines() {
        let store = InMemoryStore::new();
        let config = ColonyConfig::default();
        let colony = ColonyId::new();
        let miner = AgentView {
            id: AgentId::new(),
            role: Role::Miner,
            pos: Position::new(30, 31),
            store: Store::new(0, 0),
        };

        let first = snapshot(colony, 1, vec![miner.clone()]);
        let line = serde_json::to_string(&first).unwrap();
        let output = process_line(&store, &config, &line).await.unwrap();
        assert_eq!(output.tick, 1);
        assert_eq!(output.assigned, 1);

        let saved = store.load(colony).await.unwrap().unwrap();
        assert!(saved.bootstrapped);
        assert_eq!(saved.last_tick, Some(1));
        assert!(saved.agents.contains_key(&miner.id));

        // The agent is gone next tick; its record goes with it.
        let second = snapshot(colony, 2, Vec::new());
        let line = serde_json::to_string(&second).unwrap();
        process_line(&store, &config, &line).await.unwrap();
        let saved = store.load(colony).await.unwrap().unwrap();
        assert!(saved.agents.is_empty());
    }

    #[tokio::test]
    async fn run_skips_bad_lines_and_emits_json_lines() {
        let store = InMemoryStore::new();
        let config = ColonyConfig::default();
        let good = serde_json::to_string(&snapshot(ColonyId::new(), 1, Vec::new())).unwrap();
        let input = format!("not json\n\n{good}\n");
        let mut out = Vec::new();

        let stats = run(&store, &config, input.as_bytes(), &mut out).await.unwrap();
        assert_eq!(
            stats,
            RunStats {
                lines: 2,
                ticks: 1,
                skipped: 1,
            }
        );
        let text = String::from_utf8(out).unwrap();
        let emitted: Vec<TickOutput> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted.first().map(|o| o.produced), Some(Some(Role::Harvester)));
    }

    #[tokio::test]
    async fn configured_colony_filters_snapshots() {
        let store = InMemoryStore::new();
        let served = ColonyId::new();
        let mut config = ColonyConfig::default();
        config.colony.id = Some(served);

        let foreign = serde_json::to_string(&snapshot(ColonyId::new(), 1, Vec::new())).unwrap();
        assert!(process_line(&store, &config, &foreign).await.is_none());
        assert!(store.is_empty().await);

        let own = serde_json::to_string(&snapshot(served, 1, Vec::new())).unwrap();
        let output = process_line(&store, &config, &own).await.unwrap();
        assert_eq!(output.colony_id, served);
        assert_eq!(store.len().await, 1);
    }
}
