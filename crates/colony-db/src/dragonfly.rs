//! `Dragonfly` (Redis-compatible) colony store.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `colony:{id}:state` | JSON | Colony record: registry, queue, flags |
//! | `colony:{id}:agent:{agent}` | JSON | One agent's memory |
//! | `colony:{id}:agents` | Set | Ids of agents with a stored record |

use std::collections::BTreeMap;

use colony_core::{AgentMemory, ColonyMemory, ColonyRecord};
use colony_types::{AgentId, ColonyId};
use fred::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::store::ColonyStore;

/// Key of the colony record.
pub fn state_key(colony_id: ColonyId) -> String {
    format!("colony:{colony_id}:state")
}

/// Key of one agent's record.
pub fn agent_key(colony_id: ColonyId, agent_id: AgentId) -> String {
    format!("colony:{colony_id}:agent:{agent_id}")
}

/// Key of the set of stored agent ids.
pub fn agents_key(colony_id: ColonyId) -> String {
    format!("colony:{colony_id}:agents")
}

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] and provides typed operations for the
/// colony key patterns.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl std::fmt::Debug for DragonflyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragonflyStore").finish_non_exhaustive()
    }
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if serialization fails.
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize it from JSON.
    ///
    /// Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if deserialization fails.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(DbError::from)
    }

    /// Store many JSON values in one round-trip (MSET).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or the write fails.
    pub async fn mset_json<T: Serialize>(&self, entries: &[(String, &T)]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            pairs.push((key.clone(), serde_json::to_string(value)?));
        }
        let _: () = self.client.mset(pairs).await?;
        Ok(())
    }

    // =========================================================================
    // Agent index -- colony:{id}:agents
    // =========================================================================

    /// Agent ids currently recorded for a colony.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] if a member is not a valid id.
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn stored_agents(&self, colony_id: ColonyId) -> Result<Vec<AgentId>, DbError> {
        let key = agents_key(colony_id);
        let members: Vec<String> = self.client.smembers(&key).await?;
        let mut ids = Vec::with_capacity(members.len());
        for m in &members {
            let id = m.parse::<Uuid>().map_err(|e| DbError::Corrupt {
                key: key.clone(),
                reason: format!("invalid agent id {m}: {e}"),
            })?;
            ids.push(AgentId::from(id));
        }
        Ok(ids)
    }

    /// Delete every key belonging to a colony.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if a delete fails.
    pub async fn delete_colony(&self, colony_id: ColonyId) -> Result<(), DbError> {
        let mut keys: Vec<String> = self
            .stored_agents(colony_id)
            .await?
            .into_iter()
            .map(|agent| agent_key(colony_id, agent))
            .collect();
        keys.push(agents_key(colony_id));
        keys.push(state_key(colony_id));
        let _: u32 = self.client.del(keys).await?;
        Ok(())
    }
}

impl ColonyStore for DragonflyStore {
    async fn load(&self, colony_id: ColonyId) -> Result<Option<ColonyMemory>, DbError> {
        let Some(record) = self.get_json::<ColonyRecord>(&state_key(colony_id)).await? else {
            return Ok(None);
        };
        let mut agents = BTreeMap::new();
        for agent in self.stored_agents(colony_id).await? {
            match self.get_json::<AgentMemory>(&agent_key(colony_id, agent)).await? {
                Some(mem) => {
                    agents.insert(agent, mem);
                }
                None => warn!(colony_id = %colony_id, agent_id = %agent, "Indexed agent has no record"),
            }
        }
        debug!(colony_id = %colony_id, agents = agents.len(), "Loaded colony memory");
        Ok(Some(ColonyMemory::from_parts(record, agents)))
    }

    async fn save(&self, memory: &ColonyMemory) -> Result<(), DbError> {
        let colony_id = memory.colony_id;
        let index = agents_key(colony_id);

        let stale: Vec<AgentId> = self
            .stored_agents(colony_id)
            .await?
            .into_iter()
            .filter(|agent| !memory.agents.contains_key(agent))
            .collect();
        if !stale.is_empty() {
            let keys: Vec<String> = stale.iter().map(|a| agent_key(colony_id, *a)).collect();
            let members: Vec<String> = stale.iter().map(ToString::to_string).collect();
            let _: u32 = self.client.del(keys).await?;
            let _: u32 = self.client.srem(&index, members).await?;
            debug!(colony_id = %colony_id, pruned = stale.len(), "Pruned stale agent records");
        }

        let entries: Vec<(String, &AgentMemory)> = memory
            .agents
            .iter()
            .map(|(id, mem)| (agent_key(colony_id, *id), mem))
            .collect();
        self.mset_json(&entries).await?;
        if !memory.agents.is_empty() {
            let members: Vec<String> = memory.agents.keys().map(ToString::to_string).collect();
            let _: u32 = self.client.sadd(&index, members).await?;
        }

        self.set_json(&state_key(colony_id), &memory.record()).await?;
        debug!(colony_id = %colony_id, agents = memory.agents.len(), "Saved colony memory");
        Ok(())
    }
}
