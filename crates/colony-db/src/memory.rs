//! Process-local store, used by tests and the `memory` backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use colony_core::ColonyMemory;
use colony_types::ColonyId;
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::ColonyStore;

/// Colony memory held in a shared map. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    colonies: Arc<RwLock<BTreeMap<ColonyId, ColonyMemory>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of colonies stored.
    pub async fn len(&self) -> usize {
        self.colonies.read().await.len()
    }

    /// Whether nothing has been saved.
    pub async fn is_empty(&self) -> bool {
        self.colonies.read().await.is_empty()
    }
}

impl ColonyStore for InMemoryStore {
    async fn load(&self, colony_id: ColonyId) -> Result<Option<ColonyMemory>, DbError> {
        Ok(self.colonies.read().await.get(&colony_id).cloned())
    }

    async fn save(&self, memory: &ColonyMemory) -> Result<(), DbError> {
        self.colonies
            .write()
            .await
            .insert(memory.colony_id, memory.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colony_core::AgentMemory;
    use colony_types::{AgentId, Role};

    use super::*;

    #[tokio::test]
    async fn missing_colony_loads_none() {
        let store = InMemoryStore::new();
        assert!(store.load(ColonyId::new()).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryStore::new();
        let handle = store.clone();
        let mut memory = ColonyMemory::new(ColonyId::new());
        memory
            .agents
            .insert(AgentId::new(), AgentMemory::new(Role::Hauler, 3));
        store.save(&memory).await.unwrap();

        assert_eq!(handle.len().await, 1);
        assert_eq!(handle.load(memory.colony_id).await.unwrap(), Some(memory));
    }
}
