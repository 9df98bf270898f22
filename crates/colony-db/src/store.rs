//! The [`ColonyStore`] trait and backend selection.
//!
//! Memory is loaded once at tick start and saved once at tick end. A save
//! replaces the colony's stored state wholesale: agent records that are no
//! longer in memory are deleted, so pruning in memory carries through to
//! the store.

use std::future::Future;

use colony_core::ColonyMemory;
use colony_core::config::{StoreBackend, StoreConfig};
use colony_types::ColonyId;

use crate::dragonfly::DragonflyStore;
use crate::error::DbError;
use crate::file::FileStore;
use crate::memory::InMemoryStore;

/// Persistent storage for colony memory, keyed by colony id.
pub trait ColonyStore {
    /// Load a colony's memory, or `None` if it was never saved.
    fn load(
        &self,
        colony_id: ColonyId,
    ) -> impl Future<Output = Result<Option<ColonyMemory>, DbError>> + Send;

    /// Persist `memory`, dropping records for agents it no longer holds.
    fn save(&self, memory: &ColonyMemory) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// The backend chosen by configuration.
#[derive(Debug, Clone)]
pub enum AnyStore {
    /// Process-local memory.
    Memory(InMemoryStore),
    /// JSON documents on disk.
    File(FileStore),
    /// `Dragonfly` (Redis protocol).
    Dragonfly(DragonflyStore),
}

impl AnyStore {
    /// Open the backend named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the directory cannot be created or the
    /// `Dragonfly` connection fails.
    pub async fn open(config: &StoreConfig) -> Result<Self, DbError> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::Memory(InMemoryStore::new())),
            StoreBackend::File => Ok(Self::File(FileStore::open(&config.path).await?)),
            StoreBackend::Dragonfly => Ok(Self::Dragonfly(DragonflyStore::connect(&config.url).await?)),
        }
    }

    /// Backend name for logging.
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "file",
            Self::Dragonfly(_) => "dragonfly",
        }
    }
}

impl ColonyStore for AnyStore {
    async fn load(&self, colony_id: ColonyId) -> Result<Option<ColonyMemory>, DbError> {
        match self {
            Self::Memory(store) => store.load(colony_id).await,
            Self::File(store) => store.load(colony_id).await,
            Self::Dragonfly(store) => store.load(colony_id).await,
        }
    }

    async fn save(&self, memory: &ColonyMemory) -> Result<(), DbError> {
        match self {
            Self::Memory(store) => store.save(memory).await,
            Self::File(store) => store.save(memory).await,
            Self::Dragonfly(store) => store.save(memory).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_opens_memory_backend() {
        let store = AnyStore::open(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.backend(), "memory");

        let memory = ColonyMemory::new(ColonyId::new());
        store.save(&memory).await.unwrap();
        let loaded = store.load(memory.colony_id).await.unwrap();
        assert_eq!(loaded, Some(memory));
    }
}
