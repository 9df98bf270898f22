//! JSON file store: one document per colony in a directory.
//!
//! Each save writes `colony-{id}.json.tmp` and renames it over
//! `colony-{id}.json`, so a crash mid-write leaves the previous document
//! intact.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use colony_core::{AgentMemory, ColonyMemory, ColonyRecord};
use colony_types::{AgentId, ColonyId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DbError;
use crate::store::ColonyStore;

/// The on-disk document.
#[derive(Debug, Serialize, Deserialize)]
struct ColonyDocument {
    saved_at: DateTime<Utc>,
    record: ColonyRecord,
    agents: BTreeMap<AgentId, AgentMemory>,
}

/// Colony memory stored as JSON files.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the directory cannot be created.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, DbError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir })
    }

    /// Path of the document for `colony_id`.
    pub fn path_for(&self, colony_id: ColonyId) -> PathBuf {
        self.dir.join(format!("colony-{colony_id}.json"))
    }
}

impl ColonyStore for FileStore {
    async fn load(&self, colony_id: ColonyId) -> Result<Option<ColonyMemory>, DbError> {
        let path = self.path_for(colony_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc: ColonyDocument = serde_json::from_slice(&bytes)?;
        if doc.record.colony_id != colony_id {
            return Err(DbError::Corrupt {
                key: path.display().to_string(),
                reason: format!("holds colony {}", doc.record.colony_id),
            });
        }
        debug!(colony_id = %colony_id, saved_at = %doc.saved_at, "Loaded colony memory");
        Ok(Some(ColonyMemory::from_parts(doc.record, doc.agents)))
    }

    async fn save(&self, memory: &ColonyMemory) -> Result<(), DbError> {
        let doc = ColonyDocument {
            saved_at: Utc::now(),
            record: memory.record(),
            agents: memory.agents.clone(),
        };
        let json = serde_json::to_vec_pretty(&doc)?;
        let path = self.path_for(memory.colony_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(
            colony_id = %memory.colony_id,
            agents = memory.agents.len(),
            "Saved colony memory"
        );
        Ok(())
    }
}
