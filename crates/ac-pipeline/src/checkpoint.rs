//! Checkpoint sinks — pluggable persistence for pipeline state snapshots.
//!
//! The controller saves the state after every node, keyed by execution id.
//! The in-memory sink is the default; the file sink writes one JSON file
//! per execution for durability.

use crate::state::PipelineState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("checkpoint store poisoned")]
    Poisoned,
}

pub trait CheckpointSink: Send + Sync {
    fn save(&self, execution_id: Uuid, snapshot: &PipelineState) -> Result<(), CheckpointError>;
    fn load(&self, execution_id: Uuid) -> Result<Option<PipelineState>, CheckpointError>;
}

// ---------------------------------------------------------------------------
// In-memory sink (default)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySink {
    snapshots: Mutex<HashMap<Uuid, PipelineState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointSink for MemorySink {
    fn save(&self, execution_id: Uuid, snapshot: &PipelineState) -> Result<(), CheckpointError> {
        self.snapshots
            .lock()
            .map_err(|_| CheckpointError::Poisoned)?
            .insert(execution_id, snapshot.clone());
        Ok(())
    }

    fn load(&self, execution_id: Uuid) -> Result<Option<PipelineState>, CheckpointError> {
        Ok(self
            .snapshots
            .lock()
            .map_err(|_| CheckpointError::Poisoned)?
            .get(&execution_id)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// File sink
// ---------------------------------------------------------------------------

pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, execution_id: Uuid) -> PathBuf {
        self.dir.join(format!("{execution_id}.json"))
    }
}

impl CheckpointSink for FileSink {
    fn save(&self, execution_id: Uuid, snapshot: &PipelineState) -> Result<(), CheckpointError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        std::fs::write(self.path_for(execution_id), json)?;
        Ok(())
    }

    fn load(&self, execution_id: Uuid) -> Result<Option<PipelineState>, CheckpointError> {
        let path = self.path_for(execution_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
