//! Atomic checkpoint persistence
//!
//! The checkpoint is the durable, atomically-published snapshot of everything
//! harvested so far. It is written to a temporary path first and renamed onto
//! the canonical path, so a reader (including downstream tooling inspecting a
//! live run) never observes a torn file. The same artifact is read back at
//! startup to resume an interrupted run.

use crate::state::OutputRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Checkpoint-specific errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes and reads the checkpoint artifact
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl CheckpointWriter {
    /// Creates a writer targeting the given canonical path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        Self {
            path,
            tmp_path: PathBuf::from(tmp),
        }
    }

    /// The canonical checkpoint path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically persists the given records
    ///
    /// Writes the full serialized form to `<path>.tmp`, then renames it onto
    /// the canonical path. The rename is the publication point: a crash
    /// before it leaves the prior checkpoint fully intact.
    pub fn persist(&self, records: &[OutputRecord]) -> Result<(), CheckpointError> {
        let body = serde_json::to_vec_pretty(records)?;
        fs::write(&self.tmp_path, body)?;
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }

    /// Loads the checkpoint, if one exists
    ///
    /// Returns `Ok(None)` when no checkpoint has been written yet. Leftover
    /// temporary files from a crashed run are ignored; only the canonical
    /// path is ever read.
    pub fn load(&self) -> Result<Option<Vec<OutputRecord>>, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let records = serde_json::from_str(&content)?;
        Ok(Some(records))
    }
}
