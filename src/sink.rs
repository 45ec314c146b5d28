use serde_json::to_writer_pretty;
use std::fs::{self, File};
use std::path::PathBuf;

use crate::driver::RunLog;
use crate::error::SimError;

/// Durable storage for the accumulated run log, invoked at every round
/// boundary. A persist failure is reported, never rolled back: the
/// in-memory log is the source of truth.
pub trait ResultSink: Send {
    fn persist(&mut self, run_log: &RunLog) -> Result<(), SimError>;
}

/// Writes the full run log as pretty-printed json, overwriting the file
/// after each round so the on-disk copy always reflects every completed
/// round.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileSink { path: path.into() }
    }
}

impl ResultSink for JsonFileSink {
    fn persist(&mut self, run_log: &RunLog) -> Result<(), SimError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| SimError::Persist(format!("create {:?}: {}", parent, e)))?;
            }
        }
        let file = File::create(&self.path)
            .map_err(|e| SimError::Persist(format!("create {:?}: {}", self.path, e)))?;
        to_writer_pretty(file, run_log)
            .map_err(|e| SimError::Persist(format!("write {:?}: {}", self.path, e)))?;
        log::debug!("run log persisted to {:?}", self.path);
        Ok(())
    }
}
