//! Snapshot persistence.
//!
//! The snapshot and the stats files are whole-file JSON documents,
//! written atomically: serialize to `<path>.tmp`, then rename over the
//! target. An interrupted or failed save leaves the previous good file
//! untouched. A failed save is retried once before the run aborts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use lastpost_common::{Entity, LastpostError};

use crate::stats::ActivityStats;

pub struct SnapshotStore {
    snapshot_path: PathBuf,
    stats_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(snapshot_path: impl Into<PathBuf>, stats_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            stats_path: stats_path.into(),
        }
    }

    /// Load the previous snapshot. `None` on first run (no file yet);
    /// an unreadable or corrupt file is an error, so a bad disk never
    /// silently discards accumulated history.
    pub fn load(&self) -> Result<Option<Vec<Entity>>, LastpostError> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.snapshot_path).map_err(|e| {
            LastpostError::Persistence(format!(
                "cannot read snapshot {}: {e}",
                self.snapshot_path.display()
            ))
        })?;
        let entities: Vec<Entity> = serde_json::from_str(&raw).map_err(|e| {
            LastpostError::Persistence(format!(
                "cannot parse snapshot {}: {e}",
                self.snapshot_path.display()
            ))
        })?;

        Ok(Some(entities))
    }

    pub fn save(&self, entities: &[Entity]) -> Result<(), LastpostError> {
        self.write_json(&self.snapshot_path, entities)
    }

    pub fn save_stats(&self, stats: &ActivityStats) -> Result<(), LastpostError> {
        self.write_json(&self.stats_path, stats)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), LastpostError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| {
            LastpostError::Persistence(format!("cannot serialize {}: {e}", path.display()))
        })?;

        if let Err(first) = write_atomic(path, &json) {
            warn!(path = %path.display(), error = %first, "Save failed, retrying once");
            write_atomic(path, &json).map_err(|e| {
                LastpostError::Persistence(format!("cannot write {}: {e}", path.display()))
            })?;
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let temp_path = temp_path_for(path);

    if let Err(e) = fs::write(&temp_path, contents) {
        cleanup_temp_file(&temp_path, &e);
        return Err(e);
    }
    if let Err(e) = fs::rename(&temp_path, path) {
        cleanup_temp_file(&temp_path, &e);
        return Err(e);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn cleanup_temp_file(temp_path: &Path, original_error: &std::io::Error) {
    if let Err(cleanup_err) = fs::remove_file(temp_path) {
        warn!(
            temp_file = %temp_path.display(),
            original_error = %original_error,
            cleanup_error = %cleanup_err,
            "Failed to clean up temp file after save error"
        );
    }
}
