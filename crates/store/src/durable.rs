//! Crash-consistent persistence of the store state.
//!
//! One JSON document on disk. Every save writes a temp file in the
//! same directory, fsyncs it, then renames it over the old file, so a
//! crash at any point leaves either the old state or the new one,
//! never a torn mix. The prior file is copied aside first, keeping a
//! bounded trail of timestamped backups.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;

use crate::error::StoreError;
use crate::state::StoreState;

const DURABLE_FILE: &str = "restock.json";
const BACKUP_PREFIX: &str = "restock.json.bak.";

/// File-backed durable store.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    path: PathBuf,
    backup_retention: usize,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, backup_retention: usize) -> Self {
        let dir = dir.into();
        let path = dir.join(DURABLE_FILE);
        Self {
            dir,
            path,
            backup_retention,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the durable state.
    ///
    /// A missing file is an empty store. Leftover temp files from a
    /// crashed writer are swept away; the durable file itself is
    /// untouched by them, so state after a crash equals the last
    /// completed save.
    pub fn load(&self) -> Result<StoreState, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        self.sweep_stray_temp_files();

        if !self.path.exists() {
            return Ok(StoreState::empty());
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let mut state: StoreState = serde_json::from_str(&raw)
            .map_err(|e| StoreError::corrupt(&self.path, e.to_string()))?;
        state.normalize();
        Ok(state)
    }

    /// Persist `state` atomically, retaining a backup of the prior
    /// file first.
    pub fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        if self.backup_retention > 0 && self.path.exists() {
            self.backup_prior()?;
            self.prune_backups()?;
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let mut temp =
            NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        temp.write_all(&bytes)
            .map_err(|e| StoreError::io(temp.path().to_path_buf(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(temp.path().to_path_buf(), e))?;
        temp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;
        Ok(())
    }

    /// Existing backup files, oldest first.
    pub fn backups(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut found = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(BACKUP_PREFIX) {
                found.push(entry.path());
            }
        }
        // The timestamp format sorts lexicographically.
        found.sort();
        Ok(found)
    }

    fn backup_prior(&self) -> Result<(), StoreError> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%6fZ");
        let backup = self.dir.join(format!("{BACKUP_PREFIX}{stamp}"));
        fs::copy(&self.path, &backup).map_err(|e| StoreError::io(&backup, e))?;
        Ok(())
    }

    fn prune_backups(&self) -> Result<(), StoreError> {
        let backups = self.backups()?;
        if backups.len() <= self.backup_retention {
            return Ok(());
        }
        let excess = backups.len() - self.backup_retention;
        for stale in &backups[..excess] {
            fs::remove_file(stale).map_err(|e| StoreError::io(stale.clone(), e))?;
        }
        Ok(())
    }

    fn sweep_stray_temp_files(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(".tmp") {
                if let Err(e) = fs::remove_file(entry.path()) {
                    tracing::warn!(
                        "could not remove stray temp file {}: {}",
                        entry.path().display(),
                        e
                    );
                } else {
                    tracing::debug!("removed stray temp file {}", entry.path().display());
                }
            }
        }
    }
}
