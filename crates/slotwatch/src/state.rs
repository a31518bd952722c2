use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Normalized country key to the availability text last seen for it.
pub type SlotState = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to create state directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write state file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// JSON file holding the [`SlotState`] of one city.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing, unreadable or malformed file yields an empty
    /// state.
    pub fn load(&self) -> SlotState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No state file at {}, starting empty", self.path.display());
                return SlotState::new();
            }
            Err(e) => {
                log::warn!(
                    "Could not read state file {}: {}; starting empty",
                    self.path.display(),
                    e
                );
                return SlotState::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!(
                "State file {} is corrupt ({}); starting empty",
                self.path.display(),
                e
            );
            SlotState::new()
        })
    }

    /// Rewrites the whole file, creating parent directories as needed.
    pub fn save(&self, state: &SlotState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StateError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut json = serde_json::to_string_pretty(state)?;
        json.push('\n');
        fs::write(&self.path, json).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })?;

        log::info!(
            "Saved state for {} country(ies) to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }
}
