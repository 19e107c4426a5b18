use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::focus::FocusConfig;
use crate::progress::ProgressConfig;

/// All integrity thresholds in one place. `Default` carries the reference
/// values; deployments override through a [`SettingsStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntegrityTunables {
    pub progress: ProgressConfig,
    pub focus: FocusConfig,
}

/// JSON-file-backed store for tunable overrides.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<IntegrityTunables>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            IntegrityTunables::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tunables(&self) -> IntegrityTunables {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, tunables: IntegrityTunables) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = tunables;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &IntegrityTunables) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_reference_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let tunables = store.tunables();
        assert_eq!(tunables.progress.sample_interval_ms, 500);
        assert_eq!(tunables.progress.jump_threshold_secs, 2.0);
        assert_eq!(tunables.progress.buffering_seek_threshold_secs, 3.0);
        assert_eq!(tunables.focus.max_focus_losses, 3);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        let mut tunables = store.tunables();
        tunables.progress.max_pause_events = 2;
        tunables.focus.max_focus_losses = 1;
        store.update(tunables).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.tunables().progress.max_pause_events, 2);
        assert_eq!(reopened.tunables().focus.max_focus_losses, 1);
        // Untouched knobs keep their reference values.
        assert_eq!(reopened.tunables().progress.completion_threshold_pct, 90.0);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.tunables().progress.sample_interval_ms, 500);
    }
}
