//! Small persisted user preferences (selected voice)

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

const PREFERENCES_FILE: &str = "preferences.json";

/// Well-known key of the selected voice identifier
pub const SELECTED_VOICE_KEY: &str = "selectedVoice";

/// Key/value preferences persisted as a JSON object in the config directory
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            path: config_dir.as_ref().join(PREFERENCES_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one string preference; unreadable files count as empty
    pub fn get(&self, key: &str) -> Option<String> {
        self.read_all()
            .get(key)
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
    }

    /// Write one string preference, keeping the others
    pub fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        let mut all = self.read_all();
        all.insert(key.to_string(), Value::String(value.to_string()));
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&Value::Object(all))?)?;
        Ok(())
    }

    /// Selected voice, or `default` when none has been saved
    pub fn selected_voice(&self, default: &str) -> String {
        self.get(SELECTED_VOICE_KEY)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn set_selected_voice(&self, voice_id: &str) -> crate::Result<()> {
        self.set(SELECTED_VOICE_KEY, voice_id)
    }

    fn read_all(&self) -> Map<String, Value> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Map::new(),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!("Ignoring malformed preferences file {}", self.path.display());
                Map::new()
            }
        }
    }
}
