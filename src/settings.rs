//! User settings stored as settings.json in the app data directory

use crate::constants::*;
use crate::source::loader::FetchPolicy;
use crate::source::SourceConfig;
use crate::window::DEFAULT_OVERSCAN;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// How the filtered list is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Table on wide windows, cards on narrow ones
    #[default]
    Auto,
    Table,
    Cards,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Window geometry
    pub window_x: Option<f32>,
    pub window_y: Option<f32>,
    pub window_w: Option<f32>,
    pub window_h: Option<f32>,

    // View
    pub view_mode: ViewMode,
    pub row_height: f32,
    pub card_width: f32,
    pub card_height: f32,
    pub overscan: usize,

    // Data
    pub source: SourceConfig,
    pub fetch_timeout_secs: u64,
    pub fetch_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_x: None,
            window_y: None,
            window_w: None,
            window_h: None,
            view_mode: ViewMode::Auto,
            row_height: 52.0,
            card_width: 220.0,
            card_height: 130.0,
            overscan: DEFAULT_OVERSCAN,
            source: SourceConfig::Bundled,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            fetch_retries: DEFAULT_FETCH_RETRIES,
        }
    }
}

impl Settings {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("settings.json");
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) {
        let path = data_dir.join("settings.json");
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.fetch_timeout_secs.max(1)),
            retries: self.fetch_retries,
            ..FetchPolicy::default()
        }
    }

    /// Row height clamped to something drawable
    pub fn row_height(&self) -> f32 {
        if self.row_height.is_finite() {
            self.row_height.clamp(20.0, 200.0)
        } else {
            52.0
        }
    }
}

/// Per-user data directory (settings, database, logs)
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}
