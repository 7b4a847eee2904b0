//! Kiosk configuration
//!
//! A single JSON file next to the binary; every field has a default so a
//! missing file still starts the kiosk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Everything the kiosk needs to come up unattended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Directory holding every playable video
    pub video_dir: PathBuf,
    /// Manifest of loop videos for close visitors
    pub close_manifest: PathBuf,
    /// Manifest of loop videos for far visitors
    pub far_manifest: PathBuf,
    /// Library name of the content video
    pub content_video: String,
    /// Serial port the distance sensor is attached to
    pub serial_port: String,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Playback tick interval in milliseconds
    pub tick_ms: u64,
    /// Distance at or below which a visitor counts as close
    pub close_distance: i32,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("Videos"),
            close_manifest: PathBuf::from("LoopVideos/Close.txt"),
            far_manifest: PathBuf::from("LoopVideos/Far.txt"),
            content_video: "content.mp4".to_string(),
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            tick_ms: 13,
            close_distance: 50,
        }
    }
}

impl KioskConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("saved config to {:?}", path);
        Ok(())
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("using default config ({:?} unusable: {})", path, e);
                Self::default()
            }
        }
    }

    /// The playback tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
