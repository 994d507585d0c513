//! JSON settings file holding the pitch session parameters.

use crate::dsp::pitch::PitchConfig;
use crate::dsp::stabilizer::DEFAULT_STABILITY_DEPTH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const MAX_HARMONIC_COUNT: usize = 16;
const MAX_STABILITY_DEPTH: usize = 64;

pub fn config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hps-tuner")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerSettings {
    pub pitch: PitchConfig,
}

impl TunerSettings {
    /// Reads and parses `path`, propagating I/O and parse failures.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        let mut settings: TunerSettings = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings {}", path.display()))?;
        settings.sanitize();
        Ok(settings)
    }

    /// Like [`TunerSettings::load`], but falls back to defaults. A missing
    /// file is silent; an unreadable or malformed one is logged.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path)
            .map_err(|e| warn!("[settings] {e:#}; using defaults"))
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to encode settings")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json)
            .and_then(|()| fs::rename(&temp_path, path))
            .with_context(|| format!("failed to write settings {}", path.display()))
    }

    /// Clamps values that would make a session pointlessly expensive.
    /// Values that are outright invalid are left for `PitchConfig::validate`.
    pub fn sanitize(&mut self) {
        let pitch = &mut self.pitch;
        if pitch.harmonic_count > MAX_HARMONIC_COUNT {
            warn!(
                "[settings] harmonic count {} clamped to {MAX_HARMONIC_COUNT}",
                pitch.harmonic_count
            );
            pitch.harmonic_count = MAX_HARMONIC_COUNT;
        }
        if pitch.stability_depth > MAX_STABILITY_DEPTH {
            warn!(
                "[settings] stability depth {} reset to {DEFAULT_STABILITY_DEPTH}",
                pitch.stability_depth
            );
            pitch.stability_depth = DEFAULT_STABILITY_DEPTH;
        }
        if pitch.hop_size > pitch.window_size && pitch.window_size > 0 {
            warn!(
                "[settings] hop size {} clamped to window size {}",
                pitch.hop_size, pitch.window_size
            );
            pitch.hop_size = pitch.window_size;
        }
    }
}
