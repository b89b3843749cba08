//! Studio configuration
//!
//! Optional JSON file; every field has a default so partial files load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::MP3_BITRATE_KBPS;
use crate::dsp::EffectParams;
use crate::engine::{DEFAULT_SAMPLE_RATE, MAX_CHANNELS};
use crate::error::{EchoClipError, Result};
use crate::state::history::DEFAULT_HISTORY_CAPACITY;

/// Settings of a studio session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Maximum number of renders kept in history.
    pub history_capacity: usize,

    /// MP3 export bit rate; only 128 is supported.
    pub mp3_bitrate_kbps: u32,

    /// Effect settings a new session starts with.
    pub default_params: EffectParams,

    /// Recompute the voice-only preview when voice settings change.
    pub preview_enabled: bool,

    /// Sample rate of the monitoring output.
    pub monitor_sample_rate: u32,

    /// Channel count of the monitoring output.
    pub monitor_channels: usize,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            mp3_bitrate_kbps: MP3_BITRATE_KBPS,
            default_params: EffectParams::default(),
            preview_enabled: true,
            monitor_sample_rate: DEFAULT_SAMPLE_RATE,
            monitor_channels: MAX_CHANNELS,
        }
    }
}

impl StudioConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EchoClipError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        let config: StudioConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.mp3_bitrate_kbps != MP3_BITRATE_KBPS {
            return Err(invalid(
                "mp3_bitrate_kbps",
                self.mp3_bitrate_kbps,
                "128",
            ));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity", self.history_capacity, ">= 1"));
        }
        if self.monitor_sample_rate == 0 {
            return Err(invalid(
                "monitor_sample_rate",
                self.monitor_sample_rate,
                "> 0 Hz",
            ));
        }
        if !(1..=MAX_CHANNELS).contains(&self.monitor_channels) {
            return Err(invalid("monitor_channels", self.monitor_channels, "1 or 2"));
        }
        Ok(())
    }
}

fn invalid(param: &str, value: impl ToString, expected: &str) -> EchoClipError {
    EchoClipError::InvalidParameter {
        param: param.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}
