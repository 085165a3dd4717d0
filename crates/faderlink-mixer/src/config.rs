use faderlink_transport::DialConfig;
use serde::{Deserialize, Serialize};

use crate::error::{MixerError, Result};

/// Default local port for the control connection.
pub const DEFAULT_LOCAL_PORT: u16 = 10023;

/// Default local port for the level monitor's connection.
pub const DEFAULT_MONITOR_PORT: u16 = 10024;

/// Default number of fade steps across the full fader travel.
pub const DEFAULT_RESOLUTION: u32 = 1024;

/// Largest accepted fader resolution. A fade plans one message per unit, so
/// this caps a full-travel fade at 65536 sends.
pub const MAX_RESOLUTION: u32 = 65_536;

/// Connection and fade settings for a [`Mixer`](crate::Mixer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Console address as `host:port`.
    pub remote: String,
    pub local_port: u16,
    pub monitor_port: u16,
    pub fader_resolution: u32,
    pub dial: DialConfig,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            remote: "127.0.0.1:10023".to_string(),
            local_port: DEFAULT_LOCAL_PORT,
            monitor_port: DEFAULT_MONITOR_PORT,
            fader_resolution: DEFAULT_RESOLUTION,
            dial: DialConfig::default(),
        }
    }
}

impl MixerConfig {
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Reject settings no mixer can run with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RESOLUTION).contains(&self.fader_resolution) {
            return Err(MixerError::InvalidResolution(
                self.fader_resolution.to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a user-supplied fader resolution.
pub(crate) fn parse_resolution(input: &str) -> Result<u32> {
    match input.trim().parse::<u32>() {
        Ok(value) if (1..=MAX_RESOLUTION).contains(&value) => Ok(value),
        _ => Err(MixerError::InvalidResolution(input.to_string())),
    }
}
