//! Mixer control layer for OSC-style digital mixing consoles.
//!
//! This is the "just works" layer. Address any of the 80 fader-bearing
//! channels, read and write names, query status, run timed fades, and poll
//! the selected fader's level on a dedicated connection.

pub mod address;
pub mod config;
pub mod error;
pub mod fader;
pub mod mixer;
pub mod monitor;
pub mod motion;

#[cfg(test)]
pub(crate) mod testing;

pub use address::{address_for, ChannelId, Group, CHANNEL_COUNT};
pub use config::{
    MixerConfig, DEFAULT_LOCAL_PORT, DEFAULT_MONITOR_PORT, DEFAULT_RESOLUTION, MAX_RESOLUTION,
};
pub use error::{ErrorCategory, MixerError, Result};
pub use fader::{Fader, FaderSnapshot};
pub use mixer::{Mixer, STATUS_ADDRESS};
pub use monitor::{LevelMonitor, LevelReport, FRESHNESS_WINDOW, MONITOR_INTERVAL};
pub use motion::{
    is_in_motion, query_level, run_fade, FadePlan, FadeStep, MAX_CONSECUTIVE_FAILURES,
    MOTION_SAMPLE_INTERVAL,
};
