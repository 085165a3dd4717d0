//! Channel ids and the console's path namespace.
//!
//! Ids follow the console's own numbering for inputs, aux ins, fx returns,
//! buses, matrices and mains (0-71). DCAs have no console id and are assigned
//! 72-79.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MixerError, Result};

/// Number of addressable faders.
pub const CHANNEL_COUNT: usize = 80;

/// Fader group a channel id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Channel,
    AuxIn,
    FxReturn,
    Bus,
    Matrix,
    MainStereo,
    MainMono,
    Dca,
}

impl Group {
    /// Group of a raw channel id, or `None` when out of range.
    pub fn of(id: usize) -> Option<Self> {
        ChannelId::new(id).ok().map(ChannelId::group)
    }

    /// Lowest channel id in this group.
    pub fn first_id(self) -> usize {
        match self {
            Group::Channel => 0,
            Group::AuxIn => 32,
            Group::FxReturn => 40,
            Group::Bus => 48,
            Group::Matrix => 64,
            Group::MainStereo => 70,
            Group::MainMono => 71,
            Group::Dca => 72,
        }
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Group::Channel => "channel",
            Group::AuxIn => "aux",
            Group::FxReturn => "fx",
            Group::Bus => "bus",
            Group::Matrix => "matrix",
            Group::MainStereo => "mains",
            Group::MainMono => "mono",
            Group::Dca => "dca",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated channel id in `0..CHANNEL_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    pub fn new(id: usize) -> Result<Self> {
        if id < CHANNEL_COUNT {
            Ok(Self(id as u8))
        } else {
            Err(MixerError::InvalidChannel(id))
        }
    }

    /// Caller guarantees `id < CHANNEL_COUNT`.
    pub(crate) fn from_index(id: usize) -> Self {
        debug_assert!(id < CHANNEL_COUNT);
        Self(id as u8)
    }

    /// Every channel id, in order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (0..CHANNEL_COUNT).map(Self::from_index)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn group(self) -> Group {
        match self.0 {
            0..=31 => Group::Channel,
            32..=39 => Group::AuxIn,
            40..=47 => Group::FxReturn,
            48..=63 => Group::Bus,
            64..=69 => Group::Matrix,
            70 => Group::MainStereo,
            71 => Group::MainMono,
            _ => Group::Dca,
        }
    }

    /// 1-based position within the group.
    pub fn index_in_group(self) -> usize {
        self.index() - self.group().first_id() + 1
    }

    /// Group path prefix, e.g. `/ch/01` or `/dca/3`.
    pub fn base_path(self) -> String {
        let id = self.index();
        match self.group() {
            Group::Channel => format!("/ch/{:02}", id + 1),
            Group::AuxIn => format!("/auxin/{:02}", id - 31),
            Group::FxReturn => format!("/fxrtn/{:02}", id - 39),
            Group::Bus => format!("/bus/{:02}", id - 47),
            Group::Matrix => format!("/mtx/{:02}", id - 63),
            Group::MainStereo => "/main/st".to_string(),
            Group::MainMono => "/main/m".to_string(),
            Group::Dca => format!("/dca/{}", id - 71),
        }
    }

    /// Fader level control path. DCAs have no `mix` segment.
    pub fn fader_path(self) -> String {
        match self.group() {
            Group::Dca => format!("{}/fader", self.base_path()),
            _ => format!("{}/mix/fader", self.base_path()),
        }
    }

    /// Channel name (scribble strip) path.
    pub fn name_path(self) -> String {
        format!("{}/config/name", self.base_path())
    }
}

impl TryFrom<usize> for ChannelId {
    type Error = MixerError;

    fn try_from(id: usize) -> Result<Self> {
        Self::new(id)
    }
}

impl From<ChannelId> for usize {
    fn from(id: ChannelId) -> Self {
        id.index()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.group(), self.index_in_group())
    }
}

/// Group path for a raw channel id; `None` when out of range.
pub fn address_for(id: usize) -> Option<String> {
    ChannelId::new(id).ok().map(ChannelId::base_path)
}
