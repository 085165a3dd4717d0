use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use faderlink_osc::Message;
use faderlink_transport::{OscLink, OscSocket, TransportError};
use tracing::{debug, info};

use crate::address::ChannelId;
use crate::config::{parse_resolution, MixerConfig};
use crate::error::{MixerError, Result};
use crate::fader::{Fader, FaderSnapshot};
use crate::monitor::{LevelMonitor, FRESHNESS_WINDOW};
use crate::motion::{self, FadePlan};

/// Status query address. The reply carries several string arguments.
pub const STATUS_ADDRESS: &str = "/info";

/// State shared with fade and monitor threads.
#[derive(Debug)]
pub(crate) struct MixerState {
    faders: Vec<Fader>,
    selected: AtomicUsize,
    last_monitor_update: Mutex<Option<Instant>>,
    /// Bumped by each new monitor; a poller runs only while it holds the
    /// latest value.
    monitor_generation: AtomicU64,
}

impl MixerState {
    pub(crate) fn new() -> Self {
        Self {
            faders: ChannelId::all().map(Fader::new).collect(),
            selected: AtomicUsize::new(0),
            last_monitor_update: Mutex::new(None),
            monitor_generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn fader(&self, channel: ChannelId) -> &Fader {
        &self.faders[channel.index()]
    }

    pub(crate) fn select(&self, channel: ChannelId) {
        self.selected.store(channel.index(), Ordering::Release);
    }

    pub(crate) fn selected_channel(&self) -> ChannelId {
        let id = self.selected.load(Ordering::Acquire);
        ChannelId::new(id).unwrap_or_else(|_| ChannelId::from_index(0))
    }

    pub(crate) fn mark_monitor_update(&self) {
        *self
            .last_monitor_update
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub(crate) fn is_monitor_active(&self) -> bool {
        self.last_monitor_update
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|at| at.elapsed() < FRESHNESS_WINDOW)
    }

    /// Claim the monitor slot, superseding any running poller.
    pub(crate) fn begin_monitor(&self) -> u64 {
        self.monitor_generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn is_current_monitor(&self, generation: u64) -> bool {
        self.monitor_generation.load(Ordering::Acquire) == generation
    }

    /// Retire whichever poller holds the slot.
    pub(crate) fn end_monitors(&self) {
        self.monitor_generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// High-level handle to one console.
///
/// All methods take `&self`; a `Mixer` can be shared behind an `Arc` by a UI
/// thread, fade threads and a user-triggered connect.
pub struct Mixer {
    config: MixerConfig,
    state: Arc<MixerState>,
    resolution: AtomicU32,
    link: RwLock<Option<Arc<dyn OscLink>>>,
}

impl Mixer {
    /// Create a disconnected mixer.
    pub fn new(config: MixerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resolution: AtomicU32::new(config.fader_resolution),
            config,
            state: Arc::new(MixerState::new()),
            link: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Dial the control connection, replacing any existing one.
    pub fn connect(&self) -> Result<()> {
        let socket =
            OscSocket::dial_with_config(self.config.local_port, &self.config.remote, &self.config.dial)?;
        info!(remote = %socket.remote_addr(), "control connection ready");
        self.attach(Arc::new(socket));
        Ok(())
    }

    /// Use an already established link as the control connection.
    pub fn attach(&self, link: Arc<dyn OscLink>) {
        *self.link.write().unwrap_or_else(PoisonError::into_inner) = Some(link);
    }

    /// Drop the control connection. Returns whether one was open.
    ///
    /// Fades already running keep their own handle to the old connection
    /// until they finish.
    pub fn disconnect(&self) -> bool {
        let was = self
            .link
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if was {
            info!("control connection closed");
        }
        was
    }

    pub fn is_connected(&self) -> bool {
        self.link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn link(&self) -> Result<Arc<dyn OscLink>> {
        self.link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(MixerError::NotConnected)
    }

    /// Query console status; returns the reply's string arguments.
    pub fn status(&self) -> Result<Vec<String>> {
        let reply = self.link()?.inquire(&Message::new(STATUS_ADDRESS))?;
        Ok(reply.strings())
    }

    /// Read a channel's name.
    pub fn name(&self, channel: usize) -> Result<String> {
        let channel = ChannelId::new(channel)?;
        let path = channel.name_path();
        let reply = self.link()?.inquire(&Message::new(&path))?;
        reply
            .strings()
            .into_iter()
            .next()
            .ok_or_else(|| MixerError::UnexpectedReply {
                address: path,
                detail: format!("expected a string argument, got tags ',{}'", reply.type_tags()),
            })
    }

    /// Write a channel's name.
    pub fn set_name(&self, channel: usize, name: &str) -> Result<()> {
        let channel = ChannelId::new(channel)?;
        let link = self.link()?;
        link.send(&Message::new(channel.name_path()).with_string(name))?;
        debug!(%channel, name, "name set");
        Ok(())
    }

    /// Query a fader's live level and remember it.
    pub fn level(&self, channel: usize) -> Result<f32> {
        let channel = ChannelId::new(channel)?;
        let level = motion::query_level(&*self.link()?, channel)?;
        self.state.fader(channel).set_level(level);
        Ok(level)
    }

    /// Whether the fader appears to be moving. Blocks for one sample interval.
    pub fn is_in_motion(&self, channel: usize) -> Result<bool> {
        let channel = ChannelId::new(channel)?;
        Ok(motion::is_in_motion(&*self.link()?, channel))
    }

    /// Fade from the fader's current level to `target`, blocking until done.
    pub fn fade_to(&self, channel: usize, target: f32, duration: Duration) -> Result<()> {
        let channel = ChannelId::new(channel)?;
        check_level(target)?;
        let link = self.link()?;
        fade_from_current(&*link, self.state.fader(channel), target, self.fader_resolution(), duration)
    }

    /// Fade to silence.
    pub fn fade_out(&self, channel: usize, duration: Duration) -> Result<()> {
        self.fade_to(channel, 0.0, duration)
    }

    /// Fade between explicit levels, blocking until done.
    pub fn make_fade(&self, channel: usize, start: f32, stop: f32, duration: Duration) -> Result<()> {
        let channel = ChannelId::new(channel)?;
        let plan = FadePlan::new(channel, start, stop, self.fader_resolution(), duration)?;
        let link = self.link()?;
        motion::run_fade(&*link, self.state.fader(channel), &plan)
    }

    /// Run [`fade_to`](Self::fade_to) on its own thread.
    ///
    /// Arguments and the connection are checked before the thread starts.
    pub fn spawn_fade(
        &self,
        channel: usize,
        target: f32,
        duration: Duration,
    ) -> Result<JoinHandle<Result<()>>> {
        let channel = ChannelId::new(channel)?;
        check_level(target)?;
        let link = self.link()?;
        let state = Arc::clone(&self.state);
        let resolution = self.fader_resolution();

        thread::Builder::new()
            .name(format!("faderlink-fade-{}", channel.index()))
            .spawn(move || {
                fade_from_current(&*link, state.fader(channel), target, resolution, duration)
            })
            .map_err(|err| MixerError::Transport(TransportError::Io(err)))
    }

    /// Interrupt a running fade. Returns whether one was running.
    pub fn cancel_fade(&self, channel: usize) -> Result<bool> {
        let channel = ChannelId::new(channel)?;
        let cancelled = self.state.fader(channel).deactivate();
        if cancelled {
            debug!(%channel, "fade cancelled");
        }
        Ok(cancelled)
    }

    /// Set the fade resolution from user input. On error the previous value
    /// is kept.
    pub fn set_fader_resolution(&self, input: &str) -> Result<u32> {
        let resolution = parse_resolution(input)?;
        self.resolution.store(resolution, Ordering::Release);
        Ok(resolution)
    }

    pub fn fader_resolution(&self) -> u32 {
        self.resolution.load(Ordering::Acquire)
    }

    /// Choose the channel the level monitor polls.
    pub fn select_channel(&self, channel: usize) -> Result<()> {
        self.state.select(ChannelId::new(channel)?);
        Ok(())
    }

    pub fn selected_channel(&self) -> ChannelId {
        self.state.selected_channel()
    }

    pub fn fader(&self, channel: usize) -> Result<FaderSnapshot> {
        Ok(self.state.fader(ChannelId::new(channel)?).snapshot())
    }

    /// Snapshots of all faders, in channel order.
    pub fn faders(&self) -> Vec<FaderSnapshot> {
        self.state.faders.iter().map(Fader::snapshot).collect()
    }

    /// Start the level monitor on its own connection from the monitor port.
    ///
    /// Only one monitor polls at a time: starting another stops the previous
    /// one, which closes its connection and its report channel.
    pub fn monitor_levels(&self) -> Result<LevelMonitor> {
        let port = self.config.monitor_port;
        let remote = self.config.remote.clone();
        let dial = self.config.dial.clone();
        LevelMonitor::spawn(Arc::clone(&self.state), move || {
            let socket = OscSocket::dial_with_config(port, &remote, &dial)?;
            Ok(Arc::new(socket) as Arc<dyn OscLink>)
        })
    }

    /// Start the level monitor over an existing link.
    pub fn monitor_levels_with(&self, link: Arc<dyn OscLink>) -> Result<LevelMonitor> {
        LevelMonitor::spawn(Arc::clone(&self.state), move || Ok(link))
    }

    /// Stop whichever level monitor is running, if any.
    pub fn stop_monitor(&self) {
        self.state.end_monitors();
    }

    /// True while the monitor has delivered a level within the last second.
    pub fn is_monitor_active(&self) -> bool {
        self.state.is_monitor_active()
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("remote", &self.config.remote)
            .field("connected", &self.is_connected())
            .field("resolution", &self.fader_resolution())
            .field("selected", &self.selected_channel().index())
            .finish()
    }
}

fn check_level(level: f32) -> Result<()> {
    if (0.0..=1.0).contains(&level) {
        Ok(())
    } else {
        Err(MixerError::InvalidLevel(level))
    }
}

fn fade_from_current(
    link: &dyn OscLink,
    fader: &Fader,
    target: f32,
    resolution: u32,
    duration: Duration,
) -> Result<()> {
    let channel = fader.channel();
    if fader.is_active() || motion::is_in_motion(link, channel) {
        return Err(MixerError::InMotion);
    }
    let start = motion::query_level(link, channel)?;
    fader.set_level(start);
    let plan = FadePlan::new(channel, start, target, resolution, duration)?;
    motion::run_fade(link, fader, &plan)
}
