//! Background polling of the selected fader's level.
//!
//! The monitor owns its own connection (on the monitor port) so its
//! once-per-frame queries never queue behind a fade on the control
//! connection.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use faderlink_transport::OscLink;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::fader::{format_level, Fader};
use crate::mixer::MixerState;
use crate::motion::query_level;

/// Poll period, one frame at 24 Hz.
pub const MONITOR_INTERVAL: Duration = Duration::from_micros(41_667);

/// The monitor counts as active while its last successful update is younger
/// than this.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(1);

/// Reports buffered for a slow reader before new ones are dropped.
const REPORT_BACKLOG: usize = 64;

/// One level observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub channel: usize,
    pub group: &'static str,
    pub index: usize,
    pub level: Option<f32>,
    pub text: String,
}

impl LevelReport {
    fn from_fader(fader: &Fader) -> Self {
        let channel = fader.channel();
        let level = fader.level();
        Self {
            channel: channel.index(),
            group: channel.group().name(),
            index: channel.index_in_group(),
            level,
            text: format_level(channel, level),
        }
    }
}

impl fmt::Display for LevelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Default)]
struct MonitorControl {
    stop: AtomicBool,
    paused: AtomicBool,
}

/// Handle to a running level monitor.
///
/// Dropping the handle asks the loop to stop without waiting for it.
#[derive(Debug)]
pub struct LevelMonitor {
    control: Arc<MonitorControl>,
    reports: Receiver<LevelReport>,
    handle: Option<JoinHandle<()>>,
}

impl LevelMonitor {
    /// Start polling on a new thread. `connect` runs on that thread; if it
    /// fails the monitor logs a warning and ends, closing the report channel.
    ///
    /// A monitor started earlier on the same state stops at its next poll.
    pub(crate) fn spawn<C>(state: Arc<MixerState>, connect: C) -> Result<Self>
    where
        C: FnOnce() -> faderlink_transport::Result<Arc<dyn OscLink>> + Send + 'static,
    {
        let control = Arc::new(MonitorControl::default());
        let (tx, reports) = mpsc::sync_channel(REPORT_BACKLOG);
        let generation = state.begin_monitor();

        let handle = {
            let control = Arc::clone(&control);
            thread::Builder::new()
                .name("faderlink-monitor".to_string())
                .spawn(move || match connect() {
                    Ok(link) => run(&*link, &state, generation, &control, &tx),
                    Err(err) => warn!(error = %err, "level monitor could not connect"),
                })
                .map_err(faderlink_transport::TransportError::from)?
        };

        Ok(Self {
            control,
            reports,
            handle: Some(handle),
        })
    }

    /// Receiver for level reports, one per poll.
    pub fn reports(&self) -> &Receiver<LevelReport> {
        &self.reports
    }

    /// Suspend polling until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.control.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.control.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.control.paused.load(Ordering::Acquire)
    }

    /// Whether the polling thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop polling and wait for the loop to exit.
    pub fn stop(mut self) {
        self.control.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("level monitor thread panicked");
            }
        }
    }
}

impl Drop for LevelMonitor {
    fn drop(&mut self) {
        self.control.stop.store(true, Ordering::Release);
    }
}

fn run(
    link: &dyn OscLink,
    state: &MixerState,
    generation: u64,
    control: &MonitorControl,
    tx: &SyncSender<LevelReport>,
) {
    info!(generation, "level monitor started");

    while !control.stop.load(Ordering::Acquire) {
        if !state.is_current_monitor(generation) {
            info!(generation, "level monitor superseded");
            break;
        }
        if control.paused.load(Ordering::Acquire) {
            thread::sleep(MONITOR_INTERVAL);
            continue;
        }

        let channel = state.selected_channel();
        let fader = state.fader(channel);
        let polled = query_level(link, channel);
        if !state.is_current_monitor(generation) {
            continue;
        }
        match polled {
            Ok(level) => {
                fader.set_level(level);
                state.mark_monitor_update();
            }
            Err(err) => {
                debug!(%channel, error = %err, "level poll failed");
                fader.clear_level();
            }
        }

        match tx.try_send(LevelReport::from_fader(fader)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("report backlog full; dropping report"),
            Err(TrySendError::Disconnected(_)) => break,
        }

        thread::sleep(MONITOR_INTERVAL);
    }

    info!(generation, "level monitor stopped");
}
