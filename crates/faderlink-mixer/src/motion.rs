//! Timed fades and fader motion detection.
//!
//! A fade is planned up front as a list of level messages, one per fader
//! resolution unit between the start and stop levels, and then played out on
//! the caller's thread with an even delay between sends. Playback can be
//! cancelled from any thread by clearing the fader's ownership.

use std::thread;
use std::time::Duration;

use faderlink_osc::Message;
use faderlink_transport::OscLink;
use tracing::{debug, warn};

use crate::address::ChannelId;
use crate::config::MAX_RESOLUTION;
use crate::error::{MixerError, Result};
use crate::fader::Fader;

/// Gap between the two level samples taken by [`is_in_motion`].
pub const MOTION_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// A fade aborts once this many sends in a row have failed.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// One planned send: the level and the message that sets it.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeStep {
    pub level: f32,
    pub message: Message,
}

/// A precomputed fade.
#[derive(Debug, Clone, PartialEq)]
pub struct FadePlan {
    channel: ChannelId,
    steps: Vec<FadeStep>,
    step_delay: Duration,
}

impl FadePlan {
    /// Plan a fade of `channel` from `start` to `stop` over `duration`.
    ///
    /// Levels are quantized to `resolution` units, at most
    /// [`MAX_RESOLUTION`]. The plan covers every unit from the start
    /// (inclusive) to the stop (exclusive); equal endpoints give an empty
    /// plan.
    pub fn new(
        channel: ChannelId,
        start: f32,
        stop: f32,
        resolution: u32,
        duration: Duration,
    ) -> Result<Self> {
        if !(1..=MAX_RESOLUTION).contains(&resolution) {
            return Err(MixerError::InvalidResolution(resolution.to_string()));
        }
        let start_units = to_units(start, resolution)?;
        let stop_units = to_units(stop, resolution)?;
        let distance = start_units.abs_diff(stop_units);

        if distance == 0 {
            return Ok(Self {
                channel,
                steps: Vec::new(),
                step_delay: Duration::ZERO,
            });
        }

        let path = channel.fader_path();
        let resolution = resolution as f32;
        let units: Box<dyn Iterator<Item = i64>> = if start_units < stop_units {
            Box::new(start_units..stop_units)
        } else {
            Box::new(((stop_units + 1)..=start_units).rev())
        };
        let steps = units
            .map(|unit| {
                let level = unit as f32 / resolution;
                FadeStep {
                    level,
                    message: Message::new(&path).with_float(level),
                }
            })
            .collect();

        let step_delay = u32::try_from(distance)
            .map(|d| duration / d)
            .unwrap_or(Duration::ZERO);

        Ok(Self {
            channel,
            steps,
            step_delay,
        })
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn steps(&self) -> &[FadeStep] {
        &self.steps
    }

    /// Pause after each send.
    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }

    /// Number of resolution units covered.
    pub fn distance(&self) -> usize {
        self.steps.len()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn to_units(level: f32, resolution: u32) -> Result<i64> {
    if !(0.0..=1.0).contains(&level) {
        return Err(MixerError::InvalidLevel(level));
    }
    Ok((f64::from(level) * f64::from(resolution)).round() as i64)
}

/// Releases the fader when the fade ends, however it ends.
struct FadeGuard<'a> {
    fader: &'a Fader,
    token: u64,
}

impl Drop for FadeGuard<'_> {
    fn drop(&mut self) {
        self.fader.release(self.token);
    }
}

/// Play `plan` out on `link`, blocking until done.
///
/// Fails with [`MixerError::InMotion`] if another fade owns the fader,
/// [`MixerError::Interrupted`] if ownership is cleared mid-fade, and
/// [`MixerError::TooManyFailures`] after [`MAX_CONSECUTIVE_FAILURES`] failed
/// sends in a row. A failed send is skipped, not retried.
pub fn run_fade(link: &dyn OscLink, fader: &Fader, plan: &FadePlan) -> Result<()> {
    if plan.is_empty() {
        debug!(channel = %plan.channel, "fade has no steps");
        return Ok(());
    }

    let token = fader.try_activate().ok_or(MixerError::InMotion)?;
    let _guard = FadeGuard { fader, token };

    debug!(
        channel = %plan.channel,
        steps = plan.len(),
        step_delay = ?plan.step_delay,
        "fade started"
    );

    let mut failures = 0u32;
    for (i, step) in plan.steps.iter().enumerate() {
        if !fader.is_owned_by(token) {
            debug!(channel = %plan.channel, step = i, "fade interrupted");
            return Err(MixerError::Interrupted);
        }

        match link.send(&step.message) {
            Ok(()) => {
                failures = 0;
                fader.set_level(step.level);
            }
            Err(err) => {
                failures += 1;
                warn!(channel = %plan.channel, step = i, failures, error = %err, "fade step failed");
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    return Err(MixerError::TooManyFailures(failures));
                }
            }
        }

        thread::sleep(plan.step_delay);
    }

    debug!(channel = %plan.channel, "fade finished");
    Ok(())
}

/// Ask the console for a fader's current level.
pub fn query_level(link: &dyn OscLink, channel: ChannelId) -> Result<f32> {
    let path = channel.fader_path();
    let reply = link.inquire(&Message::new(&path))?;
    reply
        .first_float()
        .ok_or_else(|| MixerError::UnexpectedReply {
            address: path,
            detail: format!("expected a float argument, got tags ',{}'", reply.type_tags()),
        })
}

/// Whether the fader appears to be moving.
///
/// Takes two level samples [`MOTION_SAMPLE_INTERVAL`] apart. Any failed
/// sample counts as moving.
pub fn is_in_motion(link: &dyn OscLink, channel: ChannelId) -> bool {
    let first = query_level(link, channel);
    thread::sleep(MOTION_SAMPLE_INTERVAL);
    let second = query_level(link, channel);

    match (first, second) {
        (Ok(a), Ok(b)) => a != b,
        (Err(err), _) | (_, Err(err)) => {
            debug!(%channel, error = %err, "level sample failed; assuming motion");
            true
        }
    }
}
