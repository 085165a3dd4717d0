use std::sync::Arc;
use std::time::{Duration, Instant};

use faderlink_mixer::{ChannelId, Mixer, MixerError};
use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::{parse_duration, ConnectionArgs, FadeArgs, FadeOutArgs};
use crate::exit::{mixer_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{format_level, print_record, OutputFormat, Record};

#[derive(Serialize)]
struct FadeOutput {
    channel: usize,
    group: &'static str,
    index: usize,
    target: f32,
    level: Option<f32>,
    duration_ms: u128,
    elapsed_ms: u128,
    completed: bool,
}

pub fn run(args: FadeArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    fade(args.channel, args.target, duration, conn, format)
}

pub fn run_out(args: FadeOutArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    fade(args.channel, 0.0, duration, conn, format)
}

fn fade(
    channel: usize,
    target: f32,
    duration: Duration,
    conn: &ConnectionArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let id = ChannelId::new(channel).map_err(|err| mixer_error("invalid channel", err))?;
    let mixer = Arc::new(conn.connect()?);
    install_cancel_handler(Arc::clone(&mixer), channel)?;

    let started = Instant::now();
    let handle = mixer
        .spawn_fade(channel, target, duration)
        .map_err(|err| mixer_error("fade failed", err))?;
    let result = handle
        .join()
        .map_err(|_| CliError::new(INTERNAL, "fade thread panicked"))?;
    let elapsed = started.elapsed();

    let code = fade_exit_code(result)?;
    if code == SUCCESS {
        info!(%id, target, ?elapsed, "fade complete");
    } else {
        warn!(%id, ?elapsed, "fade cancelled before reaching target");
    }

    let level = mixer
        .fader(channel)
        .map_err(|err| mixer_error("fade failed", err))?
        .level;
    let out = FadeOutput {
        channel: id.index(),
        group: id.group().name(),
        index: id.index_in_group(),
        target,
        level,
        duration_ms: duration.as_millis(),
        elapsed_ms: elapsed.as_millis(),
        completed: code == SUCCESS,
    };
    let record = Record {
        value: &out,
        fields: vec![
            ("channel", id.to_string()),
            ("target", format!("{target:.2}")),
            ("level", format_level(level)),
            ("elapsed", format!("{}ms", out.elapsed_ms)),
            ("completed", out.completed.to_string()),
        ],
        raw: format_level(level),
    };
    print_record(&record, format);
    Ok(code)
}

/// Exit code for a finished fade. A cancelled fade still prints where the
/// fader stopped, but exits non-zero.
fn fade_exit_code(result: faderlink_mixer::Result<()>) -> CliResult<i32> {
    match result {
        Ok(()) => Ok(SUCCESS),
        Err(MixerError::Interrupted) => Ok(FAILURE),
        Err(err) => Err(mixer_error("fade failed", err)),
    }
}

fn install_cancel_handler(mixer: Arc<Mixer>, channel: usize) -> CliResult<()> {
    ctrlc::set_handler(move || {
        let _ = mixer.cancel_fade(channel);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
