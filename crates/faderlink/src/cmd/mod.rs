use std::time::Duration;

use clap::{Args, Subcommand};
use faderlink_mixer::{Mixer, MixerConfig, DEFAULT_LOCAL_PORT, DEFAULT_MONITOR_PORT};

use crate::exit::{mixer_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod fade;
pub mod level;
pub mod monitor;
pub mod name;
pub mod status;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query console status.
    Status(StatusArgs),
    /// Read or write a channel name.
    Name(NameArgs),
    /// Read a fader's current level.
    Level(LevelArgs),
    /// Fade a fader to a target level.
    Fade(FadeArgs),
    /// Fade a fader down to zero.
    FadeOut(FadeOutArgs),
    /// Stream level reports for one channel.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Status(args) => status::run(args, conn, format),
        Command::Name(args) => name::run(args, conn, format),
        Command::Level(args) => level::run(args, conn, format),
        Command::Fade(args) => fade::run(args, conn, format),
        Command::FadeOut(args) => fade::run_out(args, conn, format),
        Command::Monitor(args) => monitor::run(args, conn, format),
        Command::Version(args) => version::run(args),
    }
}

/// Console connection settings shared by every network command.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Console address (host:port).
    #[arg(
        long,
        env = "FADERLINK_REMOTE",
        default_value = "127.0.0.1:10023",
        global = true
    )]
    pub remote: String,
    /// Local UDP port for the control connection.
    #[arg(long, env = "FADERLINK_LOCAL_PORT", default_value_t = DEFAULT_LOCAL_PORT, global = true)]
    pub local_port: u16,
    /// Local UDP port for the level monitor connection.
    #[arg(long, env = "FADERLINK_MONITOR_PORT", default_value_t = DEFAULT_MONITOR_PORT, global = true)]
    pub monitor_port: u16,
    /// Fade steps across the full fader travel.
    #[arg(long, env = "FADERLINK_RESOLUTION", default_value = "1024", global = true)]
    pub resolution: String,
    /// Reply and write deadline (e.g. 4s, 500ms).
    #[arg(long, default_value = "4s", global = true)]
    pub timeout: String,
}

impl ConnectionArgs {
    pub fn config(&self) -> CliResult<MixerConfig> {
        let timeout = parse_duration(&self.timeout)?;
        let mut config = MixerConfig::default().with_remote(&self.remote);
        config.local_port = self.local_port;
        config.monitor_port = self.monitor_port;
        config.dial.read_timeout = timeout;
        config.dial.write_timeout = timeout;
        Ok(config)
    }

    /// Build a mixer without dialing the control connection.
    pub fn mixer(&self) -> CliResult<Mixer> {
        let mixer = Mixer::new(self.config()?).map_err(|err| mixer_error("invalid config", err))?;
        mixer
            .set_fader_resolution(&self.resolution)
            .map_err(|err| mixer_error("invalid resolution", err))?;
        Ok(mixer)
    }

    /// Build a mixer and dial the control connection.
    pub fn connect(&self) -> CliResult<Mixer> {
        let mixer = self.mixer()?;
        mixer
            .connect()
            .map_err(|err| mixer_error("connect failed", err))?;
        Ok(mixer)
    }
}

#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

#[derive(Args, Debug)]
pub struct NameArgs {
    /// Channel id (0-79).
    pub channel: usize,
    /// Write this name instead of reading.
    #[arg(long, value_name = "NAME")]
    pub set: Option<String>,
}

#[derive(Args, Debug)]
pub struct LevelArgs {
    /// Channel id (0-79).
    pub channel: usize,
}

#[derive(Args, Debug)]
pub struct FadeArgs {
    /// Channel id (0-79).
    pub channel: usize,
    /// Target level (0.0-1.0).
    pub target: f32,
    /// Fade duration (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub duration: String,
}

#[derive(Args, Debug)]
pub struct FadeOutArgs {
    /// Channel id (0-79).
    pub channel: usize,
    /// Fade duration (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub duration: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Channel id (0-79).
    pub channel: usize,
    /// Exit after N reports.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
