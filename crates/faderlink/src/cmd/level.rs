use faderlink_mixer::ChannelId;
use serde::Serialize;

use crate::cmd::{ConnectionArgs, LevelArgs};
use crate::exit::{mixer_error, CliResult, SUCCESS};
use crate::output::{format_level, print_record, OutputFormat, Record};

#[derive(Serialize)]
struct LevelOutput {
    channel: usize,
    group: &'static str,
    index: usize,
    path: String,
    level: f32,
}

pub fn run(args: LevelArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let channel =
        ChannelId::new(args.channel).map_err(|err| mixer_error("invalid channel", err))?;
    let mixer = conn.connect()?;
    let level = mixer
        .level(args.channel)
        .map_err(|err| mixer_error("level query failed", err))?;

    let out = LevelOutput {
        channel: channel.index(),
        group: channel.group().name(),
        index: channel.index_in_group(),
        path: channel.fader_path(),
        level,
    };
    let record = Record {
        value: &out,
        fields: vec![
            ("channel", channel.to_string()),
            ("path", out.path.clone()),
            ("level", format_level(Some(level))),
        ],
        raw: format_level(Some(level)),
    };
    print_record(&record, format);
    Ok(SUCCESS)
}
