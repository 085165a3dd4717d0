use faderlink_mixer::ChannelId;
use serde::Serialize;

use crate::cmd::{ConnectionArgs, NameArgs};
use crate::exit::{mixer_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat, Record};

#[derive(Serialize)]
struct NameOutput {
    channel: usize,
    group: &'static str,
    index: usize,
    name: String,
    written: bool,
}

pub fn run(args: NameArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let channel =
        ChannelId::new(args.channel).map_err(|err| mixer_error("invalid channel", err))?;
    let mixer = conn.connect()?;

    let (name, written) = match args.set {
        Some(name) => {
            mixer
                .set_name(args.channel, &name)
                .map_err(|err| mixer_error("name write failed", err))?;
            (name, true)
        }
        None => {
            let name = mixer
                .name(args.channel)
                .map_err(|err| mixer_error("name query failed", err))?;
            (name, false)
        }
    };

    let out = NameOutput {
        channel: channel.index(),
        group: channel.group().name(),
        index: channel.index_in_group(),
        name,
        written,
    };
    let record = Record {
        value: &out,
        fields: vec![
            ("channel", channel.to_string()),
            ("name", out.name.clone()),
        ],
        raw: out.name.clone(),
    };
    print_record(&record, format);
    Ok(SUCCESS)
}
