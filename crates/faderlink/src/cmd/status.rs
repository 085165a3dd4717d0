use faderlink_mixer::STATUS_ADDRESS;
use serde::Serialize;

use crate::cmd::{ConnectionArgs, StatusArgs};
use crate::exit::{mixer_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat, Record};

#[derive(Serialize)]
struct StatusOutput {
    remote: String,
    address: &'static str,
    status: Vec<String>,
}

pub fn run(_args: StatusArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mixer = conn.connect()?;
    let status = mixer
        .status()
        .map_err(|err| mixer_error("status query failed", err))?;

    let out = StatusOutput {
        remote: conn.remote.clone(),
        address: STATUS_ADDRESS,
        status,
    };
    let record = Record {
        value: &out,
        fields: vec![
            ("remote", out.remote.clone()),
            ("status", out.status.join(" ")),
        ],
        raw: out.status.join("\n"),
    };
    print_record(&record, format);
    Ok(SUCCESS)
}
