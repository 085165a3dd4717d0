use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use faderlink_mixer::LevelReport;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One command result: a serializable record plus its human renderings.
pub struct Record<'a, T: Serialize> {
    pub value: &'a T,
    pub fields: Vec<(&'static str, String)>,
    pub raw: String,
}

pub fn print_record<T: Serialize>(record: &Record<'_, T>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record.value).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(
                    record
                        .fields
                        .iter()
                        .map(|(name, _)| name.to_uppercase())
                        .collect::<Vec<_>>(),
                )
                .add_row(
                    record
                        .fields
                        .iter()
                        .map(|(_, value)| value.clone())
                        .collect::<Vec<_>>(),
                );
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = record
                .fields
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
        OutputFormat::Raw => {
            println!("{}", record.raw);
        }
    }
}

pub fn print_report(report: &LevelReport, format: OutputFormat) {
    let record = Record {
        value: report,
        fields: vec![
            ("channel", report.channel.to_string()),
            ("group", report.group.to_string()),
            ("index", report.index.to_string()),
            ("level", format_level(report.level)),
        ],
        raw: report.text.clone(),
    };
    print_record(&record, format);
}

pub fn format_level(level: Option<f32>) -> String {
    match level {
        Some(level) => format!("{level:.2}"),
        None => "??".to_string(),
    }
}
