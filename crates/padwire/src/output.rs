use std::io::{self, IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use padwire_frame::StateObject;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One JSON envelope per state.
    Json,
    /// Flattened key/value table per state.
    Table,
    /// One human-readable line per state.
    Pretty,
    /// The state object itself, one per line.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct StateOutput<'a> {
    sequence: u64,
    transport: &'a str,
    received_at: String,
    state: &'a StateObject,
}

pub fn print_state(
    out: &mut impl Write,
    sequence: u64,
    transport: &str,
    state: &StateObject,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let envelope = StateOutput {
                sequence,
                transport,
                received_at: now_unix_millis(),
                state,
            };
            serde_json::to_writer(&mut *out, &envelope)?;
            writeln!(out)
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in flatten(state) {
                table.add_row(vec![field, value]);
            }
            writeln!(out, "state #{sequence}\n{table}")
        }
        OutputFormat::Pretty => writeln!(out, "Controller state #{sequence}: {state}"),
        OutputFormat::Raw => writeln!(out, "{state}"),
    }?;
    out.flush()
}

/// Flatten nested objects/arrays into `a.b[0]` style rows, in document order.
pub fn flatten(state: &StateObject) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    flatten_into(String::new(), state, &mut rows);
    rows
}

fn flatten_into(path: String, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                flatten_into(child_path, child, rows);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(format!("{path}[{index}]"), child, rows);
            }
        }
        Value::String(text) => rows.push((path, text.clone())),
        other => rows.push((path, other.to_string())),
    }
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
