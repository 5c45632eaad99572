use std::io::{IsTerminal, Stdout};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use sensorlink_client::{Reply, TelemetryHandler, TextPresenter};
use sensorlink_frame::{is_sensor_error, TelemetryEvent};
use sensorlink_transport::PortInfo;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct ReplyOutput<'a> {
    port: &'a str,
    command: &'a str,
    received_at: u64,
    reply: &'a Reply,
}

#[derive(Serialize)]
struct EventOutput<'a> {
    port: &'a str,
    kind: Option<&'a str>,
    received_at: u64,
    event: &'a TelemetryEvent,
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    description: Option<&'a str>,
}

pub fn print_reply(port: &str, command: &str, reply: &Reply, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                port,
                command,
                received_at: now_unix_seconds(),
                reply,
            };
            println!("{}", to_json(&out));
        }
        OutputFormat::Table => println!("{}", fields_table(reply.frame().fields())),
        OutputFormat::Pretty => println!("{}", pretty_fields(reply.frame().fields())),
        OutputFormat::Raw => println!("{reply}"),
    }
}

/// Prints telemetry events as they arrive during `monitor`.
pub struct EventPrinter {
    port: String,
    format: OutputFormat,
    presenter: TextPresenter<Stdout>,
}

impl EventPrinter {
    pub fn new(port: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            port: port.into(),
            format,
            presenter: TextPresenter::stdout(),
        }
    }

    pub fn print(&mut self, event: TelemetryEvent) {
        match self.format {
            OutputFormat::Json => {
                let out = EventOutput {
                    port: &self.port,
                    kind: event.kind(),
                    received_at: now_unix_seconds(),
                    event: &event,
                };
                println!("{}", to_json(&out));
            }
            OutputFormat::Table => match serde_json::to_value(&event) {
                Ok(Value::Object(fields)) => println!("{}", fields_table(&fields)),
                _ => println!("{}", to_json(&event)),
            },
            OutputFormat::Pretty => self.presenter.handle_telemetry(event),
            OutputFormat::Raw => println!("{}", to_json(&event)),
        }
    }
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    let rows: Vec<PortOutput<'_>> = ports
        .iter()
        .map(|port| PortOutput {
            name: &port.name,
            kind: port.kind,
            description: port.description.as_deref(),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", to_json(&rows)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "KIND", "DESCRIPTION"]);
            for row in &rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.kind.to_string(),
                    row.description.unwrap_or("").to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                match row.description {
                    Some(description) => println!("{} ({}, {description})", row.name, row.kind),
                    None => println!("{} ({})", row.name, row.kind),
                }
            }
        }
        OutputFormat::Raw => {
            for row in &rows {
                println!("{}", row.name);
            }
        }
    }
}

fn fields_table(fields: &Map<String, Value>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["FIELD", "VALUE"]);
    for (key, value) in fields {
        table.add_row(vec![key.clone(), value_text(key, value)]);
    }
    table
}

fn pretty_fields(fields: &Map<String, Value>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={}", value_text(key, value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display text for one field. Sentinel readings show as `sensor error`.
fn value_text(key: &str, value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(n)
            if matches!(key, "temperature" | "humidity")
                && n.as_f64().is_some_and(is_sensor_error) =>
        {
            "sensor error".to_string()
        }
        other => other.to_string(),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
