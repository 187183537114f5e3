mod json;
mod text;

use chrono::Utc;
use serde::Serialize;

pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

use crate::relay::RouteState;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// One observability record per poll tick, transition or not.
///
/// `command_error` is set when a retune/select failed during this tick, in
/// which case `route` is the intended route and hardware may disagree until
/// the next successful transition.
#[derive(Debug, Clone, Serialize)]
pub struct TickEvent {
    pub rx1_power: f64,
    pub rx2_power: f64,
    pub route: RouteState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_error: Option<String>,
    pub timestamp: String,
}

pub trait Formatter: Send {
    fn format(&self, event: &TickEvent) -> String;

    /// Whether lines may be overwritten in place (`\r` status line).
    fn in_place(&self) -> bool {
        false
    }
}

pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
