use super::{Formatter, TickEvent};

/// One JSON object per tick, machine-readable.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, event: &TickEvent) -> String {
        serde_json::to_string(event).unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
    }
}
