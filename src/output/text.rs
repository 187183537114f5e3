use super::{Formatter, TickEvent};

/// Live status line, overwritten in place every tick.
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, event: &TickEvent) -> String {
        let mut line = format!(
            "RX1 Power: {:.10}, RX2 Power: {:.10}, {}",
            event.rx1_power,
            event.rx2_power,
            event.route.describe()
        );
        if let Some(ref err) = event.command_error {
            line.push_str(&format!(" [command failed: {}]", err));
        }
        line
    }

    fn in_place(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RouteState;

    #[test]
    fn test_status_line_mentions_route() {
        let event = TickEvent {
            rx1_power: 0.1,
            rx2_power: 0.0,
            route: RouteState::Rx1,
            command_error: None,
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let line = TextFormatter.format(&event);
        assert!(line.contains("RX1 Power: 0.1000000000"));
        assert!(line.contains("TX1 frequency"));
    }

    #[test]
    fn test_status_line_surfaces_command_error() {
        let event = TickEvent {
            rx1_power: 0.1,
            rx2_power: 0.0,
            route: RouteState::Rx1,
            command_error: Some("device busy".to_string()),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let line = TextFormatter.format(&event);
        assert!(line.contains("command failed: device busy"));
    }
}
