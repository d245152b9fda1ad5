use crate::types::StatusEvent;

/// Emit a countdown observation as a single JSON line to stdout.
pub fn report_status(event: &StatusEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}
