//! Telemetry line format.
//!
//! The instrument streams one JSON object per line, e.g.
//!
//! ```text
//! {"block_temperature": 94.8, "target_block_temp": 95, "temp_reached": false}
//! ```
//!
//! Records are sparse: any key may be absent from any line. Numeric
//! channels arrive as JSON numbers or numeric strings (older firmware
//! quotes them). Unrecognized keys are retained for display only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric channels the control core understands
pub const RECOGNIZED_CHANNELS: [&str; 4] = [
    "block_temperature",
    "target_block_temp",
    "cap_temperature",
    "target_cap_temp",
];

const TEMP_REACHED_KEY: &str = "temp_reached";

/// One decoded telemetry line
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Recognized numeric channels present in this line
    pub readings: BTreeMap<String, f64>,
    /// Target-reached flag, when the line carried one as a boolean
    pub temp_reached: Option<bool>,
    /// Unrecognized keys, stringified for display
    pub extra: BTreeMap<String, String>,
}

impl TelemetryRecord {
    /// Parse one line as telemetry.
    ///
    /// Returns `None` when the line is not a JSON object; the caller
    /// treats such lines as plain text.
    pub fn parse(line: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(line.trim()).ok()?;
        let object = value.as_object()?;

        let mut record = TelemetryRecord::default();
        for (key, value) in object {
            if RECOGNIZED_CHANNELS.contains(&key.as_str()) {
                if let Some(number) = as_number(value) {
                    record.readings.insert(key.clone(), number);
                    continue;
                }
            }
            if key == TEMP_REACHED_KEY {
                if let Some(flag) = value.as_bool() {
                    record.temp_reached = Some(flag);
                    continue;
                }
            }
            record.extra.insert(key.clone(), display_value(value));
        }
        Some(record)
    }

    pub fn reading(&self, channel: &str) -> Option<f64> {
        self.readings.get(channel).copied()
    }
}

/// Accept JSON numbers and numeric strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Last-seen value per recognized channel.
///
/// Records are sparse, so displays and charts read from here rather
/// than from individual records: a channel keeps its previous value
/// across lines that omit it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelReadings {
    pub block_temperature: Option<f64>,
    pub target_block_temp: Option<f64>,
    pub cap_temperature: Option<f64>,
    pub target_cap_temp: Option<f64>,
}

impl ChannelReadings {
    /// Fold one record into the retained view
    pub fn apply(&mut self, record: &TelemetryRecord) {
        for (key, &value) in &record.readings {
            match key.as_str() {
                "block_temperature" => self.block_temperature = Some(value),
                "target_block_temp" => self.target_block_temp = Some(value),
                "cap_temperature" => self.cap_temperature = Some(value),
                "target_cap_temp" => self.target_cap_temp = Some(value),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let record = TelemetryRecord::parse(
            r#"{"block_temperature": 94.8, "target_block_temp": 95, "temp_reached": false}"#,
        )
        .unwrap();
        assert_eq!(record.reading("block_temperature"), Some(94.8));
        assert_eq!(record.reading("target_block_temp"), Some(95.0));
        assert_eq!(record.temp_reached, Some(false));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let record =
            TelemetryRecord::parse(r#"{"cap_temperature": "109.5", "target_cap_temp": "110"}"#)
                .unwrap();
        assert_eq!(record.reading("cap_temperature"), Some(109.5));
        assert_eq!(record.reading("target_cap_temp"), Some(110.0));
    }

    #[test]
    fn test_non_numeric_channel_value_goes_to_extra() {
        let record = TelemetryRecord::parse(r#"{"block_temperature": "warming"}"#).unwrap();
        assert_eq!(record.reading("block_temperature"), None);
        assert_eq!(record.extra.get("block_temperature").unwrap(), "warming");
    }

    #[test]
    fn test_non_bool_temp_reached_ignored() {
        let record = TelemetryRecord::parse(r#"{"temp_reached": "yes"}"#).unwrap();
        assert_eq!(record.temp_reached, None);
        assert!(record.extra.contains_key("temp_reached"));
    }

    #[test]
    fn test_unrecognized_keys_kept_for_display() {
        let record =
            TelemetryRecord::parse(r#"{"fw_version": "1.4.2", "uptime_s": 321}"#).unwrap();
        assert_eq!(record.extra.get("fw_version").unwrap(), "1.4.2");
        assert_eq!(record.extra.get("uptime_s").unwrap(), "321");
    }

    #[test]
    fn test_non_object_lines_rejected() {
        assert!(TelemetryRecord::parse("ack").is_none());
        assert!(TelemetryRecord::parse("[1, 2, 3]").is_none());
        assert!(TelemetryRecord::parse("\"quoted\"").is_none());
        assert!(TelemetryRecord::parse("{\"broken\":").is_none());
    }

    #[test]
    fn test_readings_retain_last_seen() {
        let mut readings = ChannelReadings::default();

        let first = TelemetryRecord::parse(
            r#"{"block_temperature": 60.1, "cap_temperature": 108.0}"#,
        )
        .unwrap();
        readings.apply(&first);

        // Second record omits cap_temperature; it must survive
        let second = TelemetryRecord::parse(r#"{"block_temperature": 61.5}"#).unwrap();
        readings.apply(&second);

        assert_eq!(readings.block_temperature, Some(61.5));
        assert_eq!(readings.cap_temperature, Some(108.0));
        assert_eq!(readings.target_block_temp, None);
    }
}
