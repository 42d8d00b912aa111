use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cycler_protocol::{ChannelReadings, TelemetryRecord};

/// Folds telemetry lines into the retained channel view and the
/// shared target-reached signal.
///
/// The signal is last-writer-wins: every line carrying a boolean
/// `temp_reached` overwrites it, and nothing else ever resets it.
pub struct TelemetryDecoder {
    readings: ChannelReadings,
    target_reached: Arc<AtomicBool>,
}

impl TelemetryDecoder {
    pub fn new(target_reached: Arc<AtomicBool>) -> Self {
        Self {
            readings: ChannelReadings::default(),
            target_reached,
        }
    }

    /// Decode one line.
    ///
    /// Returns the record plus a copy of the retained readings, or
    /// `None` when the line is not telemetry.
    pub fn ingest(&mut self, line: &str) -> Option<(TelemetryRecord, ChannelReadings)> {
        let record = TelemetryRecord::parse(line)?;
        self.readings.apply(&record);
        if let Some(reached) = record.temp_reached {
            self.target_reached.store(reached, Ordering::Relaxed);
        }
        Some((record, self.readings))
    }

    pub fn readings(&self) -> ChannelReadings {
        self.readings
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn decoder() -> (TelemetryDecoder, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (TelemetryDecoder::new(flag.clone()), flag)
    }

    #[test]
    fn test_ingest_sets_and_clears_target_flag() {
        let (mut decoder, flag) = decoder();

        decoder.ingest(r#"{"temp_reached": true}"#).unwrap();
        assert!(flag.load(Ordering::Relaxed));

        decoder.ingest(r#"{"temp_reached": false}"#).unwrap();
        assert!(!flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_lines_without_flag_leave_it_alone() {
        let (mut decoder, flag) = decoder();
        flag.store(true, Ordering::Relaxed);

        decoder.ingest(r#"{"block_temperature": 72.0}"#).unwrap();
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_readings_accumulate_across_lines() {
        let (mut decoder, _flag) = decoder();

        decoder
            .ingest(r#"{"block_temperature": 94.9, "target_block_temp": 95}"#)
            .unwrap();
        let (_, readings) = decoder.ingest(r#"{"cap_temperature": 109.2}"#).unwrap();

        assert_eq!(readings.block_temperature, Some(94.9));
        assert_eq!(readings.target_block_temp, Some(95.0));
        assert_eq!(readings.cap_temperature, Some(109.2));
    }

    #[test]
    fn test_non_telemetry_returns_none() {
        let (mut decoder, flag) = decoder();
        assert!(decoder.ingest("ack").is_none());
        assert!(decoder.ingest("syn").is_none());
        assert!(!flag.load(Ordering::Relaxed));
    }
}
