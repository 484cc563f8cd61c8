//! Outcome of one measurement cycle and its text line.

use std::time::Duration;

use crate::conditioner::{Measurement, combined_output, is_limit_exceeded};
use crate::config::ChannelMode;

/// What one cycle measured and what it drove.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub measurements: Vec<Measurement>,
    /// Duty written to the analog output.
    pub output: u8,
    /// Level written to the limit LED.
    pub limit: bool,
    /// Hold-high time of each window, in channel order.
    pub windows: Vec<Duration>,
    /// Console/log line.
    pub line: String,
}

impl CycleReport {
    /// Derive the driven output and limit flag from the channel readings.
    ///
    /// In two-channel mode the output follows `max(raw1, raw2)`.
    pub fn new(mode: ChannelMode, measurements: Vec<Measurement>, windows: Vec<Duration>) -> Self {
        let output = match measurements.as_slice() {
            [a, b, ..] => combined_output(a.raw_adc, b.raw_adc),
            [a] => a.analog_output,
            [] => 0,
        };
        let line = format_line(mode, &measurements);
        Self {
            limit: is_limit_exceeded(output),
            output,
            measurements,
            windows,
            line,
        }
    }
}

/// `Channel 1: n% - Channel 2: m%` in dual mode, `SPU KNOCK LEVEL: n%` in single.
pub fn format_line(mode: ChannelMode, measurements: &[Measurement]) -> String {
    match mode {
        ChannelMode::Single => {
            let pct = measurements.first().map_or(0, Measurement::display_percent);
            format!("SPU KNOCK LEVEL: {pct}%")
        }
        ChannelMode::Dual => measurements
            .iter()
            .map(|m| format!("Channel {}: {}%", m.channel_id, m.display_percent()))
            .collect::<Vec<_>>()
            .join(" - "),
    }
}
