//! Runtime configuration types for the knock monitor.
//!
//! These are what `KnockMonitor` consumes. They are separate from the
//! TOML-deserialized config in `knock_config`; see `conversions`.

use std::time::Duration;

use crate::registers::{CHANNEL_1, CHANNEL_2, ChannelConfig};

/// Which SPU inputs are measured each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Channel 1 only; console shows `SPU KNOCK LEVEL: n%`.
    Single,
    /// Channels 1 and 2; output follows the louder one.
    #[default]
    Dual,
}

impl ChannelMode {
    pub fn channels(self) -> &'static [ChannelConfig] {
        const SINGLE: [ChannelConfig; 1] = [CHANNEL_1];
        const DUAL: [ChannelConfig; 2] = [CHANNEL_1, CHANNEL_2];
        match self {
            ChannelMode::Single => &SINGLE,
            ChannelMode::Dual => &DUAL,
        }
    }
}

/// Cycle timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingCfg {
    /// Hold-high integration time per channel.
    pub window: Duration,
    /// Status LED on-time after the readings are out.
    pub heartbeat: Duration,
    /// Pause after the status LED goes dark.
    pub cycle_delay: Duration,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            window: Duration::from_micros(3000),
            heartbeat: Duration::from_millis(200),
            cycle_delay: Duration::from_millis(500),
        }
    }
}
