//! `From` implementations bridging `knock_config` types to `knock_core` types.

use std::time::Duration;

use crate::config::{ChannelMode, TimingCfg};
use crate::error::KnockError;
use crate::registers::SpuConfiguration;

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&knock_config::TimingCfg> for TimingCfg {
    fn from(c: &knock_config::TimingCfg) -> Self {
        Self {
            window: Duration::from_micros(c.window_us),
            heartbeat: Duration::from_millis(c.heartbeat_ms),
            cycle_delay: Duration::from_millis(c.cycle_delay_ms),
        }
    }
}

// ── ChannelMode ──────────────────────────────────────────────────────────────

impl From<&knock_config::SpuCfg> for ChannelMode {
    fn from(c: &knock_config::SpuCfg) -> Self {
        if c.channels == 1 {
            ChannelMode::Single
        } else {
            ChannelMode::Dual
        }
    }
}

// ── SpuConfiguration ─────────────────────────────────────────────────────────

impl TryFrom<&knock_config::SpuCfg> for SpuConfiguration {
    type Error = KnockError;
    fn try_from(c: &knock_config::SpuCfg) -> Result<Self, Self::Error> {
        SpuConfiguration::new(
            c.prescaler_code,
            c.sdo_active,
            c.bandpass_index,
            c.gain_index,
            c.integrator_index,
        )
    }
}
