//! Common time helpers for knock_core.

use std::time::Duration;

use crate::config::TimingCfg;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Duration in whole microseconds, saturating at `u64::MAX`.
#[inline]
pub fn duration_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Nominal length of one cycle: every window plus the LED and pacing delays.
#[inline]
pub fn cycle_period(timing: &TimingCfg, channels: usize) -> Duration {
    let windows = timing.window.saturating_mul(u32::try_from(channels).unwrap_or(u32::MAX));
    windows
        .saturating_add(timing.heartbeat)
        .saturating_add(timing.cycle_delay)
}

/// Nominal sampling rate implied by `cycle_period`, in Hz.
#[inline]
pub fn cycle_rate_hz(timing: &TimingCfg, channels: usize) -> f64 {
    let us = duration_us(cycle_period(timing, channels)).max(1);
    MICROS_PER_SEC as f64 / us as f64
}
