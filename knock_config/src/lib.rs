#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the knock monitor.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Only `[pins]` is mandatory; every other section falls back to the
//!   defaults of the stock knock shield (two channels, 7.27 kHz band-pass,
//!   3 ms window).
use serde::Deserialize;
use std::path::Path;

/// BCM pin numbers of the shield's digital lines.
#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    /// SPU chip select (active low)
    pub spu_cs: u8,
    /// SPU INT/HOLD line
    pub hold: u8,
    /// SPU TEST line; held high for normal operation when wired
    pub test: Option<u8>,
    pub status_led: u8,
    pub limit_led: u8,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpiCfg {
    pub bus: u8,
    /// Kernel slave-select used to open the bus. The SPU itself is framed by `pins.spu_cs`.
    pub slave_select: u8,
    pub clock_hz: u32,
    /// SPI mode 0..=3 (the SPU samples on the falling edge: mode 1)
    pub mode: u8,
    pub lsb_first: bool,
    /// Re-apply the SPI mode before every exchange
    pub reassert_mode: bool,
}

impl Default for SpiCfg {
    fn default() -> Self {
        Self {
            bus: 0,
            slave_select: 0,
            clock_hz: 1_000_000,
            mode: 1,
            lsb_first: false,
            reassert_mode: false,
        }
    }
}

/// MCP3008 converter sampling the SPU output.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdcCfg {
    pub bus: u8,
    pub slave_select: u8,
    pub clock_hz: u32,
    pub channel: u8,
}

impl Default for AdcCfg {
    fn default() -> Self {
        Self {
            bus: 0,
            slave_select: 1,
            clock_hz: 1_350_000,
            channel: 0,
        }
    }
}

/// Hardware PWM used as the knock-level analog output.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PwmCfg {
    pub channel: u8,
    pub frequency_hz: f64,
}

impl Default for PwmCfg {
    fn default() -> Self {
        Self {
            channel: 0,
            frequency_hz: 490.0,
        }
    }
}

/// SPU register codes. Defaults reproduce the shield's fixed table.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpuCfg {
    /// Number of knock sensor channels to measure (1 or 2)
    pub channels: u8,
    /// Prescaler code 0..=31 (2 = 6 MHz oscillator)
    pub prescaler_code: u8,
    pub sdo_active: bool,
    /// Band-pass center frequency index 0..=63 (42 = 7.27 kHz)
    pub bandpass_index: u8,
    /// Programmable gain index 0..=63 (34 = 0.381)
    pub gain_index: u8,
    /// Integrator time constant index 0..=31 (10 = 100 us)
    pub integrator_index: u8,
}

impl Default for SpuCfg {
    fn default() -> Self {
        Self {
            channels: 2,
            prescaler_code: 2,
            sdo_active: true,
            bandpass_index: 42,
            gain_index: 34,
            integrator_index: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingCfg {
    /// Integration window with HOLD high, in microseconds
    pub window_us: u64,
    /// How long the status LED stays lit after a measurement
    pub heartbeat_ms: u64,
    /// Pause after the status LED goes dark
    pub cycle_delay_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            window_us: 3000,
            heartbeat_ms: 200,
            cycle_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StorageCfg {
    /// Append-only knock log; logging is off when absent
    pub log_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub spi: SpiCfg,
    #[serde(default)]
    pub adc: AdcCfg,
    #[serde(default)]
    pub pwm: PwmCfg,
    #[serde(default)]
    pub spu: SpuCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let mut used: Vec<(&str, u8)> = vec![
            ("pins.spu_cs", self.pins.spu_cs),
            ("pins.hold", self.pins.hold),
            ("pins.status_led", self.pins.status_led),
            ("pins.limit_led", self.pins.limit_led),
        ];
        if let Some(t) = self.pins.test {
            used.push(("pins.test", t));
        }
        for (i, (name, pin)) in used.iter().enumerate() {
            if *pin > 27 {
                eyre::bail!("{name} must be a BCM pin in 0..=27, got {pin}");
            }
            if let Some((other, _)) = used[..i].iter().find(|(_, p)| p == pin) {
                eyre::bail!("{name} and {other} both use pin {pin}");
            }
        }

        // SPI
        if self.spi.bus > 2 {
            eyre::bail!("spi.bus must be in 0..=2");
        }
        if self.spi.slave_select > 2 {
            eyre::bail!("spi.slave_select must be in 0..=2");
        }
        if self.spi.clock_hz == 0 {
            eyre::bail!("spi.clock_hz must be > 0");
        }
        if self.spi.mode > 3 {
            eyre::bail!("spi.mode must be in 0..=3");
        }

        // ADC
        if self.adc.channel > 7 {
            eyre::bail!("adc.channel must be in 0..=7");
        }
        if self.adc.clock_hz == 0 {
            eyre::bail!("adc.clock_hz must be > 0");
        }
        if self.adc.bus > 2 || self.adc.slave_select > 2 {
            eyre::bail!("adc.bus and adc.slave_select must be in 0..=2");
        }
        if self.adc.bus == self.spi.bus && self.adc.slave_select == self.spi.slave_select {
            eyre::bail!("adc and spu cannot share the same spi bus and slave_select");
        }

        // PWM
        if self.pwm.channel > 1 {
            eyre::bail!("pwm.channel must be 0 or 1");
        }
        if !(self.pwm.frequency_hz.is_finite() && self.pwm.frequency_hz > 0.0) {
            eyre::bail!("pwm.frequency_hz must be > 0");
        }

        // SPU registers
        if !(1..=2).contains(&self.spu.channels) {
            eyre::bail!("spu.channels must be 1 or 2");
        }
        if self.spu.prescaler_code > 31 {
            eyre::bail!("spu.prescaler_code must be in 0..=31");
        }
        if self.spu.bandpass_index > 63 {
            eyre::bail!("spu.bandpass_index must be in 0..=63");
        }
        if self.spu.gain_index > 63 {
            eyre::bail!("spu.gain_index must be in 0..=63");
        }
        if self.spu.integrator_index > 31 {
            eyre::bail!("spu.integrator_index must be in 0..=31");
        }

        // Timing
        if self.timing.window_us == 0 {
            eyre::bail!("timing.window_us must be >= 1");
        }
        if self.timing.window_us > 100_000 {
            eyre::bail!("timing.window_us is unreasonably large (>100ms)");
        }
        if self.timing.heartbeat_ms + self.timing.cycle_delay_ms > 60_000 {
            eyre::bail!("timing.heartbeat_ms + timing.cycle_delay_ms is unreasonably large (>60s)");
        }

        // Storage
        if let Some(p) = &self.storage.log_path
            && p.trim().is_empty()
        {
            eyre::bail!("storage.log_path must not be empty when set");
        }

        // Logging
        if let Some(rot) = &self.logging.rotation
            && !matches!(rot.as_str(), "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pins]
spu_cs = 8
hold = 23
status_led = 17
limit_led = 27
"#;

    #[test]
    fn minimal_config_uses_shield_defaults() {
        let cfg = load_toml(MINIMAL).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.spu.channels, 2);
        assert_eq!(cfg.spu.bandpass_index, 42);
        assert_eq!(cfg.timing.window_us, 3000);
        assert_eq!(cfg.spi.mode, 1);
        assert!(cfg.storage.log_path.is_none());
        assert!(cfg.pins.test.is_none());
    }

    #[test]
    fn missing_pins_is_a_parse_error() {
        assert!(load_toml("[spu]\nchannels = 1\n").is_err());
    }
}
