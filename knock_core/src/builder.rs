//! Builder for `KnockMonitor`.
//!
//! Every peripheral is boxed so the CLI can mix rppal, simulated and test
//! backends freely. `build()` reports the first missing piece as a
//! `BuildError`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use knock_traits::clock::{Clock, MonotonicClock};
use knock_traits::{AnalogInput, AnalogOutput, LineSink, OutputLine, SpiBus};

use crate::config::{ChannelMode, TimingCfg};
use crate::error::{BuildError, Result};
use crate::indicator::Indicators;
use crate::logger::{KnockLog, StdoutSink};
use crate::mocks::NoopLine;
use crate::monitor::KnockMonitor;
use crate::registers::SpuConfiguration;
use crate::spu::SpuDriver;
use crate::transport::SpiTransport;

const MAX_WINDOW: Duration = Duration::from_millis(100);

enum LogChoice {
    Off,
    Path(PathBuf),
    Sink(Box<dyn LineSink>, String),
}

pub struct MonitorBuilder {
    bus: Option<Box<dyn SpiBus>>,
    select: Option<Box<dyn OutputLine>>,
    hold: Option<Box<dyn OutputLine>>,
    test_pin: Option<Box<dyn OutputLine>>,
    adc: Option<Box<dyn AnalogInput>>,
    status_led: Option<Box<dyn OutputLine>>,
    limit_led: Option<Box<dyn OutputLine>>,
    output: Option<Box<dyn AnalogOutput>>,
    console: Option<Box<dyn LineSink>>,
    log: LogChoice,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    registers: SpuConfiguration,
    timing: TimingCfg,
    mode: ChannelMode,
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self {
            bus: None,
            select: None,
            hold: None,
            test_pin: None,
            adc: None,
            status_led: None,
            limit_led: None,
            output: None,
            console: None,
            log: LogChoice::Off,
            clock: None,
            registers: SpuConfiguration::default(),
            timing: TimingCfg::default(),
            mode: ChannelMode::default(),
        }
    }
}

impl MonitorBuilder {
    pub fn with_bus(mut self, bus: impl SpiBus + 'static) -> Self {
        self.bus = Some(Box::new(bus));
        self
    }

    pub fn with_select(mut self, line: impl OutputLine + 'static) -> Self {
        self.select = Some(Box::new(line));
        self
    }

    pub fn with_hold(mut self, line: impl OutputLine + 'static) -> Self {
        self.hold = Some(Box::new(line));
        self
    }

    /// Optional; an unwired test pin is replaced by a no-op line.
    pub fn with_test_pin(mut self, line: impl OutputLine + 'static) -> Self {
        self.test_pin = Some(Box::new(line));
        self
    }

    pub fn with_adc(mut self, adc: impl AnalogInput + 'static) -> Self {
        self.adc = Some(Box::new(adc));
        self
    }

    pub fn with_status_led(mut self, line: impl OutputLine + 'static) -> Self {
        self.status_led = Some(Box::new(line));
        self
    }

    pub fn with_limit_led(mut self, line: impl OutputLine + 'static) -> Self {
        self.limit_led = Some(Box::new(line));
        self
    }

    pub fn with_analog_output(mut self, out: impl AnalogOutput + 'static) -> Self {
        self.output = Some(Box::new(out));
        self
    }

    /// Diagnostic console; defaults to stdout.
    pub fn with_console(mut self, console: impl LineSink + 'static) -> Self {
        self.console = Some(Box::new(console));
        self
    }

    /// Check `path` at build time and log there if it can be opened.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log = LogChoice::Path(path.into());
        self
    }

    /// Log to an explicit sink, skipping the storage check.
    pub fn with_logger(mut self, sink: impl LineSink + 'static, label: impl Into<String>) -> Self {
        self.log = LogChoice::Sink(Box::new(sink), label.into());
        self
    }

    /// Provide a custom clock implementation; defaults to MonotonicClock when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_registers(mut self, registers: SpuConfiguration) -> Self {
        self.registers = registers;
        self
    }

    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_mode(mut self, mode: ChannelMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Result<KnockMonitor> {
        let bus = self.bus.ok_or(BuildError::MissingBus)?;
        let select = self.select.ok_or(BuildError::MissingSelect)?;
        let hold = self.hold.ok_or(BuildError::MissingHold)?;
        let adc = self.adc.ok_or(BuildError::MissingAdc)?;
        let status = self.status_led.ok_or(BuildError::MissingStatusLed)?;
        let limit = self.limit_led.ok_or(BuildError::MissingLimitLed)?;
        let output = self.output.ok_or(BuildError::MissingAnalogOutput)?;

        if self.timing.window.is_zero() {
            return Err(BuildError::InvalidConfig("window must be > 0").into());
        }
        if self.timing.window > MAX_WINDOW {
            return Err(BuildError::InvalidConfig("window must be <= 100ms").into());
        }

        let clock: Arc<dyn Clock + Send + Sync> =
            self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let mut console: Box<dyn LineSink> =
            self.console.unwrap_or_else(|| Box::new(StdoutSink));
        let log = match self.log {
            LogChoice::Off => KnockLog::disabled(),
            LogChoice::Path(p) => KnockLog::open_checked(&p, &mut *console),
            LogChoice::Sink(sink, label) => KnockLog::enabled(sink, label),
        };
        let test_pin: Box<dyn OutputLine> = self.test_pin.unwrap_or_else(|| Box::new(NoopLine));

        let spu = SpuDriver::new(
            SpiTransport::new(bus, select),
            hold,
            adc,
            clock.clone(),
            self.registers,
            self.timing.window,
        );

        Ok(KnockMonitor {
            spu,
            test_pin,
            indicators: Indicators::new(status, limit),
            output,
            console,
            log,
            clock,
            mode: self.mode,
            timing: self.timing,
        })
    }
}
