//! The knock monitor control loop body (`KnockMonitor`).
//!
//! `start()` brings the shield to a known state and programs the SPU;
//! `cycle()` runs one iteration: heartbeat on, one window per channel,
//! analog output and limit LED, console/log line, heartbeat off, pause.

use std::sync::Arc;

use eyre::WrapErr;
use knock_traits::clock::Clock;
use knock_traits::{AnalogInput, AnalogOutput, LineSink, OutputLine, SpiBus};

use crate::builder::MonitorBuilder;
use crate::conditioner::Measurement;
use crate::config::{ChannelMode, TimingCfg};
use crate::error::Result;
use crate::hw_error::from_boxed;
use crate::indicator::Indicators;
use crate::logger::{KnockLog, LoggingState};
use crate::report::CycleReport;
use crate::spu::{RegisterWrite, SpuDriver};

pub(crate) type DynSpu =
    SpuDriver<Box<dyn SpiBus>, Box<dyn OutputLine>, Box<dyn OutputLine>, Box<dyn AnalogInput>>;

pub struct KnockMonitor {
    pub(crate) spu: DynSpu,
    pub(crate) test_pin: Box<dyn OutputLine>,
    pub(crate) indicators: Indicators<Box<dyn OutputLine>, Box<dyn OutputLine>>,
    pub(crate) output: Box<dyn AnalogOutput>,
    pub(crate) console: Box<dyn LineSink>,
    pub(crate) log: KnockLog,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) mode: ChannelMode,
    pub(crate) timing: TimingCfg,
}

impl core::fmt::Debug for KnockMonitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KnockMonitor")
            .field("mode", &self.mode)
            .field("timing", &self.timing)
            .field("configured", &self.spu.is_configured())
            .field("logging", &self.log.state())
            .finish()
    }
}

impl KnockMonitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::default()
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn timing(&self) -> &TimingCfg {
        &self.timing
    }

    pub fn logging_state(&self) -> LoggingState {
        self.log.state()
    }

    pub fn is_configured(&self) -> bool {
        self.spu.is_configured()
    }

    /// Put every line in its idle state and program the SPU registers.
    pub fn start(&mut self) -> Result<Vec<RegisterWrite>> {
        self.test_pin
            .set_high()
            .map_err(from_boxed)
            .wrap_err("raise spu test pin")?;
        self.spu.idle_lines().wrap_err("idle spu lines")?;
        self.indicators.all_off().wrap_err("clear leds")?;
        self.output
            .write_duty(0)
            .map_err(from_boxed)
            .wrap_err("zero analog output")?;

        let writes = self.spu.configure().wrap_err("configure spu")?;
        for w in &writes {
            self.say(&w.to_string());
        }
        tracing::info!(
            mode = ?self.mode,
            window_us = self.timing.window.as_micros() as u64,
            logging = self.log.state().enabled,
            "knock monitor started"
        );
        Ok(writes)
    }

    /// One full measurement cycle, including the heartbeat and pacing delays.
    ///
    /// On failure the status LED is switched off before the error returns.
    pub fn cycle(&mut self) -> Result<CycleReport> {
        let res = self.cycle_inner();
        if res.is_err()
            && let Err(e) = self.indicators.set_status(false)
        {
            tracing::warn!(error = %e, "status led stuck after failed cycle");
        }
        res
    }

    fn cycle_inner(&mut self) -> Result<CycleReport> {
        self.indicators
            .set_status(true)
            .wrap_err("status led on")?;

        let channels = self.mode.channels();
        let mut measurements = Vec::with_capacity(channels.len());
        let mut windows = Vec::with_capacity(channels.len());
        for ch in channels {
            let sample = self
                .spu
                .measure_channel(ch)
                .wrap_err_with(|| format!("measure channel {}", ch.channel_id))?;
            let m = Measurement::from_raw(ch.channel_id, sample.raw);
            tracing::debug!(
                channel = m.channel_id,
                raw = m.raw_adc,
                pct = m.percentage,
                output = m.analog_output,
                limit = m.limit_exceeded,
                held_us = sample.held_for.as_micros() as u64,
                "knock reading"
            );
            measurements.push(m);
            windows.push(sample.held_for);
        }

        let report = CycleReport::new(self.mode, measurements, windows);
        self.output
            .write_duty(report.output)
            .map_err(from_boxed)
            .wrap_err("write analog output")?;
        self.indicators
            .set_limit(report.limit)
            .wrap_err("limit led")?;
        tracing::info!(output = report.output, limit = report.limit, "{}", report.line);

        self.say(&report.line);
        if let Some(Err(e)) = self.log.append(&report.line) {
            tracing::error!(path = self.log.label(), error = %e, "knock log write failed");
            let msg = format!("Error writing to log {}: {e}", self.log.label());
            self.say(&msg);
        }

        self.clock.sleep(self.timing.heartbeat);
        self.indicators
            .set_status(false)
            .wrap_err("status led off")?;
        self.clock.sleep(self.timing.cycle_delay);
        Ok(report)
    }

    /// Wait out one cycle delay, used after a failed cycle.
    pub fn pause(&self) {
        self.clock.sleep(self.timing.cycle_delay);
    }

    /// Best-effort: LEDs off, analog output to zero.
    pub fn shutdown_outputs(&mut self) {
        if let Err(e) = self.indicators.all_off() {
            tracing::warn!(error = %e, "failed to switch leds off");
        }
        if let Err(e) = self.output.write_duty(0) {
            tracing::warn!(error = %e, "failed to zero analog output");
        }
    }

    fn say(&mut self, line: &str) {
        if let Err(e) = self.console.log_line(line) {
            tracing::warn!(error = %e, "console write failed");
        }
    }
}
