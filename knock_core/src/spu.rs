//! SPU driver: register configuration and the timed measurement window.
//!
//! One window per channel, strictly sequential because both channels share
//! the hold line and the converter:
//!
//! ```text
//! IDLE -> SELECT_CHANNEL -> INTEGRATE (hold high, busy-wait) -> FREEZE (hold low) -> SAMPLE -> IDLE
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use knock_traits::clock::Clock;
use knock_traits::{AnalogInput, OutputLine, SpiBus};
use tracing::{debug, trace};

use crate::error::KnockError;
use crate::hw_error::from_boxed;
use crate::registers::{ChannelConfig, SpuCommand, SpuConfiguration};
use crate::transport::SpiTransport;

/// A configuration byte as written, with whatever the SPU shifted back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    pub command: SpuCommand,
    pub echo: u8,
}

impl fmt::Display for RegisterWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SPU {} <- 0b{:08b} (echo 0b{:08b})",
            self.command.name(),
            self.command.to_byte(),
            self.echo
        )
    }
}

/// Raw converter code of one window, plus how long hold was actually high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSample {
    pub raw: u16,
    pub held_for: Duration,
}

pub struct SpuDriver<B: SpiBus, P: OutputLine, H: OutputLine, A: AnalogInput> {
    transport: SpiTransport<B, P>,
    hold: H,
    adc: A,
    clock: Arc<dyn Clock + Send + Sync>,
    registers: SpuConfiguration,
    window: Duration,
    configured: bool,
}

impl<B: SpiBus, P: OutputLine, H: OutputLine, A: AnalogInput> SpuDriver<B, P, H, A> {
    pub fn new(
        transport: SpiTransport<B, P>,
        hold: H,
        adc: A,
        clock: Arc<dyn Clock + Send + Sync>,
        registers: SpuConfiguration,
        window: Duration,
    ) -> Self {
        Self {
            transport,
            hold,
            adc,
            clock,
            registers,
            window,
            configured: false,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Put chip select and hold at their idle levels.
    pub fn idle_lines(&mut self) -> Result<(), KnockError> {
        self.transport.release()?;
        self.hold.set_low().map_err(from_boxed)
    }

    /// Write prescaler, band-pass, gain and integrator time, in that order.
    ///
    /// Echo bytes are returned for diagnostics only; nothing is verified.
    pub fn configure(&mut self) -> Result<Vec<RegisterWrite>, KnockError> {
        self.configured = false;
        let mut writes = Vec::with_capacity(4);
        for command in self.registers.sequence() {
            let echo = self.transport.transfer(command.to_byte())?;
            debug!(
                register = command.name(),
                byte = command.to_byte(),
                echo,
                "spu register write"
            );
            writes.push(RegisterWrite { command, echo });
        }
        self.configured = true;
        Ok(writes)
    }

    /// Route `channel` to the integrator. Sent before every window.
    pub fn select_channel(&mut self, channel: &ChannelConfig) -> Result<u8, KnockError> {
        let echo = self.transport.transfer(channel.select_command)?;
        trace!(channel = channel.channel_id, echo, "spu channel select");
        Ok(echo)
    }

    /// Integrate for the configured window, freeze, then sample.
    ///
    /// The window is a busy-wait on the injected clock: the SPU integrates
    /// for as long as hold is high, so any scheduler slack lands directly in
    /// the reading.
    pub fn measure_window(&mut self) -> Result<WindowSample, KnockError> {
        if !self.configured {
            return Err(KnockError::NotConfigured);
        }
        self.hold.set_high().map_err(from_boxed)?;
        let opened = self.clock.now();
        self.clock.busy_wait(self.window);
        let freeze = self.hold.set_low().map_err(from_boxed);
        let held_for = self.clock.now().saturating_duration_since(opened);
        freeze?;
        // output is held until the next window, so sampling can take its time
        let raw = self.adc.sample().map_err(from_boxed)?;
        trace!(raw, held_us = held_for.as_micros() as u64, "spu window");
        Ok(WindowSample { raw, held_for })
    }

    pub fn measure_channel(&mut self, channel: &ChannelConfig) -> Result<WindowSample, KnockError> {
        self.select_channel(channel)?;
        self.measure_window()
    }
}
