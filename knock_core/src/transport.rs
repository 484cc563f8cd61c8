//! Chip-select framed single-byte SPI exchange.

use knock_traits::{OutputLine, SpiBus};

use crate::error::KnockError;
use crate::hw_error::from_boxed;

/// Holds a chip-select line low while alive; raises it on drop.
pub struct SelectGuard<'a, P: OutputLine> {
    line: &'a mut P,
}

impl<'a, P: OutputLine> SelectGuard<'a, P> {
    pub fn assert(line: &'a mut P) -> Result<Self, KnockError> {
        line.set_low().map_err(from_boxed)?;
        Ok(Self { line })
    }
}

impl<P: OutputLine> Drop for SelectGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.line.set_high() {
            tracing::warn!(error = %e, "failed to release chip select");
        }
    }
}

pub struct SpiTransport<B: SpiBus, P: OutputLine> {
    bus: B,
    select: P,
}

impl<B: SpiBus, P: OutputLine> SpiTransport<B, P> {
    pub fn new(bus: B, select: P) -> Self {
        Self { bus, select }
    }

    /// Drive the select line to its idle (high) level.
    pub fn release(&mut self) -> Result<(), KnockError> {
        self.select.set_high().map_err(from_boxed)
    }

    /// Send one byte and return the byte clocked back, with chip select held
    /// low for exactly the duration of the exchange.
    pub fn transfer(&mut self, byte: u8) -> Result<u8, KnockError> {
        let _cs = SelectGuard::assert(&mut self.select)?;
        self.bus.exchange(byte).map_err(from_boxed)
    }
}
