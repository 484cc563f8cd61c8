//! MCP3008 10-bit ADC framing, plus the rppal-backed reader.
//!
//! The SPU holds its integrator output on a pin that the host cannot sample
//! directly, so an MCP3008 sits between them. One conversion is a 3-byte
//! exchange: start bit, single-ended channel select, then 10 result bits.

use crate::error::{HwError, Result};

/// Highest code a 10-bit conversion can return.
pub const MAX_CODE: u16 = 1023;

/// Build the request frame for a single-ended conversion on `channel`.
pub fn request_frame(channel: u8) -> Result<[u8; 3]> {
    if channel > 7 {
        return Err(HwError::AdcChannel(channel));
    }
    Ok([0x01, (0x08 | channel) << 4, 0x00])
}

/// Extract the 10-bit result from a response frame.
#[inline]
pub fn decode_frame(rx: [u8; 3]) -> u16 {
    (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2])
}

#[cfg(feature = "hardware")]
pub use reader::Mcp3008;

#[cfg(feature = "hardware")]
mod reader {
    use super::{decode_frame, request_frame};
    use crate::error::{HwError, Result};
    use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
    use tracing::trace;

    pub struct Mcp3008 {
        spi: Spi,
        channel: u8,
    }

    impl Mcp3008 {
        pub fn new(bus: Bus, ss: SlaveSelect, clock_hz: u32, channel: u8) -> Result<Self> {
            // validate once so sample() cannot fail on framing
            request_frame(channel)?;
            let spi = Spi::new(bus, ss, clock_hz, Mode::Mode0)
                .map_err(|e| HwError::Spi(format!("open mcp3008: {e}")))?;
            Ok(Self { spi, channel })
        }

        pub fn read(&mut self) -> Result<u16> {
            let tx = request_frame(self.channel)?;
            let mut rx = [0u8; 3];
            self.spi
                .transfer(&mut rx, &tx)
                .map_err(|e| HwError::Spi(format!("mcp3008 transfer: {e}")))?;
            let code = decode_frame(rx);
            trace!(channel = self.channel, code, "mcp3008 conversion");
            Ok(code)
        }
    }

    impl knock_traits::AnalogInput for Mcp3008 {
        fn sample(&mut self) -> std::result::Result<u16, knock_traits::HwError> {
            Ok(self.read()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_selects_single_ended_channel() {
        assert_eq!(request_frame(0).unwrap(), [0x01, 0x80, 0x00]);
        assert_eq!(request_frame(7).unwrap(), [0x01, 0xF0, 0x00]);
    }

    #[test]
    fn decode_masks_leading_garbage() {
        assert_eq!(decode_frame([0xFF, 0xFF, 0xFF]), MAX_CODE);
        assert_eq!(decode_frame([0x00, 0xFC, 0x00]), 0);
        assert_eq!(decode_frame([0x00, 0x02, 0x05]), 517);
    }
}
