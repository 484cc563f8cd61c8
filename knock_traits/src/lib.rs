//! Hardware seams for the knock monitor.
//!
//! Everything the control loop touches goes through one of these traits so the
//! core can run against rppal peripherals, the simulator, or test doubles.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type crossing the trait boundary.
pub type HwError = Box<dyn std::error::Error + Send + Sync>;

/// Full-duplex SPI bus that exchanges one byte per call.
///
/// Chip-select framing is not the bus's job; see `OutputLine`.
pub trait SpiBus {
    fn exchange(&mut self, byte: u8) -> Result<u8, HwError>;
}

/// A single digital output (chip select, hold, LEDs, test pin).
pub trait OutputLine {
    fn set_high(&mut self) -> Result<(), HwError>;
    fn set_low(&mut self) -> Result<(), HwError>;

    fn set_level(&mut self, high: bool) -> Result<(), HwError> {
        if high { self.set_high() } else { self.set_low() }
    }
}

/// Analog input returning a raw converter code.
pub trait AnalogInput {
    fn sample(&mut self) -> Result<u16, HwError>;
}

/// Analog (PWM) output taking an 8-bit duty value.
pub trait AnalogOutput {
    fn write_duty(&mut self, duty: u8) -> Result<(), HwError>;
}

/// Destination for human-readable text lines (console, log file).
pub trait LineSink {
    fn log_line(&mut self, text: &str) -> std::io::Result<()>;
}

impl<T: SpiBus + ?Sized> SpiBus for Box<T> {
    fn exchange(&mut self, byte: u8) -> Result<u8, HwError> {
        (**self).exchange(byte)
    }
}

impl<T: OutputLine + ?Sized> OutputLine for Box<T> {
    fn set_high(&mut self) -> Result<(), HwError> {
        (**self).set_high()
    }
    fn set_low(&mut self) -> Result<(), HwError> {
        (**self).set_low()
    }
}

impl<T: AnalogInput + ?Sized> AnalogInput for Box<T> {
    fn sample(&mut self) -> Result<u16, HwError> {
        (**self).sample()
    }
}

impl<T: AnalogOutput + ?Sized> AnalogOutput for Box<T> {
    fn write_duty(&mut self, duty: u8) -> Result<(), HwError> {
        (**self).write_duty(duty)
    }
}

impl<T: LineSink + ?Sized> LineSink for Box<T> {
    fn log_line(&mut self, text: &str) -> std::io::Result<()> {
        (**self).log_line(text)
    }
}
