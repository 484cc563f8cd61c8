//! rppal-backed peripherals for the knock shield on a Raspberry Pi.

use rppal::gpio::OutputPin;
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::spi::{BitOrder, Bus, Mode, SlaveSelect, Spi};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

pub use rppal::gpio::Gpio;

type TraitResult<T> = std::result::Result<T, knock_traits::HwError>;

pub fn spi_mode(mode: u8) -> Result<Mode> {
    match mode {
        0 => Ok(Mode::Mode0),
        1 => Ok(Mode::Mode1),
        2 => Ok(Mode::Mode2),
        3 => Ok(Mode::Mode3),
        other => Err(HwError::Spi(format!("invalid spi mode {other}"))),
    }
}

pub fn spi_bus(bus: u8) -> Result<Bus> {
    match bus {
        0 => Ok(Bus::Spi0),
        1 => Ok(Bus::Spi1),
        2 => Ok(Bus::Spi2),
        other => Err(HwError::Spi(format!("invalid spi bus {other}"))),
    }
}

pub fn slave_select(ss: u8) -> Result<SlaveSelect> {
    match ss {
        0 => Ok(SlaveSelect::Ss0),
        1 => Ok(SlaveSelect::Ss1),
        2 => Ok(SlaveSelect::Ss2),
        other => Err(HwError::Spi(format!("invalid slave select {other}"))),
    }
}

/// SPI bus carrying SPU command bytes.
///
/// The SPU chip select is a plain GPIO driven by the core, so the kernel's
/// own slave-select line for `ss` must be left unconnected on the shield.
pub struct SpuBus {
    spi: Spi,
    mode: Mode,
    reassert_mode: bool,
}

impl SpuBus {
    pub fn open(
        bus: u8,
        ss: u8,
        clock_hz: u32,
        mode: u8,
        lsb_first: bool,
        reassert_mode: bool,
    ) -> Result<Self> {
        let mode = spi_mode(mode)?;
        let spi = Spi::new(spi_bus(bus)?, slave_select(ss)?, clock_hz, mode)
            .map_err(|e| HwError::Spi(format!("open spu bus: {e}")))?;
        let order = if lsb_first {
            BitOrder::LsbFirst
        } else {
            BitOrder::MsbFirst
        };
        spi.set_bit_order(order)
            .map_err(|e| HwError::Spi(format!("bit order: {e}")))?;
        debug!(bus, ss, clock_hz, ?mode, lsb_first, "spu bus open");
        Ok(Self {
            spi,
            mode,
            reassert_mode,
        })
    }
}

impl knock_traits::SpiBus for SpuBus {
    fn exchange(&mut self, byte: u8) -> TraitResult<u8> {
        if self.reassert_mode {
            self.spi
                .set_mode(self.mode)
                .map_err(|e| HwError::Spi(format!("set mode: {e}")))?;
        }
        let mut rx = [0u8; 1];
        self.spi
            .transfer(&mut rx, &[byte])
            .map_err(|e| HwError::Spi(format!("transfer: {e}")))?;
        trace!(tx = byte, rx = rx[0], "spu exchange");
        Ok(rx[0])
    }
}

/// Open the GPIO peripheral shared by every `GpioLine`.
pub fn open_gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))
}

/// GPIO output line (chip select, hold, LEDs, test pin).
pub struct GpioLine {
    pin: OutputPin,
}

impl GpioLine {
    /// Claim `pin` as an output, starting at `initial_high`.
    pub fn open(gpio: &Gpio, pin: u8, initial_high: bool) -> Result<Self> {
        let pin = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open pin {pin}: {e}")))?;
        let pin = if initial_high {
            pin.into_output_high()
        } else {
            pin.into_output_low()
        };
        Ok(Self { pin })
    }
}

impl knock_traits::OutputLine for GpioLine {
    fn set_high(&mut self) -> TraitResult<()> {
        self.pin.set_high();
        Ok(())
    }
    fn set_low(&mut self) -> TraitResult<()> {
        self.pin.set_low();
        Ok(())
    }
}

/// Hardware PWM channel used as the knock-level analog output.
pub struct PwmOutput {
    pwm: Pwm,
}

impl PwmOutput {
    pub fn open(channel: u8, frequency_hz: f64) -> Result<Self> {
        let channel = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(HwError::Pwm(format!("invalid pwm channel {other}"))),
        };
        let pwm = Pwm::with_frequency(channel, frequency_hz, 0.0, Polarity::Normal, true)
            .map_err(|e| HwError::Pwm(format!("open pwm: {e}")))?;
        Ok(Self { pwm })
    }
}

impl knock_traits::AnalogOutput for PwmOutput {
    fn write_duty(&mut self, duty: u8) -> TraitResult<()> {
        let ratio = f64::from(duty) / 255.0;
        self.pwm
            .set_duty_cycle(ratio)
            .map_err(|e| HwError::Pwm(format!("duty {duty}: {e}")))?;
        Ok(())
    }
}
