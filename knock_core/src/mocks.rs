//! Stand-in peripherals for knock_core

/// An output line that accepts every level and drives nothing; used when an
/// optional pin (e.g. the SPU test pin) is not wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLine;

impl knock_traits::OutputLine for NoopLine {
    fn set_high(&mut self) -> Result<(), knock_traits::HwError> {
        Ok(())
    }
    fn set_low(&mut self) -> Result<(), knock_traits::HwError> {
        Ok(())
    }
}
