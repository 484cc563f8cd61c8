//! Maps `Box<dyn Error>` from trait boundaries to typed `KnockError`.
//!
//! The traits in `knock_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `knock_hardware::HwError`.

use crate::error::KnockError;

/// Map a trait-boundary error to a typed `KnockError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> KnockError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<knock_hardware::error::HwError>() {
            return match hw {
                knock_hardware::error::HwError::Io(io) => KnockError::Io(io.to_string()),
                other => KnockError::HardwareFault(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return KnockError::Io(io.to_string());
    }
    KnockError::Hardware(e.to_string())
}

/// Convenience for `map_err` at trait call sites.
#[inline]
pub(crate) fn from_boxed(e: knock_traits::HwError) -> KnockError {
    map_hw_error(&*e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_their_kind() {
        let e: knock_traits::HwError = Box::new(std::io::Error::other("disk gone"));
        assert!(matches!(from_boxed(e), KnockError::Io(m) if m.contains("disk gone")));
    }

    #[test]
    fn unknown_errors_become_hardware() {
        let e: knock_traits::HwError = "bus stuck".into();
        assert!(matches!(from_boxed(e), KnockError::Hardware(m) if m == "bus stuck"));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors_are_faults() {
        let e: knock_traits::HwError = Box::new(knock_hardware::error::HwError::Spi("nak".into()));
        assert!(matches!(from_boxed(e), KnockError::HardwareFault(m) if m.contains("nak")));
    }
}
