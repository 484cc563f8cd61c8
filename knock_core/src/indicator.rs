//! Status (heartbeat) and limit LEDs.
//!
//! Both are plain digital outputs. The limit LED follows the current cycle
//! only, so it flickers when the signal sits on the threshold.

use knock_traits::OutputLine;

use crate::error::KnockError;
use crate::hw_error::from_boxed;

pub struct Indicators<S: OutputLine, L: OutputLine> {
    status: S,
    limit: L,
}

impl<S: OutputLine, L: OutputLine> Indicators<S, L> {
    pub fn new(status: S, limit: L) -> Self {
        Self { status, limit }
    }

    pub fn set_status(&mut self, on: bool) -> Result<(), KnockError> {
        self.status.set_level(on).map_err(from_boxed)
    }

    pub fn set_limit(&mut self, on: bool) -> Result<(), KnockError> {
        self.limit.set_level(on).map_err(from_boxed)
    }

    /// Both LEDs dark. Attempts both even if the first fails.
    pub fn all_off(&mut self) -> Result<(), KnockError> {
        let status = self.set_status(false);
        let limit = self.set_limit(false);
        status.and(limit)
    }
}
