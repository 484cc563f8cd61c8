use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::Result as CoreResult;
use crate::monitor::KnockMonitor;
use crate::report::CycleReport;
use crate::util::duration_us;

/// How long the loop runs.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    /// Stop after this many cycles; `None` runs until shutdown.
    pub cycles: Option<u64>,
    /// Checked between cycles, never inside a measurement window.
    pub shutdown: Option<Arc<AtomicBool>>,
}

/// Hold-high timing of every window seen so far (online, constant memory).
#[derive(Debug, Clone, Default)]
pub struct WindowStats {
    pub count: u64,
    pub min_us: u64,
    pub max_us: u64,
    mean_us: f64,
    m2: f64,
    /// Windows held more than 10% past the configured duration.
    pub overruns: u64,
    overrun_limit_us: u64,
}

impl WindowStats {
    pub fn new(window: Duration) -> Self {
        let w = duration_us(window);
        Self {
            overrun_limit_us: w.saturating_add(w / 10),
            ..Self::default()
        }
    }

    pub fn record(&mut self, held: Duration) {
        let us = duration_us(held);
        if self.count == 0 {
            self.min_us = us;
            self.max_us = us;
        } else {
            self.min_us = self.min_us.min(us);
            self.max_us = self.max_us.max(us);
        }
        self.count += 1;
        // Welford update
        let x = us as f64;
        let delta = x - self.mean_us;
        self.mean_us += delta / self.count as f64;
        self.m2 += delta * (x - self.mean_us);
        if us > self.overrun_limit_us {
            self.overruns += 1;
        }
    }

    pub fn mean_us(&self) -> f64 {
        self.mean_us
    }

    /// Sample standard deviation; 0 with fewer than two windows.
    pub fn stdev_us(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / (self.count - 1) as f64).sqrt()
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub windows: WindowStats,
    pub last_report: Option<CycleReport>,
}

#[inline]
fn should_stop(params: &RunParams, attempted: u64) -> bool {
    if let Some(flag) = &params.shutdown
        && flag.load(Ordering::Relaxed)
    {
        return true;
    }
    matches!(params.cycles, Some(n) if attempted >= n)
}

/// Start the monitor and loop cycles until `params` says stop.
///
/// A failed cycle is reported and skipped; only a failed start is returned as
/// an error, since no reading is meaningful before the SPU is programmed.
pub fn run(monitor: &mut KnockMonitor, params: RunParams) -> CoreResult<RunSummary> {
    monitor.start()?;
    let mut summary = RunSummary {
        windows: WindowStats::new(monitor.timing().window),
        ..RunSummary::default()
    };

    let mut attempted = 0u64;
    while !should_stop(&params, attempted) {
        attempted += 1;
        match monitor.cycle() {
            Ok(report) => {
                for held in &report.windows {
                    summary.windows.record(*held);
                }
                summary.cycles += 1;
                summary.last_report = Some(report);
            }
            Err(e) => {
                summary.failed_cycles += 1;
                tracing::error!(error = %format!("{e:#}"), cycle = attempted, "cycle failed");
                monitor.pause();
            }
        }
    }

    monitor.shutdown_outputs();
    tracing::info!(
        cycles = summary.cycles,
        failed = summary.failed_cycles,
        "knock monitor stopped"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_stats_track_spread_and_overruns() {
        let mut s = WindowStats::new(Duration::from_micros(3000));
        s.record(Duration::from_micros(3000));
        s.record(Duration::from_micros(3100));
        s.record(Duration::from_micros(3400));
        assert_eq!(s.count, 3);
        assert_eq!(s.min_us, 3000);
        assert_eq!(s.max_us, 3400);
        assert!((s.mean_us() - 3166.666).abs() < 0.01);
        assert!(s.stdev_us() > 200.0 && s.stdev_us() < 210.0);
        assert_eq!(s.overruns, 1);
    }

    #[test]
    fn stop_conditions() {
        let flag = Arc::new(AtomicBool::new(false));
        let p = RunParams {
            cycles: Some(2),
            shutdown: Some(flag.clone()),
        };
        assert!(!should_stop(&p, 1));
        assert!(should_stop(&p, 2));
        flag.store(true, Ordering::Relaxed);
        assert!(should_stop(&p, 0));
        assert!(!should_stop(&RunParams::default(), u64::MAX));
    }
}
