use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction for every delay in the control loop.
///
/// - now(): returns a monotonic Instant
/// - sleep(): blocking delay that may yield the CPU (cycle pacing, LED visibility)
/// - busy_wait(): blocking delay that must not yield (measurement windows)
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Spin until `d` has elapsed on this clock.
    ///
    /// The default polls `now()`, so implementations only need to override it
    /// when time does not advance on its own (simulated clocks).
    fn busy_wait(&self, d: Duration) {
        let start = self.now();
        while self.now().saturating_duration_since(start) < d {
            std::hint::spin_loop();
        }
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }

    /// Microseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn us_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_micros()).unwrap_or(u64::MAX)
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic test clock whose time only moves when told to.
    ///
    /// now() = origin + offset
    /// sleep(d) and busy_wait(d) advance internal time by d without blocking.
    /// Clones share the same timeline.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
        slept: Arc<Mutex<Vec<Duration>>>,
        spun: Arc<Mutex<Vec<Duration>>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
                slept: Arc::new(Mutex::new(Vec::new())),
                spun: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Time elapsed since the clock was created.
        pub fn elapsed(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }

        /// Every duration passed to `sleep`, in call order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().map(|g| g.clone()).unwrap_or_default()
        }

        /// Every duration passed to `busy_wait`, in call order.
        pub fn busy_waits(&self) -> Vec<Duration> {
            self.spun.lock().map(|g| g.clone()).unwrap_or_default()
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            if let Ok(mut v) = self.slept.lock() {
                v.push(d);
            }
            self.advance(d);
        }

        fn busy_wait(&self, d: Duration) {
            if let Ok(mut v) = self.spun.lock() {
                v.push(d);
            }
            self.advance(d);
        }
    }
}
