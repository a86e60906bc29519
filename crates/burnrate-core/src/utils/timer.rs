// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Monotonic clocks and a start/stop/reset stopwatch built on top of them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic time.
///
/// `now` is measured from an arbitrary, clock-specific origin. Only the
/// difference between two readings of the same clock is meaningful.
pub trait Clock: Send + Sync {
    /// Returns the current reading of the clock.
    fn now(&self) -> Duration;
}

/// A [`Clock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is the moment of creation.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A [`Clock`] that only moves when told to.
///
/// Clones share the same reading, so a host (or a test) can hold one handle
/// and advance time for every stopwatch built on the others.
#[derive(Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &self.now())
            .finish()
    }
}

/// Measures elapsed time across any number of start/stop intervals.
#[derive(Clone)]
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    started_at: Option<Duration>,
    accumulated: Duration,
}

impl Stopwatch {
    /// Creates a new Stopwatch on the monotonic clock and starts it.
    /// ## Returns
    /// A running instance of the Stopwatch struct.
    #[inline]
    pub fn new() -> Self {
        let mut watch = Self::with_clock(Arc::new(MonotonicClock::new()));
        watch.start();
        watch
    }

    /// Creates a stopped, zeroed Stopwatch reading the given clock.
    /// ## Arguments
    /// * `clock` - The time source shared with whoever drives it.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            started_at: None,
            accumulated: Duration::ZERO,
        }
    }

    /// Starts (or resumes) measuring. Has no effect if already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now());
        }
    }

    /// Stops measuring, keeping the time measured so far.
    pub fn stop(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += self.clock.now().saturating_sub(started_at);
        }
    }

    /// Stops the stopwatch and clears the measured time.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    /// Clears the measured time and starts again from zero.
    pub fn restart(&mut self) {
        self.reset();
        self.start();
    }

    /// Returns `true` while the stopwatch is measuring.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Returns the total measured time, including the current interval if running.
    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(started_at) => {
                self.accumulated + self.clock.now().saturating_sub(started_at)
            }
            None => self.accumulated,
        }
    }

    /// Returns the measured time in seconds as f64.
    #[inline]
    pub fn elapsed_secs_f64(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

impl fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stopwatch")
            .field("running", &self.is_running())
            .field("elapsed", &self.elapsed())
            .finish()
    }
}
