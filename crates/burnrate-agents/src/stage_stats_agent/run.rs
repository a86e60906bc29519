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

//! Bookkeeping shared between the agent and the run in flight.

use super::publication::StatsPublisher;
use crate::error::RefreshError;
use burnrate_core::utils::panic::panic_message;
use burnrate_core::{Clock, Environment, FuelFlowSimulation, StageStats, Stopwatch};
use burnrate_data::{Dispose, Lease};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Completed,
    Failed,
}

/// Timing state. Runs and the waits between them are measured separately so
/// that deactivating mid-run does not lose the run's duration.
#[derive(Debug)]
pub(crate) struct RunTiming {
    /// The wait since the last run. Stopped while inactive or running.
    pub(crate) wait_watch: Stopwatch,
    /// The run in flight.
    pub(crate) run_watch: Stopwatch,
    pub(crate) next_delay: Duration,
    pub(crate) last_elapsed: Duration,
    active: bool,
}

#[derive(Debug)]
pub(crate) struct RunTracker {
    running: AtomicBool,
    timing: Mutex<RunTiming>,
    backoff_multiplier: u32,
    failure_backoff: Duration,
    completed_runs: AtomicU64,
    failed_runs: AtomicU64,
}

impl RunTracker {
    pub(crate) fn new(
        clock: Arc<dyn Clock>,
        backoff_multiplier: u32,
        failure_backoff: Duration,
    ) -> Self {
        Self {
            running: AtomicBool::new(false),
            timing: Mutex::new(RunTiming {
                wait_watch: Stopwatch::with_clock(Arc::clone(&clock)),
                run_watch: Stopwatch::with_clock(clock),
                next_delay: Duration::ZERO,
                last_elapsed: Duration::ZERO,
                active: false,
            }),
            backoff_multiplier,
            failure_backoff,
            completed_runs: AtomicU64::new(0),
            failed_runs: AtomicU64::new(0),
        }
    }

    pub(crate) fn timing(&self) -> MutexGuard<'_, RunTiming> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn completed_runs(&self) -> u64 {
        self.completed_runs.load(Ordering::Relaxed)
    }

    pub(crate) fn failed_runs(&self) -> u64 {
        self.failed_runs.load(Ordering::Relaxed)
    }

    /// Whether the wait since the last run has reached the current delay.
    pub(crate) fn is_due(&self) -> bool {
        let timing = self.timing();
        timing.wait_watch.elapsed() >= timing.next_delay
    }

    pub(crate) fn activate(&self) {
        let mut timing = self.timing();
        timing.active = true;
        timing.next_delay = Duration::ZERO;
        if !self.is_running() {
            timing.wait_watch.start();
        }
    }

    /// Stops and clears the wait. A run in flight keeps its own timing.
    pub(crate) fn deactivate(&self) {
        let mut timing = self.timing();
        timing.active = false;
        timing.wait_watch.reset();
    }

    /// Marks a run as in flight and starts timing it.
    pub(crate) fn begin(&self) {
        self.running.store(true, Ordering::Release);
        let mut timing = self.timing();
        timing.wait_watch.reset();
        timing.run_watch.restart();
    }

    /// Records the end of the run in flight and, while active, starts the
    /// next wait. `running` is cleared last. Returns the measured run time.
    pub(crate) fn finish(&self, outcome: RunOutcome) -> Duration {
        let elapsed = {
            let mut timing = self.timing();
            timing.run_watch.stop();
            let elapsed = timing.run_watch.elapsed();

            match outcome {
                RunOutcome::Completed => {
                    timing.last_elapsed = elapsed;
                    timing.next_delay = elapsed.saturating_mul(self.backoff_multiplier);
                    self.completed_runs.fetch_add(1, Ordering::Relaxed);
                }
                RunOutcome::Failed => {
                    timing.next_delay = timing.next_delay.max(self.failure_backoff);
                    self.failed_runs.fetch_add(1, Ordering::Relaxed);
                }
            }

            if timing.active {
                timing.wait_watch.restart();
            }
            elapsed
        };
        self.running.store(false, Ordering::Release);
        elapsed
    }
}

/// Ends the run in flight exactly once, even if the job is dropped unrun.
pub(crate) struct RunGuard {
    tracker: Arc<RunTracker>,
    finished: bool,
}

impl RunGuard {
    pub(crate) fn new(tracker: Arc<RunTracker>) -> Self {
        Self {
            tracker,
            finished: false,
        }
    }

    pub(crate) fn finish(mut self, outcome: RunOutcome) -> Duration {
        self.finished = true;
        self.tracker.finish(outcome)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("StageStatsAgent: refresh was dropped before it ran");
            self.tracker.finish(RunOutcome::Failed);
        }
    }
}

/// Atmosphere and vacuum results of one refresh.
type StagePair = (Vec<StageStats>, Vec<StageStats>);

/// The two simulations of one refresh. They are released together.
pub(crate) struct SimulationSet<S: FuelFlowSimulation + Dispose> {
    atmo: Lease<S>,
    vac: Lease<S>,
}

impl<S: FuelFlowSimulation + Dispose> SimulationSet<S> {
    pub(crate) fn new(atmo: Lease<S>, vac: Lease<S>) -> Self {
        Self { atmo, vac }
    }

    /// Runs both environments and returns `(atmosphere, vacuum)`.
    pub(crate) fn simulate(&mut self, parallel: bool) -> Result<StagePair, RefreshError> {
        let atmo: &mut S = &mut self.atmo;
        let vac: &mut S = &mut self.vac;

        if !parallel {
            let atmo_stats = simulate_contained(atmo, Environment::Atmosphere)?;
            let vac_stats = simulate_contained(vac, Environment::Vacuum)?;
            return Ok((atmo_stats, vac_stats));
        }

        thread::scope(|scope| -> Result<StagePair, RefreshError> {
            let vac_run = scope.spawn(move || simulate_contained(vac, Environment::Vacuum));
            let atmo_stats = simulate_contained(atmo, Environment::Atmosphere);
            let vac_stats = vac_run.join().unwrap_or_else(|payload| {
                Err(RefreshError::Panicked {
                    environment: Environment::Vacuum,
                    message: panic_message(payload.as_ref()).to_string(),
                })
            });
            Ok((atmo_stats?, vac_stats?))
        })
    }

    /// Clears both simulations and returns them to their pool.
    pub(crate) fn release(self) {
        // Drop does the work.
    }
}

impl<S: FuelFlowSimulation + Dispose> Drop for SimulationSet<S> {
    fn drop(&mut self) {
        self.atmo.clear();
        self.vac.clear();
        // The leases are released right after this, when the fields drop.
    }
}

fn simulate_contained<S: FuelFlowSimulation>(
    simulation: &mut S,
    environment: Environment,
) -> Result<Vec<StageStats>, RefreshError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        simulation.simulate_all_stages(environment.params())
    }));
    match result {
        Ok(Ok(stats)) => Ok(stats),
        Ok(Err(err)) => Err(RefreshError::Simulation {
            environment,
            message: format!("{err:#}"),
        }),
        Err(payload) => Err(RefreshError::Panicked {
            environment,
            message: panic_message(payload.as_ref()).to_string(),
        }),
    }
}

/// The body of a refresh job: simulate, publish, release, then report timing.
pub(crate) fn execute_run<S: FuelFlowSimulation + Dispose>(
    mut simulations: SimulationSet<S>,
    guard: RunGuard,
    publisher: StatsPublisher,
    parallel: bool,
) {
    let outcome = match simulations.simulate(parallel) {
        Ok((atmo_stats, vac_stats)) => {
            let stages = atmo_stats.len();
            let generation = publisher.publish(atmo_stats, vac_stats);
            log::debug!("StageStatsAgent: published generation {generation} ({stages} stages)");
            RunOutcome::Completed
        }
        Err(err) => {
            log::warn!("StageStatsAgent: {err}; keeping the last published stats");
            RunOutcome::Failed
        }
    };

    simulations.release();
    let elapsed = guard.finish(outcome);
    log::debug!("StageStatsAgent: refresh took {elapsed:?} ({outcome:?})");
}
