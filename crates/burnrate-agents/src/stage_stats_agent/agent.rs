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

use super::config::StageStatsConfig;
use super::publication::{StageStatsSnapshot, StatsPublisher, StatsReader};
use super::run::{self, RunGuard, RunTracker, SimulationSet};
use super::{RefreshState, RefreshStatus, RequesterId};
use crate::error::RefreshError;
use burnrate_core::{
    Clock, FuelFlowSimulation, HostScene, MonotonicClock, VesselContext, WorkerExecutor,
};
use burnrate_data::{Dispose, Pool};
use std::collections::HashSet;
use std::sync::Arc;

/// Keeps a vessel's per-stage statistics fresh without blocking the host.
///
/// Driven from a single thread: the host calls [`tick`](Self::tick) every
/// step, requesters call [`request_update`](Self::request_update). Results
/// are read through [`snapshot`](Self::snapshot) or a [`StatsReader`] from
/// any thread.
pub struct StageStatsAgent<S: FuelFlowSimulation + Dispose> {
    config: StageStatsConfig,
    pool: Pool<S>,
    executor: Arc<dyn WorkerExecutor>,
    vessel: Arc<dyn VesselContext>,
    tracker: Arc<RunTracker>,
    publisher: StatsPublisher,
    update_requested: bool,
    users: HashSet<RequesterId>,
    active: bool,
}

impl<S: FuelFlowSimulation + Dispose> StageStatsAgent<S> {
    /// Creates an inactive agent timed by the monotonic clock.
    ///
    /// `factory` builds one simulation; the pool preallocates
    /// `config.preallocated_simulations` of them right away.
    pub fn new<F>(
        config: StageStatsConfig,
        factory: F,
        executor: Arc<dyn WorkerExecutor>,
        vessel: Arc<dyn VesselContext>,
    ) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self::with_clock(
            config,
            factory,
            executor,
            vessel,
            Arc::new(MonotonicClock::new()),
        )
    }

    /// Creates an inactive agent timed by the given clock.
    pub fn with_clock<F>(
        config: StageStatsConfig,
        factory: F,
        executor: Arc<dyn WorkerExecutor>,
        vessel: Arc<dyn VesselContext>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        let pool = Pool::new(factory, config.preallocated_simulations);
        let tracker = Arc::new(RunTracker::new(
            clock,
            config.backoff_multiplier,
            config.failure_backoff(),
        ));

        Self {
            config,
            pool,
            executor,
            vessel,
            tracker,
            publisher: StatsPublisher::default(),
            update_requested: false,
            users: HashSet::new(),
            active: false,
        }
    }

    /// Starts the agent: forgets earlier requests, zeroes the delay and starts the clock.
    pub fn activate(&mut self) {
        self.update_requested = false;
        self.users.clear();
        self.tracker.activate();
        self.active = true;
        log::info!(
            "StageStatsAgent: activated (executor '{}')",
            self.executor.name()
        );
    }

    /// Stops ticking and resets the wait. A run in flight still completes and
    /// its duration still sets the next delay.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.tracker.deactivate();
        log::info!("StageStatsAgent: deactivated");
    }

    /// Returns `true` between [`activate`](Self::activate) and [`deactivate`](Self::deactivate).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Asks for fresh statistics on behalf of `requester`.
    ///
    /// Requests made before the next dispatch collapse into one refresh. In
    /// the editor the agent also tries to dispatch right away.
    pub fn request_update(&mut self, requester: impl Into<RequesterId>) {
        self.users.insert(requester.into());
        self.update_requested = true;

        if self.config.eager_in_editor && self.vessel.scene() == HostScene::Editor {
            self.tick();
        }
    }

    /// Dispatches a refresh if one is requested and due. Returns `true` if it did.
    ///
    /// Does nothing while a refresh is in flight, while inactive, while the
    /// vessel is not the host's subject, or before the delay has passed. If
    /// the delay has passed and nobody asked for a refresh, the requesters
    /// are forgotten.
    pub fn tick(&mut self) -> bool {
        if !self.active || self.tracker.is_running() || !self.vessel.is_subject() {
            return false;
        }
        if !self.tracker.is_due() {
            return false;
        }

        if self.update_requested {
            self.update_requested = false;
            self.dispatch()
        } else {
            if !self.users.is_empty() {
                log::trace!(
                    "StageStatsAgent: no request from {} requesters, going quiet",
                    self.users.len()
                );
                self.users.clear();
            }
            false
        }
    }

    fn dispatch(&mut self) -> bool {
        self.tracker.begin();

        let parts = self.vessel.parts();
        let include_cosine_losses = self.config.include_cosine_losses;

        let mut atmo = self.pool.acquire();
        let mut vac = self.pool.acquire();
        atmo.initialize(&parts, include_cosine_losses);
        vac.initialize(&parts, include_cosine_losses);

        let simulations = SimulationSet::new(atmo, vac);
        let guard = RunGuard::new(Arc::clone(&self.tracker));
        let publisher = self.publisher.clone();
        let parallel = self.config.parallel_environments;

        log::debug!(
            "StageStatsAgent: dispatching refresh of {} parts to '{}'",
            parts.len(),
            self.executor.name()
        );

        let submitted = self.executor.submit(Box::new(move || {
            run::execute_run(simulations, guard, publisher, parallel)
        }));
        match submitted {
            Ok(()) => true,
            Err(err) => {
                // The refused job has been dropped: its leases are back and the run is closed.
                log::error!("StageStatsAgent: {}", RefreshError::Submit(err));
                self.update_requested = true;
                false
            }
        }
    }

    /// Where the agent is in its cycle.
    pub fn state(&self) -> RefreshState {
        if self.tracker.is_running() {
            RefreshState::Running
        } else if self.update_requested {
            RefreshState::Waiting
        } else {
            RefreshState::Idle
        }
    }

    /// Reports the scheduling state.
    pub fn status(&self) -> RefreshStatus {
        let state = self.state();
        let (next_delay, waited, last_elapsed) = {
            let timing = self.tracker.timing();
            let waited = if state == RefreshState::Running {
                timing.run_watch.elapsed()
            } else {
                timing.wait_watch.elapsed()
            };
            (timing.next_delay, waited, timing.last_elapsed)
        };
        RefreshStatus {
            state,
            active: self.active,
            next_delay,
            waited,
            last_elapsed,
            completed_runs: self.tracker.completed_runs(),
            failed_runs: self.tracker.failed_runs(),
            interested_requesters: self.users.len(),
            published_generation: self.publisher.reader().generation(),
        }
    }

    /// Returns `true` if `requester` has asked for a refresh since the agent last went quiet.
    pub fn is_interested(&self, requester: &str) -> bool {
        self.users.contains(requester)
    }

    /// The latest published results.
    pub fn snapshot(&self) -> Arc<StageStatsSnapshot> {
        self.publisher.reader().snapshot()
    }

    /// A handle for reading results from other threads.
    pub fn reader(&self) -> StatsReader {
        self.publisher.reader()
    }

    /// Whether delta-V includes cosine losses.
    pub fn include_cosine_losses(&self) -> bool {
        self.config.include_cosine_losses
    }

    /// Toggles cosine losses. Applies from the next dispatch.
    pub fn set_include_cosine_losses(&mut self, include: bool) {
        self.config.include_cosine_losses = include;
    }

    /// The agent's configuration.
    pub fn config(&self) -> &StageStatsConfig {
        &self.config
    }

    /// The simulation pool.
    pub fn pool(&self) -> &Pool<S> {
        &self.pool
    }

    /// Deactivates the agent and disposes its pool. Idempotent.
    ///
    /// Simulations leased by a run in flight are disposed when that run ends.
    pub fn shutdown(&mut self) {
        self.deactivate();
        if !self.pool.is_disposed() {
            self.pool.dispose();
            log::info!("StageStatsAgent: simulation pool disposed");
        }
    }
}

impl<S: FuelFlowSimulation + Dispose> Drop for StageStatsAgent<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
