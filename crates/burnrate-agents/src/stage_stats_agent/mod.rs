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

//! The stage statistics agent: a throttled, pooled background refresh of
//! per-stage delta-V statistics.
//!
//! Any number of requesters call [`StageStatsAgent::request_update`]. The host
//! calls [`StageStatsAgent::tick`] once per fixed step. When a refresh is due
//! the agent leases two simulations from its pool, hands them to a worker
//! executor, and goes back to the host immediately. The worker simulates the
//! vessel at sea level and in vacuum, publishes both results as one snapshot,
//! and returns the simulations to the pool.
//!
//! The agent paces itself: after a run that took `E`, the next run may not
//! start until `backoff_multiplier × E` has passed. When nobody asked for a
//! refresh by then, the agent forgets its requesters and goes quiet.

mod agent;
mod config;
mod publication;
mod run;

pub use agent::StageStatsAgent;
pub use config::StageStatsConfig;
pub use publication::{StageStatsSnapshot, StatsReader};

use std::borrow::Borrow;
use std::fmt;
use std::time::Duration;

/// Identifies a party interested in fresh statistics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequesterId(String);

impl RequesterId {
    /// Creates an identity from any name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequesterId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RequesterId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for RequesterId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the agent is in its refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshState {
    /// Nothing has been requested since the last dispatch.
    Idle,
    /// A refresh has been requested and waits for the delay to pass.
    Waiting,
    /// A refresh is in flight on the executor.
    Running,
}

/// A point-in-time report of the agent's scheduling state.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshStatus {
    /// The current refresh state.
    pub state: RefreshState,
    /// Whether the host has activated the agent.
    pub active: bool,
    /// The wait required between the last run and the next dispatch.
    pub next_delay: Duration,
    /// The wait so far, or the run so far while running. Zero while inactive.
    pub waited: Duration,
    /// The duration of the last completed run.
    pub last_elapsed: Duration,
    /// Runs that published results.
    pub completed_runs: u64,
    /// Runs that failed or were dropped unrun.
    pub failed_runs: u64,
    /// Requesters heard from since the agent last went quiet.
    pub interested_requesters: usize,
    /// Generation of the latest published snapshot.
    pub published_generation: u64,
}
