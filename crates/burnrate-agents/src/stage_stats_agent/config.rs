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

//! Configuration of the stage statistics agent.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the [`StageStatsAgent`](super::StageStatsAgent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageStatsConfig {
    /// Whether delta-V accounts for thrust lost to engines that are not
    /// aligned with the vessel axis.
    pub include_cosine_losses: bool,
    /// Simulation instances built when the agent is created.
    pub preallocated_simulations: usize,
    /// The wait after a completed run is this many times the run's duration.
    pub backoff_multiplier: u32,
    /// Minimum wait after a failed run, in milliseconds.
    /// A failed run's duration says nothing about the cost of a real one.
    pub failure_backoff_ms: u64,
    /// In the editor, ask for a tick as soon as an update is requested
    /// instead of waiting for the next host step.
    pub eager_in_editor: bool,
    /// Simulate the two environments on two threads instead of one after the other.
    pub parallel_environments: bool,
}

impl StageStatsConfig {
    /// The minimum wait after a failed run.
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }
}

impl Default for StageStatsConfig {
    fn default() -> Self {
        Self {
            include_cosine_losses: true,
            preallocated_simulations: 10,
            backoff_multiplier: 2,
            failure_backoff_ms: 500,
            eager_in_editor: true,
            parallel_environments: true,
        }
    }
}
