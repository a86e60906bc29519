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

//! Runtime configuration, read from an optional JSON file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use burnrate_agents::StageStatsConfig;
use burnrate_core::Part;
use serde::{Deserialize, Serialize};

/// Where refresh jobs run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    /// A dedicated pool of worker threads.
    #[default]
    Threads,
    /// The blocking pool of a multi-threaded tokio runtime.
    Tokio,
}

/// Everything the runtime needs to drive one vessel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Agent settings.
    pub agent: StageStatsConfig,
    /// The vessel to simulate.
    pub parts: Vec<Part>,
    /// How many host steps to run.
    pub ticks: u32,
    /// Length of one host step, in milliseconds.
    pub tick_interval_ms: u64,
    /// The executor backend.
    pub executor: ExecutorKind,
    /// Worker threads in the executor.
    pub worker_threads: usize,
    /// A refresh is requested every this many steps.
    pub request_every: u32,
}

impl RuntimeConfig {
    /// Loads a configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config '{}'", path.display()))
    }

    /// Length of one host step.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            agent: StageStatsConfig::default(),
            parts: default_vessel(),
            ticks: 150,
            tick_interval_ms: 20,
            executor: ExecutorKind::Threads,
            worker_threads: 2,
            request_every: 5,
        }
    }
}

/// A small two-stage launcher.
fn default_vessel() -> Vec<Part> {
    vec![
        Part::new("capsule", 0, 0.84),
        Part {
            propellant_mass: 1.8,
            ..Part::new("upper tank", 0, 0.25)
        },
        Part {
            thrust: 60.0,
            isp_vacuum: 345.0,
            isp_atmosphere: 90.0,
            ..Part::new("upper engine", 0, 0.5)
        },
        Part::new("decoupler", 1, 0.05),
        Part {
            propellant_mass: 8.0,
            ..Part::new("booster tank", 1, 1.0)
        },
        Part {
            thrust: 215.0,
            isp_vacuum: 320.0,
            isp_atmosphere: 280.0,
            thrust_alignment: 0.985,
            ..Part::new("booster engine", 1, 1.5)
        },
    ]
}
