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

//! The cell the agent publishes results into.
//!
//! Both environments are published together as one immutable snapshot, and a
//! publication replaces the whole snapshot at once. A reader therefore always
//! sees the atmosphere and vacuum results of the same run.

use burnrate_core::StageStats;
use std::sync::{Arc, PoisonError, RwLock};

/// The results of one completed refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageStatsSnapshot {
    /// Increases by one with every publication. Zero means nothing has been published yet.
    pub generation: u64,
    /// Per-stage statistics at sea level.
    pub atmo_stats: Vec<StageStats>,
    /// Per-stage statistics in vacuum.
    pub vac_stats: Vec<StageStats>,
}

type Cell = Arc<RwLock<Arc<StageStatsSnapshot>>>;

/// A read-only handle on the published results, usable from any thread.
#[derive(Debug, Clone)]
pub struct StatsReader {
    cell: Cell,
}

impl StatsReader {
    /// Returns the latest snapshot.
    pub fn snapshot(&self) -> Arc<StageStatsSnapshot> {
        Arc::clone(&self.cell.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the generation of the latest snapshot.
    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }
}

/// The writing side. Only the run in flight publishes.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsPublisher {
    cell: Cell,
}

impl StatsPublisher {
    pub(crate) fn reader(&self) -> StatsReader {
        StatsReader {
            cell: Arc::clone(&self.cell),
        }
    }

    /// Replaces the published snapshot. Returns the new generation.
    pub(crate) fn publish(&self, atmo_stats: Vec<StageStats>, vac_stats: Vec<StageStats>) -> u64 {
        let mut slot = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        let generation = slot.generation + 1;
        *slot = Arc::new(StageStatsSnapshot {
            generation,
            atmo_stats,
            vac_stats,
        });
        generation
    }
}
