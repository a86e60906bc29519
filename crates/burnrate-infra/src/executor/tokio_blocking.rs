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

use super::run_contained;
use burnrate_core::{ExecutorError, Job, WorkerExecutor};
use tokio::runtime::Handle;

/// Runs jobs on the blocking thread pool of a tokio runtime.
///
/// Simulation work is CPU-bound, so it goes through `spawn_blocking` rather
/// than onto the async worker threads.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Wraps the given runtime handle.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Wraps the runtime the caller is running inside of.
    ///
    /// Returns `None` outside of a tokio runtime.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl WorkerExecutor for TokioExecutor {
    fn submit(&self, job: Job) -> Result<(), ExecutorError> {
        // The join handle is dropped: completion is reported by the job itself.
        drop(self.handle.spawn_blocking(move || run_contained("tokio", job)));
        Ok(())
    }

    fn name(&self) -> &str {
        "tokio"
    }
}
