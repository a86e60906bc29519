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

//! The contract for running work off the caller's thread.
//!
//! The agents never spawn threads themselves. They are handed a
//! [`WorkerExecutor`] and submit self-contained [`Job`]s to it; a job reports
//! its own completion by mutating shared state before it returns.

use thiserror::Error;

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// An error returned when an executor refuses a job.
///
/// A refused job is dropped by the executor before `submit` returns, so any
/// guard it owns has already run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The executor has been shut down and accepts no more work.
    #[error("executor '{0}' has been shut down")]
    ShutDown(String),
    /// The executor could not accept the job for another reason.
    #[error("executor '{executor}' rejected the job: {reason}")]
    Rejected {
        /// The name of the executor.
        executor: String,
        /// Why the job was refused.
        reason: String,
    },
}

/// Something that can run a [`Job`] concurrently with the caller.
///
/// `submit` must return without waiting for the job to run.
pub trait WorkerExecutor: Send + Sync {
    /// Hands a job over for execution.
    fn submit(&self, job: Job) -> Result<(), ExecutorError>;

    /// A human-readable name, used in logs.
    fn name(&self) -> &str {
        "worker"
    }
}
