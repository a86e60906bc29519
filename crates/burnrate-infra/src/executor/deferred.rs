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
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Queues jobs until the host pumps them.
///
/// Useful for hosts without spare threads, which drain background work at a
/// point of their own choosing (end of frame, idle callback), and for driving
/// a refresh cycle step by step.
#[derive(Default)]
pub struct DeferredExecutor {
    queue: Mutex<VecDeque<Job>>,
    closed: AtomicBool,
}

impl DeferredExecutor {
    /// Creates an empty, open executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Runs the oldest queued job on the calling thread. Returns `false` if
    /// the queue was empty.
    pub fn run_next(&self) -> bool {
        // Pop before running so a job may submit more work.
        let job = self.lock().pop_front();
        match job {
            Some(job) => {
                run_contained("deferred", job);
                true
            }
            None => false,
        }
    }

    /// Runs queued jobs until the queue is empty, including jobs submitted
    /// while draining. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Refuses further jobs and drops the ones still queued without running them.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let dropped = std::mem::take(&mut *self.lock());
        if !dropped.is_empty() {
            log::debug!("[deferred] Dropping {} queued jobs on close.", dropped.len());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WorkerExecutor for DeferredExecutor {
    fn submit(&self, job: Job) -> Result<(), ExecutorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExecutorError::ShutDown("deferred".to_string()));
        }
        self.lock().push_back(job);
        Ok(())
    }

    fn name(&self) -> &str {
        "deferred"
    }
}
