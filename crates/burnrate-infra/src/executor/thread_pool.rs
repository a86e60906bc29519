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
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;

/// A fixed-size pool of worker threads fed through an unbounded channel.
///
/// Jobs run in submission order across the workers. A panicking job is logged
/// and the worker keeps going. Dropping the executor (or calling
/// [`shutdown`](Self::shutdown)) stops accepting work, lets the workers drain
/// what was already queued, and joins them.
pub struct ThreadPoolExecutor {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl ThreadPoolExecutor {
    /// Spawns `threads` workers (at least one) named `{name}-{index}`.
    pub fn new(name: impl Into<String>, threads: usize) -> std::io::Result<Self> {
        let name = name.into();
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();

        let mut handles = Vec::with_capacity(threads.max(1));
        for index in 0..threads.max(1) {
            let rx: Receiver<Job> = rx.clone();
            let worker_name = format!("{name}-{index}");
            let label = worker_name.clone();
            let handle = thread::Builder::new().name(worker_name).spawn(move || {
                log::debug!("[{label}] Worker thread started.");
                while let Ok(job) = rx.recv() {
                    run_contained(&label, job);
                }
                log::debug!("[{label}] Worker thread stopped.");
            })?;
            handles.push(handle);
        }

        log::info!("[{name}] Started {} worker threads.", handles.len());
        Ok(Self {
            name,
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
        })
    }

    /// The number of workers still attached to the executor.
    pub fn worker_count(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stops accepting jobs, drains the queue and joins every worker.
    ///
    /// Idempotent. When called from one of the pool's own workers, that worker
    /// is detached instead of joined.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        // Closing the channel ends each worker's receive loop once the queue is empty.
        drop(sender);

        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::warn!("[{}] A worker thread terminated abnormally.", self.name);
            }
        }
        log::info!("[{}] Executor shut down.", self.name);
    }
}

impl WorkerExecutor for ThreadPoolExecutor {
    fn submit(&self, job: Job) -> Result<(), ExecutorError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(ExecutorError::ShutDown(self.name.clone()));
        };
        // A send error hands the job back; dropping it runs its guards.
        sender
            .send(job)
            .map_err(|_| ExecutorError::ShutDown(self.name.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
