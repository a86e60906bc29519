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

//! Worker executors.
//!
//! - [`ThreadPoolExecutor`]: a fixed set of named OS threads fed by a channel.
//! - [`TokioExecutor`]: the blocking pool of an existing tokio runtime.
//! - [`DeferredExecutor`]: a queue the host drains itself at a safe point.

mod deferred;
mod thread_pool;
mod tokio_blocking;

pub use self::deferred::DeferredExecutor;
pub use self::thread_pool::ThreadPoolExecutor;
pub use self::tokio_blocking::TokioExecutor;

use burnrate_core::utils::panic::panic_message;
use burnrate_core::Job;
use std::panic::{self, AssertUnwindSafe};

/// Runs a job, containing any panic so the executing thread survives it.
pub(crate) fn run_contained(executor: &str, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        log::error!(
            "[{executor}] Job panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}
