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

//! Errors raised while refreshing derived state.
//!
//! None of these reach the callers that asked for a refresh. They are logged
//! at the worker boundary and counted in the agent's status.

use burnrate_core::{Environment, ExecutorError};
use thiserror::Error;

/// Why a refresh did not publish new results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The simulation returned an error.
    #[error("{environment} simulation failed: {message}")]
    Simulation {
        /// The environment being simulated.
        environment: Environment,
        /// The collaborator's error, with its context chain.
        message: String,
    },
    /// The simulation panicked.
    #[error("{environment} simulation panicked: {message}")]
    Panicked {
        /// The environment being simulated.
        environment: Environment,
        /// The panic message.
        message: String,
    },
    /// The executor refused the run.
    #[error("could not hand the refresh to the executor: {0}")]
    Submit(#[from] ExecutorError),
}
