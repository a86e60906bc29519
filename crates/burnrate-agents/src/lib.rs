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

//! # Burnrate Agents
//!
//! Agents own a piece of derived state and decide when and where it is
//! recomputed.

#![warn(missing_docs)]

pub mod error;
pub mod stage_stats_agent;

pub use error::RefreshError;
pub use stage_stats_agent::{
    RefreshState, RefreshStatus, RequesterId, StageStatsAgent, StageStatsConfig,
    StageStatsSnapshot, StatsReader,
};
