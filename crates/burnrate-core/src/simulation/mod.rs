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

//! Inputs, outputs and the collaborator contract of a staged fuel-flow simulation.
//!
//! The physics itself lives behind [`FuelFlowSimulation`]. This module only
//! fixes the data that crosses that boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One structural or propulsion part of a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Part {
    /// Display name.
    pub name: String,
    /// The stage in which this part is detached (or fires, for engines).
    /// Stages are numbered so the highest fires first.
    pub stage: i32,
    /// Mass without propellant, in tonnes.
    pub dry_mass: f64,
    /// Propellant mass, in tonnes.
    pub propellant_mass: f64,
    /// Vacuum thrust in kN, zero for non-engines.
    pub thrust: f64,
    /// Specific impulse in vacuum, in seconds.
    pub isp_vacuum: f64,
    /// Specific impulse at one atmosphere, in seconds.
    pub isp_atmosphere: f64,
    /// Cosine of the angle between the thrust axis and the vessel axis.
    pub thrust_alignment: f64,
}

impl Default for Part {
    fn default() -> Self {
        Self {
            name: String::new(),
            stage: 0,
            dry_mass: 0.0,
            propellant_mass: 0.0,
            thrust: 0.0,
            isp_vacuum: 0.0,
            isp_atmosphere: 0.0,
            thrust_alignment: 1.0,
        }
    }
}

impl Part {
    /// Creates an inert part with the given name, stage and dry mass.
    pub fn new(name: impl Into<String>, stage: i32, dry_mass: f64) -> Self {
        Self {
            name: name.into(),
            stage,
            dry_mass,
            ..Default::default()
        }
    }

    /// Returns `true` if the part produces thrust.
    pub fn is_engine(&self) -> bool {
        self.thrust > 0.0
    }
}

/// The statistics of one stage in one environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageStats {
    /// The stage number these statistics describe.
    pub stage: i32,
    /// Vessel mass when the stage ignites, in tonnes.
    pub start_mass: f64,
    /// Vessel mass when the stage burns out, in tonnes.
    pub end_mass: f64,
    /// Thrust at ignition, in kN.
    pub start_thrust: f64,
    /// Peak acceleration during the burn, in m/s².
    pub max_accel: f64,
    /// Burn duration, in seconds.
    pub delta_time: f64,
    /// Change in velocity, in m/s.
    pub delta_v: f64,
    /// Propellant consumed, in tonnes.
    pub resource_mass: f64,
    /// Effective specific impulse, in seconds.
    pub isp: f64,
    /// Mass discarded when the stage separates, in tonnes.
    pub staged_mass: f64,
}

impl StageStats {
    /// Creates statistics carrying only a stage number and a delta-V.
    pub fn with_delta_v(stage: i32, delta_v: f64) -> Self {
        Self {
            stage,
            delta_v,
            ..Default::default()
        }
    }
}

/// The throttle and atmosphere a simulation pass is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentParams {
    /// Throttle setting in `[0, 1]`.
    pub throttle: f64,
    /// Static pressure, in atmospheres.
    pub atmospheres: f64,
}

impl EnvironmentParams {
    /// Full throttle at sea level.
    pub const ATMOSPHERE: Self = Self {
        throttle: 1.0,
        atmospheres: 1.0,
    };

    /// Full throttle in vacuum.
    pub const VACUUM: Self = Self {
        throttle: 1.0,
        atmospheres: 0.0,
    };
}

/// The two environments every refresh is simulated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    /// Sea-level atmosphere.
    Atmosphere,
    /// Vacuum.
    Vacuum,
}

impl Environment {
    /// The fixed simulation parameters for this environment.
    pub fn params(self) -> EnvironmentParams {
        match self {
            Environment::Atmosphere => EnvironmentParams::ATMOSPHERE,
            Environment::Vacuum => EnvironmentParams::VACUUM,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Atmosphere => write!(f, "atmosphere"),
            Environment::Vacuum => write!(f, "vacuum"),
        }
    }
}

/// A reusable staged fuel-flow simulation.
///
/// Instances are expensive to build and are recycled between runs: each run
/// calls [`initialize`](Self::initialize), then
/// [`simulate_all_stages`](Self::simulate_all_stages) once, then
/// [`clear`](Self::clear) before the instance is returned for reuse.
pub trait FuelFlowSimulation: Send + 'static {
    /// Loads the vessel for the next run.
    fn initialize(&mut self, parts: &[Part], include_cosine_losses: bool);

    /// Simulates every remaining stage, in firing order.
    fn simulate_all_stages(&mut self, env: EnvironmentParams) -> anyhow::Result<Vec<StageStats>>;

    /// Drops any per-run state. Called before the instance is reused.
    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environments_map_to_fixed_params() {
        assert_eq!(Environment::Atmosphere.params().atmospheres, 1.0);
        assert_eq!(Environment::Vacuum.params().atmospheres, 0.0);
        assert_eq!(Environment::Vacuum.params().throttle, 1.0);
        assert_eq!(Environment::Atmosphere.params().throttle, 1.0);
    }

    #[test]
    fn part_deserializes_with_defaults() {
        let part: Part =
            serde_json::from_str(r#"{ "name": "tank", "stage": 2, "propellant_mass": 4.0 }"#)
                .expect("valid part json");
        assert_eq!(part.name, "tank");
        assert_eq!(part.stage, 2);
        assert_eq!(part.thrust_alignment, 1.0);
        assert!(!part.is_engine());
    }

    #[test]
    fn stage_stats_shorthand() {
        let stats = StageStats::with_delta_v(1, 48.0);
        assert_eq!(stats.stage, 1);
        assert_eq!(stats.delta_v, 48.0);
        assert_eq!(stats.start_mass, 0.0);
    }
}
