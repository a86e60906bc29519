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

//! A reference fuel-flow simulation based on the ideal rocket equation.
//!
//! Every stage burns only its own tanks through its own engines, and the
//! stage's parts are dropped when it burns out. Good enough to drive the
//! agent end to end; not a model of real fuel crossfeed.

use anyhow::{bail, Result};
use burnrate_core::{EnvironmentParams, FuelFlowSimulation, Part, StageStats};
use burnrate_data::Dispose;

/// Standard gravity, in m/s².
const G0: f64 = 9.80665;

/// Reusable scratch state for one simulation pass.
#[derive(Debug, Default)]
pub struct IdealRocketSimulation {
    parts: Vec<Part>,
    include_cosine_losses: bool,
    /// Stage numbers in firing order, rebuilt on every initialize.
    stages: Vec<i32>,
}

impl IdealRocketSimulation {
    pub fn new() -> Self {
        Self::default()
    }

    fn simulate_stage(&self, stage: i32, env: EnvironmentParams) -> Result<StageStats> {
        let attached = self.parts.iter().filter(|p| p.stage <= stage);
        let own: Vec<&Part> = self.parts.iter().filter(|p| p.stage == stage).collect();

        let start_mass: f64 = attached.map(|p| p.dry_mass + p.propellant_mass).sum();
        let propellant: f64 = own.iter().map(|p| p.propellant_mass).sum();
        let staged_mass: f64 = own.iter().map(|p| p.dry_mass).sum();

        let mut thrust = 0.0;
        let mut mass_flow = 0.0;
        for engine in own.iter().filter(|p| p.is_engine()) {
            let isp =
                engine.isp_vacuum + (engine.isp_atmosphere - engine.isp_vacuum) * env.atmospheres;
            if isp <= 0.0 {
                bail!(
                    "engine '{}' has no specific impulse at {} atm",
                    engine.name,
                    env.atmospheres
                );
            }
            let alignment = if self.include_cosine_losses {
                engine.thrust_alignment
            } else {
                1.0
            };
            thrust += engine.thrust * env.throttle * alignment;
            mass_flow += engine.thrust * env.throttle / (isp * G0);
        }

        let mut stats = StageStats {
            stage,
            start_mass,
            end_mass: start_mass,
            staged_mass,
            ..Default::default()
        };
        if thrust <= 0.0 || propellant <= 0.0 {
            return Ok(stats);
        }

        let end_mass = start_mass - propellant;
        if end_mass <= 0.0 {
            bail!("stage {stage} has no dry mass left after burning {propellant} t of propellant");
        }
        let isp = thrust / (mass_flow * G0);
        stats.end_mass = end_mass;
        stats.start_thrust = thrust;
        stats.max_accel = thrust / end_mass;
        stats.delta_time = propellant / mass_flow;
        stats.resource_mass = propellant;
        stats.isp = isp;
        stats.delta_v = isp * G0 * (start_mass / end_mass).ln();
        Ok(stats)
    }
}

impl FuelFlowSimulation for IdealRocketSimulation {
    fn initialize(&mut self, parts: &[Part], include_cosine_losses: bool) {
        self.parts.clear();
        self.parts.extend_from_slice(parts);
        self.include_cosine_losses = include_cosine_losses;

        self.stages.clear();
        self.stages.extend(parts.iter().map(|p| p.stage));
        self.stages.sort_unstable_by(|a, b| b.cmp(a));
        self.stages.dedup();
    }

    fn simulate_all_stages(&mut self, env: EnvironmentParams) -> Result<Vec<StageStats>> {
        self.stages
            .iter()
            .map(|&stage| self.simulate_stage(stage, env))
            .collect()
    }

    fn clear(&mut self) {
        self.parts.clear();
        self.stages.clear();
    }
}

impl Dispose for IdealRocketSimulation {}
