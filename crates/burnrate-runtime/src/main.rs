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

// Burnrate Runtime
// Drives a stage statistics agent from a fixed-step loop, the way a host
// engine would, and logs the published results.

mod config;
mod demo_vessel;
mod ideal_rocket;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use burnrate_agents::{StageStatsAgent, StageStatsSnapshot};
use burnrate_core::{Stopwatch, VesselContext, WorkerExecutor};
use burnrate_infra::{ThreadPoolExecutor, TokioExecutor};

use crate::config::{ExecutorKind, RuntimeConfig};
use crate::demo_vessel::DemoVessel;
use crate::ideal_rocket::IdealRocketSimulation;

const REQUESTER: &str = "runtime-hud";
const TOKIO_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// The executor backing the agent, with whatever it needs to shut down.
enum Backend {
    Threads(Arc<ThreadPoolExecutor>),
    Tokio {
        runtime: tokio::runtime::Runtime,
        executor: Arc<TokioExecutor>,
    },
}

impl Backend {
    fn start(config: &RuntimeConfig) -> Result<Self> {
        let threads = config.worker_threads.max(1);
        match config.executor {
            ExecutorKind::Threads => {
                let executor = ThreadPoolExecutor::new("burnrate-worker", threads)
                    .context("failed to start the worker pool")?;
                Ok(Self::Threads(Arc::new(executor)))
            }
            ExecutorKind::Tokio => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(threads)
                    .thread_name("burnrate-tokio")
                    .build()
                    .context("failed to start the tokio runtime")?;
                let executor = Arc::new(TokioExecutor::new(runtime.handle().clone()));
                log::info!("Started tokio runtime with {threads} workers");
                Ok(Self::Tokio { runtime, executor })
            }
        }
    }

    fn executor(&self) -> Arc<dyn WorkerExecutor> {
        match self {
            Self::Threads(executor) => executor.clone() as Arc<dyn WorkerExecutor>,
            Self::Tokio { executor, .. } => executor.clone() as Arc<dyn WorkerExecutor>,
        }
    }

    /// Waits for queued work to finish and stops the backend.
    fn shutdown(self) {
        match self {
            Self::Threads(executor) => executor.shutdown(),
            Self::Tokio { runtime, .. } => runtime.shutdown_timeout(TOKIO_SHUTDOWN_TIMEOUT),
        }
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(&path)?,
        None => RuntimeConfig::default(),
    };
    log::info!(
        "Simulating {} parts for {} steps of {:?} on {:?}",
        config.parts.len(),
        config.ticks,
        config.tick_interval(),
        config.executor
    );

    let backend = Backend::start(&config)?;
    let vessel = Arc::new(DemoVessel::new(config.parts.clone()));

    let mut agent = StageStatsAgent::new(
        config.agent.clone(),
        IdealRocketSimulation::new,
        backend.executor(),
        vessel as Arc<dyn VesselContext>,
    );
    agent.activate();

    let wall = Stopwatch::new();
    let request_every = config.request_every.max(1);
    for step in 0..config.ticks {
        if step % request_every == 0 {
            agent.request_update(REQUESTER);
        }
        agent.tick();
        thread::sleep(config.tick_interval());
    }

    // Let the last run land before reporting.
    agent.deactivate();
    backend.shutdown();

    let status = agent.status();
    log::info!(
        "{} runs completed, {} failed in {:.2} s, last run took {:?}",
        status.completed_runs,
        status.failed_runs,
        wall.elapsed_secs_f64(),
        status.last_elapsed
    );
    report(&agent.snapshot());

    agent.shutdown();
    Ok(())
}

fn report(snapshot: &StageStatsSnapshot) {
    if snapshot.generation == 0 {
        log::warn!("No stage statistics were published");
        return;
    }
    log::info!("Stage statistics (generation {}):", snapshot.generation);
    for (atmo, vac) in snapshot.atmo_stats.iter().zip(&snapshot.vac_stats) {
        log::info!(
            "  stage {:>2}: {:>8.1} m/s atmosphere, {:>8.1} m/s vacuum, burn {:>6.1} s",
            atmo.stage,
            atmo.delta_v,
            vac.delta_v,
            vac.delta_time
        );
    }
    let total_vac: f64 = snapshot.vac_stats.iter().map(|s| s.delta_v).sum();
    log::info!("  total vacuum delta-V: {total_vac:.1} m/s");
}
