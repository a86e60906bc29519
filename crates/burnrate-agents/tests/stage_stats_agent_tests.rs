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

use burnrate_agents::{RefreshState, StageStatsAgent, StageStatsConfig};
use burnrate_core::{
    EnvironmentParams, FuelFlowSimulation, HostScene, ManualClock, Part, StageStats,
    VesselContext, WorkerExecutor,
};
use burnrate_data::Dispose;
use burnrate_infra::{DeferredExecutor, ThreadPoolExecutor};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// --- TEST DOUBLES ---

/// What every simulation built by the factory will return next.
#[derive(Default)]
struct Script {
    atmo: Vec<StageStats>,
    vac: Vec<StageStats>,
    fail_with: Option<String>,
    panic_with: Option<String>,
    /// `(part count, include_cosine_losses)` for every `initialize` call.
    initialized: Vec<(usize, bool)>,
    cleared: usize,
    disposed: usize,
}

struct ScriptedSimulation {
    script: Arc<Mutex<Script>>,
    loaded: bool,
}

impl FuelFlowSimulation for ScriptedSimulation {
    fn initialize(&mut self, parts: &[Part], include_cosine_losses: bool) {
        self.loaded = true;
        self.script
            .lock()
            .unwrap()
            .initialized
            .push((parts.len(), include_cosine_losses));
    }

    fn simulate_all_stages(&mut self, env: EnvironmentParams) -> anyhow::Result<Vec<StageStats>> {
        assert!(self.loaded, "simulate called before initialize");
        let script = self.script.lock().unwrap();
        if let Some(message) = &script.panic_with {
            let message = message.clone();
            drop(script);
            panic!("{message}");
        }
        if let Some(message) = &script.fail_with {
            anyhow::bail!("{message}");
        }
        Ok(if env == EnvironmentParams::VACUUM {
            script.vac.clone()
        } else {
            script.atmo.clone()
        })
    }

    fn clear(&mut self) {
        self.loaded = false;
        self.script.lock().unwrap().cleared += 1;
    }
}

impl Dispose for ScriptedSimulation {
    fn dispose(self) {
        self.script.lock().unwrap().disposed += 1;
    }
}

struct TestVessel {
    scene: HostScene,
    controlled: AtomicBool,
    parts: Vec<Part>,
    parts_fetched: AtomicUsize,
}

impl TestVessel {
    fn flight(parts: Vec<Part>) -> Arc<Self> {
        Arc::new(Self {
            scene: HostScene::Flight,
            controlled: AtomicBool::new(true),
            parts,
            parts_fetched: AtomicUsize::new(0),
        })
    }

    fn editor(parts: Vec<Part>) -> Arc<Self> {
        Arc::new(Self {
            scene: HostScene::Editor,
            controlled: AtomicBool::new(false),
            parts,
            parts_fetched: AtomicUsize::new(0),
        })
    }
}

impl VesselContext for TestVessel {
    fn scene(&self) -> HostScene {
        self.scene
    }
    fn is_controlled(&self) -> bool {
        self.controlled.load(Ordering::SeqCst)
    }
    fn parts(&self) -> Vec<Part> {
        self.parts_fetched.fetch_add(1, Ordering::SeqCst);
        self.parts.clone()
    }
}

struct Harness {
    agent: StageStatsAgent<ScriptedSimulation>,
    executor: Arc<DeferredExecutor>,
    clock: ManualClock,
    script: Arc<Mutex<Script>>,
    vessel: Arc<TestVessel>,
}

fn two_stage_parts() -> Vec<Part> {
    vec![Part::new("StageA", 1, 2.0), Part::new("StageB", 0, 1.0)]
}

fn harness_with(config: StageStatsConfig, vessel: Arc<TestVessel>) -> Harness {
    let script = Arc::new(Mutex::new(Script::default()));
    let executor = Arc::new(DeferredExecutor::new());
    let clock = ManualClock::new();

    let factory_script = Arc::clone(&script);
    let mut agent = StageStatsAgent::with_clock(
        config,
        move || ScriptedSimulation {
            script: Arc::clone(&factory_script),
            loaded: false,
        },
        executor.clone() as Arc<dyn WorkerExecutor>,
        vessel.clone() as Arc<dyn VesselContext>,
        Arc::new(clock.clone()),
    );
    agent.activate();

    Harness {
        agent,
        executor,
        clock,
        script,
        vessel,
    }
}

fn harness() -> Harness {
    harness_with(
        StageStatsConfig {
            parallel_environments: false,
            ..Default::default()
        },
        TestVessel::flight(two_stage_parts()),
    )
}

fn example_atmo() -> Vec<StageStats> {
    vec![
        StageStats::with_delta_v(1, 48.0),
        StageStats::with_delta_v(0, 95.0),
    ]
}

fn example_vac() -> Vec<StageStats> {
    vec![
        StageStats::with_delta_v(1, 50.0),
        StageStats::with_delta_v(0, 100.0),
    ]
}

// --- TESTS ---

#[test]
fn test_request_then_tick_publishes_both_environments() {
    // --- 1. ARRANGE ---
    let mut h = harness();
    {
        let mut script = h.script.lock().unwrap();
        script.atmo = example_atmo();
        script.vac = example_vac();
    }

    // --- 2. ACT ---
    h.agent.request_update("x");
    assert!(h.agent.tick(), "A requested refresh should dispatch at once");
    assert_eq!(h.agent.state(), RefreshState::Running);
    assert_eq!(h.executor.run_pending(), 1);

    // --- 3. ASSERT ---
    let snapshot = h.agent.snapshot();
    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.atmo_stats, example_atmo());
    assert_eq!(snapshot.vac_stats, example_vac());
    assert_eq!(h.agent.state(), RefreshState::Idle);

    let script = h.script.lock().unwrap();
    assert_eq!(script.initialized, vec![(2, true), (2, true)]);
    assert_eq!(script.cleared, 2, "Both simulations are cleared before reuse");
    assert_eq!(h.vessel.parts_fetched.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ticks_while_running_never_dispatch_twice() {
    let mut h = harness();

    h.agent.request_update("x");
    assert!(h.agent.tick());

    for _ in 0..10 {
        h.agent.request_update("y");
        h.clock.advance(Duration::from_secs(1));
        assert!(!h.agent.tick(), "No second dispatch while a run is in flight");
    }
    assert_eq!(h.executor.pending(), 1);
    assert_eq!(h.agent.state(), RefreshState::Running);

    h.executor.run_pending();
    // The run took 10s of clock time, so the next one waits 20s.
    assert_eq!(h.agent.status().next_delay, Duration::from_secs(20));

    // The request made during the run is honoured afterwards.
    assert_eq!(h.agent.state(), RefreshState::Waiting);
    h.clock.advance(Duration::from_secs(20));
    assert!(h.agent.tick());
    assert_eq!(h.executor.pending(), 1);
}

#[test]
fn test_next_dispatch_waits_twice_the_last_run() {
    let mut h = harness();

    h.agent.request_update("x");
    assert!(h.agent.tick());
    h.clock.advance(Duration::from_millis(40));
    h.executor.run_pending();

    let status = h.agent.status();
    assert_eq!(status.last_elapsed, Duration::from_millis(40));
    assert_eq!(status.next_delay, Duration::from_millis(80));

    h.agent.request_update("x");
    h.clock.advance(Duration::from_millis(79));
    assert!(!h.agent.tick(), "79ms < 2 x 40ms: too early");
    assert_eq!(h.agent.state(), RefreshState::Waiting);

    h.clock.advance(Duration::from_millis(1));
    assert!(h.agent.tick(), "80ms reached: due");
}

#[test]
fn test_deactivating_mid_run_keeps_the_measured_run_time() {
    let mut h = harness();

    h.agent.request_update("x");
    assert!(h.agent.tick());
    h.clock.advance(Duration::from_millis(100));
    h.agent.deactivate();
    assert_eq!(h.executor.run_pending(), 1);

    let status = h.agent.status();
    assert_eq!(status.last_elapsed, Duration::from_millis(100));
    assert_eq!(status.next_delay, Duration::from_millis(200));
    assert_eq!(status.completed_runs, 1);

    // Inactive: the wait does not accumulate.
    h.clock.advance(Duration::from_millis(50));
    assert_eq!(h.agent.status().waited, Duration::ZERO);
    assert_eq!(h.agent.state(), RefreshState::Idle);
}

#[test]
fn test_unrequested_due_tick_forgets_requesters() {
    let mut h = harness();

    h.agent.request_update("hud");
    h.agent.request_update("ascent");
    assert!(h.agent.tick());
    h.clock.advance(Duration::from_millis(10));
    h.executor.run_pending();
    assert!(h.agent.is_interested("hud"));
    assert_eq!(h.agent.status().interested_requesters, 2);

    // Not due yet: requesters are kept.
    h.clock.advance(Duration::from_millis(5));
    assert!(!h.agent.tick());
    assert_eq!(h.agent.status().interested_requesters, 2);

    // Due, but nobody asked again.
    h.clock.advance(Duration::from_millis(15));
    assert!(!h.agent.tick());
    assert_eq!(h.agent.status().interested_requesters, 0);
    assert!(!h.agent.is_interested("hud"));
    assert_eq!(h.executor.pending(), 0);
    assert_eq!(h.agent.state(), RefreshState::Idle);
}

#[test]
fn test_failed_run_keeps_previous_results_and_recovers() {
    let mut h = harness();
    {
        let mut script = h.script.lock().unwrap();
        script.atmo = example_atmo();
        script.vac = example_vac();
    }
    h.agent.request_update("x");
    h.agent.tick();
    h.executor.run_pending();
    let before = h.agent.snapshot();

    h.script.lock().unwrap().fail_with = Some("engine table missing".to_string());
    h.agent.request_update("x");
    assert!(h.agent.tick());
    h.executor.run_pending();

    let status = h.agent.status();
    assert_eq!(h.agent.snapshot(), before, "A failed run publishes nothing");
    assert_eq!(status.state, RefreshState::Idle);
    assert_eq!(status.failed_runs, 1);
    assert_eq!(status.completed_runs, 1);
    assert_eq!(status.next_delay, Duration::from_millis(500));

    // Recovery after the fallback delay.
    h.script.lock().unwrap().fail_with = None;
    h.agent.request_update("x");
    h.clock.advance(Duration::from_millis(499));
    assert!(!h.agent.tick());
    h.clock.advance(Duration::from_millis(1));
    assert!(h.agent.tick());
    h.executor.run_pending();
    assert_eq!(h.agent.snapshot().generation, before.generation + 1);
}

#[test]
fn test_panicking_simulation_is_contained() {
    let mut h = harness_with(
        StageStatsConfig::default(),
        TestVessel::flight(two_stage_parts()),
    );
    h.script.lock().unwrap().panic_with = Some("integrator diverged".to_string());

    h.agent.request_update("x");
    assert!(h.agent.tick());
    h.executor.run_pending();

    let status = h.agent.status();
    assert_eq!(status.state, RefreshState::Idle);
    assert_eq!(status.failed_runs, 1);
    assert_eq!(status.published_generation, 0);
    assert_eq!(
        h.agent.pool().available(),
        h.agent.config().preallocated_simulations,
        "Both simulations return to the pool after a panic"
    );
}

#[test]
fn test_parallel_environments_publish_the_same_pair() {
    let mut h = harness_with(
        StageStatsConfig::default(),
        TestVessel::flight(two_stage_parts()),
    );
    {
        let mut script = h.script.lock().unwrap();
        script.atmo = example_atmo();
        script.vac = example_vac();
    }

    h.agent.request_update("x");
    h.agent.tick();
    h.executor.run_pending();

    let snapshot = h.agent.snapshot();
    assert_eq!(snapshot.atmo_stats, example_atmo());
    assert_eq!(snapshot.vac_stats, example_vac());
}

#[test]
fn test_simulations_are_reused_across_runs() {
    let mut h = harness();

    for _ in 0..5 {
        h.agent.request_update("x");
        assert!(h.agent.tick());
        h.executor.run_pending();
    }

    assert_eq!(h.agent.status().completed_runs, 5);
    assert_eq!(h.agent.pool().created(), 10, "No simulation beyond the preallocation");
    assert_eq!(h.agent.pool().available(), 10);
}

#[test]
fn test_cosine_loss_toggle_reaches_the_simulations() {
    let mut h = harness();
    assert!(h.agent.include_cosine_losses());

    h.agent.set_include_cosine_losses(false);
    h.agent.request_update("x");
    h.agent.tick();
    h.executor.run_pending();

    assert_eq!(
        h.script.lock().unwrap().initialized,
        vec![(2, false), (2, false)]
    );
}

#[test]
fn test_uncontrolled_or_inactive_vessels_do_not_dispatch() {
    let mut h = harness();

    h.vessel.controlled.store(false, Ordering::SeqCst);
    h.agent.request_update("x");
    assert!(!h.agent.tick(), "Not the controlled vessel");

    h.vessel.controlled.store(true, Ordering::SeqCst);
    h.agent.deactivate();
    assert!(!h.agent.tick(), "Inactive agent");
    assert_eq!(h.executor.pending(), 0);

    // Activation forgets the earlier request.
    h.agent.activate();
    assert_eq!(h.agent.state(), RefreshState::Idle);
    assert!(!h.agent.tick());
    h.agent.request_update("x");
    assert!(h.agent.tick());
}

#[test]
fn test_editor_requests_dispatch_eagerly() {
    let mut h = harness_with(
        StageStatsConfig {
            parallel_environments: false,
            ..Default::default()
        },
        TestVessel::editor(two_stage_parts()),
    );

    h.agent.request_update("editor-panel");
    assert_eq!(h.agent.state(), RefreshState::Running);
    assert_eq!(h.executor.pending(), 1);
}

#[test]
fn test_rejected_submission_rearms_the_request() {
    let mut h = harness();
    h.executor.close();

    h.agent.request_update("x");
    assert!(!h.agent.tick());

    let status = h.agent.status();
    assert_eq!(status.state, RefreshState::Waiting, "The request is kept for a retry");
    assert_eq!(status.failed_runs, 1);
    assert_eq!(h.agent.pool().available(), 10, "Leases went back to the pool");
}

#[test]
fn test_shutdown_disposes_idle_and_in_flight_simulations() {
    let mut h = harness();

    h.agent.request_update("x");
    assert!(h.agent.tick());
    h.agent.shutdown();
    assert_eq!(h.script.lock().unwrap().disposed, 8, "Cached simulations disposed");
    assert!(!h.agent.is_active());

    h.executor.run_pending();
    assert_eq!(h.script.lock().unwrap().disposed, 10, "Leased simulations disposed on release");
    assert_eq!(h.agent.pool().available(), 0);
}

#[test]
fn test_thread_pool_end_to_end() {
    let script = Arc::new(Mutex::new(Script {
        atmo: example_atmo(),
        vac: example_vac(),
        ..Default::default()
    }));
    let executor = Arc::new(ThreadPoolExecutor::new("stage-stats-test", 2).unwrap());
    let vessel = TestVessel::flight(two_stage_parts());

    let factory_script = Arc::clone(&script);
    let mut agent = StageStatsAgent::new(
        StageStatsConfig::default(),
        move || ScriptedSimulation {
            script: Arc::clone(&factory_script),
            loaded: false,
        },
        executor as Arc<dyn WorkerExecutor>,
        vessel as Arc<dyn VesselContext>,
    );
    agent.activate();
    let reader = agent.reader();

    agent.request_update("x");
    assert!(agent.tick());

    let deadline = Instant::now() + Duration::from_secs(5);
    while reader.generation() == 0 {
        assert!(Instant::now() < deadline, "Refresh never published");
        thread::sleep(Duration::from_millis(5));
    }
    let snapshot = reader.snapshot();
    assert_eq!(snapshot.atmo_stats, example_atmo());
    assert_eq!(snapshot.vac_stats, example_vac());

    while agent.state() == RefreshState::Running {
        assert!(Instant::now() < deadline, "Run never completed");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(agent.status().completed_runs, 1);
}
