#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave controller driving the `Idle -> Rest -> Spawning -> Active` loop.
//!
//! The rest countdown and the per-wave spawn sequence are each modeled as a
//! single suspendable task advanced by [`Event::TimeAdvanced`]. A task owns a
//! [`CancellationToken`] that is checked every time it resumes; entering a new
//! phase or calling [`WaveController::stop_waves`] cancels the previous task so
//! it can never resume into a stale run.

use std::{cell::Cell, rc::Rc, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use wave_arena_core::{Command, Event, PoolEntry, WaveConfiguration, WavePhase};
use wave_arena_system_scaling::enemy_count_for_wave;
use wave_arena_system_spawn_manager::{SpawnManager, SpawnSurroundings};

/// Cooperative cancellation flag shared between the controller and a task.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.set(true);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Snapshot of the controller's mutable run state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaveRunState {
    /// Wave the run is on; zero before the first run.
    pub current_wave: u32,
    /// Active phase.
    pub phase: WavePhase,
    /// Spawn attempts made on the current wave, skipped attempts included.
    pub spawned_this_wave: u32,
    /// Spawn attempts planned for the current wave.
    pub total_enemies_this_wave: u32,
    /// Rest countdown left while resting.
    pub rest_remaining: Duration,
    /// Whether the current wave spawns the boss template.
    pub boss_wave: bool,
}

#[derive(Debug)]
struct PhaseTask {
    token: CancellationToken,
    step: TaskStep,
}

#[derive(Clone, Copy, Debug)]
enum TaskStep {
    Rest,
    Spawn { cooldown: Duration },
}

/// Owner of the wave phase state machine.
#[derive(Debug)]
pub struct WaveController {
    configuration: WaveConfiguration,
    state: WaveRunState,
    subscribed: bool,
    task: Option<PhaseTask>,
    rng: ChaCha8Rng,
}

impl WaveController {
    /// Creates an idle controller for the provided configuration.
    ///
    /// Authoring mistakes reported by [`WaveConfiguration::validate`] are
    /// logged and otherwise tolerated.
    #[must_use]
    pub fn new(configuration: WaveConfiguration, rng_seed: u64) -> Self {
        for issue in configuration.validate() {
            warn!(%issue, "wave configuration issue");
        }

        Self {
            configuration,
            state: WaveRunState::default(),
            subscribed: false,
            task: None,
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
        }
    }

    /// Configuration the controller was built with.
    #[must_use]
    pub fn configuration(&self) -> &WaveConfiguration {
        &self.configuration
    }

    /// Active phase.
    #[must_use]
    pub fn phase(&self) -> WavePhase {
        self.state.phase
    }

    /// Wave the run is on.
    #[must_use]
    pub fn current_wave(&self) -> u32 {
        self.state.current_wave
    }

    /// Copy of the full run state.
    #[must_use]
    pub fn run_state(&self) -> WaveRunState {
        self.state
    }

    /// Token of the in-flight rest or spawn task, if any.
    #[must_use]
    pub fn active_task_token(&self) -> Option<CancellationToken> {
        self.task.as_ref().map(|task| task.token.clone())
    }

    /// Starts a run at `max(1, starting_wave)`. Ignored unless idle.
    pub fn start_waves(&mut self, starting_wave: u32, out_events: &mut Vec<Event>) {
        if self.state.phase != WavePhase::Idle {
            debug!(phase = ?self.state.phase, "start ignored; run already in progress");
            return;
        }

        self.subscribed = true;
        self.state = WaveRunState {
            current_wave: starting_wave.max(1),
            ..WaveRunState::default()
        };
        info!(wave = self.state.current_wave, "wave run started");
        self.enter_rest(out_events);
    }

    /// Tears the run down and returns to idle. Ignored when already idle.
    ///
    /// Cancels the in-flight task, stops listening to spawn manager signals,
    /// and force-destroys every tracked enemy.
    pub fn stop_waves(
        &mut self,
        spawn_manager: &mut SpawnManager,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        if self.state.phase == WavePhase::Idle {
            return;
        }

        self.cancel_task();
        self.subscribed = false;
        spawn_manager.destroy_all_enemies(out_commands, out_events);

        let wave = self.state.current_wave;
        self.state = WaveRunState {
            current_wave: wave,
            ..WaveRunState::default()
        };
        info!(wave, "wave run stopped");
        out_events.push(Event::WavePhaseChanged {
            wave,
            phase: WavePhase::Idle,
        });
    }

    /// Consumes world and spawn manager events, advancing the active task.
    pub fn handle(
        &mut self,
        events: &[Event],
        spawn_manager: &mut SpawnManager,
        surroundings: &SpawnSurroundings<'_>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.advance(*dt, spawn_manager, surroundings, out_commands, out_events);
                }
                Event::AllEnemiesDead if self.subscribed => {
                    if self.state.phase == WavePhase::Active && spawn_manager.alive_count() == 0 {
                        self.clear_wave(out_events);
                    }
                }
                Event::AliveCountChanged { alive } if self.subscribed => {
                    out_events.push(Event::EnemyCountChanged {
                        alive: *alive,
                        total: self.state.total_enemies_this_wave,
                    });
                }
                _ => {}
            }
        }

        // A zero-length rest does not wait for the next tick. The loop clears at
        // most one wave and this check runs once, so a pass clears at most two.
        if self.state.phase == WavePhase::Rest && self.state.rest_remaining.is_zero() {
            self.advance(
                Duration::ZERO,
                spawn_manager,
                surroundings,
                out_commands,
                out_events,
            );
        }
    }

    fn advance(
        &mut self,
        dt: Duration,
        spawn_manager: &mut SpawnManager,
        surroundings: &SpawnSurroundings<'_>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let step = match &self.task {
            Some(task) if !task.token.is_cancelled() => task.step,
            Some(_) => {
                debug!(phase = ?self.state.phase, "cancelled task dropped");
                self.task = None;
                return;
            }
            None => return,
        };

        match step {
            TaskStep::Rest => {
                self.state.rest_remaining = self.state.rest_remaining.saturating_sub(dt);
                if self.state.rest_remaining.is_zero() {
                    self.enter_spawning(spawn_manager, surroundings, out_commands, out_events);
                } else {
                    out_events.push(Event::RestTimeRemaining {
                        remaining: self.state.rest_remaining,
                    });
                }
            }
            TaskStep::Spawn { cooldown } => {
                self.run_spawn_sequence(
                    cooldown,
                    dt,
                    spawn_manager,
                    surroundings,
                    out_commands,
                    out_events,
                );
            }
        }
    }

    fn enter_rest(&mut self, out_events: &mut Vec<Event>) {
        let rest = self.configuration.rest_duration();
        self.state.phase = WavePhase::Rest;
        self.state.rest_remaining = rest;
        self.replace_task(TaskStep::Rest);

        info!(
            wave = self.state.current_wave,
            rest_ms = rest.as_millis() as u64,
            "resting before wave"
        );
        out_events.push(Event::WavePhaseChanged {
            wave: self.state.current_wave,
            phase: WavePhase::Rest,
        });
        if !rest.is_zero() {
            out_events.push(Event::RestTimeRemaining { remaining: rest });
        }
    }

    fn enter_spawning(
        &mut self,
        spawn_manager: &mut SpawnManager,
        surroundings: &SpawnSurroundings<'_>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let wave = self.state.current_wave;
        let boss = self.configuration.is_boss_wave(wave);
        let total = if boss {
            1
        } else {
            enemy_count_for_wave(
                wave,
                self.configuration.base_enemy_count,
                self.configuration.enemies_per_wave,
                self.configuration.max_enemies_alive,
            )
        };

        spawn_manager.reset_spawn_points();
        self.state.phase = WavePhase::Spawning;
        self.state.spawned_this_wave = 0;
        self.state.total_enemies_this_wave = total;
        self.state.rest_remaining = Duration::ZERO;
        self.state.boss_wave = boss;

        info!(wave, total, boss, "wave started");
        out_events.push(Event::WavePhaseChanged {
            wave,
            phase: WavePhase::Spawning,
        });
        out_events.push(Event::WaveStarted { wave, total, boss });
        out_events.push(Event::EnemyCountChanged {
            alive: spawn_manager.alive_count(),
            total,
        });

        if boss {
            self.cancel_task();
            let capacity = self.configuration.max_enemies_alive;
            if spawn_manager.alive_count() >= capacity {
                warn!(wave, capacity, "no room for the boss; spawn skipped");
            } else if let Some(template) = self.configuration.boss_template.as_ref() {
                let _ = spawn_manager.spawn_enemy(
                    template,
                    wave,
                    Some(&self.configuration),
                    surroundings,
                    out_commands,
                    out_events,
                );
            }
            self.record_spawn_attempt(spawn_manager, out_events);
            self.enter_active(spawn_manager, out_events);
            return;
        }

        self.replace_task(TaskStep::Spawn {
            cooldown: Duration::ZERO,
        });
        self.run_spawn_sequence(
            Duration::ZERO,
            Duration::ZERO,
            spawn_manager,
            surroundings,
            out_commands,
            out_events,
        );
    }

    fn run_spawn_sequence(
        &mut self,
        mut cooldown: Duration,
        dt: Duration,
        spawn_manager: &mut SpawnManager,
        surroundings: &SpawnSurroundings<'_>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let interval = self.configuration.spawn_interval();
        let capacity = self.configuration.max_enemies_alive;
        let mut budget = dt;

        while self.state.spawned_this_wave < self.state.total_enemies_this_wave {
            if cooldown > budget {
                self.suspend_spawning(cooldown - budget);
                return;
            }
            budget -= cooldown;
            cooldown = Duration::ZERO;

            if spawn_manager.alive_count() >= capacity {
                debug!(
                    wave = self.state.current_wave,
                    alive = spawn_manager.alive_count(),
                    capacity,
                    "spawning suspended at capacity"
                );
                self.suspend_spawning(Duration::ZERO);
                return;
            }

            self.spawn_from_pool(spawn_manager, surroundings, out_commands, out_events);
            self.record_spawn_attempt(spawn_manager, out_events);
            cooldown = interval;
        }

        self.enter_active(spawn_manager, out_events);
    }

    fn suspend_spawning(&mut self, cooldown: Duration) {
        if let Some(task) = self.task.as_mut() {
            task.step = TaskStep::Spawn { cooldown };
        }
    }

    fn spawn_from_pool(
        &mut self,
        spawn_manager: &mut SpawnManager,
        surroundings: &SpawnSurroundings<'_>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let wave = self.state.current_wave;
        let total_weight: f32 = self
            .configuration
            .eligible_entries(wave)
            .map(|entry| entry.weight)
            .sum();
        if !(total_weight > 0.0) || !total_weight.is_finite() {
            warn!(wave, "no eligible enemy pool entry; spawn skipped");
            return;
        }

        let draw = self.rng.gen_range(0.0..total_weight);
        let Some(entry) = select_pool_entry(&self.configuration, wave, draw) else {
            warn!(wave, draw, "roulette draw matched no entry; spawn skipped");
            return;
        };

        let _ = spawn_manager.spawn_enemy(
            &entry.template,
            wave,
            Some(&self.configuration),
            surroundings,
            out_commands,
            out_events,
        );
    }

    fn record_spawn_attempt(&mut self, spawn_manager: &SpawnManager, out_events: &mut Vec<Event>) {
        self.state.spawned_this_wave = self.state.spawned_this_wave.saturating_add(1);
        out_events.push(Event::EnemyCountChanged {
            alive: spawn_manager.alive_count(),
            total: self.state.total_enemies_this_wave,
        });
    }

    fn enter_active(&mut self, spawn_manager: &SpawnManager, out_events: &mut Vec<Event>) {
        self.cancel_task();
        self.state.phase = WavePhase::Active;
        info!(
            wave = self.state.current_wave,
            alive = spawn_manager.alive_count(),
            "wave fully spawned"
        );
        out_events.push(Event::WavePhaseChanged {
            wave: self.state.current_wave,
            phase: WavePhase::Active,
        });

        if spawn_manager.alive_count() == 0 {
            self.clear_wave(out_events);
        }
    }

    fn clear_wave(&mut self, out_events: &mut Vec<Event>) {
        let wave = self.state.current_wave;
        info!(wave, "wave cleared");
        out_events.push(Event::WaveCleared { wave });

        self.state.current_wave = wave.saturating_add(1);
        self.enter_rest(out_events);
    }

    fn replace_task(&mut self, step: TaskStep) {
        self.cancel_task();
        self.task = Some(PhaseTask {
            token: CancellationToken::new(),
            step,
        });
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.token.cancel();
        }
    }
}

/// Roulette-wheel selection over the entries eligible on `wave`.
///
/// Returns the first entry, in pool order, whose cumulative weight meets or
/// exceeds `draw`. A draw past the total weight yields the last eligible entry.
#[must_use]
pub fn select_pool_entry(
    configuration: &WaveConfiguration,
    wave: u32,
    draw: f32,
) -> Option<&PoolEntry> {
    let mut cumulative = 0.0;
    let mut last = None;
    for entry in configuration.eligible_entries(wave) {
        cumulative += entry.weight;
        if cumulative >= draw {
            return Some(entry);
        }
        last = Some(entry);
    }
    last
}
