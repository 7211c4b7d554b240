use std::{fmt, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use wave_arena_core::{Command, Event, ProgressStore, WavePhase};
use wave_arena_system_arena_trigger::{self as arena_trigger, ArenaTrigger};
use wave_arena_system_spawn_manager::{SpawnManager, SpawnSurroundings};
use wave_arena_system_wave_controller::WaveController;
use wave_arena_world::{self as world, query, World};

use crate::scenario::Scenario;

/// Parameters of a scripted session.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Settings {
    /// Simulated time advanced per tick.
    pub(crate) tick: Duration,
    /// Session length in simulated time.
    pub(crate) duration: Duration,
    /// Delay between two kills by the scripted player.
    pub(crate) kill_interval: Duration,
    /// Player damage per second per point of enemy contact damage.
    pub(crate) exposure: f32,
    /// Seed for every random stream of the session.
    pub(crate) seed: u64,
    /// Whether the run resumes from stored progress.
    pub(crate) resume: bool,
}

/// Counters describing a finished session.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) elapsed: Duration,
    pub(crate) waves_cleared: u32,
    pub(crate) last_wave: u32,
    pub(crate) enemies_spawned: u32,
    pub(crate) enemies_killed: u32,
    pub(crate) experience: u64,
    pub(crate) player_died: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "simulated time   {:.1}s", self.elapsed.as_secs_f32())?;
        writeln!(f, "waves cleared    {}", self.waves_cleared)?;
        writeln!(f, "last wave        {}", self.last_wave)?;
        writeln!(f, "enemies spawned  {}", self.enemies_spawned)?;
        writeln!(f, "enemies killed   {}", self.enemies_killed)?;
        writeln!(f, "experience       {}", self.experience)?;
        write!(
            f,
            "outcome          {}",
            if self.player_died {
                "player died"
            } else {
                "survived"
            }
        )
    }
}

/// Headless session pumping commands and events through every system.
pub(crate) struct Simulation<S> {
    world: World,
    spawn_manager: SpawnManager,
    controller: WaveController,
    trigger: ArenaTrigger,
    store: S,
    player: ScriptedPlayer,
    settings: Settings,
    summary: RunSummary,
}

impl<S: ProgressStore> Simulation<S> {
    /// Builds a session for the scenario, persisting progress into `store`.
    pub(crate) fn new(scenario: Scenario, settings: Settings, store: S) -> Self {
        let arena_center = (scenario.arena.bounds.min + scenario.arena.bounds.max) * 0.5;
        Self {
            world: World::new(scenario.arena),
            spawn_manager: SpawnManager::new(scenario.spawning.config(settings.seed)),
            controller: WaveController::new(scenario.waves, settings.seed.rotate_left(17)),
            trigger: ArenaTrigger::new(arena_trigger::Config::new(settings.resume)),
            store,
            player: ScriptedPlayer {
                destination: arena_center,
                since_last_kill: Duration::ZERO,
                rng: ChaCha8Rng::seed_from_u64(settings.seed.rotate_left(41)),
            },
            settings,
            summary: RunSummary::default(),
        }
    }

    /// Walks the player into the arena and runs until time is up or the
    /// player dies.
    pub(crate) fn run(&mut self) -> RunSummary {
        self.command(Command::MovePlayer {
            position: self.player.destination,
        });

        while self.summary.elapsed < self.settings.duration && !self.summary.player_died {
            self.command(Command::Tick {
                dt: self.settings.tick,
            });
            self.summary.elapsed = query::elapsed(&self.world);
            self.act();
        }

        let mut commands = Vec::new();
        let mut events = Vec::new();
        self.trigger.deactivate(
            &mut self.controller,
            &mut self.spawn_manager,
            &mut commands,
            &mut events,
        );
        self.record(&events);
        self.apply(commands);

        self.summary.last_wave = self.controller.current_wave();
        info!(
            waves_cleared = self.summary.waves_cleared,
            last_wave = self.summary.last_wave,
            player_died = self.summary.player_died,
            "session finished"
        );
        self.summary
    }

    /// Consumes the session, returning the progress store.
    pub(crate) fn into_store(self) -> S {
        self.store
    }

    fn act(&mut self) {
        self.player.since_last_kill += self.settings.tick;
        while self.player.since_last_kill >= self.settings.kill_interval {
            self.player.since_last_kill -= self.settings.kill_interval;
            let targets = query::enemy_positions(&self.world);
            if targets.is_empty() {
                self.player.since_last_kill = Duration::ZERO;
                break;
            }
            let (enemy, _) = targets[self.player.rng.gen_range(0..targets.len())];
            self.command(Command::DamageEnemy {
                enemy,
                amount: f32::MAX,
            });
        }

        let contact: f32 = query::enemy_view(&self.world)
            .iter()
            .map(|enemy| enemy.stats.contact_damage)
            .sum();
        let damage = contact * self.settings.exposure * self.settings.tick.as_secs_f32();
        if damage > 0.0 {
            self.command(Command::DamagePlayer { amount: damage });
        }
    }

    fn command(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.pump(events);
    }

    fn apply(&mut self, commands: Vec<Command>) {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        self.pump(events);
    }

    fn pump(&mut self, mut world_events: Vec<Event>) {
        while !world_events.is_empty() {
            let mut signals = Vec::new();
            self.spawn_manager.handle(&world_events, &mut signals);

            let mut controller_inputs = world_events.clone();
            controller_inputs.extend(signals.iter().cloned());

            let mut commands = Vec::new();
            let mut wave_events = Vec::new();
            {
                let positions = query::enemy_positions(&self.world);
                let surroundings = SpawnSurroundings::new(
                    query::spawn_points(&self.world),
                    &positions,
                    &self.world,
                );
                self.controller.handle(
                    &controller_inputs,
                    &mut self.spawn_manager,
                    &surroundings,
                    &mut commands,
                    &mut wave_events,
                );
            }

            let mut trigger_inputs = world_events.clone();
            trigger_inputs.extend(wave_events.iter().cloned());
            let mut trigger_events = Vec::new();
            self.trigger.handle(
                &trigger_inputs,
                &mut self.controller,
                &mut self.spawn_manager,
                &mut self.store,
                &mut commands,
                &mut trigger_events,
            );

            self.record(&world_events);
            self.record(&wave_events);
            self.record(&trigger_events);

            let mut next = Vec::new();
            for command in commands {
                world::apply(&mut self.world, command, &mut next);
            }
            world_events = next;
        }
    }

    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::EnemySpawned { .. } => self.summary.enemies_spawned += 1,
                Event::EnemyDied { experience, .. } => {
                    self.summary.enemies_killed += 1;
                    self.summary.experience += u64::from(*experience);
                }
                Event::WaveCleared { .. } => self.summary.waves_cleared += 1,
                Event::PlayerDied => self.summary.player_died = true,
                Event::WavePhaseChanged {
                    wave,
                    phase: WavePhase::Spawning,
                } => debug!(wave, "spawning"),
                Event::ProgressSaved {
                    current_wave,
                    max_wave_reached,
                } => debug!(current_wave, max_wave_reached, "progress saved"),
                _ => {}
            }
        }
    }
}

struct ScriptedPlayer {
    destination: wave_arena_core::Vec3,
    since_last_kill: Duration,
    rng: ChaCha8Rng,
}
