use std::{io, time::Duration};

use wave_arena_core::{
    Command, EnemyTemplate, Event, PoolEntry, ProgressStore, TemplateId, Vec3,
    WaveConfiguration, WavePhase,
};
use wave_arena_persistence::{MemoryProgressStore, ProgressRecord};
use wave_arena_system_arena_trigger::{ArenaTrigger, Config};
use wave_arena_system_spawn_manager::{self as spawn_manager, SpawnManager, SpawnSurroundings};
use wave_arena_system_wave_controller::WaveController;
use wave_arena_world::{self as world, query, World};

struct Harness<S> {
    world: World,
    spawn_manager: SpawnManager,
    controller: WaveController,
    trigger: ArenaTrigger,
    store: S,
    log: Vec<Event>,
}

impl<S: ProgressStore> Harness<S> {
    fn new(store: S, config: Config) -> Self {
        Self {
            world: World::default(),
            spawn_manager: SpawnManager::new(spawn_manager::Config::new(0.0, 17)),
            controller: WaveController::new(configuration(), 29),
            trigger: ArenaTrigger::new(config),
            store,
            log: Vec::new(),
        }
    }

    fn command(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.pump(events);
    }

    fn enter(&mut self) {
        self.command(Command::MovePlayer {
            position: Vec3::ZERO,
        });
    }

    fn leave(&mut self) {
        self.command(Command::MovePlayer {
            position: Vec3::new(0.0, 0.0, -30.0),
        });
    }

    fn tick(&mut self) {
        self.command(Command::Tick {
            dt: Duration::from_millis(100),
        });
    }

    fn kill_all(&mut self) {
        let mut events = Vec::new();
        for (enemy, _) in query::enemy_positions(&self.world) {
            world::apply(
                &mut self.world,
                Command::DamageEnemy {
                    enemy,
                    amount: f32::MAX,
                },
                &mut events,
            );
        }
        self.pump(events);
    }

    fn pump(&mut self, mut world_events: Vec<Event>) {
        while !world_events.is_empty() {
            let mut signals = Vec::new();
            self.spawn_manager.handle(&world_events, &mut signals);

            let mut inputs = world_events.clone();
            inputs.extend(signals.iter().cloned());

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
                    &inputs,
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

            self.log.extend(world_events);
            self.log.extend(signals);
            self.log.extend(wave_events);
            self.log.extend(trigger_events);

            let mut next = Vec::new();
            for command in commands {
                world::apply(&mut self.world, command, &mut next);
            }
            world_events = next;
        }
    }
}

fn configuration() -> WaveConfiguration {
    WaveConfiguration {
        enemy_pool: vec![PoolEntry {
            template: EnemyTemplate {
                id: TemplateId::new("grunt"),
                ..EnemyTemplate::default()
            },
            weight: 1.0,
            min_wave: 1,
        }],
        rest_seconds: 0.0,
        spawn_interval_seconds: 0.0,
        boss_wave_interval: 0,
        ..WaveConfiguration::default()
    }
}

fn saved(current_wave: u32, max_wave_reached: u32) -> MemoryProgressStore {
    MemoryProgressStore::with_record(ProgressRecord {
        current_wave: Some(current_wave),
        max_wave_reached,
    })
}

#[derive(Debug, Default)]
struct ReadOnlyStore {
    current_wave: Option<u32>,
    max_wave_reached: u32,
}

impl ProgressStore for ReadOnlyStore {
    type Error = io::Error;

    fn current_wave(&self) -> Option<u32> {
        self.current_wave
    }

    fn max_wave_reached(&self) -> u32 {
        self.max_wave_reached
    }

    fn set_current_wave(&mut self, wave: u32) {
        self.current_wave = Some(wave);
    }

    fn set_max_wave_reached(&mut self, wave: u32) {
        self.max_wave_reached = wave;
    }

    fn save(&mut self) -> Result<(), Self::Error> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

#[test]
fn entering_without_saved_progress_starts_at_wave_one() {
    let mut harness = Harness::new(MemoryProgressStore::new(), Config::default());
    harness.enter();

    assert!(harness.trigger.is_active());
    assert_eq!(harness.controller.current_wave(), 1);
    assert_eq!(harness.controller.phase(), WavePhase::Rest);
}

#[test]
fn entering_resumes_saved_wave() {
    let mut harness = Harness::new(saved(7, 7), Config::default());
    harness.enter();
    harness.tick();

    assert_eq!(harness.controller.current_wave(), 7);
    assert!(harness.log.contains(&Event::WaveStarted {
        wave: 7,
        total: 15,
        boss: false,
    }));
}

#[test]
fn resume_can_be_disabled() {
    let mut harness = Harness::new(saved(7, 7), Config::new(false));
    harness.enter();

    assert_eq!(harness.controller.current_wave(), 1);
}

#[test]
fn cleared_waves_persist_the_next_wave() {
    let mut harness = Harness::new(saved(2, 5), Config::default());
    harness.enter();
    harness.tick();
    harness.kill_all();

    assert_eq!(
        harness.store.saved(),
        ProgressRecord {
            current_wave: Some(3),
            max_wave_reached: 5,
        }
    );

    for _ in 0..3 {
        harness.kill_all();
    }

    assert_eq!(
        harness.store.saved(),
        ProgressRecord {
            current_wave: Some(6),
            max_wave_reached: 6,
        }
    );
    assert_eq!(harness.store.saves(), 4);
    assert!(harness.log.contains(&Event::ProgressSaved {
        current_wave: 6,
        max_wave_reached: 6,
    }));
}

#[test]
fn player_death_tears_the_run_down() {
    let mut harness = Harness::new(MemoryProgressStore::new(), Config::default());
    harness.enter();
    harness.tick();
    assert!(query::enemy_count(&harness.world) > 0);

    harness.command(Command::DamagePlayer { amount: 1_000.0 });

    assert!(!harness.trigger.is_active());
    assert_eq!(harness.controller.phase(), WavePhase::Idle);
    assert_eq!(harness.spawn_manager.alive_count(), 0);
    assert_eq!(query::enemy_count(&harness.world), 0);

    harness.log.clear();
    for _ in 0..10 {
        harness.tick();
    }
    assert!(!harness
        .log
        .iter()
        .any(|event| matches!(event, Event::EnemySpawned { .. })));
    assert_eq!(harness.store.saves(), 0);
}

#[test]
fn leaving_and_returning_resumes_from_the_last_clear() {
    let mut harness = Harness::new(MemoryProgressStore::new(), Config::default());
    harness.enter();
    harness.tick();
    harness.kill_all();
    harness.kill_all();
    assert_eq!(harness.controller.current_wave(), 3);

    harness.leave();
    assert!(!harness.trigger.is_active());
    assert_eq!(harness.controller.phase(), WavePhase::Idle);
    assert_eq!(query::enemy_count(&harness.world), 0);

    harness.enter();
    assert!(harness.trigger.is_active());
    assert_eq!(harness.controller.current_wave(), 3);
}

#[test]
fn explicit_deactivation_is_idempotent() {
    let mut harness = Harness::new(MemoryProgressStore::new(), Config::default());
    harness.enter();
    harness.tick();

    let mut commands = Vec::new();
    let mut events = Vec::new();
    harness.trigger.deactivate(
        &mut harness.controller,
        &mut harness.spawn_manager,
        &mut commands,
        &mut events,
    );
    let first = commands.len();
    harness.trigger.deactivate(
        &mut harness.controller,
        &mut harness.spawn_manager,
        &mut commands,
        &mut events,
    );

    assert!(first > 0);
    assert_eq!(commands.len(), first);
    assert_eq!(harness.controller.phase(), WavePhase::Idle);
}

#[test]
fn failed_save_does_not_stop_the_run() {
    let mut harness = Harness::new(ReadOnlyStore::default(), Config::default());
    harness.enter();
    harness.tick();
    harness.kill_all();

    assert!(harness.trigger.is_active());
    assert_eq!(harness.controller.current_wave(), 2);
    assert!(!harness
        .log
        .iter()
        .any(|event| matches!(event, Event::ProgressSaved { .. })));
    assert_eq!(harness.store.current_wave, Some(2));
}
