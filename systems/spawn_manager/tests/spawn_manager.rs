use std::collections::HashSet;

use wave_arena_core::{
    ArenaLayout, Command, EnemyId, EnemyStats, EnemyTemplate, Event, Locomotion, TemplateId, Vec3,
    WaveConfiguration,
};
use wave_arena_system_spawn_manager::{Config, SpawnManager, SpawnSurroundings};
use wave_arena_world::{self as world, query, World};

fn template(name: &str, locomotion: Locomotion) -> EnemyTemplate {
    EnemyTemplate {
        id: TemplateId::new(name),
        stats: EnemyStats::default(),
        locomotion,
    }
}

fn spawn(
    manager: &mut SpawnManager,
    world: &mut World,
    template: &EnemyTemplate,
    wave: u32,
    configuration: Option<&WaveConfiguration>,
) -> (Option<EnemyId>, Vec<Event>) {
    let mut commands = Vec::new();
    let mut events = Vec::new();
    let spawned = {
        let positions = query::enemy_positions(world);
        let surroundings =
            SpawnSurroundings::new(query::spawn_points(world), &positions, &*world);
        manager.spawn_enemy(
            template,
            wave,
            configuration,
            &surroundings,
            &mut commands,
            &mut events,
        )
    };
    for command in commands {
        world::apply(world, command, &mut events);
    }
    (spawned, events)
}

fn spawned_position(events: &[Event]) -> Vec3 {
    events
        .iter()
        .find_map(|event| match event {
            Event::EnemySpawned { position, .. } => Some(*position),
            _ => None,
        })
        .expect("spawn confirmed by the world")
}

fn kill(world: &mut World, enemies: &[EnemyId]) -> Vec<Event> {
    let mut events = Vec::new();
    for enemy in enemies {
        world::apply(
            world,
            Command::DamageEnemy {
                enemy: *enemy,
                amount: f32::MAX,
            },
            &mut events,
        );
    }
    events
}

fn two_point_layout() -> ArenaLayout {
    ArenaLayout {
        spawn_points: vec![Vec3::new(-10.0, 2.0, 0.0), Vec3::new(10.0, 2.0, 0.0)],
        ..ArenaLayout::default()
    }
}

#[test]
fn every_spawn_point_is_used_before_any_repeats() {
    let mut world = World::default();
    let mut manager = SpawnManager::new(Config::new(0.0, 0x5eed));
    let flyer = template("wisp", Locomotion::Airborne);
    let authored: HashSet<[u32; 3]> = query::spawn_points(&world)
        .iter()
        .map(|point| point.position.to_array().map(f32::to_bits))
        .collect();

    for round in 0..3 {
        let mut used = HashSet::new();
        for _ in 0..authored.len() {
            let (_, events) = spawn(&mut manager, &mut world, &flyer, 1, None);
            let position = spawned_position(&events).to_array().map(f32::to_bits);
            assert!(used.insert(position), "round {round} repeated a point");
        }
        assert_eq!(used, authored, "round {round} missed a spawn point");
    }
}

#[test]
fn separation_prefers_uncrowded_points() {
    let mut world = World::new(two_point_layout());
    let mut manager = SpawnManager::new(Config::new(5.0, 7));
    let flyer = template("wisp", Locomotion::Airborne);

    let (_, events) = spawn(&mut manager, &mut world, &flyer, 1, None);
    let occupied = spawned_position(&events);
    manager.reset_spawn_points();

    let positions = query::enemy_positions(&world);
    let surroundings = SpawnSurroundings::new(query::spawn_points(&world), &positions, &world);
    let selection = manager
        .select_spawn_point(&surroundings)
        .expect("points available");

    assert!(!selection.fallback);
    assert!(selection.point.position.distance(occupied) >= 5.0);
}

#[test]
fn crowded_arena_falls_back_to_any_point() {
    let mut world = World::new(two_point_layout());
    let mut manager = SpawnManager::new(Config::new(5.0, 11));
    let flyer = template("wisp", Locomotion::Airborne);

    let _ = spawn(&mut manager, &mut world, &flyer, 1, None);
    let _ = spawn(&mut manager, &mut world, &flyer, 1, None);

    let positions = query::enemy_positions(&world);
    let surroundings = SpawnSurroundings::new(query::spawn_points(&world), &positions, &world);
    let selection = manager
        .select_spawn_point(&surroundings)
        .expect("fallback still yields a point");

    assert!(selection.fallback);
}

#[test]
fn ground_bound_enemies_land_on_the_floor() {
    let mut world = World::default();
    let mut manager = SpawnManager::new(Config::new(0.0, 3).with_ground_probe(10.0, 0.5));

    let (_, walker) = spawn(
        &mut manager,
        &mut world,
        &template("grunt", Locomotion::Ground),
        1,
        None,
    );
    let (_, flyer) = spawn(
        &mut manager,
        &mut world,
        &template("wisp", Locomotion::Airborne),
        1,
        None,
    );

    assert_eq!(spawned_position(&walker).y, 0.5);
    assert_eq!(spawned_position(&flyer).y, 2.0);
}

#[test]
fn enemies_are_constructed_with_wave_scaled_stats() {
    let mut world = World::default();
    let mut manager = SpawnManager::new(Config::default());
    let configuration = WaveConfiguration {
        health_scale_per_wave: 0.15,
        ..WaveConfiguration::default()
    };

    let (spawned, _) = spawn(
        &mut manager,
        &mut world,
        &template("grunt", Locomotion::Ground),
        4,
        Some(&configuration),
    );

    let enemies = query::enemy_view(&world).into_vec();
    assert_eq!(enemies.len(), 1);
    assert_eq!(Some(enemies[0].id), spawned);
    assert_eq!(enemies[0].wave, 4);
    assert!((enemies[0].health - 145.0).abs() < 1e-3);
}

#[test]
fn simultaneous_deaths_report_all_dead_once() {
    let mut world = World::default();
    let mut manager = SpawnManager::new(Config::new(0.0, 21));
    let grunt = template("grunt", Locomotion::Ground);

    let mut enemies = Vec::new();
    for _ in 0..3 {
        let (spawned, _) = spawn(&mut manager, &mut world, &grunt, 1, None);
        enemies.push(spawned.expect("spawn points available"));
    }
    assert_eq!(manager.alive_count(), 3);

    let deaths = kill(&mut world, &enemies);
    let mut reported = Vec::new();
    manager.handle(&deaths, &mut reported);

    assert_eq!(
        reported,
        vec![
            Event::AliveCountChanged { alive: 2 },
            Event::AliveCountChanged { alive: 1 },
            Event::AliveCountChanged { alive: 0 },
            Event::AllEnemiesDead,
        ]
    );

    let mut replayed = Vec::new();
    manager.handle(&deaths, &mut replayed);
    assert!(replayed.is_empty(), "stale deaths must not re-fire");
}

#[test]
fn untracked_deaths_are_ignored() {
    let mut manager = SpawnManager::new(Config::default());
    let mut reported = Vec::new();

    manager.handle(
        &[Event::EnemyDied {
            enemy: EnemyId::new(42),
            experience: 10,
        }],
        &mut reported,
    );

    assert!(reported.is_empty());
    assert_eq!(manager.alive_count(), 0);
}

#[test]
fn destroying_all_enemies_is_not_a_clear() {
    let mut world = World::default();
    let mut manager = SpawnManager::new(Config::new(0.0, 5));
    let grunt = template("grunt", Locomotion::Ground);
    for _ in 0..4 {
        let _ = spawn(&mut manager, &mut world, &grunt, 2, None);
    }

    let mut commands = Vec::new();
    let mut reported = Vec::new();
    manager.destroy_all_enemies(&mut commands, &mut reported);

    assert_eq!(manager.alive_count(), 0);
    assert_eq!(reported, vec![Event::AliveCountChanged { alive: 0 }]);
    assert_eq!(commands.len(), 4);

    let mut world_events = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut world_events);
    }
    assert_eq!(query::enemy_count(&world), 0);

    let mut after = Vec::new();
    manager.handle(&world_events, &mut after);
    assert!(after.is_empty(), "teardown despawns are already untracked");
}

#[test]
fn arena_without_spawn_points_skips_the_spawn() {
    let mut world = World::new(ArenaLayout {
        spawn_points: Vec::new(),
        ..ArenaLayout::default()
    });
    let mut manager = SpawnManager::new(Config::default());

    let (spawned, events) = spawn(
        &mut manager,
        &mut world,
        &template("grunt", Locomotion::Ground),
        1,
        None,
    );

    assert_eq!(spawned, None);
    assert!(events.is_empty());
    assert_eq!(manager.alive_count(), 0);
}

#[test]
fn identical_seeds_choose_identical_points() {
    let flyer = template("wisp", Locomotion::Airborne);
    let run = |seed: u64| {
        let mut world = World::default();
        let mut manager = SpawnManager::new(Config::new(0.0, seed));
        (0..12)
            .map(|_| spawned_position(&spawn(&mut manager, &mut world, &flyer, 1, None).1))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(0xfeed), run(0xfeed));
}
