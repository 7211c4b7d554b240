#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn manager responsible for creating enemies and tracking the living.
//!
//! The manager is the only owner of the alive-enemy set. It allocates enemy
//! identifiers, picks spawn points, binds wave-scaled stats at construction
//! time, and listens to the world's death signals to report
//! [`Event::AliveCountChanged`] and [`Event::AllEnemiesDead`].

use std::collections::{BTreeMap, HashSet};

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use wave_arena_core::{
    Command, EnemyId, EnemyTemplate, Event, GroundQuery, Locomotion, SpawnPoint, SpawnPointId,
    TemplateId, Vec3, WaveConfiguration,
};
use wave_arena_system_scaling::scaled_stats;

const DEFAULT_MIN_SPAWN_SEPARATION: f32 = 4.0;
const DEFAULT_GROUND_PROBE_DISTANCE: f32 = 50.0;
const DEFAULT_GROUND_CLEARANCE: f32 = 0.5;

/// Configuration parameters required to construct the spawn manager.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    min_spawn_separation: f32,
    ground_probe_distance: f32,
    ground_clearance: f32,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration with the provided separation and seed.
    #[must_use]
    pub const fn new(min_spawn_separation: f32, rng_seed: u64) -> Self {
        Self {
            min_spawn_separation,
            ground_probe_distance: DEFAULT_GROUND_PROBE_DISTANCE,
            ground_clearance: DEFAULT_GROUND_CLEARANCE,
            rng_seed,
        }
    }

    /// Overrides how far below a spawn point the ground is searched and how
    /// high above the hit ground-bound enemies are placed.
    #[must_use]
    pub const fn with_ground_probe(mut self, probe_distance: f32, clearance: f32) -> Self {
        self.ground_probe_distance = probe_distance;
        self.ground_clearance = clearance;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SPAWN_SEPARATION, 0)
    }
}

/// Read-only view of everything spawn placement depends on.
pub struct SpawnSurroundings<'a> {
    spawn_points: &'a [SpawnPoint],
    enemy_positions: &'a [(EnemyId, Vec3)],
    ground: &'a dyn GroundQuery,
}

impl<'a> SpawnSurroundings<'a> {
    /// Bundles spawn points, the current enemy positions, and the ground query.
    #[must_use]
    pub fn new(
        spawn_points: &'a [SpawnPoint],
        enemy_positions: &'a [(EnemyId, Vec3)],
        ground: &'a dyn GroundQuery,
    ) -> Self {
        Self {
            spawn_points,
            enemy_positions,
            ground,
        }
    }
}

/// Spawn point chosen for a spawn attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnSelection {
    /// Chosen point.
    pub point: SpawnPoint,
    /// Whether no point satisfied the separation constraint and a random one
    /// was taken instead.
    pub fallback: bool,
}

/// Owner of the alive-enemy set.
#[derive(Debug)]
pub struct SpawnManager {
    config: Config,
    tracked: BTreeMap<EnemyId, TrackedEnemy>,
    recently_used: HashSet<SpawnPointId>,
    next_enemy_id: u32,
    rng: ChaCha8Rng,
}

#[derive(Clone, Debug)]
struct TrackedEnemy {
    template: TemplateId,
    spawn_position: Vec3,
}

impl SpawnManager {
    /// Creates a spawn manager with no tracked enemies.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tracked: BTreeMap::new(),
            recently_used: HashSet::new(),
            next_enemy_id: 0,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Number of tracked enemies.
    #[must_use]
    pub fn alive_count(&self) -> u32 {
        u32::try_from(self.tracked.len()).unwrap_or(u32::MAX)
    }

    /// Reports whether the enemy is currently tracked.
    #[must_use]
    pub fn is_tracking(&self, enemy: EnemyId) -> bool {
        self.tracked.contains_key(&enemy)
    }

    /// Identifiers of the tracked enemies in ascending order.
    pub fn tracked(&self) -> impl Iterator<Item = EnemyId> + '_ {
        self.tracked.keys().copied()
    }

    /// Creates an enemy of `template` scaled for `wave` and starts tracking it.
    ///
    /// Emits the world command that constructs the enemy and a count-changed
    /// notification. Returns `None` only when the arena has no spawn points.
    pub fn spawn_enemy(
        &mut self,
        template: &EnemyTemplate,
        wave: u32,
        configuration: Option<&WaveConfiguration>,
        surroundings: &SpawnSurroundings<'_>,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) -> Option<EnemyId> {
        let Some(selection) = self.select_spawn_point(surroundings) else {
            warn!(template = %template.id, wave, "no spawn points configured; spawn skipped");
            return None;
        };

        let position = self.resolve_position(
            template.locomotion,
            selection.point.position,
            surroundings.ground,
        );
        let stats = scaled_stats(&template.stats, wave, configuration);

        let enemy = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.wrapping_add(1);
        let _ = self.tracked.insert(
            enemy,
            TrackedEnemy {
                template: template.id.clone(),
                spawn_position: position,
            },
        );

        debug!(
            enemy = enemy.get(),
            template = %template.id,
            wave,
            spawn_point = selection.point.id.get(),
            fallback = selection.fallback,
            health = stats.stats().max_health,
            "enemy spawned"
        );

        out_commands.push(Command::SpawnEnemy {
            enemy,
            template: template.id.clone(),
            position,
            stats,
        });
        out_events.push(Event::AliveCountChanged {
            alive: self.alive_count(),
        });
        Some(enemy)
    }

    /// Picks the next spawn point and marks it as recently used.
    ///
    /// Points used since the last reset are skipped until every point has been
    /// used once. Among the remaining points, in shuffled order, the first one
    /// at least the minimum separation away from every tracked enemy wins. If
    /// none qualifies a uniformly random point is taken.
    pub fn select_spawn_point(
        &mut self,
        surroundings: &SpawnSurroundings<'_>,
    ) -> Option<SpawnSelection> {
        let points = surroundings.spawn_points;
        if points.is_empty() {
            return None;
        }

        if points
            .iter()
            .all(|point| self.recently_used.contains(&point.id))
        {
            self.recently_used.clear();
        }

        let mut candidates: Vec<usize> = (0..points.len())
            .filter(|index| !self.recently_used.contains(&points[*index].id))
            .collect();
        candidates.shuffle(&mut self.rng);

        let occupied = self.occupied_positions(surroundings);
        let separation = self.config.min_spawn_separation;
        let spaced = candidates.into_iter().find(|index| {
            let position = points[*index].position;
            occupied
                .iter()
                .all(|other| other.distance(position) >= separation)
        });

        let (index, fallback) = match spaced {
            Some(index) => (index, false),
            None => {
                let index = self.rng.gen_range(0..points.len());
                warn!(
                    spawn_point = points[index].id.get(),
                    alive = occupied.len(),
                    separation,
                    "no spawn point satisfies separation; spawning crowded"
                );
                (index, true)
            }
        };

        let point = points[index];
        let _ = self.recently_used.insert(point.id);
        Some(SpawnSelection { point, fallback })
    }

    /// Forgets which spawn points were recently used.
    pub fn reset_spawn_points(&mut self) {
        self.recently_used.clear();
    }

    /// Removes every tracked enemy immediately.
    ///
    /// Emits a despawn command per enemy and a count-changed notification, but
    /// no [`Event::AllEnemiesDead`]: teardown is not a wave clear.
    pub fn destroy_all_enemies(
        &mut self,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        if self.tracked.is_empty() {
            return;
        }

        let count = self.tracked.len();
        for enemy in self.tracked.keys() {
            out_commands.push(Command::DespawnEnemy { enemy: *enemy });
        }
        self.tracked.clear();

        info!(count, "destroyed all tracked enemies");
        out_events.push(Event::AliveCountChanged { alive: 0 });
    }

    /// Consumes world events and reports changes to the alive set.
    pub fn handle(&mut self, events: &[Event], out_events: &mut Vec<Event>) {
        for event in events {
            let enemy = match event {
                Event::EnemyDied { enemy, .. } | Event::EnemyDespawned { enemy } => *enemy,
                _ => continue,
            };

            let Some(tracked) = self.tracked.remove(&enemy) else {
                continue;
            };

            debug!(
                enemy = enemy.get(),
                template = %tracked.template,
                alive = self.tracked.len(),
                "tracked enemy removed"
            );
            out_events.push(Event::AliveCountChanged {
                alive: self.alive_count(),
            });
            if self.tracked.is_empty() {
                out_events.push(Event::AllEnemiesDead);
            }
        }
    }

    fn occupied_positions(&self, surroundings: &SpawnSurroundings<'_>) -> Vec<Vec3> {
        self.tracked
            .iter()
            .map(|(enemy, tracked)| {
                surroundings
                    .enemy_positions
                    .iter()
                    .find(|(candidate, _)| candidate == enemy)
                    .map_or(tracked.spawn_position, |(_, position)| *position)
            })
            .collect()
    }

    fn resolve_position(
        &self,
        locomotion: Locomotion,
        point: Vec3,
        ground: &dyn GroundQuery,
    ) -> Vec3 {
        if locomotion != Locomotion::Ground {
            return point;
        }

        match ground.ground_below(point, self.config.ground_probe_distance) {
            Some(hit) => hit + Vec3::Y * self.config.ground_clearance,
            None => point,
        }
    }
}
