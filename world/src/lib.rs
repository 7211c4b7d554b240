#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative arena state.
//!
//! The world owns the player, the live enemies, and the static arena layout.
//! It is mutated exclusively through [`apply`] and observed through the
//! [`query`] functions and the [`GroundQuery`] port.

use std::time::Duration;

use tracing::debug;
use wave_arena_core::{
    ArenaBounds, ArenaLayout, Command, EnemyId, Event, GroundQuery, GroundSurface,
    ScaledEnemyStats, SpawnPoint, SpawnPointId, TemplateId, Vec3,
};

/// Represents the authoritative arena state.
#[derive(Debug)]
pub struct World {
    bounds: ArenaBounds,
    spawn_points: Vec<SpawnPoint>,
    ground: Vec<GroundSurface>,
    player: Player,
    enemies: Vec<Enemy>,
    tick_index: u64,
    elapsed: Duration,
}

impl World {
    /// Creates a world from the provided arena layout.
    #[must_use]
    pub fn new(layout: ArenaLayout) -> Self {
        let spawn_points = layout
            .spawn_points
            .iter()
            .enumerate()
            .map(|(index, position)| SpawnPoint {
                id: SpawnPointId::new(index as u32),
                position: *position,
            })
            .collect();

        Self {
            bounds: layout.bounds,
            spawn_points,
            ground: layout.ground,
            player: Player::new(layout.player_start, layout.player_health),
            enemies: Vec::new(),
            tick_index: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn enemy_index(&self, enemy: EnemyId) -> Option<usize> {
        self.enemies.iter().position(|candidate| candidate.id == enemy)
    }

    fn move_player(&mut self, position: Vec3, out_events: &mut Vec<Event>) {
        self.player.position = position;
        if !self.player.alive {
            return;
        }

        let inside = self.bounds.contains(position);
        if inside && !self.player.in_arena {
            self.player.in_arena = true;
            out_events.push(Event::PlayerEnteredArena);
        } else if !inside && self.player.in_arena {
            self.player.in_arena = false;
            out_events.push(Event::PlayerExitedArena);
        }
    }

    fn damage_player(&mut self, amount: f32, out_events: &mut Vec<Event>) {
        if !self.player.alive {
            return;
        }

        self.player.health -= amount;
        if self.player.health <= 0.0 {
            self.player.health = 0.0;
            self.player.alive = false;
            out_events.push(Event::PlayerDied);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(ArenaLayout::default())
    }
}

impl GroundQuery for World {
    fn ground_below(&self, origin: Vec3, max_distance: f32) -> Option<Vec3> {
        let floor = origin.y - max_distance.max(0.0);
        self.ground
            .iter()
            .filter(|surface| {
                surface.covers(origin) && surface.height <= origin.y && surface.height >= floor
            })
            .map(|surface| surface.height)
            .fold(None, |highest: Option<f32>, height| {
                Some(highest.map_or(height, |current| current.max(height)))
            })
            .map(|height| Vec3::new(origin.x, height, origin.z))
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::MovePlayer { position } => world.move_player(position, out_events),
        Command::DamagePlayer { amount } => world.damage_player(amount, out_events),
        Command::SpawnEnemy {
            enemy,
            template,
            position,
            stats,
        } => {
            if world.enemy_index(enemy).is_some() {
                debug!(enemy = enemy.get(), "duplicate enemy spawn ignored");
                return;
            }

            world
                .enemies
                .push(Enemy::spawn(enemy, template.clone(), position, stats));
            out_events.push(Event::EnemySpawned {
                enemy,
                template,
                position,
            });
        }
        Command::DamageEnemy { enemy, amount } => {
            let Some(index) = world.enemy_index(enemy) else {
                return;
            };

            let target = &mut world.enemies[index];
            target.health -= amount;
            if target.health <= 0.0 {
                let dead = world.enemies.remove(index);
                out_events.push(Event::EnemyDied {
                    enemy,
                    experience: dead.stats.stats().experience,
                });
            }
        }
        Command::DespawnEnemy { enemy } => {
            if let Some(index) = world.enemy_index(enemy) {
                let _ = world.enemies.remove(index);
                out_events.push(Event::EnemyDespawned { enemy });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use wave_arena_core::{EnemyId, EnemyStats, SpawnPoint, TemplateId, Vec3};

    /// Spawn points authored in the arena layout, ordered by identifier.
    #[must_use]
    pub fn spawn_points(world: &World) -> &[SpawnPoint] {
        &world.spawn_points
    }

    /// Positions of every live enemy, ordered by identifier.
    #[must_use]
    pub fn enemy_positions(world: &World) -> Vec<(EnemyId, Vec3)> {
        let mut positions: Vec<(EnemyId, Vec3)> = world
            .enemies
            .iter()
            .map(|enemy| (enemy.id, enemy.position))
            .collect();
        positions.sort_by_key(|(id, _)| *id);
        positions
    }

    /// Captures a read-only view of the live enemies.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let mut snapshots: Vec<EnemySnapshot> = world
            .enemies
            .iter()
            .map(|enemy| EnemySnapshot {
                id: enemy.id,
                template: enemy.template.clone(),
                position: enemy.position,
                stats: *enemy.stats.stats(),
                wave: enemy.stats.wave(),
                health: enemy.health,
            })
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        EnemyView { snapshots }
    }

    /// Number of live enemies.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.enemies.len()
    }

    /// Captures the player's state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            position: world.player.position,
            health: world.player.health,
            alive: world.player.alive,
            in_arena: world.player.in_arena,
        }
    }

    /// Total simulated time.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Read-only snapshot describing all live enemies.
    #[derive(Clone, Debug, Default)]
    pub struct EnemyView {
        snapshots: Vec<EnemySnapshot>,
    }

    impl EnemyView {
        /// Iterator over the captured snapshots in identifier order.
        pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<EnemySnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single enemy.
    #[derive(Clone, Debug, PartialEq)]
    pub struct EnemySnapshot {
        /// Identifier of the enemy.
        pub id: EnemyId,
        /// Template the enemy was built from.
        pub template: TemplateId,
        /// Current position.
        pub position: Vec3,
        /// Stats the enemy was constructed with.
        pub stats: EnemyStats,
        /// Wave the stats were scaled for.
        pub wave: u32,
        /// Remaining health.
        pub health: f32,
    }

    /// Immutable representation of the player.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct PlayerSnapshot {
        /// Current position.
        pub position: Vec3,
        /// Remaining health.
        pub health: f32,
        /// Whether the player is alive.
        pub alive: bool,
        /// Whether the player is inside the arena bounds.
        pub in_arena: bool,
    }
}

#[derive(Clone, Debug)]
struct Player {
    position: Vec3,
    health: f32,
    alive: bool,
    in_arena: bool,
}

impl Player {
    fn new(position: Vec3, health: f32) -> Self {
        Self {
            position,
            health,
            alive: health > 0.0,
            in_arena: false,
        }
    }
}

#[derive(Clone, Debug)]
struct Enemy {
    id: EnemyId,
    template: TemplateId,
    position: Vec3,
    stats: ScaledEnemyStats,
    health: f32,
}

impl Enemy {
    fn spawn(id: EnemyId, template: TemplateId, position: Vec3, stats: ScaledEnemyStats) -> Self {
        Self {
            id,
            template,
            position,
            health: stats.stats().max_health,
            stats,
        }
    }
}
