#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the wave arena.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to. Systems consume event streams, query immutable
//! snapshots, and respond with new command batches and notifications.
//!
//! Collaborators outside the simulation are reached through two ports:
//! [`GroundQuery`] for world geometry and [`ProgressStore`] for persisted
//! wave progress.

use std::{fmt, time::Duration};

pub use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Teleports the player to a new position, possibly crossing the arena bounds.
    MovePlayer {
        /// Destination of the player in world units.
        position: Vec3,
    },
    /// Applies damage to the player.
    DamagePlayer {
        /// Amount of health removed from the player.
        amount: f32,
    },
    /// Creates an enemy that was built with pre-scaled stats.
    SpawnEnemy {
        /// Identifier allocated by the spawn manager for the new enemy.
        enemy: EnemyId,
        /// Template the enemy was instantiated from.
        template: TemplateId,
        /// Resolved spawn position.
        position: Vec3,
        /// Stats bound to the enemy before its first simulation tick.
        stats: ScaledEnemyStats,
    },
    /// Applies damage to a live enemy.
    DamageEnemy {
        /// Identifier of the enemy being hit.
        enemy: EnemyId,
        /// Amount of health removed from the enemy.
        amount: f32,
    },
    /// Removes an enemy without killing it.
    DespawnEnemy {
        /// Identifier of the enemy to remove.
        enemy: EnemyId,
    },
}

/// Events broadcast by the world and by systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// The player moved into the arena trigger volume.
    PlayerEnteredArena,
    /// The player moved out of the arena trigger volume.
    PlayerExitedArena,
    /// The player's health reached zero.
    PlayerDied,
    /// Confirms that an enemy was created.
    EnemySpawned {
        /// Identifier of the new enemy.
        enemy: EnemyId,
        /// Template the enemy was instantiated from.
        template: TemplateId,
        /// Position the enemy occupies after spawning.
        position: Vec3,
    },
    /// Death signal raised when an enemy's health reaches zero.
    EnemyDied {
        /// Identifier of the enemy that died.
        enemy: EnemyId,
        /// Experience awarded for the kill.
        experience: u32,
    },
    /// Confirms that an enemy was removed by forced teardown.
    EnemyDespawned {
        /// Identifier of the enemy that was removed.
        enemy: EnemyId,
    },
    /// The number of tracked enemies changed.
    AliveCountChanged {
        /// Tracked enemies after the change.
        alive: u32,
    },
    /// The tracked enemy set transitioned from non-empty to empty through deaths.
    AllEnemiesDead,
    /// The wave controller entered a new phase.
    WavePhaseChanged {
        /// Wave the run is on.
        wave: u32,
        /// Phase that became active.
        phase: WavePhase,
    },
    /// Rest countdown progress.
    RestTimeRemaining {
        /// Time left before spawning begins.
        remaining: Duration,
    },
    /// A wave began spawning.
    WaveStarted {
        /// Wave number.
        wave: u32,
        /// Number of spawn attempts planned for the wave.
        total: u32,
        /// Whether the wave spawns the boss template.
        boss: bool,
    },
    /// Combined alive/total progress for the current wave.
    EnemyCountChanged {
        /// Tracked enemies currently alive.
        alive: u32,
        /// Number of spawn attempts planned for the wave.
        total: u32,
    },
    /// Every enemy of the wave died.
    WaveCleared {
        /// Wave that was cleared.
        wave: u32,
    },
    /// Wave progress was written to the progress store.
    ProgressSaved {
        /// Wave a resumed run would start at.
        current_wave: u32,
        /// Highest wave ever reached.
        max_wave_reached: u32,
    },
}

/// Phase of the wave loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WavePhase {
    /// Inert; no run in progress.
    #[default]
    Idle,
    /// Countdown before the next wave spawns.
    Rest,
    /// Enemies of the current wave are being spawned.
    Spawning,
    /// All spawns issued; waiting for the wave to die.
    Active,
}

/// Unique identifier assigned to a spawned enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a spawn point, equal to its index in the arena layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpawnPointId(u32);

impl SpawnPointId {
    /// Creates a new spawn point identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Name of an enemy template as authored in configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    /// Creates a template identifier from its authored name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Authored name of the template.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate location for enemy creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPoint {
    /// Identifier of the point.
    pub id: SpawnPointId,
    /// Location of the point in world units.
    pub position: Vec3,
}

/// Base combat stats of an enemy template.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyStats {
    /// Health the enemy spawns with.
    pub max_health: f32,
    /// Damage dealt on contact with the player.
    pub contact_damage: f32,
    /// Wandering speed.
    pub move_speed: f32,
    /// Speed while chasing the player.
    pub chase_speed: f32,
    /// Experience awarded on death.
    pub experience: u32,
}

impl Default for EnemyStats {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            contact_damage: 10.0,
            move_speed: 2.0,
            chase_speed: 3.5,
            experience: 10,
        }
    }
}

/// Stat block produced for a specific wave, required to construct an enemy.
///
/// The world only accepts enemies built from this type, so an enemy never
/// observes its unscaled template stats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaledEnemyStats {
    stats: EnemyStats,
    wave: u32,
}

impl ScaledEnemyStats {
    /// Wraps stats already scaled for the provided wave.
    #[must_use]
    pub const fn new(stats: EnemyStats, wave: u32) -> Self {
        Self { stats, wave }
    }

    /// Scaled stat block.
    #[must_use]
    pub const fn stats(&self) -> &EnemyStats {
        &self.stats
    }

    /// Wave the stats were scaled for.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }
}

/// How an enemy moves, which decides whether it is snapped to the ground.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locomotion {
    /// Walks on ground surfaces; spawn position is resolved against the ground.
    #[default]
    Ground,
    /// Flies; spawns exactly at the spawn point.
    Airborne,
}

/// Constructible enemy prototype.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    /// Authored name of the template.
    pub id: TemplateId,
    /// Unscaled stats.
    #[serde(default)]
    pub stats: EnemyStats,
    /// Movement mode.
    #[serde(default)]
    pub locomotion: Locomotion,
}

/// Weighted entry of the enemy pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    /// Template spawned when the entry is drawn.
    pub template: EnemyTemplate,
    /// Relative spawn weight.
    pub weight: f32,
    /// First wave the entry may be drawn on.
    #[serde(default = "first_wave")]
    pub min_wave: u32,
}

fn first_wave() -> u32 {
    1
}

/// Immutable description of how waves are composed and paced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfiguration {
    /// Weighted templates drawn for non-boss spawns.
    pub enemy_pool: Vec<PoolEntry>,
    /// Enemies spawned on wave 1.
    pub base_enemy_count: u32,
    /// Additional enemies per wave after the first.
    pub enemies_per_wave: u32,
    /// Maximum tracked enemies alive at once; also caps the wave size.
    pub max_enemies_alive: u32,
    /// Fractional health growth per wave.
    pub health_scale_per_wave: f32,
    /// Fractional contact damage growth per wave.
    pub damage_scale_per_wave: f32,
    /// Fractional move and chase speed growth per wave.
    pub speed_scale_per_wave: f32,
    /// Fractional experience growth per wave.
    pub experience_scale_per_wave: f32,
    /// Rest between waves, in seconds.
    pub rest_seconds: f32,
    /// Delay between consecutive spawns, in seconds.
    pub spawn_interval_seconds: f32,
    /// Every n-th wave is a boss wave; zero disables boss waves.
    pub boss_wave_interval: u32,
    /// Template spawned alone on boss waves.
    pub boss_template: Option<EnemyTemplate>,
}

impl Default for WaveConfiguration {
    fn default() -> Self {
        Self {
            enemy_pool: Vec::new(),
            base_enemy_count: 3,
            enemies_per_wave: 2,
            max_enemies_alive: 15,
            health_scale_per_wave: 0.15,
            damage_scale_per_wave: 0.1,
            speed_scale_per_wave: 0.02,
            experience_scale_per_wave: 0.1,
            rest_seconds: 5.0,
            spawn_interval_seconds: 0.5,
            boss_wave_interval: 5,
            boss_template: None,
        }
    }
}

impl WaveConfiguration {
    /// Rest countdown between waves. Negative or NaN input reads as zero.
    #[must_use]
    pub fn rest_duration(&self) -> Duration {
        seconds_to_duration(self.rest_seconds)
    }

    /// Delay between consecutive spawns. Negative or NaN input reads as zero.
    #[must_use]
    pub fn spawn_interval(&self) -> Duration {
        seconds_to_duration(self.spawn_interval_seconds)
    }

    /// Reports whether the provided wave spawns the boss template.
    ///
    /// A boss wave plans a single spawn. Like any other spawn it is skipped
    /// when `max_enemies_alive` leaves no room.
    #[must_use]
    pub fn is_boss_wave(&self, wave: u32) -> bool {
        self.boss_wave_interval > 0
            && self.boss_template.is_some()
            && wave > 0
            && wave % self.boss_wave_interval == 0
    }

    /// Pool entries that may be drawn on the provided wave, in pool order.
    pub fn eligible_entries(&self, wave: u32) -> impl Iterator<Item = &PoolEntry> {
        self.enemy_pool
            .iter()
            .filter(move |entry| entry.min_wave <= wave && entry.weight > 0.0)
    }

    /// Lists authoring mistakes that make waves spawn less than intended.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigurationIssue> {
        let mut issues = Vec::new();

        if self.enemy_pool.is_empty() {
            issues.push(ConfigurationIssue::EmptyPool);
        } else if self.eligible_entries(1).next().is_none() {
            issues.push(ConfigurationIssue::NoEntryForFirstWave);
        }

        for entry in &self.enemy_pool {
            if !(entry.weight > 0.0) {
                issues.push(ConfigurationIssue::NonPositiveWeight {
                    template: entry.template.id.clone(),
                    weight: entry.weight,
                });
            }
        }

        let scales = [
            ("health", self.health_scale_per_wave),
            ("damage", self.damage_scale_per_wave),
            ("speed", self.speed_scale_per_wave),
            ("experience", self.experience_scale_per_wave),
        ];
        for (stat, value) in scales {
            if value < 0.0 {
                issues.push(ConfigurationIssue::NegativeScale { stat, value });
            }
        }

        if self.boss_wave_interval > 0 && self.boss_template.is_none() {
            issues.push(ConfigurationIssue::BossIntervalWithoutTemplate {
                interval: self.boss_wave_interval,
            });
        }

        if self.max_enemies_alive == 0 {
            issues.push(ConfigurationIssue::ZeroMaxAlive);
        }

        issues
    }
}

fn seconds_to_duration(seconds: f32) -> Duration {
    Duration::try_from_secs_f32(seconds.max(0.0)).unwrap_or(Duration::ZERO)
}

/// Authoring mistakes reported by [`WaveConfiguration::validate`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigurationIssue {
    /// The pool has no entries, so non-boss waves spawn nothing.
    #[error("enemy pool is empty; non-boss waves will spawn nothing")]
    EmptyPool,
    /// Entries exist but none may appear on wave 1.
    #[error("no enemy pool entry is eligible for wave 1")]
    NoEntryForFirstWave,
    /// An entry can never be drawn.
    #[error("pool entry `{template}` has non-positive weight {weight}")]
    NonPositiveWeight {
        /// Template of the offending entry.
        template: TemplateId,
        /// Authored weight.
        weight: f32,
    },
    /// A scale factor shrinks stats as waves progress.
    #[error("{stat} scale per wave is negative ({value})")]
    NegativeScale {
        /// Name of the stat.
        stat: &'static str,
        /// Authored factor.
        value: f32,
    },
    /// Boss waves are scheduled but there is nothing to spawn.
    #[error("boss wave interval {interval} is set but no boss template is configured")]
    BossIntervalWithoutTemplate {
        /// Authored interval.
        interval: u32,
    },
    /// No enemy can ever be alive.
    #[error("max enemies alive is zero; waves will never spawn")]
    ZeroMaxAlive,
}

/// Axis-aligned trigger volume of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl ArenaBounds {
    /// Reports whether the point lies inside the volume, borders included.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Horizontal walkable rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundSurface {
    /// Minimum X of the footprint.
    pub min_x: f32,
    /// Maximum X of the footprint.
    pub max_x: f32,
    /// Minimum Z of the footprint.
    pub min_z: f32,
    /// Maximum Z of the footprint.
    pub max_z: f32,
    /// Height of the surface.
    pub height: f32,
}

impl GroundSurface {
    /// Reports whether the point's horizontal projection lies on the surface.
    #[must_use]
    pub fn covers(&self, point: Vec3) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.z >= self.min_z
            && point.z <= self.max_z
    }
}

/// Static description of the arena geometry and player setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaLayout {
    /// Trigger volume that activates the wave loop.
    pub bounds: ArenaBounds,
    /// Candidate spawn locations.
    pub spawn_points: Vec<Vec3>,
    /// Walkable surfaces used to place ground-bound enemies.
    pub ground: Vec<GroundSurface>,
    /// Where the player starts.
    pub player_start: Vec3,
    /// Health the player starts with.
    pub player_health: f32,
}

impl Default for ArenaLayout {
    fn default() -> Self {
        Self {
            bounds: ArenaBounds {
                min: Vec3::new(-20.0, -5.0, -20.0),
                max: Vec3::new(20.0, 20.0, 20.0),
            },
            spawn_points: vec![
                Vec3::new(-15.0, 2.0, -15.0),
                Vec3::new(15.0, 2.0, -15.0),
                Vec3::new(-15.0, 2.0, 15.0),
                Vec3::new(15.0, 2.0, 15.0),
            ],
            ground: vec![GroundSurface {
                min_x: -20.0,
                max_x: 20.0,
                min_z: -20.0,
                max_z: 20.0,
                height: 0.0,
            }],
            player_start: Vec3::new(0.0, 0.0, -30.0),
            player_health: 100.0,
        }
    }
}

/// World-geometry collaborator used for ground-bound spawn placement.
pub trait GroundQuery {
    /// Casts straight down from `origin` and returns the first ground hit within
    /// `max_distance`, if any.
    fn ground_below(&self, origin: Vec3, max_distance: f32) -> Option<Vec3>;
}

/// Persistence collaborator storing wave progress between runs.
pub trait ProgressStore {
    /// Error raised when the store cannot be written.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Wave a resumed run starts at, if progress was saved.
    fn current_wave(&self) -> Option<u32>;

    /// Highest wave ever reached; zero when nothing was saved.
    fn max_wave_reached(&self) -> u32;

    /// Records the wave a resumed run should start at.
    fn set_current_wave(&mut self, wave: u32);

    /// Records the highest wave reached.
    fn set_max_wave_reached(&mut self, wave: u32);

    /// Flushes recorded values to the backing storage.
    fn save(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str) -> EnemyTemplate {
        EnemyTemplate {
            id: TemplateId::new(name),
            ..EnemyTemplate::default()
        }
    }

    #[test]
    fn boss_waves_follow_interval() {
        let config = WaveConfiguration {
            boss_wave_interval: 5,
            boss_template: Some(template("brute")),
            ..WaveConfiguration::default()
        };
        let bosses: Vec<u32> = (1..=15).filter(|wave| config.is_boss_wave(*wave)).collect();
        assert_eq!(bosses, vec![5, 10, 15]);
    }

    #[test]
    fn boss_waves_require_template() {
        let config = WaveConfiguration {
            boss_wave_interval: 5,
            boss_template: None,
            ..WaveConfiguration::default()
        };
        assert!(!config.is_boss_wave(5));
        assert!(config
            .validate()
            .contains(&ConfigurationIssue::BossIntervalWithoutTemplate { interval: 5 }));
    }

    #[test]
    fn negative_durations_read_as_zero() {
        let config = WaveConfiguration {
            rest_seconds: -3.0,
            spawn_interval_seconds: f32::NAN,
            ..WaveConfiguration::default()
        };
        assert_eq!(config.rest_duration(), Duration::ZERO);
        assert_eq!(config.spawn_interval(), Duration::ZERO);
    }

    #[test]
    fn eligible_entries_respect_min_wave_and_weight() {
        let config = WaveConfiguration {
            enemy_pool: vec![
                PoolEntry {
                    template: template("grunt"),
                    weight: 3.0,
                    min_wave: 1,
                },
                PoolEntry {
                    template: template("runner"),
                    weight: 1.0,
                    min_wave: 3,
                },
                PoolEntry {
                    template: template("ghost"),
                    weight: 0.0,
                    min_wave: 1,
                },
            ],
            ..WaveConfiguration::default()
        };

        let early: Vec<&str> = config
            .eligible_entries(2)
            .map(|entry| entry.template.id.as_str())
            .collect();
        assert_eq!(early, vec!["grunt"]);

        let later: Vec<&str> = config
            .eligible_entries(3)
            .map(|entry| entry.template.id.as_str())
            .collect();
        assert_eq!(later, vec!["grunt", "runner"]);

        assert!(config.validate().contains(&ConfigurationIssue::NonPositiveWeight {
            template: TemplateId::new("ghost"),
            weight: 0.0,
        }));
    }

    #[test]
    fn empty_pool_is_reported() {
        let issues = WaveConfiguration::default().validate();
        assert!(issues.contains(&ConfigurationIssue::EmptyPool));
    }

    #[test]
    fn configuration_parses_from_toml() {
        let source = r#"
            base_enemy_count = 4
            max_enemies_alive = 10
            rest_seconds = 2.5
            boss_wave_interval = 0

            [[enemy_pool]]
            weight = 2.0
            [enemy_pool.template]
            id = "grunt"
            stats = { max_health = 50.0, experience = 5 }

            [[enemy_pool]]
            weight = 1.0
            min_wave = 4
            [enemy_pool.template]
            id = "bat"
            locomotion = "airborne"
        "#;

        let config: WaveConfiguration = toml::from_str(source).expect("valid configuration");
        assert_eq!(config.base_enemy_count, 4);
        assert_eq!(config.enemies_per_wave, 2, "missing fields fall back to defaults");
        assert_eq!(config.rest_duration(), Duration::from_millis(2_500));
        assert_eq!(config.enemy_pool.len(), 2);
        assert_eq!(config.enemy_pool[0].min_wave, 1);
        assert_eq!(config.enemy_pool[0].template.stats.max_health, 50.0);
        assert_eq!(config.enemy_pool[0].template.stats.move_speed, 2.0);
        assert_eq!(config.enemy_pool[1].template.locomotion, Locomotion::Airborne);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn bounds_include_borders() {
        let bounds = ArenaBounds {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        assert!(bounds.contains(Vec3::new(1.0, 0.0, -1.0)));
        assert!(!bounds.contains(Vec3::new(1.5, 0.0, 0.0)));
    }
}
