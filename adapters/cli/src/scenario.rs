use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use wave_arena_core::{ArenaLayout, WaveConfiguration};
use wave_arena_system_spawn_manager::Config as SpawnConfig;

/// Everything a headless session is configured with.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    /// Wave composition and pacing.
    pub(crate) waves: WaveConfiguration,
    /// Arena geometry and player setup.
    pub(crate) arena: ArenaLayout,
    /// Spawn placement tuning.
    pub(crate) spawning: SpawnSettings,
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a scenario from TOML text.
    pub(crate) fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Spawn placement tuning authored in the `[spawning]` table.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct SpawnSettings {
    /// Minimum distance between a new spawn and any live enemy.
    pub(crate) min_spawn_separation: f32,
    /// How far below a spawn point the ground is searched.
    pub(crate) ground_probe_distance: f32,
    /// Height above the ground hit at which ground-bound enemies appear.
    pub(crate) ground_clearance: f32,
}

impl SpawnSettings {
    /// Spawn manager configuration seeded with `seed`.
    pub(crate) fn config(&self, seed: u64) -> SpawnConfig {
        SpawnConfig::new(self.min_spawn_separation, seed)
            .with_ground_probe(self.ground_probe_distance, self.ground_clearance)
    }
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            min_spawn_separation: 4.0,
            ground_probe_distance: 50.0,
            ground_clearance: 0.5,
        }
    }
}

/// Errors raised while loading a scenario file.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The file could not be read.
    #[error("could not read scenario {}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid scenario.
    #[error("could not parse scenario {}", path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying TOML failure.
        #[source]
        source: toml::de::Error,
    },
}
