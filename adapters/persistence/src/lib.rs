#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Progress stores backing the arena trigger.

mod atomic_io;

use std::{
    convert::Infallible,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use wave_arena_core::ProgressStore;

/// Persisted wave progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    /// Wave a resumed run starts at; `None` until the first clear.
    pub current_wave: Option<u32>,
    /// Highest wave ever reached.
    pub max_wave_reached: u32,
}

/// Errors raised while reading or writing the progress file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The file could not be read or written.
    #[error("progress file {} is not accessible", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file exists but does not hold a progress record.
    #[error("progress file {} is malformed", path.display())]
    Malformed {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },
    /// The record could not be encoded.
    #[error("failed to encode progress record")]
    Encode(#[source] serde_json::Error),
}

/// Progress store kept in memory. Never fails.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryProgressStore {
    record: ProgressRecord,
    saved: ProgressRecord,
    saves: u32,
}

impl MemoryProgressStore {
    /// Creates a store with no saved progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose saved progress is `record`.
    #[must_use]
    pub fn with_record(record: ProgressRecord) -> Self {
        Self {
            record,
            saved: record,
            saves: 0,
        }
    }

    /// Progress as of the last [`ProgressStore::save`].
    #[must_use]
    pub fn saved(&self) -> ProgressRecord {
        self.saved
    }

    /// Number of completed saves.
    #[must_use]
    pub fn saves(&self) -> u32 {
        self.saves
    }
}

impl ProgressStore for MemoryProgressStore {
    type Error = Infallible;

    fn current_wave(&self) -> Option<u32> {
        self.record.current_wave
    }

    fn max_wave_reached(&self) -> u32 {
        self.record.max_wave_reached
    }

    fn set_current_wave(&mut self, wave: u32) {
        self.record.current_wave = Some(wave);
    }

    fn set_max_wave_reached(&mut self, wave: u32) {
        self.record.max_wave_reached = wave;
    }

    fn save(&mut self) -> Result<(), Self::Error> {
        self.saved = self.record;
        self.saves = self.saves.saturating_add(1);
        Ok(())
    }
}

/// Progress store persisted as a JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileProgressStore {
    path: PathBuf,
    record: ProgressRecord,
}

impl JsonFileProgressStore {
    /// Loads progress from `path`. A missing file yields fresh progress.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let record = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| {
                PersistenceError::Malformed {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no saved progress; starting fresh");
                ProgressRecord::default()
            }
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };

        Ok(Self { path, record })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Progress currently held in memory.
    #[must_use]
    pub fn record(&self) -> ProgressRecord {
        self.record
    }
}

impl ProgressStore for JsonFileProgressStore {
    type Error = PersistenceError;

    fn current_wave(&self) -> Option<u32> {
        self.record.current_wave
    }

    fn max_wave_reached(&self) -> u32 {
        self.record.max_wave_reached
    }

    fn set_current_wave(&mut self, wave: u32) {
        self.record.current_wave = Some(wave);
    }

    fn set_max_wave_reached(&mut self, wave: u32) {
        self.record.max_wave_reached = wave;
    }

    fn save(&mut self) -> Result<(), Self::Error> {
        let text = serde_json::to_string_pretty(&self.record).map_err(PersistenceError::Encode)?;
        atomic_io::write_text_atomic(&self.path, &text).map_err(|source| {
            PersistenceError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        info!(
            path = %self.path.display(),
            current_wave = ?self.record.current_wave,
            max_wave_reached = self.record.max_wave_reached,
            "progress written"
        );
        Ok(())
    }
}
