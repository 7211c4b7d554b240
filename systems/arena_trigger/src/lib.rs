#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Arena trigger that starts and stops wave runs and persists progress.

use tracing::{info, warn};
use wave_arena_core::{Command, Event, ProgressStore};
use wave_arena_system_spawn_manager::SpawnManager;
use wave_arena_system_wave_controller::WaveController;

/// Configuration parameters for the arena trigger.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    resume_saved_progress: bool,
}

impl Config {
    /// Creates a configuration; when `resume_saved_progress` is set a run
    /// starts at the stored wave instead of wave 1.
    #[must_use]
    pub const fn new(resume_saved_progress: bool) -> Self {
        Self {
            resume_saved_progress,
        }
    }

    /// Whether runs resume from stored progress.
    #[must_use]
    pub const fn resume_saved_progress(&self) -> bool {
        self.resume_saved_progress
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Bridges player presence to the wave controller.
#[derive(Debug)]
pub struct ArenaTrigger {
    config: Config,
    active: bool,
}

impl ArenaTrigger {
    /// Creates an inactive trigger.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            active: false,
        }
    }

    /// Whether a run is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Consumes world and controller events.
    ///
    /// While active the trigger listens for player death and exit, and writes
    /// progress to `store` after every cleared wave.
    pub fn handle<S>(
        &mut self,
        events: &[Event],
        controller: &mut WaveController,
        spawn_manager: &mut SpawnManager,
        store: &mut S,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) where
        S: ProgressStore,
    {
        for event in events {
            match event {
                Event::PlayerEnteredArena if !self.active => {
                    self.activate(controller, store, out_events);
                }
                Event::WaveCleared { wave } if self.active => {
                    record_clear(*wave, store, out_events);
                }
                Event::PlayerDied | Event::PlayerExitedArena if self.active => {
                    info!(reason = ?event, "player left the fight");
                    self.deactivate(controller, spawn_manager, out_commands, out_events);
                }
                _ => {}
            }
        }
    }

    /// Stops the run and stops listening to the player. Ignored when inactive.
    pub fn deactivate(
        &mut self,
        controller: &mut WaveController,
        spawn_manager: &mut SpawnManager,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        if !self.active {
            return;
        }

        self.active = false;
        controller.stop_waves(spawn_manager, out_commands, out_events);
        info!(wave = controller.current_wave(), "arena deactivated");
    }

    fn activate<S>(
        &mut self,
        controller: &mut WaveController,
        store: &S,
        out_events: &mut Vec<Event>,
    ) where
        S: ProgressStore,
    {
        let starting_wave = if self.config.resume_saved_progress {
            store.current_wave().unwrap_or(1)
        } else {
            1
        };

        self.active = true;
        info!(
            starting_wave,
            max_wave_reached = store.max_wave_reached(),
            "arena activated"
        );
        controller.start_waves(starting_wave, out_events);
    }
}

fn record_clear<S>(wave: u32, store: &mut S, out_events: &mut Vec<Event>)
where
    S: ProgressStore,
{
    let next = wave.saturating_add(1);
    store.set_current_wave(next);
    if next > store.max_wave_reached() {
        store.set_max_wave_reached(next);
    }

    match store.save() {
        Ok(()) => out_events.push(Event::ProgressSaved {
            current_wave: next,
            max_wave_reached: store.max_wave_reached(),
        }),
        Err(error) => warn!(%error, wave, "failed to save wave progress"),
    }
}
