#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-wave stat growth and wave sizing.
//!
//! Everything here is a pure function of its arguments. [`scaled_stats`] is
//! the stat override step: it produces the [`ScaledEnemyStats`] an enemy must
//! be constructed with, so no enemy ever observes its unscaled template stats.

use wave_arena_core::{EnemyStats, ScaledEnemyStats, WaveConfiguration};

/// Multiplier applied to a base stat on the provided wave.
///
/// Wave 1 (and wave 0, which is treated as wave 1) yields exactly `1.0`.
#[must_use]
pub fn wave_multiplier(wave: u32, rate: f32) -> f32 {
    let waves_past_first = wave.saturating_sub(1);
    if waves_past_first == 0 {
        return 1.0;
    }
    1.0 + waves_past_first as f32 * rate
}

/// Scales `base` by `1 + (wave - 1) * rate`.
#[must_use]
pub fn scale_stat(base: f32, wave: u32, rate: f32) -> f32 {
    if wave <= 1 {
        return base;
    }
    base * wave_multiplier(wave, rate)
}

/// Number of enemies spawned on the provided wave, capped at `max_alive`.
#[must_use]
pub fn enemy_count_for_wave(wave: u32, base: u32, increment: u32, max_alive: u32) -> u32 {
    let growth = wave.saturating_sub(1).saturating_mul(increment);
    base.saturating_add(growth).min(max_alive)
}

/// Computes the stats an enemy of `base` stats is built with on `wave`.
///
/// Without a configuration the base stats pass through unchanged.
#[must_use]
pub fn scaled_stats(
    base: &EnemyStats,
    wave: u32,
    configuration: Option<&WaveConfiguration>,
) -> ScaledEnemyStats {
    let Some(configuration) = configuration else {
        return ScaledEnemyStats::new(*base, wave);
    };

    let speed_rate = configuration.speed_scale_per_wave;
    let experience = scale_stat(
        base.experience as f32,
        wave,
        configuration.experience_scale_per_wave,
    );

    ScaledEnemyStats::new(
        EnemyStats {
            max_health: scale_stat(base.max_health, wave, configuration.health_scale_per_wave),
            contact_damage: scale_stat(
                base.contact_damage,
                wave,
                configuration.damage_scale_per_wave,
            ),
            move_speed: scale_stat(base.move_speed, wave, speed_rate),
            chase_speed: scale_stat(base.chase_speed, wave, speed_rate),
            experience: experience.round().max(0.0) as u32,
        },
        wave,
    )
}
