// Strong typing over raw numbers. Newtypes for playback time and percentage geometry.

use serde::{Deserialize, Serialize};

/// Playback time in microseconds. Newtype for type safety.
///
/// Story documents carry seconds as floats; everything past the parser
/// works in whole microseconds so comparisons against trigger times are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// Convert document seconds. Negative and NaN inputs clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::from_scaled(secs, 1_000_000.0)
    }

    /// Convert a host frame clock reading (e.g. `performance.now()`).
    pub fn from_millis_f64(ms: f64) -> Self {
        Self::from_scaled(ms, 1000.0)
    }

    fn from_scaled(value: f64, scale: f64) -> Self {
        if !value.is_finite() {
            // +inf saturates, NaN and -inf collapse to zero.
            return if value == f64::INFINITY {
                Timestamp(u64::MAX)
            } else {
                Timestamp(0)
            };
        }
        if value <= 0.0 {
            return Timestamp(0);
        }
        Timestamp((value * scale).round() as u64)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn as_secs(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn saturating_add(self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_sub(other.0))
    }

    pub fn add_millis(self, ms: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(ms.saturating_mul(1000)))
    }

    /// Clamp into `[0, max]`.
    pub fn clamp_to(self, max: Timestamp) -> Timestamp {
        Timestamp(self.0.min(max.0))
    }
}

/// Percentage-based point (0-100 on each axis).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Position { x, y }
    }

    pub fn center() -> Self {
        Position { x: 50.0, y: 50.0 }
    }
}

/// Percentage-based size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Percentage-based rectangle. Panels and hotspots may overlap freely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Bounds {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Position) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Player configuration passed from JS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Start the page timeline automatically when a page becomes active.
    #[serde(default = "default_true")]
    pub auto_play: bool,
    /// Settle time between activating a page and starting playback.
    #[serde(default = "default_autoplay_delay_ms")]
    pub autoplay_delay_ms: u64,
    /// Move to the next page when a page's timeline completes.
    #[serde(default)]
    pub auto_advance: bool,
    /// Page index to open on.
    #[serde(default)]
    pub start_page: usize,
    /// Volume for `playSound` timeline cues.
    #[serde(default = "default_event_sound_volume")]
    pub event_sound_volume: f32,
    #[serde(default)]
    pub reactions: ReactionSettings,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            auto_play: true,
            autoplay_delay_ms: default_autoplay_delay_ms(),
            auto_advance: false,
            start_page: 0,
            event_sound_volume: default_event_sound_volume(),
            reactions: ReactionSettings::default(),
        }
    }
}

/// Tap reaction timing and particle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSettings {
    /// How long the reaction animation class stays applied.
    #[serde(default = "default_reaction_ms")]
    pub reaction_ms: u64,
    /// How long the particle overlay stays up.
    #[serde(default = "default_particle_ms")]
    pub particle_ms: u64,
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,
    #[serde(default = "default_tap_sound_volume")]
    pub tap_sound_volume: f32,
    /// Base seed for particle layouts.
    #[serde(default)]
    pub seed: u64,
}

impl Default for ReactionSettings {
    fn default() -> Self {
        ReactionSettings {
            reaction_ms: default_reaction_ms(),
            particle_ms: default_particle_ms(),
            particle_count: default_particle_count(),
            tap_sound_volume: default_tap_sound_volume(),
            seed: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_autoplay_delay_ms() -> u64 {
    100
}

fn default_event_sound_volume() -> f32 {
    0.6
}

fn default_reaction_ms() -> u64 {
    500
}

fn default_particle_ms() -> u64 {
    1000
}

fn default_particle_count() -> usize {
    8
}

fn default_tap_sound_volume() -> f32 {
    0.5
}

/// Format seconds as `M:SS` (minutes are not wrapped into hours).
pub fn format_clock(ts: Timestamp) -> String {
    let total = ts.as_micros() / 1_000_000;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_conversions() {
        let ts = Timestamp::from_secs_f64(1.5);
        assert_eq!(ts.as_micros(), 1_500_000);
        assert!((ts.as_secs() - 1.5).abs() < 0.0001);
        assert_eq!(Timestamp::from_millis_f64(16.5).as_micros(), 16_500);
    }

    #[test]
    fn negative_and_nan_seconds_clamp_to_zero() {
        assert_eq!(Timestamp::from_secs_f64(-3.0), Timestamp::ZERO);
        assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::ZERO);
        assert_eq!(Timestamp::from_secs_f64(f64::NEG_INFINITY), Timestamp::ZERO);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(Timestamp::ZERO), "0:00");
        assert_eq!(format_clock(Timestamp::from_secs_f64(7.9)), "0:07");
        assert_eq!(format_clock(Timestamp::from_secs_f64(125.0)), "2:05");
    }

    #[test]
    fn player_config_defaults_from_empty_json() {
        let config: PlayerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PlayerConfig::default());
        assert_eq!(config.reactions.reaction_ms, 500);
        assert_eq!(config.reactions.particle_ms, 1000);
        assert!(config.auto_play);
        assert!(!config.auto_advance);
    }

    #[test]
    fn player_config_partial_override() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"autoAdvance":true,"reactions":{"particleCount":4}}"#).unwrap();
        assert!(config.auto_advance);
        assert_eq!(config.reactions.particle_count, 4);
        assert_eq!(config.reactions.reaction_ms, 500);
    }

    #[test]
    fn bounds_contains_edges() {
        let b = Bounds::new(10.0, 10.0, 20.0, 20.0);
        assert!(b.contains(Position::new(10.0, 30.0)));
        assert!(!b.contains(Position::new(31.0, 15.0)));
    }
}
