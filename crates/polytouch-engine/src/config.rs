//! Instrument configuration.
//!
//! Plain serde-serializable values the host UI owns; the engine reads a
//! snapshot before each gesture decision. Accessors clamp rather than
//! reject, so a bad value degrades instead of crashing mid-performance.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Grid layout variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridLayout {
    /// Rectangular isomorphic grid: each row a fixed interval above the
    /// previous, columns ascending by semitone.
    #[default]
    Sonome,
    /// Janko-style grid: alternate rows shifted half a key width, adjacent
    /// rows one semitone apart, adjacent columns two apart.
    Janko,
}

/// Geometry and pitch layout of the key grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub layout: GridLayout,
    /// Number of key rows.
    pub rows: usize,
    /// Notes per row.
    pub keys_per_row: usize,
    /// MIDI note of the bottom-left key.
    pub low_note: u8,
    /// Semitones between the start of one row and the next (Sonome only).
    pub row_interval: u8,
    /// Playable surface size in pixels.
    pub surface_width: f32,
    pub surface_height: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            layout: GridLayout::Sonome,
            rows: 13,
            keys_per_row: 25,
            low_note: 24,
            row_interval: 5,
            surface_width: 1280.0,
            surface_height: 800.0,
        }
    }
}

impl GridConfig {
    #[inline]
    pub fn key_width(&self) -> f32 {
        self.surface_width / self.keys_per_row.max(1) as f32
    }

    #[inline]
    pub fn key_height(&self) -> f32 {
        self.surface_height / self.rows.max(1) as f32
    }
}

/// Which aftertouch message the translator emits on move events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AftertouchMode {
    Off,
    /// Per-note polyphonic aftertouch (0xA0).
    #[default]
    Poly,
    /// Channel-wide aftertouch (0xD0).
    Channel,
}

/// What the allocator does when every pool channel is owned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExhaustPolicy {
    /// The new touch plays on the fixed shared channel; it sounds but
    /// cannot bend independently.
    #[default]
    FallBackToShared,
    /// Evict the longest-held channel; its owning touch is force-closed
    /// (note-off + bend reset) before the channel is reused.
    StealOldest,
}

/// RGBA color, components in 0.0..=1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba(pub [f32; 4]);

impl Rgba {
    pub const WHITE: Rgba = Rgba([1.0, 1.0, 1.0, 1.0]);
    pub const BLACK: Rgba = Rgba([0.0, 0.0, 0.0, 1.0]);
    pub const RED: Rgba = Rgba([1.0, 0.0, 0.0, 1.0]);
}

/// Full instrument configuration.
///
/// Defaults match the shipped configuration of the original instrument:
/// channel 0, velocity 127, aftertouch on, sensitivity 3, 13 rows of 25
/// keys from MIDI note 24, rows a fourth apart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub grid: GridConfig,
    /// Fixed channel used when independent pitch bend is off, and as the
    /// fallback/shared channel otherwise. Reserved: never pool-allocated.
    pub channel: u8,
    pub default_velocity: u8,
    pub aftertouch: AftertouchMode,
    /// Derive velocity/pressure from hardware touch pressure when present.
    pub hardware_pressure: bool,
    /// Derive velocity/pressure from vertical distance to the key center.
    pub vertical_expression: bool,
    /// Velocity change per pixel of vertical distance.
    pub sensitivity: u8,
    /// Independent-channel mode: each touch gets its own channel so each
    /// can bend pitch independently.
    pub pitch_bend: bool,
    pub bend_range_semitones: u8,
    /// Number of channels the pool may hand out (1..=16).
    pub pool_size: u8,
    pub exhaust_policy: ExhaustPolicy,
    pub highlight_color: Rgba,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            channel: 0,
            default_velocity: 127,
            aftertouch: AftertouchMode::Poly,
            hardware_pressure: false,
            vertical_expression: true,
            sensitivity: 3,
            pitch_bend: false,
            bend_range_semitones: 12,
            pool_size: 16,
            exhaust_policy: ExhaustPolicy::FallBackToShared,
            highlight_color: Rgba::RED,
        }
    }
}

impl InstrumentConfig {
    /// The fixed/shared channel, clamped to 0..=15.
    #[inline]
    pub fn shared_channel(&self) -> u8 {
        self.channel.min(15)
    }

    /// Default velocity, clamped to the MIDI range.
    #[inline]
    pub fn velocity(&self) -> u8 {
        self.default_velocity.min(127)
    }

    /// Bend range in semitones, clamped to at least 1 — it participates in
    /// a divisor.
    #[inline]
    pub fn bend_range(&self) -> u16 {
        self.bend_range_semitones.max(1) as u16
    }

    /// Pool size clamped to 1..=16.
    #[inline]
    pub fn pool_size(&self) -> u8 {
        self.pool_size.clamp(1, 16)
    }

    /// Reject configurations the clamping accessors cannot make sense of.
    pub fn validate(&self) -> Result<()> {
        if self.grid.rows == 0 || self.grid.keys_per_row == 0 {
            return Err(Error::InvalidConfig(
                "grid must have at least one row and one key per row".into(),
            ));
        }
        if self.grid.surface_width <= 0.0 || self.grid.surface_height <= 0.0 {
            return Err(Error::InvalidConfig(
                "surface dimensions must be positive".into(),
            ));
        }
        if self.channel > 15 {
            return Err(Error::InvalidConfig(format!(
                "channel {} out of range 0..=15",
                self.channel
            )));
        }
        Ok(())
    }
}
