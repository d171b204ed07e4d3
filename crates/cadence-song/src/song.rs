//! The top-level `Song` value object the renderer consumes (spec §3).

use serde::{Deserialize, Serialize};

use crate::instrument::Instrument;
use crate::pattern::Pattern;

/// How a channel's tones are synthesized and allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Pitch,
    Noise,
    Modulation,
}

/// One channel: an ordered instrument list plus a bar-indexed mapping to
/// patterns (spec §3 "Song").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub kind: ChannelKind,
    pub instruments: Vec<Instrument>,
    pub patterns: Vec<Pattern>,
    /// `bars[i]` is `Some(pattern_index)` for bar `i`, or `None` for a
    /// silent bar.
    pub bars: Vec<Option<usize>>,
    #[serde(default)]
    pub muted: bool,
}

impl Channel {
    pub fn pattern_at_bar(&self, bar: usize) -> Option<&Pattern> {
        self.bars.get(bar).copied().flatten().and_then(|idx| self.patterns.get(idx))
    }
}

/// The song's musical key: a pitch class (0-11, C=0) plus octave offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub pitch_class: u8,
    pub octave: i8,
}

/// Master compressor/limiter parameters (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterSettings {
    pub compression_threshold: f32,
    pub limit_threshold: f32,
    pub compression_ratio: f32,
    pub limit_ratio: f32,
    pub decay_rate: f32,
    pub rise_rate: f32,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            compression_threshold: 0.85,
            limit_threshold: 0.95,
            compression_ratio: 0.75,
            limit_ratio: 0.95,
            decay_rate: 0.5,
            rise_rate: 2.0,
        }
    }
}

/// A user-set loop override; `None` fields disable the override and fall
/// back to the song's authored `loop_start`/`loop_length` (spec §1.1
/// "Loop override").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoopOverride {
    pub loop_bar_start: Option<u32>,
    pub loop_bar_end: Option<u32>,
}

/// The complete, read-only song description the renderer plays (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub channels: Vec<Channel>,
    pub beats_per_bar: u32,
    pub ticks_per_part: u32,
    pub parts_per_beat: u32,
    pub bar_count: u32,
    pub loop_start: u32,
    pub loop_length: u32,
    /// `-1` (represented here as `None`) means loop forever.
    pub loop_repeat_count: Option<u32>,
    pub tempo_bpm: f32,
    pub key: Key,
    pub master_gain: f32,
    pub limiter: LimiterSettings,
    pub song_eq: crate::filter::FilterSettings,
    #[serde(default)]
    pub loop_override: LoopOverride,
}

impl Song {
    /// Samples in one bar at the song's constant tempo (ignoring tempo
    /// modulation). See invariant 1 of the testable properties.
    pub fn samples_per_bar(&self, sample_rate: f32) -> f32 {
        let samples_per_tick =
            cadence_core::samples_per_tick(sample_rate, self.tempo_bpm, self.ticks_per_part, self.parts_per_beat);
        samples_per_tick * (self.ticks_per_part * self.parts_per_beat * self.beats_per_bar) as f32
    }

    pub fn parts_per_bar(&self) -> u32 {
        self.parts_per_beat * self.beats_per_bar
    }

    pub fn ticks_per_bar(&self) -> u32 {
        self.parts_per_bar() * self.ticks_per_part
    }

    /// Parse a `Song` from JSON text.
    pub fn from_json(text: &str) -> Result<Self, crate::error::SongError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a `Song` from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, crate::error::SongError> {
        Ok(toml::from_str(text)?)
    }

    /// Serialize this `Song` to TOML text.
    pub fn to_toml(&self) -> Result<String, crate::error::SongError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Serialize this `Song` to JSON text.
    pub fn to_json(&self) -> Result<String, crate::error::SongError> {
        serde_json::to_string_pretty(self).map_err(crate::error::SongError::JsonParse)
    }
}
