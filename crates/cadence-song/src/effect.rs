//! Authored effect configurations making up an instrument's effects chain
//! (spec §3 "Effect", §4.8 "Effects Chain").

use serde::{Deserialize, Serialize};

use crate::filter::FilterSettings;

/// Stereo panning algorithm (spec §4.8 "Panning").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanningMode {
    /// Classic L/R split via delay taps.
    ClassicSplit,
    /// Split plus cross-feed proportional to the volume imbalance.
    SplitWithCrossfeed,
    /// Sum to mono, then re-scale by L/R volumes.
    SumToMono,
}

/// Grain envelope shape (spec §4.8 "Granular").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrainEnvelopeShape {
    Parabolic,
    RaisedCosineBell,
}

/// A single authored effect and its parameters. Effects that modulate an
/// EQ own their own post-EQ `FilterSettings` with morph sub-filters, mapped
/// here onto `EffectConfig::EqFilter`'s `filter` field for the dedicated EQ
/// effect, or not present at all for effects with no EQ stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectConfig {
    EqFilter {
        filter: FilterSettings,
    },
    Distortion {
        drive: f32,
    },
    Bitcrusher {
        /// Normalized sample-rate reduction factor in `(0, 1]`.
        rate_reduction: f32,
        /// Number of quantization steps (bit depth proxy).
        scale: f32,
        fold_level: f32,
    },
    Gain {
        gain_db: f32,
    },
    Panning {
        mode: PanningMode,
        pan: f32,
        /// Delay (in samples) of the panning ring buffer's read tap.
        delay_samples: f32,
    },
    Flanger {
        rate_hz: f32,
        depth_samples: f32,
        feedback: f32,
        mix: f32,
    },
    Chorus {
        rate_hz: f32,
        depth_samples: f32,
        mix: f32,
    },
    Echo {
        /// Delay length as a count of "steps", each `echo_delay_step_ticks`
        /// ticks long (spec §4.8 "Echo" buffer sizing).
        delay_steps: f32,
        sustain: f32,
        ping_pong: f32,
    },
    Reverb {
        mix: f32,
        sustain: f32,
    },
    RingModulation {
        hz: f32,
        mix: f32,
    },
    Granular {
        grain_size_seconds: f32,
        grain_range_seconds: f32,
        grain_amount_exponent: u8,
        min_delay_seconds: f32,
        max_delay_seconds: f32,
        envelope_shape: GrainEnvelopeShape,
        mix: f32,
    },
}

impl EffectConfig {
    /// A short stable name for this effect kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            EffectConfig::EqFilter { .. } => "eq_filter",
            EffectConfig::Distortion { .. } => "distortion",
            EffectConfig::Bitcrusher { .. } => "bitcrusher",
            EffectConfig::Gain { .. } => "gain",
            EffectConfig::Panning { .. } => "panning",
            EffectConfig::Flanger { .. } => "flanger",
            EffectConfig::Chorus { .. } => "chorus",
            EffectConfig::Echo { .. } => "echo",
            EffectConfig::Reverb { .. } => "reverb",
            EffectConfig::RingModulation { .. } => "ring_modulation",
            EffectConfig::Granular { .. } => "granular",
        }
    }
}
