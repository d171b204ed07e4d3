//! Envelope definitions authored on an instrument.
//!
//! The renderer's `EnvelopeComputer` (in `cadence-engine`) evaluates these
//! once per tick per tone to produce `start`/`end` scalars for every
//! parameter an instrument exposes. This module only carries the authored
//! data; the evaluation logic lives with the renderer.

use serde::{Deserialize, Serialize};

/// The parameter an envelope entry drives.
///
/// Operator- and filter-point-scoped targets carry their index so one
/// envelope list entry can target e.g. operator 2's amplitude or note
/// filter point 0's frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvelopeTarget {
    PitchShift,
    Detune,
    NoteVolume,
    OperatorAmplitude { operator: u8 },
    FeedbackAmplitude,
    FilterPointFreq { point: u8 },
    FilterPointGain { point: u8 },
    FilterAllFreqs,
    PulseWidth,
    SupersawDynamism,
    SupersawSpread,
    SupersawShape,
    StringSustain,
    EffectMix { effect: u8 },
    GrainSize,
    GrainRange,
    GrainAmount,
    RingModHz,
    RingModDepth,
    DrumsetFilterCutoff,
}

/// The shape an envelope entry follows over the lifetime of a note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// Constant 1.0 for the life of the note.
    Steady,
    /// A percussive rise-then-fall, fixed attack with a speed-scaled decay.
    Punch,
    /// Rises from 0 to 1 over the envelope's speed-scaled attack window.
    Flare,
    /// Oscillates with increasing then decreasing amplitude (vibrato-like
    /// swell used for guitar-style string bends).
    Twang,
    /// Rises from 0 to 1 and back down, a symmetric swell.
    Swell,
    /// Continuous sinusoidal oscillation at `speed` Hz-equivalent rate.
    Tremolo,
    /// Exponential decay from 1 toward 0 at `speed`-scaled rate.
    Decay,
    /// A free-running low-frequency oscillator with a selectable shape.
    Lfo { lfo_shape: LfoShape },
    /// Scales with the note's authored size (pin interpolation), not time.
    NoteSizeDriven,
}

/// Waveform shape used by [`EnvelopeKind::Lfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LfoShape {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// One authored envelope: what it drives, how it's shaped, and how fast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub target: EnvelopeTarget,
    pub kind: EnvelopeKind,
    /// Speed scalar; larger values move through the envelope's shape
    /// faster. Units are envelope-kind-specific (Hz for LFO/tremolo,
    /// inverse-seconds for decay/flare/punch).
    pub speed: f32,
    /// Optional clamp applied to the envelope's output before it's
    /// combined into the tone's overall expression.
    #[serde(default)]
    pub lower_bound: Option<f32>,
    #[serde(default)]
    pub upper_bound: Option<f32>,
}
