//! Instrument definitions: the discriminated voice-synthesizer kind plus
//! the shared envelope/vibrato/unison/filter/effects-chain authoring data
//! every instrument carries (spec §3 "Instrument").

use serde::{Deserialize, Serialize};

use crate::effect::EffectConfig;
use crate::envelope::Envelope;
use crate::filter::FilterSettings;

/// Loop behavior for a loopable chip wave (spec §4.5 "Chip (loopable)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipLoopMode {
    Loop,
    PingPong,
    Once,
    LoopOnce,
}

/// FM operator algorithm topology (which operators modulate which).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmOperator {
    pub amplitude: f32,
    pub freq_multiplier: f32,
    pub hz_offset: f32,
    /// Indices of operators that phase-modulate this one.
    #[serde(default)]
    pub modulators: Vec<u8>,
    /// Whether this operator's output is summed into the audible carrier
    /// output (as opposed to being a pure modulator).
    pub is_carrier: bool,
}

/// Which biquad-string-loop type a picked-string instrument emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringType {
    Nylon,
    Steel,
    Bass,
}

/// Unison (detuned stacked voice) parameters, applicable to most
/// non-FM, non-picked-string instrument kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unison {
    pub voices: u8,
    pub spread_semitones: f32,
    pub offset_semitones: f32,
    pub expression: f32,
    /// Extra voices beyond 2 get per-voice sign-mixed detune; unused for
    /// `voices <= 2` (spec §4.5 "unison sign mixing").
    #[serde(default)]
    pub sign: f32,
}

impl Default for Unison {
    fn default() -> Self {
        Self {
            voices: 1,
            spread_semitones: 0.0,
            offset_semitones: 0.0,
            expression: 1.0,
            sign: 1.0,
        }
    }
}

/// Vibrato authoring: either a named preset id or fully custom parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Vibrato {
    Preset { id: u32 },
    Custom {
        depth_semitones: f32,
        delay_ticks: f32,
        speed_hz: f32,
        /// `true` for a smooth sine vibrato, `false` for a plucked/one-shot
        /// shape.
        periodic: bool,
    },
    /// No vibrato (delay is effectively infinite).
    None,
}

/// The discriminated instrument kind and its kind-specific fields (spec §3
/// "Instrument", §4.5 "Voice synthesizers").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstrumentKind {
    Chip {
        wave_id: u32,
    },
    CustomChipWave {
        wave_id: u32,
        loop_mode: ChipLoopMode,
        loop_start: u32,
        loop_end: u32,
        plays_backward: bool,
    },
    Fm {
        operators: Vec<FmOperator>,
        feedback_amount: f32,
        feedback_operators: Vec<u8>,
    },
    Fm6Op {
        operators: Vec<FmOperator>,
        feedback_amount: f32,
        feedback_operators: Vec<u8>,
    },
    Harmonics {
        harmonic_amplitudes: Vec<f32>,
    },
    Pwm {
        pulse_width: f32,
    },
    Supersaw {
        voice_count: u8,
        dynamism: f32,
        spread_semitones: f32,
        shape: f32,
    },
    PickedString {
        string_type: StringType,
        sustain: f32,
    },
    Noise {
        wave_id: u32,
    },
    Spectrum {
        harmonic_amplitudes: Vec<f32>,
    },
    Drumset {
        per_pitch_wave_ids: Vec<u32>,
        envelope_cutoff_hz: f32,
    },
    /// A modulation instrument: writes into the mod-value tables rather
    /// than producing audio (spec §4.2, §4.5 "Mod synth").
    Mod {
        slots: Vec<ModSlot>,
    },
}

/// One modulator slot on a `Mod`-kind instrument, selected by a modulation
/// note's pitch (spec §4.4 Glossary "Modulator / Mod slot").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModSlot {
    pub target_channel: ModChannelTarget,
    pub target_instrument: ModInstrumentTarget,
    pub setting: u32,
    /// If this slot targets a filter dot position rather than a scalar
    /// setting, the dot index within the target's filter.
    #[serde(default)]
    pub filter_target: Option<u32>,
}

/// Which channel(s) a mod slot affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModChannelTarget {
    /// Song-scope settings (tempo, song reverb, song EQ, song detune).
    Song,
    Channel { index: u32 },
}

/// Which instrument(s) within a targeted channel a mod slot affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModInstrumentTarget {
    Single { index: u32 },
    AllInChannel,
    CurrentPattern,
}

/// A complete instrument definition (spec §3 "Instrument").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub kind: InstrumentKind,
    #[serde(default)]
    pub unison: Unison,
    #[serde(default = "default_vibrato")]
    pub vibrato: Vibrato,
    /// Ticks per arpeggio step; 0 disables arpeggiation.
    #[serde(default)]
    pub arpeggio_speed: f32,
    pub fade_in_seconds: f32,
    /// Negative-signed tick count in the source convention; stored as a
    /// plain non-negative tick count here (sign only mattered for the
    /// `abs(fadeOutTicks)` comparisons the spec describes).
    pub fade_out_ticks: u32,
    #[serde(default)]
    pub envelopes: Vec<Envelope>,
    pub note_filter: FilterSettings,
    #[serde(default)]
    pub effects: Vec<EffectConfig>,
    /// How many simultaneous pitches this instrument accepts; notes with
    /// more pitches than this are truncated, per chord-expression rules
    /// (spec §4.6 step 5, `monoChordTone >= pitchCount`).
    #[serde(default = "default_max_chord_size")]
    pub max_chord_size: u8,
}

fn default_vibrato() -> Vibrato {
    Vibrato::None
}

fn default_max_chord_size() -> u8 {
    1
}

impl Instrument {
    pub fn is_modulation(&self) -> bool {
        matches!(self.kind, InstrumentKind::Mod { .. })
    }

    pub fn is_seamless_capable(&self) -> bool {
        !matches!(self.kind, InstrumentKind::Mod { .. })
    }
}
