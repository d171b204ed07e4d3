//! Engine-wide tunable constants (spec §6 "Configuration").
//!
//! Mirrors the teacher's `sonido-core::param_info` pattern of centralizing
//! every process-wide bound in one module rather than scattering magic
//! numbers across the allocator, envelope computer, and effects factory.

/// Simultaneous tones a single channel may hold (active + releasing). Chords
/// live on one tone each, so this bounds overlapping notes/release tails,
/// not chord size.
pub const MAX_TONES_PER_CHANNEL: usize = 4;

/// Largest chord any instrument kind accepts (spec §3 "Instrument").
pub const MAX_CHORD_SIZE: usize = 8;

/// Largest note-filter point count a tone's filter chain is sized for.
pub const MAX_FILTER_POINTS: usize = 4;

/// Picked-string and supersaw-shape delay lines are sized for the lowest
/// practical pitch at this sample rate ceiling.
pub const MAX_PICKED_STRING_DELAY_SAMPLES: usize = 4096;

/// Ticks per echo delay "step" when an instrument authors `delay_steps`
/// (spec §4.8 "Echo" buffer sizing).
pub const ECHO_DELAY_STEP_TICKS: f32 = 3.0;

/// Hard ceiling on simultaneous grains per granular effect instance, mirrored
/// here from `cadence-effects` so the allocator can reason about worst-case
/// per-tick CPU without importing the effects crate's private constant.
pub const GRANULAR_MAX_GRAINS: usize = 64;

/// Ring-modulation carrier frequency range (Hz), used to clamp modulator-
/// driven `RingModHz` targets (spec §4.4 Modulation State Tables).
pub const RING_MOD_HZ_RANGE: core::ops::RangeInclusive<f32> = 20.0..=8000.0;

/// Sentinel written into the modulation value tables to mean "no active
/// modulator claims this slot this tick" (spec §4.4).
pub const MOD_VALUE_UNSET: f32 = -1.0;

/// Number of ticks a released tone keeps rendering its fade-out envelope
/// before the allocator reclaims it back to the pool, if the instrument's
/// `fade_out_ticks` is zero (instant release would otherwise click).
pub const MIN_RELEASE_TAIL_TICKS: u32 = 1;

/// Number of consecutive silent bars the loop/skip policy will traverse
/// before giving up and treating the song as fully silent (spec §4.1.1
/// "infinite-skip guard").
pub const MAX_BAR_SKIP_GUARD: u32 = 4096;

/// Short click burst length for the optional metronome generator, in
/// samples at 48 kHz; scaled by the actual sample rate at construction.
pub const METRONOME_CLICK_SAMPLES_AT_48K: u32 = 480;
