//! Cadence Synth - the voice synthesizer family and the `Tone` type they
//! operate on (spec §4.5, §3 "Tone").
//!
//! This crate is pure signal generation: given a `Tone`'s phase/expression
//! state and an instrument's discriminated kind, produce `runSamples` of
//! additive stereo output. It knows nothing about scheduling, modulation,
//! or tone allocation — those live in `cadence-engine`, which owns `Tone`
//! pools and drives this crate's `synthesize` entry point once per tick.

pub mod oscillator;
pub mod tone;
pub mod voice;

pub use oscillator::{blep_pulse, blep_saw, next_noise_sample, poly_blep};
pub use tone::{ChipLoopVoice, LoopDirection, NoteRef, OperatorState, PickedStringVoice, Tone};
pub use voice::{synthesize, WaveTables};
