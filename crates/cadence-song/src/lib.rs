//! Cadence Song - the `Song` value object the Cadence renderer consumes.
//!
//! This crate owns only data and (de)serialization: channels, patterns,
//! notes, instruments, effects, and the handful of validation rules spec'd
//! for well-formed songs. It has no dependency on the rendering engine;
//! `cadence-engine` borrows a `Song` for the duration of a render call and
//! never mutates it.

pub mod effect;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod instrument;
pub mod pattern;
pub mod song;
pub mod validate;

pub use effect::EffectConfig;
pub use envelope::{Envelope, EnvelopeKind, EnvelopeTarget, LfoShape};
pub use error::SongError;
pub use filter::{FilterControlPoint, FilterPointKind, FilterSettings};
pub use instrument::{
    ChipLoopMode, FmOperator, Instrument, InstrumentKind, ModChannelTarget, ModInstrumentTarget,
    ModSlot, StringType, Unison, Vibrato,
};
pub use pattern::{Note, Pattern, Pin};
pub use song::{Channel, ChannelKind, Key, LimiterSettings, LoopOverride, Song};
pub use validate::validate_song;
