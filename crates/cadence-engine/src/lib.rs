//! Cadence Engine — the scheduler, tone allocator, modulation evaluator,
//! and public renderer that turn a [`cadence_song::Song`] into audio (spec
//! §4, §6 "External Interfaces").
//!
//! This crate is the composition root: it owns no DSP of its own beyond
//! what [`cadence_core`], [`cadence_synth`], and [`cadence_effects`]
//! already provide, and instead is responsible for *when* each of those
//! runs — the tick-synchronous scheduling, tone lifecycle, and modulation
//! plumbing the other crates are deliberately ignorant of.

pub mod channel_runtime;
pub mod config;
pub mod envelope_computer;
pub mod metronome;
pub mod modulation;
pub mod renderer;
pub mod scheduler;
pub mod song_master;
pub mod tone_params;
pub mod tone_pool;

pub use modulation::ModTarget;
pub use renderer::{LiveInputState, PeakMeters, Renderer};
pub use scheduler::{Playhead, Scheduler};
