//! Cadence Effects - the per-instrument stereo effects chain (spec §4.8).
//!
//! Every effect implements [`StereoEffect`]; [`chain::EffectsChain`] owns a
//! dynamically-dispatched `Vec<Box<dyn StereoEffect>>` built from an
//! instrument's authored [`cadence_song::effect::EffectConfig`] list and
//! traversed once per sample.

pub mod bitcrusher;
pub mod chain;
pub mod chorus;
pub mod distortion;
pub mod echo;
pub mod eq_filter;
pub mod flanger;
pub mod gain;
pub mod granular;
pub mod panning;
pub mod reverb;
pub mod ring_mod;
pub mod trait_def;

pub use bitcrusher::Bitcrusher;
pub use chain::{build_effect, EffectsChain};
pub use chorus::Chorus;
pub use distortion::Distortion;
pub use echo::Echo;
pub use eq_filter::EqFilter;
pub use flanger::Flanger;
pub use gain::Gain;
pub use granular::{GrainEnvelopeShape, Granular};
pub use panning::{Panning, PanningMode};
pub use reverb::Reverb;
pub use ring_mod::RingModulation;
pub use trait_def::StereoEffect;
