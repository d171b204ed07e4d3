//! Cadence Core - shared DSP primitives for the Cadence tracker renderer.
//!
//! This crate holds the sample-rate-dependent building blocks that the rest
//! of the workspace is built from: power-of-two ring buffers, a dynamic
//! (per-sample coefficient-interpolating) biquad filter, tick-synchronous
//! linear ramps, and the small math/denormal utilities every DSP module
//! leans on.
//!
//! # Design principles
//!
//! - **Real-time safe**: no allocation inside a render call; buffers are
//!   sized up front (or grown at tick boundaries, never mid-tick).
//! - **`no_std`-friendly**: only `libm` is required; `std` merely enables
//!   heap-allocated buffers through `alloc`-equivalent `Vec` usage.
//! - **Total**: nothing here panics on malformed audio data; out-of-range
//!   inputs saturate or are sanitized rather than erroring, matching the
//!   renderer's "always produce samples" contract.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod math;
pub mod ramp;
pub mod ring_buffer;
pub mod tempo;

pub use biquad::{BiquadCoefficients, DynamicBiquad, FilterKind, sanitize_filters};
pub use math::{
    clamp01, db_to_linear, flush_denormal, lerp, linear_to_db, mono_sum, wet_dry_mix,
    wet_dry_mix_stereo,
};
pub use ramp::Ramp;
pub use ring_buffer::RingBuffer;
pub use tempo::samples_per_tick;
