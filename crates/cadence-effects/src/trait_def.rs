//! The object-safe stereo effect trait every effect in the chain implements
//! (spec §4.8 "Effects Chain" — "a small data structure traversed linearly
//! each sample", per the Design Notes).
//!
//! Unlike the teacher's mono [`cadence_core`]-style `Effect` trait, every
//! effect here is inherently stereo: panning, ping-pong echo, and the
//! reverb's decorrelated L/R sums all mix across channels, so splitting
//! into two independent mono instances would lose that coupling.

/// A single effect's stateful per-sample transform.
pub trait StereoEffect: Send {
    /// Process one stereo sample pair in place.
    fn process(&mut self, l: f32, r: f32) -> (f32, f32);

    /// Process a block of stereo samples in place. Default implementation
    /// calls [`process`](Self::process) per sample; effects that want to
    /// amortize per-block setup can override this.
    fn process_block(&mut self, l: &mut [f32], r: &mut [f32]) {
        debug_assert_eq!(l.len(), r.len());
        for i in 0..l.len() {
            let (ol, or) = self.process(l[i], r[i]);
            l[i] = ol;
            r[i] = or;
        }
    }

    /// Update sample-rate-dependent coefficients and buffer sizes.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear internal state (delay lines, filter histories, phase
    /// accumulators) without forgetting authored parameters.
    fn reset(&mut self);

    /// Samples of latency this effect introduces. Every effect in this
    /// chain is zero-latency (no lookahead), so the default is adequate.
    fn latency_samples(&self) -> usize {
        0
    }
}
