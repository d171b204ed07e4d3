//! Stereo panning with optional crossfeed delay and mono-sum modes
//! (spec §4.8 "Panning").

use cadence_core::ramp::Ramp;
use cadence_core::ring_buffer::RingBuffer;

use crate::trait_def::StereoEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanningMode {
    /// Classic equal-power split with no crossfeed.
    Split,
    /// Split with a delayed crossfeed from each channel into the other,
    /// approximating stereo widening/narrowing through a short delay tap.
    Crossfeed,
    /// Collapse both channels to identical mono content before panning.
    SumToMono,
}

pub struct Panning {
    mode: PanningMode,
    pan: Ramp,
    delay_l: RingBuffer,
    delay_r: RingBuffer,
    delay_samples: usize,
}

impl Panning {
    pub fn new(mode: PanningMode, pan: f32, delay_samples: usize) -> Self {
        let cap = delay_samples.max(1) + 1;
        Self {
            mode,
            pan: Ramp::at(pan.clamp(-1.0, 1.0)),
            delay_l: RingBuffer::new(cap),
            delay_r: RingBuffer::new(cap),
            delay_samples,
        }
    }

    pub fn set_pan_target(&mut self, pan: f32, num_samples: u32) {
        self.pan.retarget(pan.clamp(-1.0, 1.0), num_samples);
    }

    fn gains(pan: f32) -> (f32, f32) {
        // equal-power pan law
        let angle = (pan + 1.0) * 0.25 * core::f32::consts::PI;
        (libm::cosf(angle), libm::sinf(angle))
    }
}

impl StereoEffect for Panning {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let pan = self.pan.next();
        let (gl, gr) = Self::gains(pan);

        match self.mode {
            PanningMode::Split => (l * gl, r * gr),
            PanningMode::SumToMono => {
                let mono = (l + r) * 0.5;
                (mono * gl, mono * gr)
            }
            PanningMode::Crossfeed => {
                let delayed_l = self.delay_l.read(self.delay_samples);
                let delayed_r = self.delay_r.read(self.delay_samples);
                self.delay_l.write(l);
                self.delay_r.write(r);
                let out_l = (l + delayed_r * 0.5) * gl;
                let out_r = (r + delayed_l * 0.5) * gr;
                (out_l, out_r)
            }
        }
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    fn reset(&mut self) {
        self.delay_l.clear();
        self.delay_r.clear();
    }

    fn latency_samples(&self) -> usize {
        match self.mode {
            PanningMode::Crossfeed => self.delay_samples,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_pan_splits_evenly() {
        let mut p = Panning::new(PanningMode::Split, 0.0, 0);
        let (l, r) = p.process(1.0, 1.0);
        assert!((l - r).abs() < 1e-5);
    }

    #[test]
    fn hard_left_pan_silences_right_gain() {
        let mut p = Panning::new(PanningMode::Split, -1.0, 0);
        let (_, r) = p.process(1.0, 1.0);
        assert!(r.abs() < 1e-5);
    }

    #[test]
    fn sum_to_mono_collapses_independent_channels() {
        let mut p = Panning::new(PanningMode::SumToMono, 0.0, 0);
        let (l, r) = p.process(1.0, -1.0);
        assert!(l.abs() < 1e-5 && r.abs() < 1e-5);
    }
}
