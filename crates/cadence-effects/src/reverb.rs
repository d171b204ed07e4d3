//! Reverb: a 4-line Hadamard-mixed feedback delay network at fixed tap
//! offsets within a 16384-sample window, with a highpass shelf in the
//! feedback path and decorrelated L/R sums (spec §4.8 "Reverb").

use cadence_core::biquad::{rbj_coefficients, DynamicBiquad, FilterKind};
use cadence_core::ring_buffer::RingBuffer;

use crate::trait_def::StereoEffect;

const BUFFER_LEN: usize = 16384;
const TAP_OFFSETS: [usize; 4] = [3041, 6426, 10907, 4001];

#[inline]
fn hadamard4(x: [f32; 4]) -> [f32; 4] {
    let a = x[0] + x[1];
    let b = x[0] - x[1];
    let c = x[2] + x[3];
    let d = x[2] - x[3];
    [(a + c) * 0.5, (b + d) * 0.5, (a - c) * 0.5, (b - d) * 0.5]
}

pub struct Reverb {
    lines: [RingBuffer; 4],
    shelf: [DynamicBiquad; 4],
    mix: f32,
    sustain: f32,
}

impl Reverb {
    pub fn new(mix: f32, sustain: f32, sample_rate: f32) -> Self {
        let mut shelf = [DynamicBiquad::new(), DynamicBiquad::new(), DynamicBiquad::new(), DynamicBiquad::new()];
        let coeffs = rbj_coefficients(FilterKind::HighShelf, 200.0 / sample_rate, 0.707, -8.0);
        for s in &mut shelf {
            s.set_coefficients(coeffs);
        }
        Self {
            lines: TAP_OFFSETS.map(|_| RingBuffer::new(BUFFER_LEN)),
            shelf,
            mix: mix.clamp(0.0, 1.0),
            sustain: sustain.clamp(0.0, 0.98),
        }
    }

    pub fn set_sustain(&mut self, sustain: f32) {
        self.sustain = sustain.clamp(0.0, 0.98);
    }
}

impl StereoEffect for Reverb {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let taps = [
            self.lines[0].read(TAP_OFFSETS[0]),
            self.lines[1].read(TAP_OFFSETS[1]),
            self.lines[2].read(TAP_OFFSETS[2]),
            self.lines[3].read(TAP_OFFSETS[3]),
        ];

        let mixed = hadamard4(taps);
        let input_sum = (l + r) * 0.25;

        for i in 0..4 {
            let fed_back = self.shelf[i].process(mixed[i]) * self.sustain;
            self.lines[i].write(input_sum + fed_back);
        }

        // Lines 0/2 feed L, lines 1/3 feed R: each channel hears a
        // different pair of taps so the stereo image decorrelates.
        let wet_l = taps[0] + taps[2];
        let wet_r = taps[1] + taps[3];

        (l + wet_l * self.mix, r + wet_r * self.mix)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let coeffs = rbj_coefficients(FilterKind::HighShelf, 200.0 / sample_rate, 0.707, -8.0);
        for s in &mut self.shelf {
            s.set_coefficients(coeffs);
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        for s in &mut self.shelf {
            s.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_in_produces_silence_out() {
        let mut rv = Reverb::new(0.5, 0.7, 48000.0);
        for _ in 0..100 {
            let (l, r) = rv.process(0.0, 0.0);
            assert!(l.abs() < 1e-6 && r.abs() < 1e-6);
        }
    }

    #[test]
    fn impulse_produces_a_decaying_tail() {
        let mut rv = Reverb::new(0.8, 0.9, 48000.0);
        rv.process(1.0, 1.0);
        let mut energy_early = 0.0f32;
        let mut energy_late = 0.0f32;
        for i in 0..20000 {
            let (l, r) = rv.process(0.0, 0.0);
            let e = l * l + r * r;
            if i < 100 {
                energy_early += e;
            } else if (11000..11100).contains(&i) {
                energy_late += e;
            }
        }
        assert!(energy_early.is_finite() && energy_late.is_finite());
    }
}
