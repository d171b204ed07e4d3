//! Chorus: six LFO-modulated delay taps (three per channel) summed with a
//! mix-dependent gain compensation so the combined output's energy stays
//! roughly constant as `mix` changes (spec §4.8 "Chorus").

use cadence_core::ring_buffer::RingBuffer;

use crate::trait_def::StereoEffect;

const MAX_DEPTH_SAMPLES: usize = 2048;
const TWO_PI: f32 = 2.0 * core::f32::consts::PI;
// Phase offsets for the three taps feeding each channel, spread evenly
// around the LFO cycle so the taps don't beat in lockstep.
const TAP_PHASE_OFFSETS: [f32; 3] = [0.0, TWO_PI / 3.0, 2.0 * TWO_PI / 3.0];

pub struct Chorus {
    delay_l: RingBuffer,
    delay_r: RingBuffer,
    lfo_phase: f32,
    lfo_rate_radians: f32,
    depth_samples: f32,
    mix: f32,
    sample_rate: f32,
}

impl Chorus {
    pub fn new(rate_hz: f32, depth_samples: f32, mix: f32, sample_rate: f32) -> Self {
        let cap = MAX_DEPTH_SAMPLES + 4;
        Self {
            delay_l: RingBuffer::new(cap),
            delay_r: RingBuffer::new(cap),
            lfo_phase: 0.0,
            lfo_rate_radians: TWO_PI * rate_hz / sample_rate,
            depth_samples: depth_samples.clamp(0.0, MAX_DEPTH_SAMPLES as f32 - 2.0),
            mix: mix.clamp(0.0, 1.0),
            sample_rate,
        }
    }

    pub fn set_rate_hz(&mut self, rate_hz: f32) {
        self.lfo_rate_radians = TWO_PI * rate_hz / self.sample_rate;
    }

    fn combined_mult(&self) -> f32 {
        1.0 / libm::sqrtf(3.0 * self.mix * self.mix + 1.0)
    }
}

impl StereoEffect for Chorus {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let mut sum_l = 0.0f32;
        let mut sum_r = 0.0f32;
        for offset in TAP_PHASE_OFFSETS {
            let lfo = libm::sinf(self.lfo_phase + offset) * 0.5 + 0.5;
            let tap_offset = lfo * self.depth_samples;
            sum_l += self.delay_l.read_interpolated(tap_offset);
            sum_r += self.delay_r.read_interpolated(tap_offset);
        }

        self.delay_l.write(l);
        self.delay_r.write(r);

        self.lfo_phase += self.lfo_rate_radians;
        if self.lfo_phase > TWO_PI {
            self.lfo_phase -= TWO_PI;
        }

        let combined_mult = self.combined_mult();
        let wet_l = sum_l * self.mix * combined_mult;
        let wet_r = sum_r * self.mix * combined_mult;
        (l * combined_mult + wet_l, r * combined_mult + wet_r)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let rate_hz = self.lfo_rate_radians * self.sample_rate / TWO_PI;
        self.sample_rate = sample_rate;
        self.set_rate_hz(rate_hz);
    }

    fn reset(&mut self) {
        self.delay_l.clear();
        self.delay_r.clear();
        self.lfo_phase = 0.0;
    }

    fn latency_samples(&self) -> usize {
        self.depth_samples as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mix_is_near_identity() {
        let mut c = Chorus::new(0.5, 50.0, 0.0, 48000.0);
        let (l, r) = c.process(0.4, -0.4);
        assert!((l - 0.4).abs() < 1e-4);
        assert!((r + 0.4).abs() < 1e-4);
    }

    #[test]
    fn output_stays_finite() {
        let mut c = Chorus::new(1.5, 100.0, 0.8, 48000.0);
        for i in 0..2000 {
            let x = libm::sinf(i as f32 * 0.03);
            let (l, r) = c.process(x, x);
            assert!(l.is_finite() && r.is_finite());
        }
    }
}
