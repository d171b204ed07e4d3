//! Flanger: two sine/cosine LFO-modulated delay taps with feedback
//! write-back (spec §4.8 "Flanger").

use cadence_core::ring_buffer::RingBuffer;

use crate::trait_def::StereoEffect;

const MAX_DEPTH_SAMPLES: usize = 4096;

pub struct Flanger {
    delay_l: RingBuffer,
    delay_r: RingBuffer,
    lfo_phase: f32,
    lfo_rate_radians: f32,
    depth_samples: f32,
    feedback: f32,
    mix: f32,
    sample_rate: f32,
}

impl Flanger {
    pub fn new(rate_hz: f32, depth_samples: f32, feedback: f32, mix: f32, sample_rate: f32) -> Self {
        let cap = MAX_DEPTH_SAMPLES + 4;
        Self {
            delay_l: RingBuffer::new(cap),
            delay_r: RingBuffer::new(cap),
            lfo_phase: 0.0,
            lfo_rate_radians: 2.0 * core::f32::consts::PI * rate_hz / sample_rate,
            depth_samples: depth_samples.clamp(0.0, MAX_DEPTH_SAMPLES as f32 - 2.0),
            feedback: feedback.clamp(-0.99, 0.99),
            mix: mix.clamp(0.0, 1.0),
            sample_rate,
        }
    }

    pub fn set_rate_hz(&mut self, rate_hz: f32) {
        self.lfo_rate_radians = 2.0 * core::f32::consts::PI * rate_hz / self.sample_rate;
    }
}

impl StereoEffect for Flanger {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        // L reads the sine tap, R reads the cosine tap: the two channels
        // sweep out of phase with each other.
        let sin_offset = (libm::sinf(self.lfo_phase) * 0.5 + 0.5) * self.depth_samples;
        let cos_offset = (libm::cosf(self.lfo_phase) * 0.5 + 0.5) * self.depth_samples;

        let tap_l = self.delay_l.read_interpolated(sin_offset);
        let tap_r = self.delay_r.read_interpolated(cos_offset);

        self.delay_l.write(l + tap_l * self.feedback);
        self.delay_r.write(r + tap_r * self.feedback);

        self.lfo_phase += self.lfo_rate_radians;
        if self.lfo_phase > 2.0 * core::f32::consts::PI {
            self.lfo_phase -= 2.0 * core::f32::consts::PI;
        }

        (l + (tap_l - l) * self.mix, r + (tap_r - r) * self.mix)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let rate_hz = self.lfo_rate_radians * self.sample_rate / (2.0 * core::f32::consts::PI);
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
    fn zero_mix_passes_signal_through() {
        let mut f = Flanger::new(0.5, 100.0, 0.0, 0.0, 48000.0);
        let (l, r) = f.process(0.3, -0.3);
        assert!((l - 0.3).abs() < 1e-5);
        assert!((r + 0.3).abs() < 1e-5);
    }

    #[test]
    fn output_stays_finite_with_feedback() {
        let mut f = Flanger::new(2.0, 200.0, 0.7, 0.5, 48000.0);
        for i in 0..2000 {
            let x = libm::sinf(i as f32 * 0.05);
            let (l, r) = f.process(x, x);
            assert!(l.is_finite() && r.is_finite());
        }
    }
}
