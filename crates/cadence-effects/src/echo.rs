//! Echo: tempo-synced delay with optional ping-pong crossfeed and a
//! per-tap highpass shelf that darkens repeats as they decay
//! (spec §4.8 "Echo").

use cadence_core::biquad::{rbj_coefficients, DynamicBiquad, FilterKind};
use cadence_core::ring_buffer::RingBuffer;

use crate::trait_def::StereoEffect;

pub struct Echo {
    delay_l: RingBuffer,
    delay_r: RingBuffer,
    shelf_l: DynamicBiquad,
    shelf_r: DynamicBiquad,
    delay_samples: usize,
    sustain: f32,
    ping_pong: bool,
    sample_rate: f32,
}

impl Echo {
    pub fn new(delay_samples: usize, sustain: f32, ping_pong: bool, sample_rate: f32) -> Self {
        let mut shelf_l = DynamicBiquad::new();
        let mut shelf_r = DynamicBiquad::new();
        let coeffs = rbj_coefficients(FilterKind::HighShelf, 300.0 / sample_rate, 0.707, -6.0);
        shelf_l.set_coefficients(coeffs);
        shelf_r.set_coefficients(coeffs);

        Self {
            delay_l: RingBuffer::new(delay_samples.max(1) + 1),
            delay_r: RingBuffer::new(delay_samples.max(1) + 1),
            shelf_l,
            shelf_r,
            delay_samples,
            sustain: sustain.clamp(0.0, 0.99),
            ping_pong,
            sample_rate,
        }
    }

    /// Reallocate the delay buffer for a new tempo-derived tap length,
    /// preserving whatever tail is still audible in the old buffer
    /// (spec §4.1.2's tempo-slide reallocation behavior, applied here to
    /// the echo tap instead of the tick clock).
    pub fn set_delay_samples(&mut self, delay_samples: usize) {
        self.delay_samples = delay_samples;
        let needed = delay_samples.max(1) + 1;
        self.delay_l.resize_preserving(needed);
        self.delay_r.resize_preserving(needed);
    }

    pub fn set_sustain(&mut self, sustain: f32) {
        self.sustain = sustain.clamp(0.0, 0.99);
    }
}

impl StereoEffect for Echo {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let tap_l = self.shelf_l.process(self.delay_l.read(self.delay_samples));
        let tap_r = self.shelf_r.process(self.delay_r.read(self.delay_samples));

        let (feed_l, feed_r) = if self.ping_pong { (tap_r, tap_l) } else { (tap_l, tap_r) };

        self.delay_l.write(l + feed_l * self.sustain);
        self.delay_r.write(r + feed_r * self.sustain);

        (l + tap_l, r + tap_r)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let coeffs = rbj_coefficients(FilterKind::HighShelf, 300.0 / sample_rate, 0.707, -6.0);
        self.shelf_l.set_coefficients(coeffs);
        self.shelf_r.set_coefficients(coeffs);
    }

    fn reset(&mut self) {
        self.delay_l.clear();
        self.delay_r.clear();
        self.shelf_l.reset();
        self.shelf_r.reset();
    }

    fn latency_samples(&self) -> usize {
        0
    }
}
