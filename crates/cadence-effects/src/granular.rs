//! Granular delay: spawns short grains at randomized delay-line offsets,
//! windows each with a raised-cosine or parabolic envelope, and sums the
//! live grain population into the output (spec §4.8 "Granular").

use cadence_core::ring_buffer::RingBuffer;

use crate::trait_def::StereoEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrainEnvelopeShape {
    Parabolic,
    RaisedCosine,
}

fn window(shape: GrainEnvelopeShape, t: f32) -> f32 {
    match shape {
        GrainEnvelopeShape::Parabolic => 1.0 - (2.0 * t - 1.0) * (2.0 * t - 1.0),
        GrainEnvelopeShape::RaisedCosine => 0.5 - 0.5 * libm::cosf(2.0 * core::f32::consts::PI * t),
    }
}

struct Grain {
    age_samples: u32,
    length_samples: u32,
    delay_samples: f32,
}

const MAX_GRAINS: usize = 64;

pub struct Granular {
    delay_l: RingBuffer,
    delay_r: RingBuffer,
    grains: Vec<Grain>,
    next_spawn_countdown: u32,
    grain_size_samples: u32,
    grain_range_samples: u32,
    grain_amount_exponent: f32,
    min_delay_samples: f32,
    max_delay_samples: f32,
    envelope_shape: GrainEnvelopeShape,
    mix: f32,
    rng_state: u32,
}

impl Granular {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grain_size_samples: u32,
        grain_range_samples: u32,
        grain_amount_exponent: f32,
        min_delay_samples: f32,
        max_delay_samples: f32,
        envelope_shape: GrainEnvelopeShape,
        mix: f32,
    ) -> Self {
        let capacity =
            max_delay_samples as usize + grain_range_samples as usize + grain_size_samples as usize + 2;
        Self {
            delay_l: RingBuffer::new(capacity),
            delay_r: RingBuffer::new(capacity),
            grains: Vec::with_capacity(MAX_GRAINS),
            next_spawn_countdown: 0,
            grain_size_samples: grain_size_samples.max(1),
            grain_range_samples,
            grain_amount_exponent,
            min_delay_samples: min_delay_samples.max(0.0),
            max_delay_samples: max_delay_samples.max(min_delay_samples),
            envelope_shape,
            mix: mix.clamp(0.0, 1.0),
            rng_state: 0x9E3779B9,
        }
    }

    fn next_rand(&mut self) -> f32 {
        // xorshift32, matching the synth voices' noise generator pattern.
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 17;
        self.rng_state ^= self.rng_state << 5;
        (self.rng_state >> 8) as f32 / (1u32 << 24) as f32
    }

    fn spawn_interval_samples(&mut self) -> u32 {
        // higher grain_amount_exponent -> shorter average gap -> denser texture
        let base = self.grain_size_samples as f32 / 2.0_f32.max(self.grain_amount_exponent);
        (base.max(1.0)) as u32
    }

    fn maybe_spawn(&mut self) {
        if self.next_spawn_countdown == 0 {
            if self.grains.len() < MAX_GRAINS {
                let span = self.max_delay_samples - self.min_delay_samples;
                let jitter = self.next_rand() * self.grain_range_samples as f32;
                let delay = self.min_delay_samples + (self.next_rand() * span) + jitter;
                self.grains.push(Grain {
                    age_samples: 0,
                    length_samples: self.grain_size_samples,
                    delay_samples: delay.max(1.0),
                });
            }
            self.next_spawn_countdown = self.spawn_interval_samples();
        } else {
            self.next_spawn_countdown -= 1;
        }
    }
}

impl StereoEffect for Granular {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        self.delay_l.write(l);
        self.delay_r.write(r);

        self.maybe_spawn();

        let mut wet_l = 0.0f32;
        let mut wet_r = 0.0f32;
        let mut i = 0;
        while i < self.grains.len() {
            let alive = self.grains[i].age_samples < self.grains[i].length_samples;
            if !alive {
                // swap-remove: grain order doesn't matter, so this avoids
                // shifting the rest of the active population down by one.
                self.grains.swap_remove(i);
                continue;
            }
            let g = &mut self.grains[i];
            let t = g.age_samples as f32 / g.length_samples as f32;
            let env = window(self.envelope_shape, t);
            wet_l += self.delay_l.read_interpolated(g.delay_samples) * env;
            wet_r += self.delay_r.read_interpolated(g.delay_samples) * env;
            g.age_samples += 1;
            i += 1;
        }

        let grain_count = self.grains.len().max(1) as f32;
        let norm = 1.0 / grain_count.sqrt();
        (
            l + (wet_l * norm - l) * self.mix,
            r + (wet_r * norm - r) * self.mix,
        )
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    fn reset(&mut self) {
        self.delay_l.clear();
        self.delay_r.clear();
        self.grains.clear();
        self.next_spawn_countdown = 0;
    }

    fn latency_samples(&self) -> usize {
        self.max_delay_samples as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_functions_peak_at_center() {
        for shape in [GrainEnvelopeShape::Parabolic, GrainEnvelopeShape::RaisedCosine] {
            let center = window(shape, 0.5);
            let edge = window(shape, 0.0);
            assert!(center > edge);
        }
    }

    #[test]
    fn output_stays_finite_over_many_grains() {
        let mut g = Granular::new(200, 50, 2.0, 10.0, 500.0, GrainEnvelopeShape::RaisedCosine, 1.0);
        for i in 0..5000 {
            let x = libm::sinf(i as f32 * 0.02);
            let (l, r) = g.process(x, x);
            assert!(l.is_finite() && r.is_finite());
        }
    }

    #[test]
    fn dead_grains_are_reaped() {
        let mut g = Granular::new(10, 0, 4.0, 5.0, 20.0, GrainEnvelopeShape::Parabolic, 1.0);
        for _ in 0..500 {
            g.process(0.1, 0.1);
        }
        assert!(g.grains.len() <= MAX_GRAINS);
    }
}
