//! Scalar gain effect (spec §4.8 "Gain": "scalar multiply, ramped").

use cadence_core::ramp::Ramp;
use cadence_core::math::db_to_linear;

use crate::trait_def::StereoEffect;

pub struct Gain {
    ramp: Ramp,
}

impl Gain {
    pub fn new(gain_db: f32) -> Self {
        Self { ramp: Ramp::at(db_to_linear(gain_db)) }
    }

    /// Begin ramping toward a new gain over the next `num_samples`.
    pub fn set_target_db(&mut self, gain_db: f32, num_samples: u32) {
        self.ramp.retarget(db_to_linear(gain_db), num_samples);
    }
}

impl StereoEffect for Gain {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let g = self.ramp.next();
        (l * g, r * g)
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    fn reset(&mut self) {
        self.ramp.snap(self.ramp.target());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_scales_signal() {
        let mut g = Gain::new(0.0);
        let (l, r) = g.process(0.5, -0.5);
        assert!((l - 0.5).abs() < 1e-5);
        assert!((r + 0.5).abs() < 1e-5);
    }

    #[test]
    fn gain_ramps_to_target() {
        let mut g = Gain::new(0.0);
        g.set_target_db(-200.0, 10);
        let mut last = (0.0, 0.0);
        for _ in 0..10 {
            last = g.process(1.0, 1.0);
        }
        assert!(last.0.abs() < 0.01);
    }
}
