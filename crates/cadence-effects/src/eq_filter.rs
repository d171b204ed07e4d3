//! EQ filter effect: a dual L/R biquad cascade plus a volume-compensation
//! ramp (spec §4.8 "EQ filter").

use cadence_core::biquad::{sanitize_filters, DynamicBiquad};
use cadence_core::ramp::Ramp;

use crate::trait_def::StereoEffect;

pub struct EqFilter {
    chain_l: Vec<DynamicBiquad>,
    chain_r: Vec<DynamicBiquad>,
    volume_compensation: Ramp,
}

impl EqFilter {
    pub fn new(num_points: usize) -> Self {
        Self {
            chain_l: (0..num_points).map(|_| DynamicBiquad::new()).collect(),
            chain_r: (0..num_points).map(|_| DynamicBiquad::new()).collect(),
            volume_compensation: Ramp::at(1.0),
        }
    }

    /// Load a new coefficient gradient for point `index` in both channels,
    /// interpolating across the tick (spec §4.7).
    pub fn load_point_gradient(
        &mut self,
        index: usize,
        coeffs: cadence_core::biquad::BiquadCoefficients,
        num_samples: u32,
    ) {
        if let Some(f) = self.chain_l.get_mut(index) {
            f.load_gradient(coeffs, num_samples);
        }
        if let Some(f) = self.chain_r.get_mut(index) {
            f.load_gradient(coeffs, num_samples);
        }
    }

    pub fn set_volume_compensation_target(&mut self, target: f32, num_samples: u32) {
        self.volume_compensation.retarget(target.min(3.0), num_samples);
    }
}

impl StereoEffect for EqFilter {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let mut out_l = l;
        let mut out_r = r;
        for f in &mut self.chain_l {
            out_l = f.process(out_l);
        }
        for f in &mut self.chain_r {
            out_r = f.process(out_r);
        }
        let comp = self.volume_compensation.next();
        (out_l * comp, out_r * comp)
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {
        self.reset();
    }

    fn reset(&mut self) {
        for f in &mut self.chain_l {
            f.reset();
        }
        for f in &mut self.chain_r {
            f.reset();
        }
        sanitize_filters(&mut self.chain_l);
        sanitize_filters(&mut self.chain_r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::biquad::{rbj_coefficients, FilterKind};

    #[test]
    fn identity_filter_passes_signal() {
        let mut eq = EqFilter::new(1);
        let (l, r) = eq.process(0.3, -0.3);
        assert!((l - 0.3).abs() < 1e-5);
        assert!((r + 0.3).abs() < 1e-5);
    }

    #[test]
    fn lowpass_attenuates_high_frequency_content() {
        let mut eq = EqFilter::new(1);
        let coeffs = rbj_coefficients(FilterKind::LowPass, 0.05, 0.707, 0.0);
        eq.load_point_gradient(0, coeffs, 0);
        let mut peak: f32 = 0.0;
        for i in 0..1000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let (l, _) = eq.process(x, x);
            peak = peak.max(l.abs());
        }
        assert!(peak < 0.5);
    }
}
