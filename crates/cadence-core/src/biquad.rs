//! A dynamic (per-sample coefficient-interpolating) biquad filter.
//!
//! Tracker modulation can retarget a filter's cutoff/resonance every tick
//! (spec §4.7, "filter morphing"). Recomputing RBJ coefficients once per
//! tick and then snapping to them produces an audible zipper; instead the
//! filter is given a *start* and *end* coefficient set for the tick and
//! linearly interpolates between them one sample at a time via
//! [`DynamicBiquad::load_gradient`] / [`DynamicBiquad::process`].
//!
//! The underlying Direct Form I difference equation and the RBJ cookbook
//! coefficient formulas are ported from the teacher's `biquad` module.

use libm::{cosf, sinf, sqrtf};

/// The five normalized coefficients of a Direct Form I biquad section.
///
/// `a0` is always normalized to `1.0` before storage; the remaining fields
/// are `b0, b1, b2, a1, a2` of `H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1
/// z^-1 + a2 z^-2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoefficients {
    /// The identity filter (pass-through).
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Which RBJ cookbook formula to use when deriving coefficients from
/// cutoff/resonance/gain parameters (spec §4.7 filter kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
    Notch,
    PeakingEq,
    LowShelf,
    HighShelf,
    AllPass,
}

/// Derive normalized RBJ coefficients for `kind` at the given cutoff
/// (normalized `0.0..0.5` of sample rate), Q, and gain in dB (used only by
/// the shelf/peaking kinds).
pub fn rbj_coefficients(
    kind: FilterKind,
    normalized_cutoff: f32,
    q: f32,
    gain_db: f32,
) -> BiquadCoefficients {
    let w0 = core::f32::consts::TAU * normalized_cutoff.clamp(1e-5, 0.4999);
    let cos_w0 = cosf(w0);
    let sin_w0 = sinf(w0);
    let q = q.max(1e-4);
    let alpha = sin_w0 / (2.0 * q);

    match kind {
        FilterKind::LowPass => {
            let b0 = (1.0 - cos_w0) / 2.0;
            let b1 = 1.0 - cos_w0;
            let b2 = (1.0 - cos_w0) / 2.0;
            let a0 = 1.0 + alpha;
            let a1 = -2.0 * cos_w0;
            let a2 = 1.0 - alpha;
            normalize(b0, b1, b2, a0, a1, a2)
        }
        FilterKind::HighPass => {
            let b0 = (1.0 + cos_w0) / 2.0;
            let b1 = -(1.0 + cos_w0);
            let b2 = (1.0 + cos_w0) / 2.0;
            let a0 = 1.0 + alpha;
            let a1 = -2.0 * cos_w0;
            let a2 = 1.0 - alpha;
            normalize(b0, b1, b2, a0, a1, a2)
        }
        FilterKind::BandPass => {
            let b0 = alpha;
            let b1 = 0.0;
            let b2 = -alpha;
            let a0 = 1.0 + alpha;
            let a1 = -2.0 * cos_w0;
            let a2 = 1.0 - alpha;
            normalize(b0, b1, b2, a0, a1, a2)
        }
        FilterKind::Notch => {
            let b0 = 1.0;
            let b1 = -2.0 * cos_w0;
            let b2 = 1.0;
            let a0 = 1.0 + alpha;
            let a1 = -2.0 * cos_w0;
            let a2 = 1.0 - alpha;
            normalize(b0, b1, b2, a0, a1, a2)
        }
        FilterKind::AllPass => {
            let b0 = 1.0 - alpha;
            let b1 = -2.0 * cos_w0;
            let b2 = 1.0 + alpha;
            let a0 = 1.0 + alpha;
            let a1 = -2.0 * cos_w0;
            let a2 = 1.0 - alpha;
            normalize(b0, b1, b2, a0, a1, a2)
        }
        FilterKind::PeakingEq => {
            let a = sqrtf(10f32.powf(gain_db / 40.0));
            let b0 = 1.0 + alpha * a;
            let b1 = -2.0 * cos_w0;
            let b2 = 1.0 - alpha * a;
            let a0 = 1.0 + alpha / a;
            let a1 = -2.0 * cos_w0;
            let a2 = 1.0 - alpha / a;
            normalize(b0, b1, b2, a0, a1, a2)
        }
        FilterKind::LowShelf => {
            let a = sqrtf(10f32.powf(gain_db / 40.0));
            let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;
            let b0 = a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
            let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0);
            let b2 = a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha);
            let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
            let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0);
            let a2 = (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha;
            normalize(b0, b1, b2, a0, a1, a2)
        }
        FilterKind::HighShelf => {
            let a = sqrtf(10f32.powf(gain_db / 40.0));
            let two_sqrt_a_alpha = 2.0 * sqrtf(a) * alpha;
            let b0 = a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
            let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0);
            let b2 = a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha);
            let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
            let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0);
            let a2 = (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha;
            normalize(b0, b1, b2, a0, a1, a2)
        }
    }
}

#[inline]
fn normalize(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> BiquadCoefficients {
    BiquadCoefficients {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
    }
}

/// A biquad filter whose coefficients can be linearly interpolated sample
/// by sample across a fixed number of steps, rather than snapped to
/// instantly.
#[derive(Debug, Clone)]
pub struct DynamicBiquad {
    current: BiquadCoefficients,
    delta: BiquadCoefficients,
    steps_remaining: u32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl DynamicBiquad {
    pub fn new() -> Self {
        Self {
            current: BiquadCoefficients::IDENTITY,
            delta: BiquadCoefficients::IDENTITY,
            steps_remaining: 0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Snap directly to `coeffs`, cancelling any in-progress gradient.
    pub fn set_coefficients(&mut self, coeffs: BiquadCoefficients) {
        self.current = coeffs;
        self.steps_remaining = 0;
    }

    /// Begin interpolating from the current coefficients to `target` over
    /// `num_samples` samples (the tick length, per spec §4.7).
    ///
    /// `num_samples == 0` behaves like [`set_coefficients`](Self::set_coefficients).
    pub fn load_gradient(&mut self, target: BiquadCoefficients, num_samples: u32) {
        if num_samples == 0 {
            self.set_coefficients(target);
            return;
        }
        let n = num_samples as f32;
        self.delta = BiquadCoefficients {
            b0: (target.b0 - self.current.b0) / n,
            b1: (target.b1 - self.current.b1) / n,
            b2: (target.b2 - self.current.b2) / n,
            a1: (target.a1 - self.current.a1) / n,
            a2: (target.a2 - self.current.a2) / n,
        };
        self.steps_remaining = num_samples;
    }

    fn advance_gradient(&mut self) {
        if self.steps_remaining == 0 {
            return;
        }
        self.current.b0 += self.delta.b0;
        self.current.b1 += self.delta.b1;
        self.current.b2 += self.delta.b2;
        self.current.a1 += self.delta.a1;
        self.current.a2 += self.delta.a2;
        self.steps_remaining -= 1;
    }

    /// Process one sample, advancing any active coefficient gradient.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = self.current;
        let output =
            c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = crate::math::flush_denormal(output);
        self.advance_gradient();
        output
    }

    /// Reset the internal state (history), leaving coefficients untouched.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn coefficients(&self) -> BiquadCoefficients {
        self.current
    }
}

impl Default for DynamicBiquad {
    fn default() -> Self {
        Self::new()
    }
}

/// Flush the internal state of a filter pair back to zero if it has decayed
/// into denormal range, called once per tick after filter morphing (spec
/// §4.7 "denormal safety sweep").
pub fn sanitize_filters(filters: &mut [DynamicBiquad]) {
    for filter in filters {
        filter.x1 = crate::math::flush_denormal(filter.x1);
        filter.x2 = crate::math::flush_denormal(filter.x2);
        filter.y1 = crate::math::flush_denormal(filter.y1);
        filter.y2 = crate::math::flush_denormal(filter.y2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_signal_through() {
        let mut f = DynamicBiquad::new();
        for x in [0.1, -0.5, 1.0, -1.0, 0.0] {
            assert_eq!(f.process(x), x);
        }
    }

    #[test]
    fn lowpass_attenuates_dc_less_than_nyquist() {
        let coeffs = rbj_coefficients(FilterKind::LowPass, 0.05, 0.707, 0.0);
        let mut f = DynamicBiquad::new();
        f.set_coefficients(coeffs);
        // settle on a DC input
        let mut last = 0.0;
        for _ in 0..2000 {
            last = f.process(1.0);
        }
        assert!(last > 0.9, "DC should pass through a lowpass near-unity: {last}");

        let mut f2 = DynamicBiquad::new();
        f2.set_coefficients(coeffs);
        // alternate +1/-1 approximates Nyquist; lowpass should attenuate it heavily
        let mut peak: f32 = 0.0;
        for i in 0..2000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            peak = peak.max(f2.process(x).abs());
        }
        assert!(peak < 0.5, "Nyquist content should be attenuated: {peak}");
    }

    #[test]
    fn gradient_reaches_target_after_num_samples() {
        let mut f = DynamicBiquad::new();
        let target = rbj_coefficients(FilterKind::LowPass, 0.1, 1.0, 0.0);
        f.load_gradient(target, 100);
        for _ in 0..100 {
            f.process(0.0);
        }
        let c = f.coefficients();
        assert!((c.b0 - target.b0).abs() < 1e-4);
        assert!((c.a1 - target.a1).abs() < 1e-4);
    }

    #[test]
    fn zero_length_gradient_snaps_immediately() {
        let mut f = DynamicBiquad::new();
        let target = rbj_coefficients(FilterKind::HighPass, 0.2, 0.707, 0.0);
        f.load_gradient(target, 0);
        assert_eq!(f.coefficients(), target);
    }

    #[test]
    fn sanitize_filters_zeroes_denormal_history() {
        let mut f = DynamicBiquad::new();
        f.x1 = 1e-30;
        f.y1 = -1e-30;
        let mut bank = [f];
        sanitize_filters(&mut bank);
        assert_eq!(bank[0].x1, 0.0);
        assert_eq!(bank[0].y1, 0.0);
    }
}
