//! Band-limited step correction and pitch-conversion helpers shared by the
//! whole voice-synthesizer family (spec §4.5).

use libm::{floorf, log2f, powf};

/// Convert a MIDI-style pitch (60 = middle C = pitch 60 in the song's
/// pitch space) to frequency in Hz.
#[inline]
pub fn pitch_to_freq(pitch: f32) -> f32 {
    440.0 * powf(2.0, (pitch - 69.0) / 12.0)
}

/// Inverse of [`pitch_to_freq`].
#[inline]
pub fn freq_to_pitch(freq: f32) -> f32 {
    69.0 + 12.0 * log2f(freq / 440.0)
}

/// Convert a semitone interval to a frequency ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    powf(2.0, semitones / 12.0)
}

#[inline]
fn rem_euclid_f32(a: f32, b: f32) -> f32 {
    let r = a - b * floorf(a / b);
    if r < 0.0 { r + b } else { r }
}

/// 4th-order PolyBLEP (Polynomial Band-Limited Step) correction.
///
/// Applies a C²-continuous, degree-4 piecewise polynomial correction near
/// waveform discontinuities, a 2-samples-wide window on each side. Per
/// Välimäki et al., "Antialiasing Oscillators", IEEE Signal Processing
/// Magazine, 2010.
#[inline]
pub fn poly_blep(t: f32, dt: f32) -> f32 {
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    let dt2 = 2.0 * dt;
    if t < dt2 {
        let n = t / dt;
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    } else if t > 1.0 - dt2 {
        let n = (1.0 - t) / dt;
        if n < 1.0 {
            let n2 = n * n;
            -(A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0)
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            -(C * u2 * u2)
        }
    } else {
        0.0
    }
}

/// A naive sawtooth in `[-1, 1)` at `phase`, PolyBLEP-corrected at its
/// single discontinuity (phase wrap).
#[inline]
pub fn blep_saw(phase: f32, dt: f32) -> f32 {
    let naive = 2.0 * phase - 1.0;
    naive - poly_blep(phase, dt)
}

/// A naive pulse wave with duty cycle `duty`, PolyBLEP-corrected at both
/// the rising and falling edges.
#[inline]
pub fn blep_pulse(phase: f32, duty: f32, dt: f32) -> f32 {
    let duty = duty.clamp(0.01, 0.99);
    let naive = if phase < duty { 1.0 } else { -1.0 };
    let blep_rise = poly_blep(phase, dt);
    let blep_fall = poly_blep(rem_euclid_f32(phase - duty + 1.0, 1.0), dt);
    naive + blep_rise - blep_fall
}

/// Xorshift32 pseudo-random noise sample in `[-1, 1]`, advancing `state`.
#[inline]
pub fn next_noise_sample(state: &mut u32) -> f32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    (x as i32 as f32) / (i32::MAX as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_freq_roundtrip() {
        for pitch in [40.0, 60.0, 69.0, 84.0] {
            let freq = pitch_to_freq(pitch);
            assert!((freq_to_pitch(freq) - pitch).abs() < 1e-3);
        }
    }

    #[test]
    fn a4_is_440hz() {
        assert!((pitch_to_freq(69.0) - 440.0).abs() < 0.01);
    }

    #[test]
    fn poly_blep_vanishes_away_from_discontinuity() {
        assert_eq!(poly_blep(0.5, 0.01), 0.0);
    }

    #[test]
    fn noise_is_bounded() {
        let mut state = 12345u32;
        for _ in 0..1000 {
            let s = next_noise_sample(&mut state);
            assert!((-1.0..=1.0).contains(&s));
        }
    }
}
