//! Small math and denormal-sanitization helpers shared across the renderer.
//!
//! Ported from the teacher's DSP math module and trimmed to what the
//! tracker renderer actually needs: level conversions, interpolation, and
//! the denormal-flush used after every filter run (spec §4.7).

use libm::{expf, logf};

/// Convert decibels to linear gain.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Linear interpolation between `a` and `b` at `t` (unclamped).
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamp a value to `[0.0, 1.0]`.
#[inline]
pub fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Crossfade between dry and wet signals: `dry + (wet - dry) * mix`.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

/// Stereo crossfade between dry and wet signals.
#[inline]
pub fn wet_dry_mix_stereo(dry_l: f32, dry_r: f32, wet_l: f32, wet_r: f32, mix: f32) -> (f32, f32) {
    (wet_dry_mix(dry_l, wet_l, mix), wet_dry_mix(dry_r, wet_r, mix))
}

/// Sum two channels to mono.
#[inline]
pub fn mono_sum(left: f32, right: f32) -> f32 {
    (left + right) * 0.5
}

/// Flush a value that has decayed into denormal range to exact zero.
///
/// Denormal floats are produced by decaying filter/delay feedback loops and
/// are many times slower to compute on most FPUs. Spec §4.7 requires this
/// sweep after every filter run; `1e-24` is the threshold used there.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-24 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_linear_roundtrip() {
        for db in [-24.0, -6.0, 0.0, 3.0, 12.0] {
            let linear = db_to_linear(db);
            assert!((linear_to_db(linear) - db).abs() < 0.01);
        }
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 8.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 8.0, 1.0), 8.0);
        assert_eq!(lerp(2.0, 8.0, 0.5), 5.0);
    }

    #[test]
    fn flush_denormal_zeroes_tiny_values() {
        assert_eq!(flush_denormal(1e-30), 0.0);
        assert_eq!(flush_denormal(1e-20), 1e-20);
        assert_eq!(flush_denormal(-1e-30), 0.0);
    }

    #[test]
    fn wet_dry_mix_bounds() {
        assert_eq!(wet_dry_mix(1.0, 5.0, 0.0), 1.0);
        assert_eq!(wet_dry_mix(1.0, 5.0, 1.0), 5.0);
    }
}
