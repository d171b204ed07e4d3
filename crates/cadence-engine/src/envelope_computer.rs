//! EnvelopeComputer: evaluates every envelope an instrument authors into a
//! per-tick `(start, end)` multiplier pair for the target it drives (spec
//! §4.9 "EnvelopeComputer").
//!
//! Each target accumulates multiplicatively across every envelope entry
//! that names it — an instrument with both a `Decay` volume envelope and a
//! `Tremolo` volume envelope hears their product, not a last-write-wins
//! override. `start`/`end` bracket the current tick so callers can drive a
//! [`cadence_core::Ramp`] across it (spec §4.6 "slide interpolation").

use std::collections::HashMap;

use cadence_song::envelope::{Envelope, EnvelopeKind, EnvelopeTarget, LfoShape};

const TAU: f32 = core::f32::consts::TAU;
/// Fixed attack window for the percussive `Punch` shape, seconds.
const PUNCH_ATTACK_SECONDS: f32 = 0.015;

/// The result of evaluating one instrument's envelope list for a tick: a
/// `(start, end)` multiplier pair per [`EnvelopeTarget`] that had at least
/// one envelope entry. Targets with none default to `(1.0, 1.0)` via
/// [`EnvelopeValues::get`].
#[derive(Debug, Clone, Default)]
pub struct EnvelopeValues {
    values: HashMap<EnvelopeTarget, (f32, f32)>,
}

impl EnvelopeValues {
    pub fn get(&self, target: EnvelopeTarget) -> (f32, f32) {
        self.values.get(&target).copied().unwrap_or((1.0, 1.0))
    }

    fn accumulate(&mut self, target: EnvelopeTarget, start: f32, end: f32) {
        let entry = self.values.entry(target).or_insert((1.0, 1.0));
        entry.0 *= start;
        entry.1 *= end;
    }
}

#[inline]
fn lfo_wave(shape: LfoShape, phase: f32) -> f32 {
    let p = phase.rem_euclid(1.0);
    match shape {
        LfoShape::Sine => 0.5 + 0.5 * libm::sinf(p * TAU),
        LfoShape::Square => {
            if p < 0.5 {
                1.0
            } else {
                0.0
            }
        }
        LfoShape::Triangle => 1.0 - (2.0 * (2.0 * p - 1.0).abs() - 1.0).abs() / 1.0,
        LfoShape::Sawtooth => p,
    }
}

/// Evaluate one envelope kind at note-age `t` seconds, given the envelope's
/// `speed` scalar and (for `NoteSizeDriven`) the note's authored size.
///
/// `t` is wall-clock seconds since the note began, and keeps advancing
/// through a released tone's fade-out tail rather than freezing, so a
/// `Decay`/`Twang`/`Flare`/`Punch`/`Swell` envelope still reaches its
/// asymptote during release (spec §4.9).
fn evaluate_kind(kind: EnvelopeKind, speed: f32, t: f32, note_size: f32) -> f32 {
    let speed = speed.max(1e-4);
    match kind {
        EnvelopeKind::Steady => 1.0,
        EnvelopeKind::Punch => {
            if t < PUNCH_ATTACK_SECONDS {
                t / PUNCH_ATTACK_SECONDS
            } else {
                libm::expf(-speed * (t - PUNCH_ATTACK_SECONDS))
            }
        }
        EnvelopeKind::Flare => (t * speed).clamp(0.0, 1.0),
        EnvelopeKind::Swell => libm::sinf(core::f32::consts::PI * (t * speed).clamp(0.0, 1.0)),
        EnvelopeKind::Twang => {
            let envelope = libm::sinf(core::f32::consts::PI * (t * speed).clamp(0.0, 1.0));
            let wobble = libm::sinf(t * speed * TAU * 5.0);
            envelope * wobble
        }
        EnvelopeKind::Tremolo => 0.5 + 0.5 * libm::sinf(t * speed * TAU),
        EnvelopeKind::Decay => libm::expf(-speed * t),
        EnvelopeKind::Lfo { lfo_shape } => lfo_wave(lfo_shape, t * speed),
        EnvelopeKind::NoteSizeDriven => note_size,
    }
}

/// Compute every envelope value for one instrument across one tick.
///
/// `note_age_start`/`note_age_end` are seconds since the note began,
/// bracketing this tick. `note_size_start`/`note_size_end` are the note's
/// authored pin-interpolated size (0..1-ish) at the same two instants.
pub fn compute_envelopes(
    envelopes: &[Envelope],
    note_age_start: f32,
    note_age_end: f32,
    note_size_start: f32,
    note_size_end: f32,
) -> EnvelopeValues {
    let mut values = EnvelopeValues::default();
    for env in envelopes {
        let mut start = evaluate_kind(env.kind, env.speed, note_age_start, note_size_start);
        let mut end = evaluate_kind(env.kind, env.speed, note_age_end, note_size_end);
        if let Some(lower) = env.lower_bound {
            start = start.max(lower);
            end = end.max(lower);
        }
        if let Some(upper) = env.upper_bound {
            start = start.min(upper);
            end = end.min(upper);
        }
        values.accumulate(env.target, start, end);
    }
    values
}

/// Extra lowpass-cutoff compensation applied so a decaying filter envelope
/// doesn't also perceptually quiet the note beyond what its volume envelope
/// already accounts for (spec §4.9 "lowpassCutoffDecayVolumeCompensation").
///
/// Returns a linear gain multiplier to apply alongside the filter's cutoff
/// move; `cutoff_ratio` is the filter's current cutoff divided by its fully
/// open cutoff (`1.0` = wide open, `0.0` = fully closed).
pub fn lowpass_cutoff_decay_volume_compensation(cutoff_ratio: f32) -> f32 {
    // A closing lowpass removes energy the ear expects the volume envelope
    // alone to have removed; compensate with a mild boost as it closes.
    1.0 + (1.0 - cutoff_ratio.clamp(0.0, 1.0)) * 0.3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_envelope_stays_at_unity() {
        let envs = vec![Envelope {
            target: EnvelopeTarget::NoteVolume,
            kind: EnvelopeKind::Steady,
            speed: 1.0,
            lower_bound: None,
            upper_bound: None,
        }];
        let v = compute_envelopes(&envs, 0.0, 0.1, 1.0, 1.0);
        let (s, e) = v.get(EnvelopeTarget::NoteVolume);
        assert_eq!(s, 1.0);
        assert_eq!(e, 1.0);
    }

    #[test]
    fn decay_envelope_falls_off_over_time() {
        let envs = vec![Envelope {
            target: EnvelopeTarget::NoteVolume,
            kind: EnvelopeKind::Decay,
            speed: 5.0,
            lower_bound: None,
            upper_bound: None,
        }];
        let v = compute_envelopes(&envs, 0.0, 1.0, 1.0, 1.0);
        let (start, end) = v.get(EnvelopeTarget::NoteVolume);
        assert!(start > end);
    }

    #[test]
    fn two_envelopes_on_the_same_target_multiply() {
        let envs = vec![
            Envelope {
                target: EnvelopeTarget::NoteVolume,
                kind: EnvelopeKind::Steady,
                speed: 1.0,
                lower_bound: None,
                upper_bound: Some(0.5),
            },
            Envelope {
                target: EnvelopeTarget::NoteVolume,
                kind: EnvelopeKind::Steady,
                speed: 1.0,
                lower_bound: None,
                upper_bound: Some(0.5),
            },
        ];
        let v = compute_envelopes(&envs, 0.0, 0.0, 1.0, 1.0);
        let (start, _) = v.get(EnvelopeTarget::NoteVolume);
        assert!((start - 0.25).abs() < 1e-6);
    }

    #[test]
    fn note_size_driven_tracks_authored_size_not_time() {
        let envs = vec![Envelope {
            target: EnvelopeTarget::NoteVolume,
            kind: EnvelopeKind::NoteSizeDriven,
            speed: 1.0,
            lower_bound: None,
            upper_bound: None,
        }];
        let v = compute_envelopes(&envs, 0.0, 10.0, 0.25, 0.75);
        let (start, end) = v.get(EnvelopeTarget::NoteVolume);
        assert!((start - 0.25).abs() < 1e-6);
        assert!((end - 0.75).abs() < 1e-6);
    }
}
