//! Tempo-to-sample-count conversions shared by the scheduler and the
//! total-duration estimator.

use libm::logf;

/// Number of output samples that make up one tick at the given tempo.
///
/// `samplesPerTick = sampleRate / (ticksPerPart * partsPerBeat * bpm / 60)`
/// (spec §4.1). Ticks-per-part and parts-per-beat are fixed per song; only
/// `beats_per_bar` varies, and tempo is re-evaluated live whenever a tempo
/// modulator is active.
#[inline]
pub fn samples_per_tick(
    sample_rate: f32,
    bpm: f32,
    ticks_per_part: u32,
    parts_per_beat: u32,
) -> f32 {
    let ticks_per_minute = (ticks_per_part * parts_per_beat) as f32 * bpm / 60.0;
    sample_rate / ticks_per_minute
}

/// `K` from the closed-form tempo-slide integral (spec §4.1.2): the number
/// of ticks per minute per unit BPM.
#[inline]
fn tempo_slide_k(parts_per_beat: u32, ticks_per_part: u32) -> f32 {
    (parts_per_beat * ticks_per_part) as f32 / 60.0
}

/// Total samples consumed while the tempo linearly slides from `start_bpm`
/// to `end_bpm` over `tick_length` ticks.
///
/// Uses the closed-form integral of `1/bpm(t)` rather than summing
/// `samples_per_tick` per tick, which would drift for long slides. Falls
/// back to the direct per-tick count when the endpoints are equal (the
/// integral's denominator vanishes there).
pub fn tempo_slide_samples(
    sample_rate: f32,
    start_bpm: f32,
    end_bpm: f32,
    tick_length: f32,
    parts_per_beat: u32,
    ticks_per_part: u32,
) -> f32 {
    let k = tempo_slide_k(parts_per_beat, ticks_per_part);
    if (start_bpm - end_bpm).abs() < 1e-6 {
        let spt = samples_per_tick(sample_rate, start_bpm, ticks_per_part, parts_per_beat);
        return tick_length * spt;
    }
    let numerator =
        logf(k * end_bpm * tick_length) - logf(k * start_bpm * tick_length);
    -sample_rate * tick_length * numerator / (k * (start_bpm - end_bpm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_tick_matches_hand_computation() {
        // 44100 Hz, 120 bpm, 6 ticks/part, 4 parts/beat
        let spt = samples_per_tick(44100.0, 120.0, 6, 4);
        let ticks_per_minute = 6.0 * 4.0 * 120.0 / 60.0;
        let expected = 44100.0 / ticks_per_minute;
        assert!((spt - expected).abs() < 1e-3);
    }

    #[test]
    fn constant_tempo_slide_matches_direct_multiply() {
        let direct = tempo_slide_samples(44100.0, 120.0, 120.0, 48.0, 4, 6);
        let spt = samples_per_tick(44100.0, 120.0, 6, 4);
        assert!((direct - 48.0 * spt).abs() < 1e-2);
    }

    #[test]
    fn slide_is_positive_and_finite_for_varying_tempo() {
        let samples = tempo_slide_samples(44100.0, 100.0, 160.0, 96.0, 4, 6);
        assert!(samples.is_finite());
        assert!(samples > 0.0);
    }
}
