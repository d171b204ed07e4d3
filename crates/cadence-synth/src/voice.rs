//! Voice synthesizers: one function per instrument kind, each additively
//! writing stereo samples into the instrument's temp buffer (spec §4.5).
//!
//! Every variant follows the shared inner-loop template from §4.5: compute
//! a raw oscillator value, anti-alias it (bandlimited integration or
//! PolyBLEP), mix unison voices, run it through the tone's note-filter
//! chain, scale by the tone's expression ramp, and step phase/expression
//! forward by one sample.

use cadence_song::InstrumentKind;

use crate::oscillator::{blep_pulse, blep_saw, next_noise_sample, poly_blep};
use crate::tone::{LoopDirection, Tone};

/// Precomputed read-only wave tables a voice synthesizer consults. Process-
/// wide and immutable after construction (spec §5 "Shared resources").
pub struct WaveTables {
    pub sine: Vec<f32>,
    pub chip_noise: Vec<f32>,
    pub spectrum_noise: Vec<f32>,
}

impl WaveTables {
    pub fn new() -> Self {
        const SINE_LEN: usize = 2048;
        let sine = (0..SINE_LEN)
            .map(|i| libm::sinf(2.0 * core::f32::consts::PI * i as f32 / SINE_LEN as f32))
            .collect();

        let mut noise_state = 0xC0FFEEu32;
        const NOISE_LEN: usize = 4096;
        let chip_noise = (0..NOISE_LEN).map(|_| next_noise_sample(&mut noise_state)).collect();
        let spectrum_noise = (0..NOISE_LEN).map(|_| next_noise_sample(&mut noise_state)).collect();

        Self { sine, chip_noise, spectrum_noise }
    }

    #[inline]
    pub fn sine_at(&self, phase: f32) -> f32 {
        let len = self.sine.len() as f32;
        let pos = phase.rem_euclid(1.0) * len;
        let i0 = pos as usize % self.sine.len();
        let i1 = (i0 + 1) % self.sine.len();
        let frac = pos - pos.floor();
        self.sine[i0] + (self.sine[i1] - self.sine[i0]) * frac
    }

    #[inline]
    fn table_at(table: &[f32], phase: f32) -> f32 {
        let len = table.len() as f32;
        let pos = phase.rem_euclid(1.0) * len;
        let i0 = pos as usize % table.len();
        let i1 = (i0 + 1) % table.len();
        let frac = pos - pos.floor();
        table[i0] + (table[i1] - table[i0]) * frac
    }
}

impl Default for WaveTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Additively render `run_samples` of `tone` according to `kind` into
/// `out_l`/`out_r` (each at least `run_samples` long).
pub fn synthesize(
    kind: &InstrumentKind,
    tone: &mut Tone,
    tables: &WaveTables,
    run_samples: usize,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    match kind {
        InstrumentKind::Chip { .. } => synth_chip(tone, tables, run_samples, out_l, out_r),
        InstrumentKind::CustomChipWave { loop_mode, .. } => {
            synth_chip_loopable(tone, tables, *loop_mode, run_samples, out_l, out_r)
        }
        InstrumentKind::Fm { operators, feedback_amount, feedback_operators } => {
            synth_fm(tone, tables, operators, *feedback_amount, feedback_operators, run_samples, out_l, out_r)
        }
        InstrumentKind::Fm6Op { operators, feedback_amount, feedback_operators } => {
            synth_fm(tone, tables, operators, *feedback_amount, feedback_operators, run_samples, out_l, out_r)
        }
        InstrumentKind::Harmonics { harmonic_amplitudes } => {
            synth_harmonics(tone, tables, harmonic_amplitudes, run_samples, out_l, out_r)
        }
        InstrumentKind::Pwm { .. } => synth_pwm(tone, run_samples, out_l, out_r),
        InstrumentKind::Supersaw { voice_count, shape, .. } => {
            synth_supersaw(tone, *voice_count, *shape, run_samples, out_l, out_r)
        }
        InstrumentKind::PickedString { .. } => synth_picked_string(tone, run_samples, out_l, out_r),
        InstrumentKind::Noise { .. } => synth_noise(tone, tables, run_samples, out_l, out_r),
        InstrumentKind::Spectrum { harmonic_amplitudes } => {
            synth_spectrum(tone, tables, harmonic_amplitudes, run_samples, out_l, out_r)
        }
        InstrumentKind::Drumset { .. } => synth_drumset(tone, tables, run_samples, out_l, out_r),
        InstrumentKind::Mod { .. } => {
            // Modulation instruments never produce audio; their tones are
            // consumed entirely by the modulation evaluator (spec §4.2).
        }
    }
}

/// Apply the tone's stereo note-filter chain and write the result
/// additively into `(out_l[i], out_r[i])`, stepping expression forward.
#[inline]
fn apply_filter_and_store(tone: &mut Tone, i: usize, sample: f32, out_l: &mut [f32], out_r: &mut [f32]) {
    let mut l = sample;
    let mut r = sample;
    for f in &mut tone.note_filters_l {
        l = f.process(l);
    }
    for f in &mut tone.note_filters_r {
        r = f.process(r);
    }
    let expr = tone.expression;
    out_l[i] += l * expr;
    out_r[i] += r * expr;
    tone.expression += tone.expression_delta;
}

fn synth_chip(tone: &mut Tone, tables: &WaveTables, run_samples: usize, out_l: &mut [f32], out_r: &mut [f32]) {
    for i in 0..run_samples {
        let a = tables.sine_at(tone.phases[0]);
        let b = tables.sine_at(tone.phases[1]);
        let sample = a + b;
        apply_filter_and_store(tone, i, sample * 0.5, out_l, out_r);
        for v in 0..2 {
            tone.phases[v] = (tone.phases[v] + tone.phase_deltas[v]).fract();
            tone.phase_deltas[v] *= tone.phase_delta_scales[v];
        }
    }
    tone.sanitize_filters();
}

fn synth_chip_loopable(
    tone: &mut Tone,
    tables: &WaveTables,
    loop_mode: cadence_song::ChipLoopMode,
    run_samples: usize,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    use cadence_song::ChipLoopMode;

    for i in 0..run_samples {
        let mut sample = 0.0;
        for v in 0..2 {
            let voice = &mut tone.chip_loop_voices[v];
            if voice.fade_samples_remaining > 0 {
                let t = voice.fade_samples_remaining as f32 / 1000.0;
                sample += voice.last_sample_before_stop * t;
                voice.fade_samples_remaining -= 1;
                continue;
            }
            let s = tables.sine_at(tone.phases[v]);
            sample += s;

            let mut phase = tone.phases[v];
            phase += match voice.direction {
                LoopDirection::Forward => tone.phase_deltas[v],
                LoopDirection::Backward => -tone.phase_deltas[v],
            };

            let wrapped = phase >= 1.0 || phase < 0.0;
            if wrapped {
                match loop_mode {
                    ChipLoopMode::Loop => phase = phase.rem_euclid(1.0),
                    ChipLoopMode::PingPong => {
                        voice.direction = match voice.direction {
                            LoopDirection::Forward => LoopDirection::Backward,
                            LoopDirection::Backward => LoopDirection::Forward,
                        };
                        phase = phase.rem_euclid(1.0);
                    }
                    // spec §9 "Open questions": the B-voice direction check
                    // must be symmetric (use this voice's own direction),
                    // not always voice A's — the source's typo is not
                    // replicated here.
                    ChipLoopMode::Once | ChipLoopMode::LoopOnce => {
                        voice.last_sample_before_stop = s;
                        voice.fade_samples_remaining = 1000;
                        phase = phase.rem_euclid(1.0);
                    }
                }
            }
            tone.phases[v] = phase;
        }
        apply_filter_and_store(tone, i, sample * 0.5, out_l, out_r);
    }
    tone.sanitize_filters();
}

fn synth_fm(
    tone: &mut Tone,
    tables: &WaveTables,
    operators: &[cadence_song::FmOperator],
    feedback_amount: f32,
    feedback_operators: &[u8],
    run_samples: usize,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    let n = operators.len().min(crate::tone::MAX_OPERATORS);
    for i in 0..run_samples {
        let mut carrier_sum = 0.0;
        let feedback_sum: f32 = feedback_operators
            .iter()
            .filter_map(|&idx| tone.operators.get(idx as usize))
            .map(|op| tables.sine_at(op.phase) * op.expression)
            .sum();

        // Highest-index operator first (spec §4.5 "FM"): later operators'
        // outputs are available as modulation input to earlier ones.
        let mut operator_outputs = [0.0f32; crate::tone::MAX_OPERATORS];
        for j in (0..n).rev() {
            let op_def = &operators[j];
            let mut phase_mod = feedback_amount * feedback_sum;
            for &mod_idx in &op_def.modulators {
                phase_mod += operator_outputs[mod_idx as usize];
            }
            let op = &mut tone.operators[j];
            let sample = tables.sine_at(op.phase + phase_mod) * op.expression;
            operator_outputs[j] = sample;
            if op_def.is_carrier {
                carrier_sum += sample;
            }
            op.phase = (op.phase + op.phase_delta).fract();
            op.expression += op.expression_delta;
        }
        for idx in feedback_operators.iter() {
            if let Some(op) = tone.operators.get_mut(*idx as usize) {
                op.expression += op.expression_delta;
            }
        }

        apply_filter_and_store(tone, i, carrier_sum, out_l, out_r);
    }
    tone.sanitize_filters();
}

fn synth_harmonics(
    tone: &mut Tone,
    tables: &WaveTables,
    harmonic_amplitudes: &[f32],
    run_samples: usize,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    for i in 0..run_samples {
        let mut sample = 0.0;
        for (h, &amp) in harmonic_amplitudes.iter().enumerate() {
            if amp == 0.0 {
                continue;
            }
            let harmonic_phase = tone.phases[0] * (h + 1) as f32;
            sample += tables.sine_at(harmonic_phase) * amp;
        }
        apply_filter_and_store(tone, i, sample, out_l, out_r);
        tone.phases[0] = (tone.phases[0] + tone.phase_deltas[0]).fract();
    }
    tone.sanitize_filters();
}

fn synth_pwm(tone: &mut Tone, run_samples: usize, out_l: &mut [f32], out_r: &mut [f32]) {
    for i in 0..run_samples {
        let dt = tone.phase_deltas[0];
        let sample = blep_pulse(tone.phases[0], tone.pulse_width, dt);
        apply_filter_and_store(tone, i, sample, out_l, out_r);
        tone.phases[0] = (tone.phases[0] + tone.phase_deltas[0]).fract();
        tone.pulse_width = (tone.pulse_width + tone.pulse_width_delta).clamp(0.01, 0.99);
    }
    tone.sanitize_filters();
}

fn synth_supersaw(
    tone: &mut Tone,
    voice_count: u8,
    shape: f32,
    run_samples: usize,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    let voices = (voice_count as usize).min(crate::tone::MAX_VOICES).max(1);
    for i in 0..run_samples {
        let mut sum = 0.0;
        for v in 0..voices {
            let dt = tone.phase_deltas[v];
            sum += blep_saw(tone.phases[v], dt);
        }
        sum /= voices as f32;

        // "Shape" morphs between the raw saw sum and a sub-sample-delayed
        // copy of it, read through the shared delay line (spec §4.5
        // "Supersaw").
        let shaped = if let Some(delay) = &mut tone.supersaw_delay {
            delay.write(sum);
            let delayed = delay.read_interpolated(tone.supersaw_delay_length);
            sum + (delayed - sum) * shape
        } else {
            sum
        };

        apply_filter_and_store(tone, i, shaped, out_l, out_r);
        for v in 0..voices {
            tone.phases[v] = (tone.phases[v] + tone.phase_deltas[v]).fract();
            tone.phase_deltas[v] *= tone.phase_delta_scales[v];
        }
        tone.supersaw_delay_length += tone.supersaw_delay_length_delta;
    }
    tone.sanitize_filters();
}

fn synth_picked_string(tone: &mut Tone, run_samples: usize, out_l: &mut [f32], out_r: &mut [f32]) {
    let voice_count = tone.picked_string_voices.len().min(crate::tone::MAX_VOICES);
    for i in 0..run_samples {
        let mut sum = 0.0;
        for v in 0..voice_count {
            let voice = &mut tone.picked_string_voices[v];
            if voice.needs_impulse {
                voice.delay.clear();
                voice.delay.write(1.0);
                voice.needs_impulse = false;
            }

            let delayed = voice.delay.read_interpolated(voice.delay_length);
            // First-order fractional-delay allpass smooths the delay
            // length between integer taps without a pitch discontinuity.
            let allpass_coeff =
                (1.0 - voice.delay_length.fract()) / (1.0 + voice.delay_length.fract());
            let allpassed = -allpass_coeff * delayed + voice.allpass_sample
                + allpass_coeff * voice.fractional_delay_sample;
            voice.fractional_delay_sample = delayed;
            voice.allpass_sample = allpassed;

            let sustained = voice.sustain_filter.process(allpassed);
            voice.delay.write(sustained);
            sum += sustained;

            voice.delay_length += voice.delay_length_delta;
        }
        apply_filter_and_store(tone, i, sum / voice_count.max(1) as f32, out_l, out_r);
    }
    tone.sanitize_filters();
}

fn synth_noise(tone: &mut Tone, tables: &WaveTables, run_samples: usize, out_l: &mut [f32], out_r: &mut [f32]) {
    let len = tables.chip_noise.len();
    for i in 0..run_samples {
        let pos = (tone.phases[0] * len as f32) as usize % len;
        let sample = tables.chip_noise[pos];
        apply_filter_and_store(tone, i, sample, out_l, out_r);
        tone.phases[0] = (tone.phases[0] + tone.phase_deltas[0]).fract();
    }
    tone.sanitize_filters();
}

fn synth_spectrum(
    tone: &mut Tone,
    tables: &WaveTables,
    harmonic_amplitudes: &[f32],
    run_samples: usize,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    let total_amp: f32 = harmonic_amplitudes.iter().sum::<f32>().max(1e-6);
    for i in 0..run_samples {
        let raw = WaveTables::table_at(&tables.spectrum_noise, tone.phases[0]);
        // One-pole lowpass scaled by pitch, approximating the spectral
        // tilt the harmonic amplitude list authors (spec §4.5 "Spectrum").
        let cutoff_coeff = (tone.phase_deltas[0] * total_amp).clamp(0.0, 1.0);
        let prev = tone.phases[1];
        let filtered = prev + (raw - prev) * cutoff_coeff;
        tone.phases[1] = filtered;

        apply_filter_and_store(tone, i, filtered, out_l, out_r);
        tone.phases[0] = (tone.phases[0] + tone.phase_deltas[0]).fract();
    }
    tone.sanitize_filters();
}

fn synth_drumset(tone: &mut Tone, tables: &WaveTables, run_samples: usize, out_l: &mut [f32], out_r: &mut [f32]) {
    let len = tables.chip_noise.len();
    for i in 0..run_samples {
        let pos = (tone.phases[0] * len as f32) as usize % len;
        let raw = tables.chip_noise[pos];
        // Drumset adds one extra trailing lowpass with an envelope-warped
        // cutoff (spec §4.6 step 7): modeled here as the last entry in the
        // tone's note-filter chain, already applied by
        // `apply_filter_and_store`.
        apply_filter_and_store(tone, i, raw, out_l, out_r);
        tone.phases[0] = (tone.phases[0] + tone.phase_deltas[0]).fract();
    }
    tone.sanitize_filters();
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_song::FmOperator;

    fn fresh_tone() -> Tone {
        let mut t = Tone::new(2, 4096);
        t.expression = 1.0;
        t.expression_delta = 0.0;
        t
    }

    #[test]
    fn chip_synth_produces_nonzero_output_for_a_held_note() {
        let mut tone = fresh_tone();
        tone.phase_deltas[0] = 440.0 / 48000.0;
        tone.phase_deltas[1] = 440.0 / 48000.0;
        let tables = WaveTables::new();
        let mut out_l = vec![0.0; 256];
        let mut out_r = vec![0.0; 256];
        synth_chip(&mut tone, &tables, 256, &mut out_l, &mut out_r);
        let rms: f32 = (out_l.iter().map(|x| x * x).sum::<f32>() / out_l.len() as f32).sqrt();
        assert!(rms > 0.01, "expected audible output, got rms={rms}");
    }

    #[test]
    fn pwm_output_stays_in_unit_range() {
        let mut tone = fresh_tone();
        tone.phase_deltas[0] = 220.0 / 48000.0;
        tone.pulse_width = 0.3;
        let mut out_l = vec![0.0; 512];
        let mut out_r = vec![0.0; 512];
        synth_pwm(&mut tone, 512, &mut out_l, &mut out_r);
        for &s in &out_l {
            assert!(s.abs() <= 1.2, "pwm sample out of expected range: {s}");
        }
    }

    #[test]
    fn fm_feedback_operator_contributes_to_output() {
        let mut tone = fresh_tone();
        tone.operators[0].phase_delta = 220.0 / 48000.0;
        tone.operators[0].expression = 1.0;
        let tables = WaveTables::new();
        let operators = vec![FmOperator {
            amplitude: 1.0,
            freq_multiplier: 1.0,
            hz_offset: 0.0,
            modulators: vec![],
            is_carrier: true,
        }];
        let mut out_l = vec![0.0; 128];
        let mut out_r = vec![0.0; 128];
        synth_fm(&mut tone, &tables, &operators, 0.0, &[], 128, &mut out_l, &mut out_r);
        let rms: f32 = (out_l.iter().map(|x| x * x).sum::<f32>() / out_l.len() as f32).sqrt();
        assert!(rms > 0.01);
    }

    #[test]
    fn picked_string_impulse_decays_over_time() {
        let mut tone = fresh_tone();
        for v in &mut tone.picked_string_voices {
            v.delay_length = 100.0;
        }
        tone.picked_string_voices.truncate(1);
        let mut out_l = vec![0.0; 2000];
        let mut out_r = vec![0.0; 2000];
        synth_picked_string(&mut tone, 2000, &mut out_l, &mut out_r);
        let early: f32 = out_l[0..200].iter().map(|x| x.abs()).sum();
        let late: f32 = out_l[1800..2000].iter().map(|x| x.abs()).sum();
        assert!(early >= late, "expected decay: early={early} late={late}");
    }
}
