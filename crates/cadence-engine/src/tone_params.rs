//! Per-tone parameter computation: turn an active note plus this tick's
//! envelope/modulation values into the oscillator phase deltas, operator
//! frequencies, and expression ramps `cadence_synth::synthesize` consumes
//! (spec §4.6 "Per-Tone Parameter Computation").

use cadence_song::envelope::EnvelopeTarget;
use cadence_song::{Instrument, InstrumentKind, Note, Unison, Vibrato};
use cadence_synth::oscillator::{pitch_to_freq, semitones_to_ratio};
use cadence_synth::tone::MAX_VOICES;
use cadence_synth::Tone;

use crate::envelope_computer::EnvelopeValues;
use crate::modulation::{ModSetting, ModulationTables};

/// Everything `configure_tone` needs about the current tick's position
/// within the active note, beyond the note and instrument themselves.
pub struct TickContext<'a> {
    pub part_in_note_start: f32,
    pub part_in_note_end: f32,
    pub run_samples: usize,
    pub sample_rate: f32,
    pub vibrato_depth_semitones: f32,
    pub vibrato_phase_start: f32,
    pub vibrato_phase_end: f32,
    /// Wall-clock seconds since this note began, bracketing this tick; the
    /// fade-in half of [`fade_scaling`]'s curve runs off these (spec §4.6
    /// step 4).
    pub note_age_start_seconds: f32,
    pub note_age_end_seconds: f32,
    pub mod_tables: &'a ModulationTables,
    pub channel_index: u32,
    pub instrument_index: u32,
}

/// Resolved vibrato parameters for one instrument: depth, the delay (in
/// ticks) before vibrato reaches full depth, the LFO rate, and whether it
/// oscillates continuously (`Custom { periodic: true }`/presets) or plays
/// once as a decaying pitch glide (`Custom { periodic: false }`, spec §4.6
/// step 3 "plucked/one-shot shape").
pub struct VibratoParams {
    pub depth_semitones: f32,
    pub delay_ticks: f32,
    pub speed_hz: f32,
    pub periodic: bool,
}

/// Named vibrato presets, `(depth_semitones, delay_ticks, speed_hz, periodic)`.
/// The song format only carries a preset id (spec §3 "Instrument" `Vibrato::Preset`);
/// nothing in the pack or `original_source/` pins down the exact per-id
/// curve, so this small table is this renderer's own invented mapping, id 0
/// reserved for "no vibrato".
const VIBRATO_PRESETS: [(f32, f32, f32, bool); 5] = [
    (0.0, 0.0, 0.0, true),
    (0.15, 0.0, 5.0, true),
    (0.35, 4.0, 6.2, true),
    (0.6, 2.0, 7.5, true),
    (0.3, 0.0, 9.0, false),
];

pub fn resolve_vibrato(vibrato: &Vibrato) -> VibratoParams {
    let (depth_semitones, delay_ticks, speed_hz, periodic) = match vibrato {
        Vibrato::None => (0.0, 0.0, 0.0, true),
        Vibrato::Custom { depth_semitones, delay_ticks, speed_hz, periodic } => {
            (*depth_semitones, *delay_ticks, *speed_hz, *periodic)
        }
        Vibrato::Preset { id } => VIBRATO_PRESETS[*id as usize % VIBRATO_PRESETS.len()],
    };
    VibratoParams { depth_semitones, delay_ticks, speed_hz, periodic }
}

/// Step 1-11 of the per-tone computation, condensed into one pass over the
/// tone's fields (spec §4.6). DSP-state reset at note start is handled
/// separately by [`cadence_synth::Tone::reset_for_note_start`]; this
/// function only derives this tick's phase/expression targets.
pub fn configure_tone(
    tone: &mut Tone,
    instrument: &Instrument,
    note: &Note,
    envelopes: &EnvelopeValues,
    ctx: &TickContext,
) {
    let (interval_start, size_start) = note.interpolate_at(ctx.part_in_note_start);
    let (interval_end, size_end) = note.interpolate_at(ctx.part_in_note_end);

    let chord_size = note.chord_size().min(instrument.max_chord_size as usize).max(1);
    tone.chord_size = chord_size;
    tone.pitch_count = chord_size;

    let vibrato = (ctx.vibrato_phase_start, ctx.vibrato_phase_end);
    let vib_start = libm::sinf(vibrato.0 * core::f32::consts::TAU) * ctx.vibrato_depth_semitones;
    let vib_end = libm::sinf(vibrato.1 * core::f32::consts::TAU) * ctx.vibrato_depth_semitones;

    // Pitch-shift/detune modulators are carried as a literal semitone offset
    // added straight onto the note's pitch (spec §4.4 per-instrument
    // settings; the song format leaves the unit unspecified for arbitrary
    // mod values, so this is this renderer's own convention).
    let pitch_mod = ctx.mod_tables.instrument_value(ctx.channel_index, ctx.instrument_index, ModSetting::PitchShift).unwrap_or(0.0)
        + ctx.mod_tables.instrument_value(ctx.channel_index, ctx.instrument_index, ModSetting::Detune).unwrap_or(0.0);

    for (i, &base_pitch) in note.pitches.iter().take(chord_size).enumerate() {
        let pitch_start = base_pitch as f32 + interval_start + vib_start + pitch_mod;
        let pitch_end = base_pitch as f32 + interval_end + vib_end + pitch_mod;
        tone.pitches[i] = pitch_end;
        let freq_start = pitch_to_freq(pitch_start);
        let freq_end = pitch_to_freq(pitch_end);
        configure_kind_voice(tone, &instrument.kind, &instrument.unison, i, freq_start, freq_end, ctx);
    }

    let (vol_start, vol_end) = envelopes.get(EnvelopeTarget::NoteVolume);
    let fade = fade_scaling(instrument, ctx);
    let expr_start = vol_start * size_start.max(0.0) * fade.0;
    let expr_end = vol_end * size_end.max(0.0) * fade.1;
    tone.expression = expr_start;
    tone.expression_delta = ramp_delta(expr_start, expr_end, ctx.run_samples);
    tone.last_note_size = expr_end;

    configure_note_filters(tone, instrument, envelopes, ctx);
}

#[inline]
fn ramp_delta(start: f32, end: f32, run_samples: usize) -> f32 {
    if run_samples == 0 {
        0.0
    } else {
        (end - start) / run_samples as f32
    }
}

/// Fade-in scaling at the start and end of this tick, as a `(start, end)`
/// multiplier pair (spec §4.6 step 4). `configure_tone` only ever runs
/// while a note is actively sounding, so the fade-out half of the curve
/// lives in [`configure_release_tail`] instead, driven off
/// `ticks_since_released` once the note has ended.
fn fade_scaling(instrument: &Instrument, ctx: &TickContext) -> (f32, f32) {
    let fade_in_seconds = instrument.fade_in_seconds.max(0.0);
    if fade_in_seconds <= 0.0 {
        return (1.0, 1.0);
    }
    let start = (ctx.note_age_start_seconds / fade_in_seconds).clamp(0.0, 1.0);
    let end = (ctx.note_age_end_seconds / fade_in_seconds).clamp(0.0, 1.0);
    (start, end)
}

/// Expression ramp for a released tone's fade-out tail (spec §4.6 step 4
/// `(1 - ticksSinceReleased/fadeOutTicks)^1.5`, §4.3.4 "no click on free").
/// Runs in place of `configure_tone` once a tone's note has ended, decaying
/// the expression it last held rather than keeping it frozen.
pub fn configure_release_tail(tone: &mut Tone, fade_out_ticks: u32, ticks_since_released: u32, run_samples: usize) {
    let fade_out_ticks = fade_out_ticks.max(1) as f32;
    let progress_start = (ticks_since_released as f32 / fade_out_ticks).clamp(0.0, 1.0);
    let progress_end = ((ticks_since_released + 1) as f32 / fade_out_ticks).clamp(0.0, 1.0);
    let start = (1.0 - progress_start).powf(1.5) * tone.last_note_size;
    let end = (1.0 - progress_end).powf(1.5) * tone.last_note_size;
    tone.expression = start;
    tone.expression_delta = ramp_delta(start, end, run_samples);
}

fn configure_kind_voice(
    tone: &mut Tone,
    kind: &InstrumentKind,
    unison: &Unison,
    voice_index: usize,
    freq_start: f32,
    freq_end: f32,
    ctx: &TickContext,
) {
    let sr = ctx.sample_rate;
    match kind {
        InstrumentKind::Chip { .. } => {
            if voice_index == 0 {
                tone.phase_deltas[0] = freq_start / sr;
                tone.phase_deltas[1] = freq_end / sr * 1.0012;
                tone.phase_delta_scales[0] = 1.0;
                tone.phase_delta_scales[1] = 1.0;
            }
        }
        InstrumentKind::CustomChipWave { .. } => {
            if voice_index == 0 {
                tone.phase_deltas[0] = freq_start / sr;
                tone.phase_deltas[1] = freq_end / sr;
            }
        }
        InstrumentKind::Fm { operators, .. } | InstrumentKind::Fm6Op { operators, .. } => {
            if voice_index == 0 {
                for (j, op_def) in operators.iter().enumerate().take(tone.operators.len()) {
                    let op = &mut tone.operators[j];
                    op.phase_delta = (freq_end * op_def.freq_multiplier + op_def.hz_offset) / sr;
                    let target_expr = op_def.amplitude;
                    op.expression_delta = ramp_delta(op.expression, target_expr, ctx.run_samples);
                }
            }
        }
        InstrumentKind::Harmonics { .. } | InstrumentKind::Spectrum { .. } => {
            if voice_index == 0 {
                tone.phase_deltas[0] = freq_end / sr;
            }
        }
        InstrumentKind::Pwm { pulse_width } => {
            if voice_index == 0 {
                tone.phase_deltas[0] = freq_end / sr;
                tone.pulse_width_delta = ramp_delta(tone.pulse_width, *pulse_width, ctx.run_samples);
            }
        }
        InstrumentKind::Supersaw { voice_count, spread_semitones, .. } => {
            if voice_index == 0 {
                let voices = (*voice_count as usize).min(MAX_VOICES).max(1);
                for v in 0..voices {
                    let detune = if voices > 1 {
                        spread_semitones * (v as f32 - (voices - 1) as f32 / 2.0) / (voices - 1).max(1) as f32
                    } else {
                        0.0
                    };
                    tone.supersaw_detunes[v] = detune;
                    tone.phase_deltas[v] = freq_end / sr * semitones_to_ratio(detune);
                }
                if tone.supersaw_delay.is_none() {
                    tone.supersaw_delay = Some(cadence_core::ring_buffer::RingBuffer::new(64));
                    tone.supersaw_delay_length = 2.0;
                }
            }
        }
        InstrumentKind::PickedString { .. } => {
            // The string model keeps a fixed `MAX_VOICES`-sized bank of
            // delay lines rather than allocating one per unison voice, so
            // the authored unison spread is applied cyclically across the
            // fixed bank (spec §4.5 "Picked-string", §4.6 step 9).
            let voices = unison.voices.max(1) as usize;
            for v in 0..tone.picked_string_voices.len() {
                let unison_index = v % voices;
                let detune = if voices > 1 {
                    unison.spread_semitones * (unison_index as f32 - (voices - 1) as f32 / 2.0) / (voices - 1) as f32
                        + unison.offset_semitones
                } else {
                    unison.offset_semitones
                };
                let voice_freq_end = freq_end * semitones_to_ratio(detune);
                let length = (sr / voice_freq_end.max(1.0)).clamp(2.0, sr);
                tone.picked_string_voices[v].delay_length_delta =
                    ramp_delta(tone.picked_string_voices[v].delay_length, length, ctx.run_samples);
            }
        }
        InstrumentKind::Noise { .. } | InstrumentKind::Drumset { .. } => {
            if voice_index == 0 {
                tone.phase_deltas[0] = freq_end / (sr * 8.0);
            }
        }
        InstrumentKind::Mod { .. } => {}
    }
}

fn configure_note_filters(tone: &mut Tone, instrument: &Instrument, envelopes: &EnvelopeValues, ctx: &TickContext) {
    use cadence_core::biquad::{rbj_coefficients, FilterKind};
    use cadence_song::filter::{FilterPointKind, FilterSettings};

    let (base_freq_start, base_freq_end) = envelopes.get(EnvelopeTarget::FilterAllFreqs);

    // `NoteFilterCut`/`NoteFilterPeak` modulators only have a direct
    // counterpart for the single-point `Simple` filter shape; a
    // `MultiPoint` filter is addressed per-point via filter-dot mods
    // instead (spec §4.4 "dot-X/Y" addressing).
    let cut_mod = ctx.mod_tables.instrument_value(ctx.channel_index, ctx.instrument_index, ModSetting::NoteFilterCut);
    let peak_mod = ctx.mod_tables.instrument_value(ctx.channel_index, ctx.instrument_index, ModSetting::NoteFilterPeak);

    let points: Vec<(FilterPointKind, f32, f32)> = match &instrument.note_filter {
        FilterSettings::Simple { cut, peak } => {
            let cut = cut_mod.unwrap_or(*cut);
            let peak = peak_mod.unwrap_or(*peak);
            vec![(FilterPointKind::LowPass, cut, 0.5 + peak.clamp(0.0, 1.0) * 9.5)]
        }
        FilterSettings::MultiPoint { points, .. } => {
            points.iter().map(|p| (p.kind, p.freq, 0.707)).collect()
        }
    };

    for (i, (kind, freq, q)) in points.iter().enumerate().take(tone.note_filters_l.len()) {
        let (point_start, point_end) = envelopes.get(EnvelopeTarget::FilterPointFreq { point: i as u8 });
        let freq_dot_mod = ctx
            .mod_tables
            .instrument_filter_dot(ctx.channel_index, ctx.instrument_index, 1 + 2 * i as u32)
            .unwrap_or(1.0);
        let gain_dot_mod = ctx
            .mod_tables
            .instrument_filter_dot(ctx.channel_index, ctx.instrument_index, 2 + 2 * i as u32)
            .unwrap_or(1.0);
        let freq_start = (freq * base_freq_start * point_start * freq_dot_mod).clamp(0.0005, 0.4999);
        let freq_end = (freq * base_freq_end * point_end * freq_dot_mod).clamp(0.0005, 0.4999);
        let biquad_kind = match kind {
            FilterPointKind::LowPass => FilterKind::LowPass,
            FilterPointKind::HighPass => FilterKind::HighPass,
            FilterPointKind::PeakingEq => FilterKind::PeakingEq,
            FilterPointKind::LowShelf => FilterKind::LowShelf,
            FilterPointKind::HighShelf => FilterKind::HighShelf,
            FilterPointKind::Notch => FilterKind::Notch,
        };
        let (gain_start, gain_end) = envelopes.get(EnvelopeTarget::FilterPointGain { point: i as u8 });
        let gain_start = gain_start * gain_dot_mod;
        let gain_end = gain_end * gain_dot_mod;
        let start_coeffs = rbj_coefficients(biquad_kind, freq_start, *q, gain_start);
        let end_coeffs = rbj_coefficients(biquad_kind, freq_end, *q, gain_end);
        if tone.freshly_allocated {
            tone.note_filters_l[i].set_coefficients(start_coeffs);
            tone.note_filters_r[i].set_coefficients(start_coeffs);
        }
        tone.note_filters_l[i].load_gradient(end_coeffs, ctx.run_samples as u32);
        tone.note_filters_r[i].load_gradient(end_coeffs, ctx.run_samples as u32);
    }
    tone.freshly_allocated = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_song::envelope::Envelope;
    use cadence_song::filter::FilterSettings;
    use cadence_song::{Pin, Unison, Vibrato};

    fn simple_instrument() -> Instrument {
        Instrument {
            kind: InstrumentKind::Chip { wave_id: 0 },
            unison: Unison::default(),
            vibrato: Vibrato::None,
            arpeggio_speed: 0.0,
            fade_in_seconds: 0.0,
            fade_out_ticks: 0,
            envelopes: vec![],
            note_filter: FilterSettings::Simple { cut: 0.4, peak: 0.1 },
            effects: vec![],
            max_chord_size: 1,
        }
    }

    fn simple_note() -> Note {
        Note {
            start: 0,
            end: 8,
            pitches: vec![60],
            pins: vec![Pin { time: 0, interval: 0, size: 1.0 }, Pin { time: 8, interval: 0, size: 1.0 }],
            continues_last_pattern: false,
            chip_wave_start_offset: None,
        }
    }

    #[test]
    fn configure_tone_sets_plausible_phase_delta_for_middle_c() {
        let instrument = simple_instrument();
        let note = simple_note();
        let mut tone = Tone::new(2, 64);
        let envelopes = EnvelopeValues::default();
        let mod_tables = ModulationTables::default();
        let ctx = TickContext {
            part_in_note_start: 0.0,
            part_in_note_end: 1.0,
            run_samples: 256,
            sample_rate: 48000.0,
            vibrato_depth_semitones: 0.0,
            vibrato_phase_start: 0.0,
            vibrato_phase_end: 0.0,
            note_age_start_seconds: 0.0,
            note_age_end_seconds: 0.01,
            mod_tables: &mod_tables,
            channel_index: 0,
            instrument_index: 0,
        };
        configure_tone(&mut tone, &instrument, &note, &envelopes, &ctx);
        let expected = pitch_to_freq(60.0) / 48000.0;
        assert!((tone.phase_deltas[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn unused_envelope_targets_default_to_unity_and_keep_expression_from_note_size() {
        let instrument = simple_instrument();
        let note = simple_note();
        let mut tone = Tone::new(2, 64);
        let envelopes = EnvelopeValues::default();
        let mod_tables = ModulationTables::default();
        let ctx = TickContext {
            part_in_note_start: 0.0,
            part_in_note_end: 1.0,
            run_samples: 128,
            sample_rate: 48000.0,
            vibrato_depth_semitones: 0.0,
            vibrato_phase_start: 0.0,
            vibrato_phase_end: 0.0,
            note_age_start_seconds: 0.0,
            note_age_end_seconds: 0.01,
            mod_tables: &mod_tables,
            channel_index: 0,
            instrument_index: 0,
        };
        configure_tone(&mut tone, &instrument, &note, &envelopes, &ctx);
        assert!((tone.expression - 1.0).abs() < 1e-5);
    }

    #[test]
    fn envelope_list_is_unused_placeholder_field_compiles() {
        let _e: Vec<Envelope> = vec![];
    }

    #[test]
    fn fade_in_ramps_expression_up_from_note_start() {
        let mut instrument = simple_instrument();
        instrument.fade_in_seconds = 0.02;
        let note = simple_note();
        let mut tone = Tone::new(2, 64);
        let envelopes = EnvelopeValues::default();
        let mod_tables = ModulationTables::default();
        let ctx = TickContext {
            part_in_note_start: 0.0,
            part_in_note_end: 1.0,
            run_samples: 128,
            sample_rate: 48000.0,
            vibrato_depth_semitones: 0.0,
            vibrato_phase_start: 0.0,
            vibrato_phase_end: 0.0,
            note_age_start_seconds: 0.0,
            note_age_end_seconds: 0.01,
            mod_tables: &mod_tables,
            channel_index: 0,
            instrument_index: 0,
        };
        configure_tone(&mut tone, &instrument, &note, &envelopes, &ctx);
        assert!(tone.expression < 1.0);
        assert!(tone.expression_delta > 0.0);
    }

    #[test]
    fn release_tail_decays_to_zero_and_never_clicks_upward() {
        let mut tone = Tone::new(2, 64);
        tone.last_note_size = 0.8;
        configure_release_tail(&mut tone, 10, 0, 128);
        let start = tone.expression;
        assert!((start - 0.8).abs() < 1e-5);
        configure_release_tail(&mut tone, 10, 9, 128);
        let near_end = tone.expression;
        assert!(near_end < start);
        configure_release_tail(&mut tone, 10, 10, 128);
        assert_eq!(tone.expression, 0.0);
    }

    #[test]
    fn picked_string_unison_spreads_voices_across_distinct_delay_lengths() {
        let mut instrument = simple_instrument();
        instrument.kind = InstrumentKind::PickedString { string_type: cadence_song::StringType::Nylon, sustain: 0.5 };
        instrument.unison = Unison { voices: 4, spread_semitones: 7.0, offset_semitones: 0.0, expression: 1.0, sign: 1.0 };
        let note = simple_note();
        let mut tone = Tone::new(2, 64);
        let envelopes = EnvelopeValues::default();
        let mod_tables = ModulationTables::default();
        let ctx = TickContext {
            part_in_note_start: 0.0,
            part_in_note_end: 1.0,
            run_samples: 128,
            sample_rate: 48000.0,
            vibrato_depth_semitones: 0.0,
            vibrato_phase_start: 0.0,
            vibrato_phase_end: 0.0,
            note_age_start_seconds: 0.0,
            note_age_end_seconds: 0.01,
            mod_tables: &mod_tables,
            channel_index: 0,
            instrument_index: 0,
        };
        configure_tone(&mut tone, &instrument, &note, &envelopes, &ctx);
        let lengths: Vec<f32> =
            tone.picked_string_voices.iter().take(4).map(|v| v.delay_length + v.delay_length_delta * 128.0).collect();
        assert!((lengths[0] - lengths[3]).abs() > 1e-3, "outer unison voices should land on different delay lengths");
    }
}
