//! The tick-synchronous playhead and per-tick render step (spec §4.1
//! "Scheduler & Time Base").
//!
//! `Scheduler` owns the song's runtime state — the playhead, every
//! channel's tone pool and effects chains, the modulation tables, the
//! song master bus, and the shared wave tables every tone's oscillator
//! reads from (spec §5 "Shared resources") — and exposes one entry point,
//! [`Scheduler::render`], that fills a caller-provided stereo buffer tick
//! by tick.

use std::collections::HashSet;

use cadence_song::{InstrumentKind, Note, Pattern, Song};
use cadence_synth::{synthesize, WaveTables};

use crate::channel_runtime::ChannelRuntime;
use crate::config::{ECHO_DELAY_STEP_TICKS, MIN_RELEASE_TAIL_TICKS};
use crate::envelope_computer::compute_envelopes;
use crate::metronome::MetronomeGenerator;
use crate::modulation::{ModSetting, ModTarget, ModulationTables};
use crate::song_master::SongMaster;
use crate::tone_params::{configure_release_tail, configure_tone, resolve_vibrato, TickContext};

/// The 5-tuple playhead position: bar, beat-within-bar, part-within-beat,
/// tick-within-part, and the fractional sample countdown to the next tick
/// boundary (spec §4.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct Playhead {
    pub bar: u32,
    pub beat: u32,
    pub part: u32,
    pub tick: u32,
    pub tick_sample_countdown: f32,
}

impl Playhead {
    pub fn part_in_bar(&self, parts_per_beat: u32) -> u32 {
        self.beat * parts_per_beat + self.part
    }
}

/// Decide the bar to play after `current_bar`, applying the song's loop
/// region (or a live [`cadence_song::LoopOverride`]) and repeat count
/// (spec §4.1.1 "Loop/skip policy").
///
/// Returns `(next_bar, finished)`; `finished` is true once a finite loop
/// count has been exhausted and there is no more song left to play.
pub fn next_bar(song: &Song, current_bar: u32, repeats_done: u32) -> (u32, bool) {
    let (loop_start, loop_end) = effective_loop_region(song);

    let candidate = current_bar + 1;
    if candidate < song.bar_count && (loop_end == 0 || candidate < loop_end || candidate <= loop_start) {
        return (candidate, false);
    }

    if loop_end == 0 || loop_end <= loop_start {
        // No loop region configured at all; stop at the end of the song.
        return (current_bar, candidate >= song.bar_count);
    }

    match song.loop_repeat_count {
        None => (loop_start, false),
        Some(max_repeats) => {
            if repeats_done < max_repeats {
                (loop_start, false)
            } else {
                (current_bar, true)
            }
        }
    }
}

fn effective_loop_region(song: &Song) -> (u32, u32) {
    let start = song.loop_override.loop_bar_start.unwrap_or(song.loop_start);
    let end = song
        .loop_override
        .loop_bar_end
        .unwrap_or(song.loop_start + song.loop_length)
        .min(song.bar_count);
    (start.min(song.bar_count), end)
}

/// Estimate the total sample count a full playthrough will consume,
/// including every loop repeat (spec §4.1.2 "Total Duration Estimation").
/// Returns `None` for an infinitely-looping song (`loop_repeat_count` is
/// `None` and the loop region is non-empty).
///
/// Accounts for `Tempo`-targeting modulation notes via the closed-form
/// tempo-slide integral (`cadence_core::tempo::tempo_slide_samples`) rather
/// than assuming every bar takes `samples_per_bar(song.tempo_bpm)`; bars a
/// tempo modulator never touches still use that fast path exactly, so a
/// song with no tempo modulation gets the same answer as before.
pub fn estimate_total_samples(song: &Song, sample_rate: f32) -> Option<f64> {
    let (loop_start, loop_end) = effective_loop_region(song);

    let intro_bars = bars_duration_samples(song, 0, loop_start, sample_rate);
    let outro_bars = bars_duration_samples(song, loop_end, song.bar_count, sample_rate);

    if loop_end <= loop_start {
        return Some(intro_bars + outro_bars);
    }
    let loop_once = bars_duration_samples(song, loop_start, loop_end, sample_rate);

    match song.loop_repeat_count {
        None => None,
        Some(repeats) => Some(intro_bars + loop_once * (repeats as f64 + 1.0) + outro_bars),
    }
}

fn bars_duration_samples(song: &Song, start_bar: u32, end_bar: u32, sample_rate: f32) -> f64 {
    (start_bar..end_bar).map(|bar| bar_duration_samples(song, bar, sample_rate)).sum()
}

/// All notes in bar `bar`, across every modulation channel, whose selected
/// slot targets `Tempo` at song scope — sorted by start part so a static
/// scan can walk them in playback order.
fn tempo_notes_in_bar(song: &Song, bar: u32) -> Vec<&Note> {
    let mut notes = Vec::new();
    for channel in &song.channels {
        if channel.kind != cadence_song::ChannelKind::Modulation {
            continue;
        }
        let Some(pattern) = channel.pattern_at_bar(bar as usize) else { continue };
        for note in &pattern.notes {
            for (pitch_index, &instrument_idx) in pattern.instruments.iter().enumerate() {
                let Some(instrument) = channel.instruments.get(instrument_idx) else { continue };
                let InstrumentKind::Mod { slots } = &instrument.kind else { continue };
                let Some(&pitch) = note.pitches.get(pitch_index.min(note.pitches.len().saturating_sub(1))) else {
                    continue;
                };
                let slot_index = (pitch.rem_euclid(slots.len().max(1) as i32)) as usize;
                let Some(slot) = slots.get(slot_index) else { continue };
                let target = ModTarget::from_slot(slot, instrument_idx);
                if target.channel.is_none() && target.instrument.is_none() && target.setting_kind() == ModSetting::Tempo {
                    notes.push(note);
                }
            }
        }
    }
    notes.sort_by_key(|n| n.start);
    notes
}

/// Duration of one bar, walking any `Tempo` modulation notes that touch it
/// and falling back to the song's base tempo elsewhere in the bar.
fn bar_duration_samples(song: &Song, bar: u32, sample_rate: f32) -> f64 {
    let parts_per_bar = song.parts_per_bar();
    let ticks_per_part = song.ticks_per_part as f64;
    let default_spt =
        cadence_core::samples_per_tick(sample_rate, song.tempo_bpm, song.ticks_per_part, song.parts_per_beat) as f64;

    let notes = tempo_notes_in_bar(song, bar);
    if notes.is_empty() {
        return parts_per_bar as f64 * ticks_per_part * default_spt;
    }

    let mut total = 0.0f64;
    let mut part = 0u32;
    for note in notes {
        let note_start = note.start.min(parts_per_bar);
        if note_start > part {
            total += (note_start - part) as f64 * ticks_per_part * default_spt;
        }
        let note_end = note.end.min(parts_per_bar).max(note_start);
        if note_end > note_start {
            let part_in_note_start = (note_start as i64 - note.start as i64).max(0) as f32;
            let part_in_note_end = part_in_note_start + (note_end - note_start) as f32;
            let (_, bpm_start) = note.interpolate_at(part_in_note_start);
            let (_, bpm_end) = note.interpolate_at(part_in_note_end);
            let tick_length = (note_end - note_start) as f32 * song.ticks_per_part as f32;
            total += cadence_core::tempo::tempo_slide_samples(
                sample_rate,
                bpm_start.max(1.0),
                bpm_end.max(1.0),
                tick_length,
                song.parts_per_beat,
                song.ticks_per_part,
            ) as f64;
        }
        part = note_end.max(part);
    }
    if part < parts_per_bar {
        total += (parts_per_bar - part) as f64 * ticks_per_part * default_spt;
    }
    total
}

/// One channel/instrument's resolved note context for this tick.
struct NoteSlot<'p> {
    instrument_index: usize,
    note: Option<&'p cadence_song::Note>,
}

fn note_slots<'p>(channel: &cadence_song::Channel, pattern: Option<&'p Pattern>, part_in_bar: u32) -> Vec<NoteSlot<'p>> {
    (0..channel.instruments.len())
        .map(|instrument_index| {
            let note = pattern
                .filter(|p| p.instruments.contains(&instrument_index))
                .and_then(|p| p.note_at(part_in_bar));
            NoteSlot { instrument_index, note }
        })
        .collect()
}

pub struct Scheduler {
    sample_rate: f32,
    tables: WaveTables,
    playhead: Playhead,
    channels: Vec<ChannelRuntime>,
    mod_tables: ModulationTables,
    master: SongMaster,
    metronome: MetronomeGenerator,
    repeats_done: u32,
    finished: bool,
    samples_rendered: u64,
}

impl Scheduler {
    pub fn new(song: &Song, sample_rate: f32) -> Self {
        let samples_per_tick = cadence_core::samples_per_tick(sample_rate, song.tempo_bpm, song.ticks_per_part, song.parts_per_beat);
        let samples_per_step = samples_per_tick * ECHO_DELAY_STEP_TICKS;
        let channels = song
            .channels
            .iter()
            .map(|c| ChannelRuntime::new(c, sample_rate, samples_per_step))
            .collect();
        let master = SongMaster::new(&song.song_eq, song.limiter, song.master_gain, sample_rate);
        Self {
            sample_rate,
            tables: WaveTables::new(),
            playhead: Playhead { tick_sample_countdown: samples_per_tick, ..Default::default() },
            channels,
            mod_tables: ModulationTables::default(),
            master,
            metronome: MetronomeGenerator::new(sample_rate),
            repeats_done: 0,
            finished: false,
            samples_rendered: 0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for ch in &mut self.channels {
            ch.set_sample_rate(sample_rate);
        }
        self.master.set_sample_rate(sample_rate);
        self.metronome.set_sample_rate(sample_rate);
    }

    pub fn mod_tables(&self) -> &ModulationTables {
        &self.mod_tables
    }

    pub fn mod_tables_mut(&mut self) -> &mut ModulationTables {
        &mut self.mod_tables
    }

    pub fn set_metronome_enabled(&mut self, enabled: bool) {
        self.metronome.set_enabled(enabled);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn playhead_bar(&self) -> u32 {
        self.playhead.bar
    }

    pub fn snap_to_start(&mut self, song: &Song) {
        self.playhead = Playhead {
            tick_sample_countdown: cadence_core::samples_per_tick(
                self.sample_rate,
                song.tempo_bpm,
                song.ticks_per_part,
                song.parts_per_beat,
            ),
            ..Default::default()
        };
        self.repeats_done = 0;
        self.finished = false;
        for ch in &mut self.channels {
            ch.reset();
        }
        self.master.reset();
    }

    pub fn go_to_bar(&mut self, bar: u32) {
        self.playhead.bar = bar;
        self.playhead.beat = 0;
        self.playhead.part = 0;
        self.playhead.tick = 0;
        self.finished = false;
        for ch in &mut self.channels {
            ch.allocator.reset();
        }
    }

    /// Render `out_l.len()` samples (both slices must be the same length)
    /// of this song starting from the current playhead, advancing it as
    /// ticks elapse (spec §4.1 "render()" steps a-j).
    pub fn render(&mut self, song: &Song, out_l: &mut [f32], out_r: &mut [f32]) {
        debug_assert_eq!(out_l.len(), out_r.len());
        let mut written = 0usize;
        let total = out_l.len();
        while written < total {
            if self.finished {
                out_l[written..].fill(0.0);
                out_r[written..].fill(0.0);
                return;
            }

            if self.playhead.tick_sample_countdown <= 0.0 {
                self.advance_tick(song);
            }

            let remaining_in_tick = self.playhead.tick_sample_countdown.max(0.0).ceil() as usize;
            let chunk = remaining_in_tick.min(total - written).max(1);

            self.render_chunk(song, &mut out_l[written..written + chunk], &mut out_r[written..written + chunk]);

            self.playhead.tick_sample_countdown -= chunk as f32;
            written += chunk;
            self.samples_rendered += chunk as u64;
        }
    }

    /// `song.tempo_bpm`, overridden by a currently-active `Tempo` modulator
    /// (spec §4.1 "tempo is re-evaluated live whenever a tempo modulator is
    /// active"). The modulator's value is a literal BPM, matching the
    /// convention `evaluate_modulation` claims it under.
    fn effective_tempo_bpm(&self, song: &Song) -> f32 {
        self.mod_tables.active_song_scope(ModSetting::Tempo).unwrap_or(song.tempo_bpm)
    }

    fn advance_tick(&mut self, song: &Song) {
        let samples_per_tick = cadence_core::samples_per_tick(
            self.sample_rate,
            self.effective_tempo_bpm(song),
            song.ticks_per_part,
            song.parts_per_beat,
        );
        self.playhead.tick_sample_countdown += samples_per_tick;

        self.playhead.tick += 1;
        if self.playhead.tick >= song.ticks_per_part {
            self.playhead.tick = 0;
            self.playhead.part += 1;
        }
        if self.playhead.part >= song.parts_per_beat {
            self.playhead.part = 0;
            self.playhead.beat += 1;
            self.metronome.trigger();
        }
        if self.playhead.beat >= song.beats_per_bar {
            self.playhead.beat = 0;
            let (next, finished) = next_bar(song, self.playhead.bar, self.repeats_done);
            if next < self.playhead.bar {
                self.repeats_done += 1;
            }
            if finished {
                self.finished = true;
            } else {
                self.playhead.bar = next;
            }
        }

        self.evaluate_modulation(song);
        self.allocate_and_configure_tones(song, samples_per_tick);
    }

    /// Two passes over every modulation note active this tick: the first
    /// claims every target except dot-X/Y filter-morph edits, the second
    /// claims only those — so a filter-morph mod always sees the rest of
    /// this tick's modulation state already settled (spec §8.5).
    fn evaluate_modulation(&mut self, song: &Song) {
        let part_in_bar = self.playhead.part_in_bar(song.parts_per_beat);
        let tick_frac = self.playhead.tick as f32 / song.ticks_per_part.max(1) as f32;
        let mut claimed = HashSet::new();
        self.evaluate_modulation_pass(song, part_in_bar, tick_frac, &mut claimed, false);
        self.evaluate_modulation_pass(song, part_in_bar, tick_frac, &mut claimed, true);
        self.mod_tables.end_tick(&claimed);
    }

    fn evaluate_modulation_pass(
        &mut self,
        song: &Song,
        part_in_bar: u32,
        tick_frac: f32,
        claimed: &mut HashSet<ModTarget>,
        filter_dot_pass: bool,
    ) {
        for channel in &song.channels {
            if channel.kind != cadence_song::ChannelKind::Modulation {
                continue;
            }
            let Some(pattern) = channel.pattern_at_bar(self.playhead.bar as usize) else { continue };
            let Some(note) = pattern.note_at(part_in_bar) else { continue };
            for (pitch_index, &instrument_idx) in pattern.instruments.iter().enumerate() {
                let Some(instrument) = channel.instruments.get(instrument_idx) else { continue };
                let cadence_song::InstrumentKind::Mod { slots } = &instrument.kind else { continue };
                let Some(&pitch) = note.pitches.get(pitch_index.min(note.pitches.len().saturating_sub(1))) else {
                    continue;
                };
                let slot_index = (pitch.rem_euclid(slots.len().max(1) as i32)) as usize;
                let Some(slot) = slots.get(slot_index) else { continue };
                let target = ModTarget::from_slot(slot, instrument_idx);
                if target.is_filter_dot_edit() != filter_dot_pass {
                    continue;
                }
                let part_in_note = (part_in_bar as i64 - note.start as i64).max(0) as f32 + tick_frac;
                let (_, size) = note.interpolate_at(part_in_note);
                self.mod_tables.claim(target, size);
                claimed.insert(target);
            }
        }
    }

    fn allocate_and_configure_tones(&mut self, song: &Song, samples_per_tick: f32) {
        let part_in_bar = self.playhead.part_in_bar(song.parts_per_beat);
        for (channel_index, channel) in song.channels.iter().enumerate() {
            if channel.kind == cadence_song::ChannelKind::Modulation || channel.muted {
                continue;
            }
            let Some(runtime) = self.channels.get_mut(channel_index) else { continue };
            let pattern = channel.pattern_at_bar(self.playhead.bar as usize);
            let slots = note_slots(channel, pattern, part_in_bar);

            for slot in slots {
                let existing = runtime.allocator.find_sounding(slot.instrument_index);
                match (existing, slot.note) {
                    (None, Some(note)) => {
                        let idx = runtime.allocator.allocate(slot.instrument_index);
                        runtime.allocator.active[idx].tone.note = Some(cadence_synth::tone::NoteRef {
                            start_part: note.start,
                            end_part: note.end,
                            pitch_index: 0,
                        });
                        runtime.allocator.active[idx].tone.at_note_start = true;
                    }
                    (Some(active_idx), Some(note)) => {
                        let current_start = runtime.allocator.active[active_idx].tone.note.map(|n| n.start_part);
                        if current_start != Some(note.start) {
                            let instrument = &channel.instruments[slot.instrument_index];
                            let tail_ticks = instrument.fade_out_ticks.max(MIN_RELEASE_TAIL_TICKS);
                            runtime.allocator.release(active_idx, (tail_ticks as f32 * samples_per_tick) as u32);
                            let idx = runtime.allocator.allocate(slot.instrument_index);
                            runtime.allocator.active[idx].tone.note = Some(cadence_synth::tone::NoteRef {
                                start_part: note.start,
                                end_part: note.end,
                                pitch_index: 0,
                            });
                            runtime.allocator.active[idx].tone.at_note_start = true;
                        } else {
                            runtime.allocator.active[active_idx].tone.at_note_start = false;
                        }
                    }
                    (Some(active_idx), None) => {
                        let instrument = &channel.instruments[slot.instrument_index];
                        let tail_ticks = instrument.fade_out_ticks.max(MIN_RELEASE_TAIL_TICKS);
                        runtime.allocator.release(active_idx, (tail_ticks as f32 * samples_per_tick) as u32);
                    }
                    (None, None) => {}
                }
            }

            for active in &mut runtime.allocator.active {
                if active.releasing {
                    active.tone.ticks_since_released += 1;
                }
            }
        }
    }

    fn render_chunk(&mut self, song: &Song, out_l: &mut [f32], out_r: &mut [f32]) {
        out_l.fill(0.0);
        out_r.fill(0.0);
        let run_samples = out_l.len();
        let part_in_bar = self.playhead.part_in_bar(song.parts_per_beat);

        for (channel_index, channel) in song.channels.iter().enumerate() {
            if channel.kind == cadence_song::ChannelKind::Modulation || channel.muted {
                continue;
            }
            let Some(runtime) = self.channels.get_mut(channel_index) else { continue };
            let pattern = channel.pattern_at_bar(self.playhead.bar as usize);

            let mut channel_l = vec![0.0f32; run_samples];
            let mut channel_r = vec![0.0f32; run_samples];

            for active in runtime.allocator.active.iter_mut() {
                let instrument_index = active.instrument_index;
                let Some(instrument) = channel.instruments.get(instrument_index) else { continue };
                let note = pattern.and_then(|p| {
                    if p.instruments.contains(&instrument_index) {
                        active.tone.note.and_then(|nr| p.notes.iter().find(|n| n.start == nr.start_part))
                    } else {
                        None
                    }
                });

                let run_seconds = run_samples as f32 / self.sample_rate;

                if let Some(note) = note {
                    let part_in_note_start = part_in_bar as f32 - note.start as f32;
                    let part_in_note_end = part_in_note_start + 1.0;

                    let note_age_start_seconds = active.tone.seconds_since_note_start;
                    let note_age_end_seconds = note_age_start_seconds + run_seconds;
                    let envelopes =
                        compute_envelopes(&instrument.envelopes, note_age_start_seconds, note_age_end_seconds, 1.0, 1.0);

                    let vibrato = resolve_vibrato(&instrument.vibrato);
                    let note_age_ticks = part_in_note_start.max(0.0) * song.ticks_per_part.max(1) as f32 + self.playhead.tick as f32;
                    let delay_gate = if vibrato.delay_ticks <= 0.0 {
                        1.0
                    } else {
                        (note_age_ticks / vibrato.delay_ticks).clamp(0.0, 1.0)
                    };
                    let (vibrato_depth_semitones, vibrato_phase_start, vibrato_phase_end);
                    if vibrato.periodic {
                        let phase_delta = vibrato.speed_hz * run_seconds;
                        vibrato_phase_start = active.tone.vibrato_time;
                        vibrato_phase_end = active.tone.vibrato_time + phase_delta;
                        vibrato_depth_semitones = vibrato.depth_semitones * delay_gate;
                        active.tone.vibrato_time = vibrato_phase_end;
                    } else {
                        // Plucked/one-shot shape: a single decaying pitch
                        // glide rather than a repeating oscillation (spec
                        // §4.6 step 3).
                        vibrato_phase_start = 0.25;
                        vibrato_phase_end = 0.25;
                        vibrato_depth_semitones =
                            vibrato.depth_semitones * libm::expf(-vibrato.speed_hz.max(0.01) * note_age_start_seconds);
                        active.tone.vibrato_time = 0.0;
                    }

                    let ctx = TickContext {
                        part_in_note_start,
                        part_in_note_end,
                        run_samples,
                        sample_rate: self.sample_rate,
                        vibrato_depth_semitones,
                        vibrato_phase_start,
                        vibrato_phase_end,
                        note_age_start_seconds,
                        note_age_end_seconds,
                        mod_tables: &self.mod_tables,
                        channel_index: channel_index as u32,
                        instrument_index: instrument_index as u32,
                    };
                    configure_tone(&mut active.tone, instrument, note, &envelopes, &ctx);
                    active.tone.seconds_since_note_start = note_age_end_seconds;
                } else {
                    // Ringing out the release tail: no note, so `configure_tone`
                    // never runs. Fade the expression toward zero instead of
                    // leaving it frozen at whatever it was on release (spec
                    // §4.3.4 "no click on free").
                    let fade_out_ticks = instrument.fade_out_ticks.max(MIN_RELEASE_TAIL_TICKS);
                    configure_release_tail(&mut active.tone, fade_out_ticks, active.tone.ticks_since_released, run_samples);
                    active.tone.seconds_since_note_start += run_seconds;
                }

                let mut inst_l = vec![0.0f32; run_samples];
                let mut inst_r = vec![0.0f32; run_samples];
                synthesize(&instrument.kind, &mut active.tone, &self.tables, run_samples, &mut inst_l, &mut inst_r);

                if let Some(chain) = runtime.instrument_effects.get_mut(instrument_index) {
                    for slot in 0..instrument.effects.len() {
                        let mix = self.mod_tables.instrument_value(
                            channel_index as u32,
                            instrument_index as u32,
                            ModSetting::EffectMix(slot as u8),
                        );
                        match mix {
                            Some(mix) => chain.set_mix_override(slot, mix),
                            None => chain.clear_mix_override(slot),
                        }
                    }
                    for i in 0..run_samples {
                        let (l, r) = chain.process(inst_l[i], inst_r[i]);
                        channel_l[i] += l;
                        channel_r[i] += r;
                    }
                } else {
                    for i in 0..run_samples {
                        channel_l[i] += inst_l[i];
                        channel_r[i] += inst_r[i];
                    }
                }
            }

            runtime.allocator.reap_finished(run_samples as u32);

            for i in 0..run_samples {
                out_l[i] += channel_l[i];
                out_r[i] += channel_r[i];
            }
        }

        for i in 0..run_samples {
            let click = self.metronome.next_sample();
            let (l, r) = self.master.process(out_l[i] + click, out_r[i] + click);
            out_l[i] = l;
            out_r[i] = r;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_song::{Channel, ChannelKind, Key, LimiterSettings, LoopOverride};

    fn minimal_song() -> Song {
        Song {
            channels: vec![Channel {
                kind: ChannelKind::Pitch,
                instruments: vec![],
                patterns: vec![],
                bars: vec![None; 4],
                muted: false,
            }],
            beats_per_bar: 4,
            ticks_per_part: 2,
            parts_per_beat: 2,
            bar_count: 4,
            loop_start: 0,
            loop_length: 4,
            loop_repeat_count: Some(0),
            tempo_bpm: 120.0,
            key: Key { pitch_class: 0, octave: 0 },
            master_gain: 1.0,
            limiter: LimiterSettings::default(),
            song_eq: cadence_song::FilterSettings::Simple { cut: 0.45, peak: 0.1 },
            loop_override: LoopOverride::default(),
        }
    }

    #[test]
    fn render_on_an_instrumentless_song_produces_silence() {
        let song = minimal_song();
        let mut scheduler = Scheduler::new(&song, 48000.0);
        let mut l = vec![1.0; 512];
        let mut r = vec![1.0; 512];
        scheduler.render(&song, &mut l, &mut r);
        for (s_l, s_r) in l.iter().zip(r.iter()) {
            assert!(s_l.abs() < 1e-4 && s_r.abs() < 1e-4);
        }
    }

    #[test]
    fn next_bar_wraps_within_the_loop_region_until_repeats_exhausted() {
        let mut song = minimal_song();
        song.loop_start = 1;
        song.loop_length = 2;
        song.loop_repeat_count = Some(1);
        let (b1, f1) = next_bar(&song, 2, 0);
        assert_eq!(b1, 1);
        assert!(!f1);
        let (b2, f2) = next_bar(&song, 2, 1);
        assert_eq!(b2, 2);
        assert!(f2);
    }

    #[test]
    fn finite_duration_estimate_accounts_for_repeats() {
        let mut song = minimal_song();
        song.loop_start = 0;
        song.loop_length = 4;
        song.loop_repeat_count = Some(2);
        let estimate = estimate_total_samples(&song, 48000.0);
        assert!(estimate.is_some());
        let one_bar = song.samples_per_bar(48000.0) as f64;
        assert!((estimate.unwrap() - one_bar * 4.0 * 3.0).abs() < 1.0);
    }

    #[test]
    fn infinite_loop_has_no_finite_duration_estimate() {
        let mut song = minimal_song();
        song.loop_repeat_count = None;
        assert!(estimate_total_samples(&song, 48000.0).is_none());
    }

    fn tempo_mod_note(start: u32, end: u32, bpm_start: f32, bpm_end: f32) -> cadence_song::Note {
        cadence_song::Note {
            start,
            end,
            pitches: vec![0],
            pins: vec![
                cadence_song::Pin { time: 0, interval: 0, size: bpm_start },
                cadence_song::Pin { time: end - start, interval: 0, size: bpm_end },
            ],
            continues_last_pattern: false,
            chip_wave_start_offset: None,
        }
    }

    fn song_with_tempo_ramp(bpm_start: f32, bpm_end: f32) -> Song {
        let mut song = minimal_song();
        let mod_instrument = cadence_song::Instrument {
            kind: InstrumentKind::Mod {
                slots: vec![cadence_song::ModSlot {
                    target_channel: cadence_song::ModChannelTarget::Song,
                    target_instrument: cadence_song::ModInstrumentTarget::AllInChannel,
                    setting: 0,
                    filter_target: None,
                }],
            },
            unison: cadence_song::Unison::default(),
            vibrato: cadence_song::Vibrato::None,
            arpeggio_speed: 0.0,
            fade_in_seconds: 0.0,
            fade_out_ticks: 0,
            envelopes: vec![],
            note_filter: cadence_song::FilterSettings::Simple { cut: 0.4, peak: 0.1 },
            effects: vec![],
            max_chord_size: 1,
        };
        let pattern = Pattern { notes: vec![tempo_mod_note(0, 4, bpm_start, bpm_end)], instruments: vec![0] };
        song.channels.push(cadence_song::Channel {
            kind: ChannelKind::Modulation,
            instruments: vec![mod_instrument],
            patterns: vec![pattern],
            bars: vec![Some(0); 4],
            muted: false,
        });
        song
    }

    #[test]
    fn tempo_modulated_bar_uses_the_closed_form_slide_not_the_base_tempo() {
        let song = song_with_tempo_ramp(120.0, 240.0);
        let modulated = bar_duration_samples(&song, 0, 48000.0);
        let base_tempo_bar = song.samples_per_bar(48000.0) as f64;
        // Ramping to a faster tempo partway through the bar should finish it
        // in fewer samples than the constant-base-tempo bar would.
        assert!(modulated < base_tempo_bar);
        assert!(modulated > 0.0);
    }

    #[test]
    fn bar_with_no_tempo_notes_matches_the_constant_tempo_fast_path() {
        let song = minimal_song();
        let computed = bar_duration_samples(&song, 0, 48000.0);
        let expected = song.samples_per_bar(48000.0) as f64;
        assert!((computed - expected).abs() < 1.0);
    }

    #[test]
    fn two_pass_modulation_orders_filter_dot_edits_after_everything_else() {
        let mut song = minimal_song();
        let mod_instrument = cadence_song::Instrument {
            kind: InstrumentKind::Mod {
                slots: vec![
                    cadence_song::ModSlot {
                        target_channel: cadence_song::ModChannelTarget::Channel { index: 0 },
                        target_instrument: cadence_song::ModInstrumentTarget::Single { index: 0 },
                        setting: 1,
                        filter_target: None,
                    },
                    cadence_song::ModSlot {
                        target_channel: cadence_song::ModChannelTarget::Channel { index: 0 },
                        target_instrument: cadence_song::ModInstrumentTarget::Single { index: 0 },
                        setting: 0,
                        filter_target: Some(1),
                    },
                ],
            },
            unison: cadence_song::Unison::default(),
            vibrato: cadence_song::Vibrato::None,
            arpeggio_speed: 0.0,
            fade_in_seconds: 0.0,
            fade_out_ticks: 0,
            envelopes: vec![],
            note_filter: cadence_song::FilterSettings::Simple { cut: 0.4, peak: 0.1 },
            effects: vec![],
            max_chord_size: 1,
        };
        // One chord note carries both pitches; `pattern.instruments`'s two
        // slots each read a different pitch off it, selecting the plain
        // pitch-shift slot (pitch 0) and the filter-dot slot (pitch 1).
        let pattern = Pattern {
            notes: vec![cadence_song::Note {
                start: 0,
                end: 4,
                pitches: vec![0, 1],
                pins: vec![
                    cadence_song::Pin { time: 0, interval: 0, size: 0.3 },
                    cadence_song::Pin { time: 4, interval: 0, size: 0.3 },
                ],
                continues_last_pattern: false,
                chip_wave_start_offset: None,
            }],
            instruments: vec![0, 0],
        };
        song.channels.push(cadence_song::Channel {
            kind: ChannelKind::Modulation,
            instruments: vec![mod_instrument],
            patterns: vec![pattern],
            bars: vec![Some(0); 4],
            muted: false,
        });

        let mut scheduler = Scheduler::new(&song, 48000.0);
        scheduler.evaluate_modulation(&song);

        // Both passes ran: the plain pitch-shift slot (pass 1) and the
        // filter-dot slot (pass 2) each claimed a value this tick, rather
        // than the dot edit silently losing to or pre-empting the other.
        let pitch_shift = scheduler
            .mod_tables
            .instrument_value(0, 0, ModSetting::PitchShift)
            .expect("pitch-shift slot should have claimed a value");
        assert!((pitch_shift - 0.3).abs() < 1e-5);
        let dot_value = scheduler
            .mod_tables
            .instrument_filter_dot(0, 0, 1)
            .expect("filter-dot slot should have claimed a value");
        assert!((dot_value - 0.3).abs() < 1e-5);
    }
}
