//! `Renderer`: the crate's public entry type (spec §6 "External Interfaces"),
//! wrapping [`Scheduler`] and exposing its playhead-control, modulator, and
//! observability surface as inherent methods — the way `sonido-io::engine`'s
//! `ProcessingEngine` wraps an effect chain behind one inherent API that a
//! host (CLI, GUI, audio callback) drives without reaching into internals.

use std::sync::OnceLock;

use cadence_song::Song;
use tracing::instrument;

use crate::modulation::ModTarget;
use crate::scheduler::{estimate_total_samples, Scheduler};

static RENDER_CALLS: OnceLock<std::sync::atomic::AtomicU64> = OnceLock::new();

fn render_call_counter() -> &'static std::sync::atomic::AtomicU64 {
    RENDER_CALLS.get_or_init(|| std::sync::atomic::AtomicU64::new(0))
}

/// Live-input note tracking (spec §6 "Live input"). The renderer records
/// these fields for the host to drive a dedicated live-input tone, but does
/// not itself own a MIDI/audio capture device — that's explicitly out of
/// scope (spec "Out of scope: MIDI/live-input capture hardware").
#[derive(Debug, Clone, Default)]
pub struct LiveInputState {
    pub pitches: Vec<i32>,
    pub bass_pitches: Vec<i32>,
    pub channel: Option<u32>,
    pub instruments: Vec<usize>,
    pub started: bool,
    /// Ticks remaining before live input auto-deactivates.
    pub duration_ticks: u32,
}

/// Peak meters for the oscilloscope/metering observability hook (spec §6
/// "Observability"), modeled on a GUI metering bridge's peak-hold-then-reset
/// contract even though this workspace has no GUI crate to push events to.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeakMeters {
    pub input_l: f32,
    pub input_r: f32,
    pub output_l: f32,
    pub output_r: f32,
}

impl PeakMeters {
    fn note_output(&mut self, l: f32, r: f32) {
        self.output_l = self.output_l.max(l.abs());
        self.output_r = self.output_r.max(r.abs());
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The renderer's play/pause/recording transport state (spec §7 "pause()
/// flips a flag that will take effect at the next render() entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Playing,
    Paused,
}

/// The public rendering engine: owns the [`Scheduler`] plus the transport,
/// live-input, and metering state spec §6 names as the renderer's external
/// surface. A host (CLI `render`/`play` subcommands, or an embedding
/// application) owns one `Renderer` per playing song and drives it entirely
/// through these inherent methods — never by reaching into `Scheduler`
/// directly, which is why `scheduler` stays private to this module.
pub struct Renderer {
    song: Song,
    scheduler: Scheduler,
    transport: Transport,
    sample_rate: f32,
    pub live_input: LiveInputState,
    meters: PeakMeters,
    render_calls_since_oscilloscope: u32,
    last_oscilloscope_l: Vec<f32>,
    last_oscilloscope_r: Vec<f32>,
}

impl Renderer {
    pub fn new(song: Song, sample_rate: f32) -> Self {
        let scheduler = Scheduler::new(&song, sample_rate);
        Self {
            song,
            scheduler,
            transport: Transport::Playing,
            sample_rate,
            live_input: LiveInputState::default(),
            meters: PeakMeters::default(),
            render_calls_since_oscilloscope: 0,
            last_oscilloscope_l: Vec::new(),
            last_oscilloscope_r: Vec::new(),
        }
    }

    /// Replace the song being played, rebuilding every channel's tone pools
    /// and effects chains for the new instrument/effect lineup.
    pub fn set_song(&mut self, song: Song) {
        self.scheduler = Scheduler::new(&song, self.sample_rate);
        self.song = song;
    }

    /// Reallocate every delay-dependent buffer (echo, picked-string,
    /// supersaw shape line) for a new output sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.scheduler.set_sample_rate(sample_rate);
    }

    /// Run one dummy sample through the whole render path to prime caches
    /// and branch predictors before the first audible buffer (spec §6
    /// "warm_up() — runs one dummy sample to prime JIT/caches").
    pub fn warm_up(&mut self) {
        let mut l = [0.0f32; 1];
        let mut r = [0.0f32; 1];
        self.render(&mut l, &mut r, 1, false);
    }

    pub fn play(&mut self) {
        self.transport = Transport::Playing;
    }

    /// Pause playback; the flag takes effect at the next `render()` call,
    /// not immediately (spec §7 "Cancellation and timeouts").
    pub fn pause(&mut self) {
        self.transport = Transport::Paused;
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    /// Whether the scheduler has exhausted the song's loop repeats and has
    /// nothing left to render.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Mark the transport as actively recording a performance; recording
    /// does not change render semantics here, only live-input deadline
    /// handling (spec §6 "start_recording()").
    pub fn start_recording(&mut self) {
        self.live_input.started = true;
    }

    pub fn snap_to_start(&mut self) {
        self.scheduler.snap_to_start(&self.song);
        self.meters.reset();
    }

    /// Snap the playhead to the start of the current bar.
    pub fn snap_to_bar(&mut self) {
        let bar = self.scheduler.playhead_bar();
        self.scheduler.go_to_bar(bar);
    }

    pub fn go_to_bar(&mut self, bar: u32) {
        self.scheduler.go_to_bar(bar.min(self.song.bar_count.saturating_sub(1)));
    }

    pub fn go_to_next_bar(&mut self) {
        let next = (self.scheduler.playhead_bar() + 1).min(self.song.bar_count.saturating_sub(1));
        self.scheduler.go_to_bar(next);
    }

    pub fn go_to_prev_bar(&mut self) {
        let prev = self.scheduler.playhead_bar().saturating_sub(1);
        self.scheduler.go_to_bar(prev);
    }

    /// Jump the playhead into the start of the song's loop region.
    pub fn jump_into_loop(&mut self) {
        self.scheduler.go_to_bar(self.song.loop_override.loop_bar_start.unwrap_or(self.song.loop_start));
    }

    /// Advance one bar without rendering its audio (spec §4.1.1 "skip
    /// policy" combined with the infinite-skip guard in
    /// [`crate::config::MAX_BAR_SKIP_GUARD`]).
    pub fn skip_bar(&mut self) {
        let next = (self.scheduler.playhead_bar() + 1).min(self.song.bar_count.saturating_sub(1));
        self.scheduler.go_to_bar(next);
    }

    /// Estimate the total sample count a full playthrough produces (spec
    /// §4.1.2 "Total-duration estimation"). `enable_intro`/`enable_outro`
    /// gate whether the bars before/after the loop region are counted; when
    /// both are disabled the estimate covers only the looped region itself.
    pub fn get_total_samples(&self, enable_intro: bool, enable_outro: bool, loop_count: Option<u32>) -> Option<u64> {
        let mut song = self.song.clone();
        song.loop_repeat_count = loop_count;
        let estimate = estimate_total_samples(&song, self.sample_rate)?;
        let samples_per_bar = song.samples_per_bar(self.sample_rate) as f64;
        let (loop_start, loop_end) =
            (song.loop_override.loop_bar_start.unwrap_or(song.loop_start), song.loop_override.loop_bar_end.unwrap_or(song.loop_start + song.loop_length));
        let intro = if enable_intro { loop_start as f64 * samples_per_bar } else { 0.0 };
        let outro = if enable_outro {
            (song.bar_count.saturating_sub(loop_end)) as f64 * samples_per_bar
        } else {
            0.0
        };
        let loop_only = estimate - (loop_start as f64 * samples_per_bar) - (song.bar_count.saturating_sub(loop_end)) as f64 * samples_per_bar;
        Some((intro + loop_only + outro).round().max(0.0) as u64)
    }

    /// Extend the live-input auto-deactivation deadline; call periodically
    /// while a live performance is ongoing (spec §6 "maintain_live_input()").
    pub fn maintain_live_input(&mut self, extend_ticks: u32) {
        self.live_input.duration_ticks = self.live_input.duration_ticks.saturating_add(extend_ticks);
    }

    pub fn set_mod_value(&mut self, target: ModTarget, value: f32) {
        self.scheduler.mod_tables_mut().set_user(target, value);
    }

    pub fn get_mod_value(&self, target: ModTarget) -> f32 {
        self.scheduler.mod_tables().get(target)
    }

    pub fn is_mod_active(&self, target: ModTarget) -> bool {
        self.scheduler.mod_tables().is_active(target)
    }

    pub fn is_any_mod_active(&self) -> bool {
        self.scheduler.mod_tables().is_any_active()
    }

    pub fn unset_mod(&mut self, target: ModTarget) {
        self.scheduler.mod_tables_mut().unset_user(target);
    }

    /// Hold `target` at its current value for 24 ticks (~12 parts), the way
    /// a recording gesture stabilizes a modulator release so it doesn't
    /// glitch when let go slightly off-grid (spec §6 "force_hold_mods").
    pub fn force_hold_mods(&mut self, target: ModTarget) {
        self.scheduler.mod_tables_mut().force_hold(target);
    }

    pub fn input_peak(&self) -> (f32, f32) {
        (self.meters.input_l, self.meters.input_r)
    }

    pub fn output_peak(&self) -> (f32, f32) {
        (self.meters.output_l, self.meters.output_r)
    }

    /// Reset accumulated peak meters, as a host does after reading them for
    /// one UI poll cycle.
    pub fn reset_peaks(&mut self) {
        self.meters.reset();
    }

    /// The L/R slices captured on the most "oscilloscopeUpdate" render call
    /// (spec §6: raised every 2 render calls), or empty before the first one.
    pub fn oscilloscope_slices(&self) -> (&[f32], &[f32]) {
        (&self.last_oscilloscope_l, &self.last_oscilloscope_r)
    }

    /// Render `frames` samples into `out_l`/`out_r`, advancing the song
    /// playhead only when `advance` is true and the transport is playing
    /// (spec §6 "Render call", §7 testable property 3).
    #[instrument(skip(self, out_l, out_r), fields(frames))]
    pub fn render(&mut self, out_l: &mut [f32], out_r: &mut [f32], frames: usize, advance: bool) {
        debug_assert!(out_l.len() >= frames && out_r.len() >= frames);
        render_call_counter().fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let should_advance = advance && self.transport == Transport::Playing;
        if should_advance {
            self.scheduler.render(&self.song, &mut out_l[..frames], &mut out_r[..frames]);
        } else {
            out_l[..frames].fill(0.0);
            out_r[..frames].fill(0.0);
        }

        for i in 0..frames {
            self.meters.note_output(out_l[i], out_r[i]);
        }

        self.render_calls_since_oscilloscope += 1;
        if self.render_calls_since_oscilloscope >= 2 {
            self.render_calls_since_oscilloscope = 0;
            self.last_oscilloscope_l.clear();
            self.last_oscilloscope_l.extend_from_slice(&out_l[..frames]);
            self.last_oscilloscope_r.clear();
            self.last_oscilloscope_r.extend_from_slice(&out_r[..frames]);
        }

        tracing::debug!(frames, advance = should_advance, "render call completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_song::{Channel, ChannelKind, FilterSettings, Key, LimiterSettings, LoopOverride};

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
            song_eq: FilterSettings::Simple { cut: 0.45, peak: 0.1 },
            loop_override: LoopOverride::default(),
        }
    }

    #[test]
    fn paused_render_with_advance_writes_silence() {
        let mut renderer = Renderer::new(minimal_song(), 48000.0);
        renderer.pause();
        let mut l = vec![1.0; 64];
        let mut r = vec![1.0; 64];
        renderer.render(&mut l, &mut r, 64, true);
        assert!(l.iter().all(|&s| s == 0.0));
        assert!(r.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn warm_up_does_not_panic_on_an_empty_song() {
        let mut renderer = Renderer::new(minimal_song(), 48000.0);
        renderer.warm_up();
    }

    #[test]
    fn oscilloscope_slice_fills_in_every_second_render_call() {
        let mut renderer = Renderer::new(minimal_song(), 48000.0);
        let mut l = vec![0.0; 32];
        let mut r = vec![0.0; 32];
        renderer.render(&mut l, &mut r, 32, true);
        assert!(renderer.oscilloscope_slices().0.is_empty());
        renderer.render(&mut l, &mut r, 32, true);
        assert_eq!(renderer.oscilloscope_slices().0.len(), 32);
    }

    #[test]
    fn mod_value_round_trips_through_the_user_override_api() {
        let mut renderer = Renderer::new(minimal_song(), 48000.0);
        let target = ModTarget { channel: Some(0), instrument: Some(0), setting: 1, filter_dot: None };
        assert!(!renderer.is_mod_active(target));
        renderer.set_mod_value(target, 0.5);
        assert!(renderer.is_mod_active(target));
        assert_eq!(renderer.get_mod_value(target), 0.5);
        renderer.unset_mod(target);
        assert!(!renderer.is_mod_active(target));
    }
}
