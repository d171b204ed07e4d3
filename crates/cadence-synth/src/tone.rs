//! `Tone`: a pooled, renderer-owned live voice instance (spec §3 "Tone").
//!
//! A `Tone` is never freed back to the allocator; the pool
//! (`cadence-engine::tone_pool`) recycles the same `Tone` values across
//! notes, calling [`Tone::reset_for_note_start`] whenever DSP state must
//! not carry over.

use cadence_core::biquad::DynamicBiquad;
use cadence_core::ring_buffer::RingBuffer;

/// Upper bound on FM operators (6-op is the richest instrument kind) and on
/// unison/supersaw voices, used to size the tone's per-voice arrays once at
/// pool construction (spec §6 "Configuration": these are immutable
/// process-wide constants).
pub const MAX_VOICES: usize = 8;
pub const MAX_OPERATORS: usize = 6;

/// Per-operator FM state (spec §3 Tone "per-operator expression and delta").
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorState {
    pub phase: f32,
    pub phase_delta: f32,
    pub expression: f32,
    pub expression_delta: f32,
}

/// Per-unison-voice Karplus-Strong state for the picked-string instrument
/// (spec §3 Tone "PickedString voice states").
#[derive(Debug, Clone)]
pub struct PickedStringVoice {
    pub delay: RingBuffer,
    pub delay_length: f32,
    pub delay_length_delta: f32,
    pub allpass_sample: f32,
    pub sustain_filter: DynamicBiquad,
    pub fractional_delay_sample: f32,
    /// `true` immediately after a retrigger, until the impulse is injected.
    pub needs_impulse: bool,
}

impl PickedStringVoice {
    pub fn new(max_delay_samples: usize) -> Self {
        Self {
            delay: RingBuffer::new(max_delay_samples),
            delay_length: 1.0,
            delay_length_delta: 0.0,
            allpass_sample: 0.0,
            sustain_filter: DynamicBiquad::new(),
            fractional_delay_sample: 0.0,
            needs_impulse: true,
        }
    }
}

/// Direction a loopable chip-wave voice reads its table in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDirection {
    Forward,
    Backward,
}

/// Per-unison-voice state for the loopable chip-wave instrument.
#[derive(Debug, Clone, Copy)]
pub struct ChipLoopVoice {
    pub direction: LoopDirection,
    /// Remaining samples in the completion fade-out ("once"/"loop-once"
    /// modes, spec §4.5).
    pub fade_samples_remaining: u32,
    pub last_sample_before_stop: f32,
}

impl Default for ChipLoopVoice {
    fn default() -> Self {
        Self {
            direction: LoopDirection::Forward,
            fade_samples_remaining: 0,
            last_sample_before_stop: 0.0,
        }
    }
}

/// Reference to the note currently, previously, or about to be played by a
/// tone, plus the index of the tone's pitch within that note's chord.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteRef {
    pub start_part: u32,
    pub end_part: u32,
    pub pitch_index: usize,
}

/// A live voice-rendering instance (spec §3 "Tone").
#[derive(Debug, Clone)]
pub struct Tone {
    pub pitches: [f32; 8],
    pub pitch_count: usize,
    pub chord_size: usize,
    pub instrument_index: usize,

    pub note: Option<NoteRef>,
    pub prev_note: Option<NoteRef>,
    pub next_note: Option<NoteRef>,

    pub at_note_start: bool,
    pub passed_end_of_note: bool,
    pub force_continue_at_start: bool,
    pub force_continue_at_end: bool,
    pub ticks_since_released: u32,
    pub is_on_last_tick: bool,
    pub freshly_allocated: bool,

    /// Per-voice phase / phase-delta / phase-delta-scale for non-FM
    /// oscillator kinds (chip, pwm, supersaw, harmonics, noise, spectrum).
    pub phases: [f32; MAX_VOICES],
    pub phase_deltas: [f32; MAX_VOICES],
    pub phase_delta_scales: [f32; MAX_VOICES],

    pub expression: f32,
    pub expression_delta: f32,

    pub pulse_width: f32,
    pub pulse_width_delta: f32,

    /// FM operator state, highest index computed first (spec §4.5 "FM").
    pub operators: [OperatorState; MAX_OPERATORS],
    pub feedback_expression: f32,
    pub feedback_expression_delta: f32,

    /// Supersaw per-voice detune (semitones) and the shared fractional
    /// delay line used for the "shape" morph.
    pub supersaw_detunes: [f32; MAX_VOICES],
    pub supersaw_delay: Option<RingBuffer>,
    pub supersaw_delay_length: f32,
    pub supersaw_delay_length_delta: f32,

    pub picked_string_voices: Vec<PickedStringVoice>,
    pub chip_loop_voices: [ChipLoopVoice; 2],

    /// Note-filter (pre-EQ) chain histories, stereo.
    pub note_filters_l: Vec<DynamicBiquad>,
    pub note_filters_r: Vec<DynamicBiquad>,

    pub prev_vibrato: f32,
    pub vibrato_time: f32,

    /// Wall-clock seconds since the currently (or most recently) sounding
    /// note began, tracked independent of tick/part granularity so envelopes
    /// and fade curves progress smoothly (spec §4.9 "seconds since the note
    /// began").
    pub seconds_since_note_start: f32,
    /// Expression magnitude at the moment this tone's note last sounded,
    /// used as the baseline a release-tail fade-out decays from.
    pub last_note_size: f32,

    /// Noise/xorshift state for noise-family instruments.
    pub noise_state: u32,
}

impl Tone {
    /// Construct a tone from the pool, sized for the richest instrument
    /// kind it may ever be assigned to play.
    pub fn new(max_filter_points: usize, max_picked_string_delay_samples: usize) -> Self {
        Self {
            pitches: [0.0; 8],
            pitch_count: 0,
            chord_size: 1,
            instrument_index: 0,
            note: None,
            prev_note: None,
            next_note: None,
            at_note_start: false,
            passed_end_of_note: false,
            force_continue_at_start: false,
            force_continue_at_end: false,
            ticks_since_released: 0,
            is_on_last_tick: false,
            freshly_allocated: true,
            phases: [0.0; MAX_VOICES],
            phase_deltas: [0.0; MAX_VOICES],
            phase_delta_scales: [1.0; MAX_VOICES],
            expression: 0.0,
            expression_delta: 0.0,
            pulse_width: 0.5,
            pulse_width_delta: 0.0,
            operators: [OperatorState::default(); MAX_OPERATORS],
            feedback_expression: 0.0,
            feedback_expression_delta: 0.0,
            supersaw_detunes: [0.0; MAX_VOICES],
            supersaw_delay: None,
            supersaw_delay_length: 1.0,
            supersaw_delay_length_delta: 0.0,
            picked_string_voices: (0..MAX_VOICES)
                .map(|_| PickedStringVoice::new(max_picked_string_delay_samples))
                .collect(),
            chip_loop_voices: [ChipLoopVoice::default(); 2],
            note_filters_l: (0..max_filter_points).map(|_| DynamicBiquad::new()).collect(),
            note_filters_r: (0..max_filter_points).map(|_| DynamicBiquad::new()).collect(),
            prev_vibrato: 0.0,
            vibrato_time: 0.0,
            seconds_since_note_start: 0.0,
            last_note_size: 1.0,
            noise_state: 0x9e3779b9,
        }
    }

    /// Reset DSP state for a non-seamless note start: phases, operator
    /// state, and filter histories are cleared, but the filter
    /// *coefficients* and pooled buffer allocations are left alone.
    pub fn reset_for_note_start(&mut self) {
        self.phases = [0.0; MAX_VOICES];
        self.phase_deltas = [0.0; MAX_VOICES];
        self.operators = [OperatorState::default(); MAX_OPERATORS];
        self.feedback_expression = 0.0;
        for f in self.note_filters_l.iter_mut().chain(self.note_filters_r.iter_mut()) {
            f.reset();
        }
        for v in &mut self.picked_string_voices {
            v.needs_impulse = true;
            v.allpass_sample = 0.0;
            v.fractional_delay_sample = 0.0;
        }
        self.prev_vibrato = 0.0;
        self.vibrato_time = 0.0;
        self.seconds_since_note_start = 0.0;
        self.last_note_size = 1.0;
        self.ticks_since_released = 0;
        self.passed_end_of_note = false;
    }

    /// Sweep denormal history out of every filter this tone owns (spec
    /// §4.7 "sanitize_filters", run once per tick after voice synthesis).
    pub fn sanitize_filters(&mut self) {
        cadence_core::biquad::sanitize_filters(&mut self.note_filters_l);
        cadence_core::biquad::sanitize_filters(&mut self.note_filters_r);
    }
}
