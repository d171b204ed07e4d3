//! Per-channel render-time state: the tone pool and each instrument's
//! effects chain (spec §4.3 "ToneAllocator" is channel-scoped — every
//! channel allocates tones independently of its siblings).

use cadence_effects::chain::EffectsChain;
use cadence_song::{Channel, Instrument};

use crate::config::MAX_TONES_PER_CHANNEL;
use crate::tone_pool::ToneAllocator;

pub struct ChannelRuntime {
    pub allocator: ToneAllocator,
    /// One effects chain per instrument in the channel, rebuilt whenever
    /// `rebuild_effects` is called (e.g. after a song/sample-rate change).
    pub instrument_effects: Vec<EffectsChain>,
    /// Part index (within the channel's currently playing pattern) each
    /// instrument was last observed holding a note at, used to detect note
    /// start/continue/end transitions tick to tick (spec §4.3 step-by-step
    /// allocation).
    pub last_seen_note_end: Vec<Option<u32>>,
}

impl ChannelRuntime {
    pub fn new(channel: &Channel, sample_rate: f32, samples_per_step: f32) -> Self {
        let instrument_effects = channel
            .instruments
            .iter()
            .map(|inst: &Instrument| EffectsChain::build(&inst.effects, sample_rate, samples_per_step))
            .collect();
        Self {
            allocator: ToneAllocator::new(MAX_TONES_PER_CHANNEL),
            instrument_effects,
            last_seen_note_end: vec![None; channel.instruments.len()],
        }
    }

    pub fn rebuild_effects(&mut self, channel: &Channel, sample_rate: f32, samples_per_step: f32) {
        self.instrument_effects =
            channel.instruments.iter().map(|inst| EffectsChain::build(&inst.effects, sample_rate, samples_per_step)).collect();
        self.last_seen_note_end.resize(channel.instruments.len(), None);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for chain in &mut self.instrument_effects {
            chain.set_sample_rate(sample_rate);
        }
    }

    pub fn reset(&mut self) {
        self.allocator.reset();
        for chain in &mut self.instrument_effects {
            chain.reset();
        }
        for seen in &mut self.last_seen_note_end {
            *seen = None;
        }
    }
}
