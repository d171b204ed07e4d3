//! Per-channel tone allocation: a LIFO pool of pooled [`Tone`] values plus
//! the active/releasing list a channel's scheduler drives each tick (spec
//! §4.3 "ToneAllocator", §4.3.4 "Tone pool").
//!
//! Tones are never dropped once constructed; `newTone`/`freeTone` in the
//! spec map to [`ToneAllocator::allocate`]/[`ToneAllocator::reap_finished`]
//! here, mirroring the teacher's `VoiceManager` fixed-capacity voice array
//! rather than allocating mid-render.

use cadence_synth::Tone;

use crate::config::{MAX_FILTER_POINTS, MAX_PICKED_STRING_DELAY_SAMPLES, MAX_TONES_PER_CHANNEL};

/// One live tone slot: the synth state plus the bookkeeping the allocator
/// needs to decide when it can be reclaimed.
pub struct ActiveTone {
    pub tone: Tone,
    pub instrument_index: usize,
    pub releasing: bool,
    /// Samples of fade-out tail still owed before this tone is silent,
    /// counted down once `releasing` is set (spec §4.6 step 4 "fade-out
    /// scaling").
    pub release_samples_remaining: u32,
}

/// LIFO pool of [`Tone`]s plus the active list for one channel (spec §4.3.4).
pub struct ToneAllocator {
    pool: Vec<Tone>,
    pub active: Vec<ActiveTone>,
}

impl ToneAllocator {
    pub fn new(capacity: usize) -> Self {
        let mut pool = Vec::with_capacity(capacity.max(MAX_TONES_PER_CHANNEL));
        for _ in 0..capacity.max(MAX_TONES_PER_CHANNEL) {
            pool.push(Tone::new(MAX_FILTER_POINTS, MAX_PICKED_STRING_DELAY_SAMPLES));
        }
        Self { pool, active: Vec::new() }
    }

    /// Allocate a tone for a fresh note on `instrument_index`. Pops the
    /// most-recently-freed pool tone (LIFO: its note-filter/picked-string
    /// buffers are most likely to already be warm/zeroed from the last
    /// note), or steals the oldest releasing active tone if the pool is
    /// exhausted (spec §4.3.4 "steal oldest releasing tone").
    pub fn allocate(&mut self, instrument_index: usize) -> usize {
        if let Some(mut tone) = self.pool.pop() {
            tone.reset_for_note_start();
            tone.freshly_allocated = true;
            self.active.push(ActiveTone {
                tone,
                instrument_index,
                releasing: false,
                release_samples_remaining: 0,
            });
            return self.active.len() - 1;
        }

        if let Some(steal_idx) = self
            .active
            .iter()
            .enumerate()
            .filter(|(_, a)| a.releasing)
            .min_by_key(|(_, a)| a.release_samples_remaining)
            .map(|(i, _)| i)
        {
            self.active[steal_idx].tone.reset_for_note_start();
            self.active[steal_idx].tone.freshly_allocated = true;
            self.active[steal_idx].instrument_index = instrument_index;
            self.active[steal_idx].releasing = false;
            self.active[steal_idx].release_samples_remaining = 0;
            return steal_idx;
        }

        // Every tone is mid-attack; steal the one closest to done with its
        // own note (oldest `ticks_since_released`, or just index 0).
        let steal_idx = self
            .active
            .iter()
            .enumerate()
            .max_by_key(|(_, a)| a.tone.ticks_since_released)
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.active[steal_idx].tone.reset_for_note_start();
        self.active[steal_idx].tone.freshly_allocated = true;
        self.active[steal_idx].instrument_index = instrument_index;
        self.active[steal_idx].releasing = false;
        self.active[steal_idx].release_samples_remaining = 0;
        steal_idx
    }

    /// Mark an active tone as releasing, with `tail_samples` left to ring
    /// out (its fade-out envelope) before the allocator reclaims it.
    pub fn release(&mut self, active_index: usize, tail_samples: u32) {
        if let Some(a) = self.active.get_mut(active_index) {
            a.releasing = true;
            a.release_samples_remaining = tail_samples;
        }
    }

    /// Step every releasing tone's remaining tail by `samples`, returning
    /// finished tones to the pool (spec §4.3.4 "freeTone").
    pub fn reap_finished(&mut self, samples: u32) {
        let mut i = 0;
        while i < self.active.len() {
            let a = &mut self.active[i];
            if a.releasing {
                a.release_samples_remaining = a.release_samples_remaining.saturating_sub(samples);
                if a.release_samples_remaining == 0 {
                    let finished = self.active.swap_remove(i);
                    self.pool.push(finished.tone);
                    continue;
                }
            }
            i += 1;
        }
    }

    /// Active tone playing `instrument_index` that isn't already releasing,
    /// if any (used to find "the tone this pattern is currently sounding
    /// through" for seamless continuation, spec §4.3.3).
    pub fn find_sounding(&self, instrument_index: usize) -> Option<usize> {
        self.active
            .iter()
            .position(|a| !a.releasing && a.instrument_index == instrument_index)
    }

    pub fn reset(&mut self) {
        while let Some(a) = self.active.pop() {
            self.pool.push(a.tone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_release_returns_to_pool() {
        let mut alloc = ToneAllocator::new(2);
        let idx = alloc.allocate(0);
        assert_eq!(alloc.active.len(), 1);
        alloc.release(idx, 10);
        alloc.reap_finished(10);
        assert_eq!(alloc.active.len(), 0);
    }

    #[test]
    fn allocation_beyond_capacity_steals_a_releasing_tone() {
        let mut alloc = ToneAllocator::new(1);
        let first = alloc.allocate(0);
        alloc.release(first, 1000);
        let second = alloc.allocate(1);
        assert_eq!(alloc.active.len(), 1);
        assert_eq!(second, first);
        assert!(!alloc.active[second].releasing);
    }

    #[test]
    fn find_sounding_locates_the_non_releasing_tone_for_an_instrument() {
        let mut alloc = ToneAllocator::new(2);
        let idx = alloc.allocate(3);
        assert_eq!(alloc.find_sounding(3), Some(idx));
        alloc.release(idx, 5);
        assert_eq!(alloc.find_sounding(3), None);
    }
}
