//! Power-of-two circular buffers with wrap-masked indexing.
//!
//! Every delay-based effect in the renderer (chorus, flanger, echo, reverb,
//! granular, the supersaw sub-oscillator delay, and the stereo panning tap)
//! shares this one buffer type. Sizing to a power of two lets every read or
//! write wrap with a single `& mask` instead of a `%`, which matters because
//! these buffers are touched once or more per output sample.

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Round `n` up to the next power of two, with a floor of 1.
///
/// Used to size delay buffers from a sample-rate- and parameter-derived
/// minimum capacity (spec §4.8: echo and reverb buffer sizing).
#[inline]
pub fn fitting_power_of_two(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    n.next_power_of_two()
}

/// A circular buffer of `f32` samples whose length is always a power of two.
///
/// Indices are masked rather than taken modulo, and the buffer never
/// reallocates downward: [`RingBuffer::resize_preserving`] only grows the
/// buffer, copying existing contents into the new, larger one so that
/// in-flight delay taps (e.g. an echo tail surviving a tempo change, spec
/// §3 "Invariants") are not discarded.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    mask: usize,
    write_pos: usize,
}

impl RingBuffer {
    /// Create a new ring buffer with at least `min_capacity` samples.
    pub fn new(min_capacity: usize) -> Self {
        let capacity = fitting_power_of_two(min_capacity.max(1));
        Self {
            buffer: vec![0.0; capacity],
            mask: capacity - 1,
            write_pos: 0,
        }
    }

    /// Number of samples the buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Write a sample at the current position and advance it by one.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) & self.mask;
    }

    /// Read the sample written `delay` positions ago (integer delay).
    ///
    /// `delay = 0` returns the most recently written sample.
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let pos = (self.write_pos.wrapping_sub(1).wrapping_sub(delay)) & self.mask;
        self.buffer[pos]
    }

    /// Read with linear interpolation for a fractional delay in samples.
    #[inline]
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let delay_samples = delay_samples.max(0.0);
        let delay_int = delay_samples as usize;
        let frac = delay_samples - delay_int as f32;
        let a = self.read(delay_int);
        let b = self.read(delay_int + 1);
        a + (b - a) * frac
    }

    /// Combined write-then-read-delayed, the common delay-line idiom.
    #[inline]
    pub fn read_write(&mut self, sample: f32, delay: usize) -> f32 {
        let out = self.read(delay);
        self.write(sample);
        out
    }

    /// Fixed offset read relative to the write cursor, used by multi-tap
    /// topologies (reverb's four fixed offsets) where `offset` is itself a
    /// buffer index rather than "delay back from now".
    #[inline]
    pub fn read_at(&self, offset: usize) -> f32 {
        self.buffer[offset & self.mask]
    }

    /// Write at an explicit absolute index (used by multi-tap feedback
    /// networks that write to several positions derived from one shared
    /// write cursor).
    #[inline]
    pub fn write_at(&mut self, offset: usize, sample: f32) {
        self.buffer[offset & self.mask] = sample;
    }

    /// Current write cursor, for topologies that derive several read offsets
    /// from one shared position (reverb).
    #[inline]
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Advance the write cursor without writing (used when a caller writes
    /// directly via [`write_at`](Self::write_at)).
    #[inline]
    pub fn advance_cursor(&mut self) {
        self.write_pos = (self.write_pos + 1) & self.mask;
    }

    /// Zero the buffer without changing its capacity.
    pub fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
    }

    /// Grow the buffer to at least `min_capacity`, preserving existing
    /// contents so currently-decaying delay taps are not truncated.
    ///
    /// The old buffer's samples are copied starting at the current read
    /// position (oldest-to-newest) so that after the resize, `read(0)`
    /// still returns what was most recently written. No-op if the buffer
    /// is already large enough.
    pub fn resize_preserving(&mut self, min_capacity: usize) {
        let new_capacity = fitting_power_of_two(min_capacity.max(1));
        if new_capacity <= self.buffer.len() {
            return;
        }
        let old_len = self.buffer.len();
        let mut new_buffer = vec![0.0; new_capacity];
        for i in 0..old_len {
            // Oldest sample first: write_pos is the next slot to be
            // overwritten, i.e. the oldest live sample.
            let src = (self.write_pos + i) & self.mask;
            new_buffer[new_capacity - old_len + i] = self.buffer[src];
        }
        self.buffer = new_buffer;
        self.mask = new_capacity - 1;
        self.write_pos = new_capacity - old_len + old_len; // == new_capacity, wraps to 0 below
        self.write_pos &= self.mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitting_power_of_two_rounds_up() {
        assert_eq!(fitting_power_of_two(0), 1);
        assert_eq!(fitting_power_of_two(1), 1);
        assert_eq!(fitting_power_of_two(5), 8);
        assert_eq!(fitting_power_of_two(1024), 1024);
        assert_eq!(fitting_power_of_two(1025), 2048);
    }

    #[test]
    fn write_then_read_back() {
        let mut rb = RingBuffer::new(8);
        for i in 1..=8 {
            rb.write(i as f32);
        }
        // most recently written is 8.0 at delay 0
        assert_eq!(rb.read(0), 8.0);
        assert_eq!(rb.read(1), 7.0);
        assert_eq!(rb.read(7), 1.0);
    }

    #[test]
    fn interpolated_read_halfway() {
        let mut rb = RingBuffer::new(8);
        rb.write(0.0);
        rb.write(2.0);
        // read(0) = 2.0 (most recent), read(1) = 0.0
        assert!((rb.read_interpolated(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn resize_preserving_keeps_tail() {
        let mut rb = RingBuffer::new(4);
        for i in 1..=4 {
            rb.write(i as f32);
        }
        rb.resize_preserving(16);
        assert_eq!(rb.capacity(), 16);
        // the 4 most recent samples should still be readable in order
        assert_eq!(rb.read(0), 4.0);
        assert_eq!(rb.read(1), 3.0);
        assert_eq!(rb.read(2), 2.0);
        assert_eq!(rb.read(3), 1.0);
    }

    #[test]
    fn resize_preserving_is_noop_when_already_large_enough() {
        let mut rb = RingBuffer::new(16);
        rb.write(42.0);
        rb.resize_preserving(8);
        assert_eq!(rb.capacity(), 16);
        assert_eq!(rb.read(0), 42.0);
    }
}
