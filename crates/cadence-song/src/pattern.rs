//! Patterns, notes, and pins — the per-bar note data a channel plays.

use serde::{Deserialize, Serialize};

/// A control point within a note: a time offset (in parts, relative to the
/// note's start), a pitch interval (semitones, relative to the note's base
/// pitch), and a size (a 0..`note_size_max` loudness proxy).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub time: u32,
    pub interval: i32,
    pub size: f32,
}

/// A played note: one or more simultaneous pitches (a chord), a sequence of
/// pins describing how pitch and loudness evolve across the note, and the
/// note's extent in parts relative to its containing pattern.
///
/// Invariants (checked by [`crate::validate::validate_song`]): `start <
/// end`; `pins[0].time == 0`; `pins.last().time == end - start`; pin times
/// strictly increase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub start: u32,
    pub end: u32,
    pub pitches: Vec<i32>,
    pub pins: Vec<Pin>,
    /// True if this note should seamlessly continue the pitch/tone state of
    /// whatever note ended at this pattern's start on the previous bar.
    #[serde(default)]
    pub continues_last_pattern: bool,
    /// Playback start offset into a custom chip wave, in samples.
    #[serde(default)]
    pub chip_wave_start_offset: Option<u32>,
}

impl Note {
    /// Number of simultaneous pitches (chord size).
    pub fn chord_size(&self) -> usize {
        self.pitches.len()
    }

    /// Interpolated `(interval, size)` at a fractional part position within
    /// the note (`part_in_note` in `0.0..=(end - start) as f32`).
    ///
    /// Returns the last pin's value if `part_in_note` is past the final pin.
    pub fn interpolate_at(&self, part_in_note: f32) -> (f32, f32) {
        if self.pins.is_empty() {
            return (0.0, 0.0);
        }
        if self.pins.len() == 1 || part_in_note <= self.pins[0].time as f32 {
            let p = &self.pins[0];
            return (p.interval as f32, p.size);
        }
        for window in self.pins.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            if part_in_note <= b.time as f32 {
                let span = (b.time - a.time) as f32;
                let t = if span > 0.0 {
                    (part_in_note - a.time as f32) / span
                } else {
                    1.0
                };
                let interval = a.interval as f32 + (b.interval - a.interval) as f32 * t;
                let size = a.size + (b.size - a.size) * t;
                return (interval, size);
            }
        }
        let last = self.pins.last().unwrap();
        (last.interval as f32, last.size)
    }
}

/// A one-bar-long reusable block of notes, referenced by one or more bar
/// slots of a channel. Notes in a pattern are disjoint in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub notes: Vec<Note>,
    /// Indices into the channel's instrument list that this pattern plays
    /// through. Most patterns reference exactly one instrument.
    pub instruments: Vec<usize>,
}

impl Pattern {
    /// The note active at `part`, if any.
    pub fn note_at(&self, part: u32) -> Option<&Note> {
        self.notes.iter().find(|n| n.start <= part && part < n.end)
    }

    /// The note immediately preceding `part` (ending exactly at `part`).
    pub fn note_ending_at(&self, part: u32) -> Option<&Note> {
        self.notes.iter().find(|n| n.end == part)
    }

    /// The note immediately following `part` (starting exactly at `part`).
    pub fn note_starting_at(&self, part: u32) -> Option<&Note> {
        self.notes.iter().find(|n| n.start == part)
    }

    pub fn last_note(&self) -> Option<&Note> {
        self.notes.iter().max_by_key(|n| n.end)
    }

    pub fn first_note(&self) -> Option<&Note> {
        self.notes.iter().min_by_key(|n| n.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start: u32, end: u32) -> Note {
        Note {
            start,
            end,
            pitches: vec![60],
            pins: vec![
                Pin { time: 0, interval: 0, size: 1.0 },
                Pin { time: end - start, interval: 0, size: 1.0 },
            ],
            continues_last_pattern: false,
            chip_wave_start_offset: None,
        }
    }

    #[test]
    fn interpolate_at_midpoint_of_a_slide() {
        let n = Note {
            start: 0,
            end: 8,
            pitches: vec![60],
            pins: vec![
                Pin { time: 0, interval: 0, size: 0.0 },
                Pin { time: 8, interval: 12, size: 1.0 },
            ],
            continues_last_pattern: false,
            chip_wave_start_offset: None,
        };
        let (interval, size) = n.interpolate_at(4.0);
        assert!((interval - 6.0).abs() < 1e-6);
        assert!((size - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pattern_notes_are_locatable_by_part() {
        let pattern = Pattern {
            notes: vec![note(0, 8), note(8, 16)],
            instruments: vec![0],
        };
        assert_eq!(pattern.note_at(0).unwrap().start, 0);
        assert_eq!(pattern.note_at(8).unwrap().start, 8);
        assert!(pattern.note_ending_at(8).is_some());
        assert!(pattern.note_starting_at(8).is_some());
    }
}
