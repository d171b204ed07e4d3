//! Error types for song loading and validation.

use thiserror::Error;

/// Errors that can occur while loading or validating a [`crate::Song`].
#[derive(Debug, Error)]
pub enum SongError {
    /// Failed to parse JSON.
    #[error("failed to parse song JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Failed to parse TOML.
    #[error("failed to parse song TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML.
    #[error("failed to serialize song TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A pattern contains two notes that overlap in time.
    #[error("channel {channel}, bar {bar}: notes overlap at part {part}")]
    OverlappingNotes {
        channel: usize,
        bar: usize,
        part: u32,
    },

    /// A note's `start` is not strictly less than its `end`.
    #[error("channel {channel}, bar {bar}: note start ({start}) is not before end ({end})")]
    InvalidNoteRange {
        channel: usize,
        bar: usize,
        start: u32,
        end: u32,
    },

    /// A note's pins are not strictly increasing in time, or don't span
    /// `0..(end - start)`.
    #[error(
        "channel {channel}, bar {bar}, note starting at {note_start}: pins must start at 0, \
         end at {expected_end}, and strictly increase in time"
    )]
    InvalidPins {
        channel: usize,
        bar: usize,
        note_start: u32,
        expected_end: u32,
    },

    /// A note referenced an instrument index the channel doesn't have.
    #[error("channel {channel}: note references instrument {instrument}, but channel only has {instrument_count}")]
    UnknownInstrument {
        channel: usize,
        instrument: usize,
        instrument_count: usize,
    },

    /// A pattern slot referenced a pattern index that doesn't exist.
    #[error("channel {channel}, bar {bar}: pattern index {pattern} out of range ({pattern_count} patterns)")]
    UnknownPattern {
        channel: usize,
        bar: usize,
        pattern: usize,
        pattern_count: usize,
    },

    /// A modulation instrument targets a channel/instrument pair that
    /// doesn't exist.
    #[error("modulation instrument on channel {channel} targets unknown channel {target_channel}")]
    InvalidModTarget {
        channel: usize,
        target_channel: usize,
    },

    /// The loop region extends past the song's bar count.
    #[error("loop region [{loop_start}, {loop_start}+{loop_length}) exceeds bar count {bar_count}")]
    LoopOutOfRange {
        loop_start: u32,
        loop_length: u32,
        bar_count: u32,
    },

    /// A required timing constant was zero or otherwise nonsensical.
    #[error("invalid timing constants: beats_per_bar={beats_per_bar}, parts_per_beat={parts_per_beat}, ticks_per_part={ticks_per_part}")]
    InvalidTimingConstants {
        beats_per_bar: u32,
        parts_per_beat: u32,
        ticks_per_part: u32,
    },
}
