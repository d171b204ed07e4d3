//! Validation of a [`Song`] against the invariants spec §3 lists for
//! patterns and notes, and the handful of cross-reference invariants that
//! span channels.

use crate::error::SongError;
use crate::song::{ChannelKind, Song};

/// Validate `song`, returning every violation found (not just the first).
///
/// The renderer itself never calls this — per spec §7 it is always total —
/// but a loader should call this before handing a `Song` to the engine so
/// malformed data is rejected at the boundary rather than silently
/// producing unexpected audio.
pub fn validate_song(song: &Song) -> Result<(), Vec<SongError>> {
    let mut errors = Vec::new();

    if song.ticks_per_part == 0 || song.parts_per_beat == 0 || song.beats_per_bar == 0 {
        errors.push(SongError::InvalidTimingConstants {
            beats_per_bar: song.beats_per_bar,
            parts_per_beat: song.parts_per_beat,
            ticks_per_part: song.ticks_per_part,
        });
    }

    if song.loop_start + song.loop_length > song.bar_count {
        errors.push(SongError::LoopOutOfRange {
            loop_start: song.loop_start,
            loop_length: song.loop_length,
            bar_count: song.bar_count,
        });
    }

    let parts_per_bar = song.parts_per_bar();

    for (channel_idx, channel) in song.channels.iter().enumerate() {
        for (bar, slot) in channel.bars.iter().enumerate() {
            let Some(pattern_idx) = slot else { continue };
            if *pattern_idx >= channel.patterns.len() {
                errors.push(SongError::UnknownPattern {
                    channel: channel_idx,
                    bar,
                    pattern: *pattern_idx,
                    pattern_count: channel.patterns.len(),
                });
                continue;
            }
            let pattern = &channel.patterns[*pattern_idx];

            for &instrument_idx in &pattern.instruments {
                if instrument_idx >= channel.instruments.len() {
                    errors.push(SongError::UnknownInstrument {
                        channel: channel_idx,
                        instrument: instrument_idx,
                        instrument_count: channel.instruments.len(),
                    });
                }
            }

            validate_pattern_notes(channel_idx, bar, parts_per_bar, pattern, &mut errors);
        }

        if channel.kind == ChannelKind::Modulation {
            validate_mod_targets(channel_idx, channel, song, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_pattern_notes(
    channel_idx: usize,
    bar: usize,
    parts_per_bar: u32,
    pattern: &crate::pattern::Pattern,
    errors: &mut Vec<SongError>,
) {
    let mut sorted: Vec<&crate::pattern::Note> = pattern.notes.iter().collect();
    sorted.sort_by_key(|n| n.start);

    for window in sorted.windows(2) {
        if window[1].start < window[0].end {
            errors.push(SongError::OverlappingNotes {
                channel: channel_idx,
                bar,
                part: window[1].start,
            });
        }
    }

    for note in &pattern.notes {
        if note.start >= note.end {
            errors.push(SongError::InvalidNoteRange {
                channel: channel_idx,
                bar,
                start: note.start,
                end: note.end,
            });
            continue;
        }
        let _ = parts_per_bar;
        let expected_end = note.end - note.start;
        let pins_valid = !note.pins.is_empty()
            && note.pins.first().map(|p| p.time) == Some(0)
            && note.pins.last().map(|p| p.time) == Some(expected_end)
            && note.pins.windows(2).all(|w| w[0].time < w[1].time);
        if !pins_valid {
            errors.push(SongError::InvalidPins {
                channel: channel_idx,
                bar,
                note_start: note.start,
                expected_end,
            });
        }
    }
}

fn validate_mod_targets(
    channel_idx: usize,
    channel: &crate::song::Channel,
    song: &Song,
    errors: &mut Vec<SongError>,
) {
    use crate::instrument::{InstrumentKind, ModChannelTarget};

    for instrument in &channel.instruments {
        let InstrumentKind::Mod { slots } = &instrument.kind else {
            continue;
        };
        for slot in slots {
            if let ModChannelTarget::Channel { index } = slot.target_channel {
                if index as usize >= song.channels.len() {
                    errors.push(SongError::InvalidModTarget {
                        channel: channel_idx,
                        target_channel: index as usize,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectConfig;
    use crate::filter::FilterSettings;
    use crate::instrument::{Instrument, InstrumentKind, Unison, Vibrato};
    use crate::pattern::{Note, Pattern, Pin};
    use crate::song::{Channel, Key, LimiterSettings, LoopOverride};

    fn minimal_song(notes: Vec<Note>) -> Song {
        let instrument = Instrument {
            kind: InstrumentKind::Chip { wave_id: 0 },
            unison: Unison::default(),
            vibrato: Vibrato::None,
            arpeggio_speed: 0.0,
            fade_in_seconds: 0.0,
            fade_out_ticks: 0,
            envelopes: vec![],
            note_filter: FilterSettings::Simple { cut: 1.0, peak: 0.0 },
            effects: Vec::<EffectConfig>::new(),
            max_chord_size: 1,
        };
        let pattern = Pattern { notes, instruments: vec![0] };
        let channel = Channel {
            kind: ChannelKind::Pitch,
            instruments: vec![instrument],
            patterns: vec![pattern],
            bars: vec![Some(0)],
            muted: false,
        };
        Song {
            channels: vec![channel],
            beats_per_bar: 4,
            ticks_per_part: 6,
            parts_per_beat: 4,
            bar_count: 1,
            loop_start: 0,
            loop_length: 1,
            loop_repeat_count: Some(0),
            tempo_bpm: 120.0,
            key: Key { pitch_class: 0, octave: 0 },
            master_gain: 1.0,
            limiter: LimiterSettings::default(),
            song_eq: FilterSettings::Simple { cut: 1.0, peak: 0.0 },
            loop_override: LoopOverride::default(),
        }
    }

    fn valid_note(start: u32, end: u32) -> Note {
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
    fn valid_song_passes() {
        let song = minimal_song(vec![valid_note(0, 16)]);
        assert!(validate_song(&song).is_ok());
    }

    #[test]
    fn overlapping_notes_rejected() {
        let song = minimal_song(vec![valid_note(0, 8), valid_note(4, 16)]);
        let errors = validate_song(&song).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, SongError::OverlappingNotes { .. })));
    }

    #[test]
    fn missing_last_pin_rejected() {
        let mut note = valid_note(0, 16);
        note.pins.pop();
        let song = minimal_song(vec![note]);
        let errors = validate_song(&song).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, SongError::InvalidPins { .. })));
    }

    #[test]
    fn loop_region_past_bar_count_rejected() {
        let mut song = minimal_song(vec![valid_note(0, 16)]);
        song.loop_length = 5;
        let errors = validate_song(&song).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, SongError::LoopOutOfRange { .. })));
    }
}
