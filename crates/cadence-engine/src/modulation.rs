//! Modulation value tables and the per-tick evaluator that fills them from
//! `Mod`-kind instrument channels (spec §4.2 "ModulationEvaluator", §4.4
//! "Modulation State Tables").
//!
//! A modulation note's pitch selects a [`ModSlot`] on its channel's `Mod`
//! instrument; the note's pin-interpolated size becomes the value written
//! for that slot's target for as long as the note sounds. Ending the note
//! reverts the target to [`config::MOD_VALUE_UNSET`] unless the target has
//! been placed in the "held" state, either by `forceHoldMods` or by a live
//! user override (spec §6 "Modulator API").

use std::collections::{HashMap, HashSet};

use cadence_song::{ModChannelTarget, ModInstrumentTarget, ModSlot};

use crate::config::MOD_VALUE_UNSET;

/// The fully-resolved destination a modulator slot writes to: song scope,
/// a whole channel's worth of instruments, or one instrument — optionally
/// narrowed to a single filter-morph dot rather than a scalar setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModTarget {
    pub channel: Option<u32>,
    pub instrument: Option<u32>,
    pub setting: u32,
    pub filter_dot: Option<u32>,
}

impl ModTarget {
    pub fn from_slot(slot: &ModSlot, current_pattern_instrument: usize) -> Self {
        let channel = match slot.target_channel {
            ModChannelTarget::Song => None,
            ModChannelTarget::Channel { index } => Some(index),
        };
        let instrument = match slot.target_instrument {
            ModInstrumentTarget::Single { index } => Some(index),
            ModInstrumentTarget::AllInChannel => None,
            ModInstrumentTarget::CurrentPattern => Some(current_pattern_instrument as u32),
        };
        Self {
            channel,
            instrument,
            setting: slot.setting,
            filter_dot: slot.filter_target,
        }
    }

    /// Whether this target edits an individual note-filter control point
    /// rather than a scalar setting or the whole-filter morph (spec §4.2
    /// "first pass plays all modulation tones except dot-X/Y filter-morph
    /// mods; a second pass plays only those").
    pub fn is_filter_dot_edit(&self) -> bool {
        matches!(self.filter_dot, Some(n) if n >= 1)
    }

    /// The semantic setting this target names, for targets that aren't a
    /// filter-dot edit (see [`ModSetting::from_raw`]).
    pub fn setting_kind(&self) -> ModSetting {
        ModSetting::from_raw(self.setting)
    }
}

/// Semantic meaning of a [`ModSlot::setting`] id. The song format leaves
/// `setting` an opaque `u32` (spec §4.4 "Modulation State Tables" names the
/// *kinds* of settings — tempo, song reverb, song EQ, song detune, per-
/// instrument pitch shift/detune/filter/effect-mix — without pinning down
/// wire ids); these are the ids this renderer assigns meaning to. Any id
/// outside this table is carried as [`ModSetting::Unrecognized`] so an
/// unfamiliar slot doesn't panic, it's just inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModSetting {
    Tempo,
    PitchShift,
    Detune,
    NoteFilterCut,
    NoteFilterPeak,
    EffectMix(u8),
    Unrecognized(u32),
}

const TEMPO_ID: u32 = 0;
const PITCH_SHIFT_ID: u32 = 1;
const DETUNE_ID: u32 = 2;
const NOTE_FILTER_CUT_ID: u32 = 3;
const NOTE_FILTER_PEAK_ID: u32 = 4;
const EFFECT_MIX_BASE_ID: u32 = 5;
const EFFECT_MIX_SLOTS: u32 = 16;

impl ModSetting {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            TEMPO_ID => ModSetting::Tempo,
            PITCH_SHIFT_ID => ModSetting::PitchShift,
            DETUNE_ID => ModSetting::Detune,
            NOTE_FILTER_CUT_ID => ModSetting::NoteFilterCut,
            NOTE_FILTER_PEAK_ID => ModSetting::NoteFilterPeak,
            n if n >= EFFECT_MIX_BASE_ID && n < EFFECT_MIX_BASE_ID + EFFECT_MIX_SLOTS => {
                ModSetting::EffectMix((n - EFFECT_MIX_BASE_ID) as u8)
            }
            other => ModSetting::Unrecognized(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            ModSetting::Tempo => TEMPO_ID,
            ModSetting::PitchShift => PITCH_SHIFT_ID,
            ModSetting::Detune => DETUNE_ID,
            ModSetting::NoteFilterCut => NOTE_FILTER_CUT_ID,
            ModSetting::NoteFilterPeak => NOTE_FILTER_PEAK_ID,
            ModSetting::EffectMix(effect) => EFFECT_MIX_BASE_ID + effect as u32,
            ModSetting::Unrecognized(raw) => raw,
        }
    }
}

/// Which of a note-filter's dot-addressed sub-targets a `filter_dot >= 1`
/// value names: dot 0 is reserved for the whole-filter morph (pass 1), so
/// dots are laid out as `[freq(0), gain(0), freq(1), gain(1), ...]` starting
/// at dot 1 (spec §4.4 "dot-X/Y" addressing).
pub fn filter_dot_point(dot: u32) -> (usize, bool) {
    let n = dot.saturating_sub(1);
    ((n / 2) as usize, n % 2 == 1)
}

/// `modValues`/`modInsValues` plus the live-override surface from §6's
/// Modulator API, unified into one table keyed by resolved target.
#[derive(Debug, Default)]
pub struct ModulationTables {
    values: HashMap<ModTarget, f32>,
    /// Targets that should not revert to [`MOD_VALUE_UNSET`] when their
    /// driving note ends this tick (spec §6 `force_hold_mods`, and any
    /// target a user has directly `set_mod_value`d).
    held: HashSet<ModTarget>,
}

impl ModulationTables {
    pub fn get(&self, target: ModTarget) -> f32 {
        self.values.get(&target).copied().unwrap_or(MOD_VALUE_UNSET)
    }

    pub fn is_active(&self, target: ModTarget) -> bool {
        self.values.contains_key(&target)
    }

    pub fn is_any_active(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn set_user(&mut self, target: ModTarget, value: f32) {
        self.values.insert(target, value);
        self.held.insert(target);
    }

    pub fn unset_user(&mut self, target: ModTarget) {
        self.values.remove(&target);
        self.held.remove(&target);
    }

    pub fn force_hold(&mut self, target: ModTarget) {
        self.held.insert(target);
    }

    /// Record that a scheduled mod note claims `target` this tick, with its
    /// current pin-interpolated value. Call once per actively-modulating
    /// target per tick, then [`Self::end_tick`] with the same claimed set.
    pub fn claim(&mut self, target: ModTarget, value: f32) {
        self.values.insert(target, value);
    }

    /// Finish a tick's scheduled pass: any previously-active, non-held
    /// target not claimed this tick reverts to unset (spec §4.4 "a
    /// modulator that stops playing clears its slot next tick unless
    /// held").
    pub fn end_tick(&mut self, claimed_this_tick: &HashSet<ModTarget>) {
        let to_clear: Vec<ModTarget> = self
            .values
            .keys()
            .copied()
            .filter(|t| !claimed_this_tick.contains(t) && !self.held.contains(t))
            .collect();
        for t in to_clear {
            self.values.remove(&t);
        }
    }

    /// Current value of a song-scope setting (e.g. [`ModSetting::Tempo`]),
    /// or `None` if no modulator is currently driving it (spec §4.4
    /// "modValues\[setting\]").
    pub fn active_song_scope(&self, setting: ModSetting) -> Option<f32> {
        let target = ModTarget { channel: None, instrument: None, setting: setting.raw(), filter_dot: None };
        self.is_active(target).then(|| self.get(target))
    }

    /// Current value of a per-instrument setting, preferring a target that
    /// names this exact instrument over one that targets every instrument
    /// on the channel ([`cadence_song::ModInstrumentTarget::AllInChannel`])
    /// (spec §4.4 "modInsValues\[channel\]\[instrument\]\[setting\]").
    pub fn instrument_value(&self, channel: u32, instrument: u32, setting: ModSetting) -> Option<f32> {
        let specific = ModTarget { channel: Some(channel), instrument: Some(instrument), setting: setting.raw(), filter_dot: None };
        if self.is_active(specific) {
            return Some(self.get(specific));
        }
        let all_in_channel = ModTarget { channel: Some(channel), instrument: None, setting: setting.raw(), filter_dot: None };
        self.is_active(all_in_channel).then(|| self.get(all_in_channel))
    }

    /// Current value of a note-filter dot edit (`dot == 0` is the whole-
    /// filter morph; `dot >= 1` is an individual freq/gain control point,
    /// see [`filter_dot_point`]). The authored `setting` id on a dot-
    /// targeting slot carries no meaning beyond distinguishing it from a
    /// scalar setting, so this scans by `(channel, instrument, filter_dot)`
    /// rather than an exact key.
    pub fn instrument_filter_dot(&self, channel: u32, instrument: u32, dot: u32) -> Option<f32> {
        self.values.iter().find_map(|(t, &v)| {
            let scope_matches = t.channel == Some(channel) && (t.instrument == Some(instrument) || t.instrument.is_none());
            (scope_matches && t.filter_dot == Some(dot)).then_some(v)
        })
    }
}
