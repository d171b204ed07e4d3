//! Building and running a per-instrument effects chain from its authored
//! [`EffectConfig`] list (spec §4.8 "Effects Chain").

use cadence_core::biquad::{rbj_coefficients, BiquadCoefficients, FilterKind};
use cadence_song::effect::{EffectConfig, GrainEnvelopeShape as SongGrainShape, PanningMode as SongPanningMode};
use cadence_song::filter::{FilterPointKind, FilterSettings};

use crate::bitcrusher::Bitcrusher;
use crate::chorus::Chorus;
use crate::distortion::Distortion;
use crate::echo::Echo;
use crate::eq_filter::EqFilter;
use crate::flanger::Flanger;
use crate::gain::Gain;
use crate::granular::{GrainEnvelopeShape, Granular};
use crate::panning::{Panning, PanningMode};
use crate::reverb::Reverb;
use crate::ring_mod::RingModulation;
use crate::trait_def::StereoEffect;

fn point_kind_to_filter_kind(kind: FilterPointKind) -> FilterKind {
    match kind {
        FilterPointKind::LowPass => FilterKind::LowPass,
        FilterPointKind::HighPass => FilterKind::HighPass,
        FilterPointKind::PeakingEq => FilterKind::PeakingEq,
        FilterPointKind::LowShelf => FilterKind::LowShelf,
        FilterPointKind::HighShelf => FilterKind::HighShelf,
        FilterPointKind::Notch => FilterKind::Notch,
    }
}

/// Expand authored filter settings into the ordered list of biquad
/// coefficients an [`EqFilter`] chain should load, one per control point.
fn filter_settings_to_coefficients(settings: &FilterSettings) -> Vec<BiquadCoefficients> {
    match settings {
        FilterSettings::Simple { cut, peak } => {
            let q = 0.5 + peak.clamp(0.0, 1.0) * 9.5;
            vec![rbj_coefficients(FilterKind::LowPass, cut.clamp(0.001, 0.499), q, 0.0)]
        }
        FilterSettings::MultiPoint { points, .. } => points
            .iter()
            .map(|p| {
                rbj_coefficients(
                    point_kind_to_filter_kind(p.kind),
                    p.freq.clamp(0.001, 0.499),
                    0.707,
                    p.gain,
                )
            })
            .collect(),
    }
}

fn song_panning_mode(mode: SongPanningMode) -> PanningMode {
    match mode {
        SongPanningMode::ClassicSplit => PanningMode::Split,
        SongPanningMode::SplitWithCrossfeed => PanningMode::Crossfeed,
        SongPanningMode::SumToMono => PanningMode::SumToMono,
    }
}

fn song_grain_shape(shape: SongGrainShape) -> GrainEnvelopeShape {
    match shape {
        SongGrainShape::Parabolic => GrainEnvelopeShape::Parabolic,
        SongGrainShape::RaisedCosineBell => GrainEnvelopeShape::RaisedCosine,
    }
}

/// Ticks-per-second-independent step length used to convert an echo's
/// authored `delay_steps` into a sample count; the caller passes in the
/// tick's actual sample length since that depends on the song's tempo.
pub fn build_effect(config: &EffectConfig, sample_rate: f32, samples_per_step: f32) -> Box<dyn StereoEffect> {
    match config {
        EffectConfig::EqFilter { filter } => {
            let coeffs = filter_settings_to_coefficients(filter);
            let mut eq = EqFilter::new(coeffs.len());
            for (i, c) in coeffs.into_iter().enumerate() {
                eq.load_point_gradient(i, c, 0);
            }
            Box::new(eq)
        }
        EffectConfig::Distortion { drive } => Box::new(Distortion::new(*drive)),
        EffectConfig::Bitcrusher { rate_reduction, scale, fold_level } => {
            Box::new(Bitcrusher::new(*rate_reduction, *scale, *fold_level))
        }
        EffectConfig::Gain { gain_db } => Box::new(Gain::new(*gain_db)),
        EffectConfig::Panning { mode, pan, delay_samples } => {
            Box::new(Panning::new(song_panning_mode(*mode), *pan, *delay_samples as usize))
        }
        EffectConfig::Flanger { rate_hz, depth_samples, feedback, mix } => {
            Box::new(Flanger::new(*rate_hz, *depth_samples, *feedback, *mix, sample_rate))
        }
        EffectConfig::Chorus { rate_hz, depth_samples, mix } => {
            Box::new(Chorus::new(*rate_hz, *depth_samples, *mix, sample_rate))
        }
        EffectConfig::Echo { delay_steps, sustain, ping_pong } => {
            let delay_samples = (*delay_steps * samples_per_step).max(1.0) as usize;
            Box::new(Echo::new(delay_samples, *sustain, *ping_pong > 0.5, sample_rate))
        }
        EffectConfig::Reverb { mix, sustain } => Box::new(Reverb::new(*mix, *sustain, sample_rate)),
        EffectConfig::RingModulation { hz, mix } => Box::new(RingModulation::new(*hz, *mix, sample_rate)),
        EffectConfig::Granular {
            grain_size_seconds,
            grain_range_seconds,
            grain_amount_exponent,
            min_delay_seconds,
            max_delay_seconds,
            envelope_shape,
            mix,
        } => Box::new(Granular::new(
            (*grain_size_seconds * sample_rate) as u32,
            (*grain_range_seconds * sample_rate) as u32,
            *grain_amount_exponent as f32,
            *min_delay_seconds * sample_rate,
            *max_delay_seconds * sample_rate,
            song_grain_shape(*envelope_shape),
            *mix,
        )),
    }
}

/// A linear chain of stereo effects, rebuilt whenever an instrument's
/// authored effect list changes and traversed once per sample thereafter.
pub struct EffectsChain {
    effects: Vec<Box<dyn StereoEffect>>,
    /// Per-effect wet/dry override, driven by an `EffectMix` modulator
    /// (spec §4.4 "Modulation State Tables" per-instrument effect mix). A
    /// slot left `None` runs that effect fully wet, as authored.
    mix_overrides: Vec<Option<f32>>,
}

impl EffectsChain {
    pub fn build(configs: &[EffectConfig], sample_rate: f32, samples_per_step: f32) -> Self {
        let effects: Vec<Box<dyn StereoEffect>> =
            configs.iter().map(|c| build_effect(c, sample_rate, samples_per_step)).collect();
        let mix_overrides = vec![None; effects.len()];
        Self { effects, mix_overrides }
    }

    pub fn empty() -> Self {
        Self { effects: Vec::new(), mix_overrides: Vec::new() }
    }

    /// Crossfade effect `index`'s output against its input for this tick,
    /// in place of the chain's normal fully-wet traversal.
    pub fn set_mix_override(&mut self, index: usize, mix: f32) {
        if let Some(slot) = self.mix_overrides.get_mut(index) {
            *slot = Some(mix.clamp(0.0, 1.0));
        }
    }

    /// Revert effect `index` to its normal fully-wet output.
    pub fn clear_mix_override(&mut self, index: usize) {
        if let Some(slot) = self.mix_overrides.get_mut(index) {
            *slot = None;
        }
    }

    pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let mut out = (l, r);
        for (effect, mix_override) in self.effects.iter_mut().zip(self.mix_overrides.iter()) {
            let dry = out;
            let wet = effect.process(out.0, out.1);
            out = match mix_override {
                Some(mix) => (dry.0 + (wet.0 - dry.0) * mix, dry.1 + (wet.1 - dry.1) * mix),
                None => wet,
            };
        }
        out
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for effect in &mut self.effects {
            effect.set_sample_rate(sample_rate);
        }
    }

    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }

    pub fn latency_samples(&self) -> usize {
        self.effects.iter().map(|e| e.latency_samples()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_passes_signal_through() {
        let mut chain = EffectsChain::empty();
        let (l, r) = chain.process(0.3, -0.3);
        assert!((l - 0.3).abs() < 1e-6 && (r + 0.3).abs() < 1e-6);
    }

    #[test]
    fn chain_of_gains_multiplies_in_sequence() {
        let configs = vec![EffectConfig::Gain { gain_db: 0.0 }, EffectConfig::Gain { gain_db: 0.0 }];
        let mut chain = EffectsChain::build(&configs, 48000.0, 500.0);
        let (l, _) = chain.process(1.0, 1.0);
        assert!((l - 1.0).abs() < 1e-4);
    }

    #[test]
    fn mix_override_crossfades_between_dry_and_wet() {
        let configs = vec![EffectConfig::Gain { gain_db: -120.0 }];
        let mut chain = EffectsChain::build(&configs, 48000.0, 500.0);
        chain.set_mix_override(0, 0.5);
        let (l, _) = chain.process(1.0, 1.0);
        // Gain of -120dB is effectively silent, so a 50% mix should land
        // roughly halfway between the dry 1.0 and the near-zero wet output.
        assert!((l - 0.5).abs() < 0.01);

        chain.clear_mix_override(0);
        let (l, _) = chain.process(1.0, 1.0);
        assert!(l < 0.01);
    }

    #[test]
    fn build_effect_covers_every_config_kind() {
        let configs = vec![
            EffectConfig::EqFilter { filter: FilterSettings::Simple { cut: 0.3, peak: 0.2 } },
            EffectConfig::Distortion { drive: 0.3 },
            EffectConfig::Bitcrusher { rate_reduction: 0.2, scale: 8.0, fold_level: 1.0 },
            EffectConfig::Gain { gain_db: -3.0 },
            EffectConfig::Panning { mode: SongPanningMode::ClassicSplit, pan: 0.0, delay_samples: 0.0 },
            EffectConfig::Flanger { rate_hz: 0.5, depth_samples: 50.0, feedback: 0.3, mix: 0.5 },
            EffectConfig::Chorus { rate_hz: 0.5, depth_samples: 50.0, mix: 0.5 },
            EffectConfig::Echo { delay_steps: 4.0, sustain: 0.5, ping_pong: 0.0 },
            EffectConfig::Reverb { mix: 0.3, sustain: 0.6 },
            EffectConfig::RingModulation { hz: 220.0, mix: 0.5 },
            EffectConfig::Granular {
                grain_size_seconds: 0.02,
                grain_range_seconds: 0.01,
                grain_amount_exponent: 2,
                min_delay_seconds: 0.01,
                max_delay_seconds: 0.1,
                envelope_shape: SongGrainShape::RaisedCosineBell,
                mix: 0.4,
            },
        ];
        let mut chain = EffectsChain::build(&configs, 48000.0, 500.0);
        assert_eq!(chain.effects.len(), configs.len());
        let (l, r) = chain.process(0.2, 0.2);
        assert!(l.is_finite() && r.is_finite());
    }
}
