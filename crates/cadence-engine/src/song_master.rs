//! SongMaster: the song-level EQ plus compressor/limiter every channel's
//! mixed output passes through before it reaches the caller's output
//! buffer (spec §4.10 "SongMaster").

use cadence_core::math::flush_denormal;
use cadence_effects::chain::build_effect;
use cadence_effects::trait_def::StereoEffect;
use cadence_song::{EffectConfig, FilterSettings, LimiterSettings};

/// Three-range soft-knee compressor/limiter: below `compression_threshold`
/// peaks pass untouched, between the two thresholds they're compressed by
/// `compression_ratio`, and above `limit_threshold` the steeper
/// `limit_ratio` takes over (spec §4.10 "limitRange"/"limitTarget", ranges
/// 0/1/2).
pub struct Limiter {
    settings: LimiterSettings,
    current_gain: f32,
}

impl Limiter {
    pub fn new(settings: LimiterSettings) -> Self {
        Self { settings, current_gain: 1.0 }
    }

    pub fn set_settings(&mut self, settings: LimiterSettings) {
        self.settings = settings;
    }

    /// Target gain scalar for a single absolute peak sample, not yet
    /// smoothed (spec §4.10 "limitTarget").
    fn target_gain(&self, peak: f32) -> f32 {
        let s = &self.settings;
        if peak <= s.compression_threshold || peak <= 1e-9 {
            return 1.0;
        }
        if peak <= s.limit_threshold {
            let excess = peak - s.compression_threshold;
            let compressed_peak = s.compression_threshold + excess * s.compression_ratio;
            return (compressed_peak / peak).clamp(0.0, 1.0);
        }
        let excess_at_comp = s.limit_threshold - s.compression_threshold;
        let compressed_at_limit = s.compression_threshold + excess_at_comp * s.compression_ratio;
        let excess_over_limit = peak - s.limit_threshold;
        let limited_peak = compressed_at_limit + excess_over_limit * s.limit_ratio;
        (limited_peak / peak).clamp(0.0, 1.0)
    }

    /// Feed one sample's absolute peak and get back the gain scalar to
    /// apply, smoothed toward its target at `rise_rate` when recovering
    /// (gain climbing back to 1.0) or `decay_rate` when clamping down
    /// (gain falling to meet a hot peak) — clamping reacts faster than
    /// recovery so transients never slip through (spec §4.10 "limit
    /// rise/decay approach").
    pub fn process_peak(&mut self, peak: f32) -> f32 {
        let target = self.target_gain(peak.abs());
        let rate = if target < self.current_gain {
            self.settings.decay_rate
        } else {
            self.settings.rise_rate
        };
        let rate = rate.clamp(0.0, 1.0);
        self.current_gain += (target - self.current_gain) * rate;
        self.current_gain
    }

    pub fn reset(&mut self) {
        self.current_gain = 1.0;
    }
}

/// The song-wide EQ + limiter + master gain stage (spec §4.10).
pub struct SongMaster {
    eq: Box<dyn StereoEffect>,
    limiter: Limiter,
    master_gain: f32,
}

impl SongMaster {
    pub fn new(song_eq: &FilterSettings, limiter_settings: LimiterSettings, master_gain: f32, sample_rate: f32) -> Self {
        let eq = build_effect(&EffectConfig::EqFilter { filter: song_eq.clone() }, sample_rate, 1.0);
        Self { eq, limiter: Limiter::new(limiter_settings), master_gain }
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain;
    }

    pub fn set_limiter_settings(&mut self, settings: LimiterSettings) {
        self.limiter.set_settings(settings);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.eq.set_sample_rate(sample_rate);
    }

    pub fn rebuild_eq(&mut self, song_eq: &FilterSettings, sample_rate: f32) {
        self.eq = build_effect(&EffectConfig::EqFilter { filter: song_eq.clone() }, sample_rate, 1.0);
    }

    pub fn reset(&mut self) {
        self.eq.reset();
        self.limiter.reset();
    }

    pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        let (eq_l, eq_r) = self.eq.process(l, r);
        let gained_l = eq_l * self.master_gain;
        let gained_r = eq_r * self.master_gain;
        let peak = gained_l.abs().max(gained_r.abs());
        let gain = self.limiter.process_peak(peak);
        (flush_denormal(gained_l * gain), flush_denormal(gained_r * gain))
    }
}
