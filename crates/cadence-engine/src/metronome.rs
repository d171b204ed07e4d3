//! MetronomeGenerator: an optional short click tone at each beat boundary,
//! mixed directly into the master output rather than any channel (spec §6
//! "Observability" lists the metronome as a renderer-level toggle, not an
//! authored channel).

const CLICK_FREQ_HZ: f32 = 1800.0;

pub struct MetronomeGenerator {
    enabled: bool,
    click_length_samples: u32,
    samples_remaining: u32,
    phase: f32,
    phase_delta: f32,
}

impl MetronomeGenerator {
    pub fn new(sample_rate: f32) -> Self {
        let click_length_samples =
            (crate::config::METRONOME_CLICK_SAMPLES_AT_48K as f32 * sample_rate / 48000.0) as u32;
        Self {
            enabled: false,
            click_length_samples: click_length_samples.max(1),
            samples_remaining: 0,
            phase: 0.0,
            phase_delta: CLICK_FREQ_HZ / sample_rate,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.click_length_samples =
            (crate::config::METRONOME_CLICK_SAMPLES_AT_48K as f32 * sample_rate / 48000.0).max(1.0) as u32;
        self.phase_delta = CLICK_FREQ_HZ / sample_rate;
    }

    /// Trigger a click burst, e.g. when the scheduler crosses a beat
    /// boundary.
    pub fn trigger(&mut self) {
        if self.enabled {
            self.samples_remaining = self.click_length_samples;
            self.phase = 0.0;
        }
    }

    /// One sample of click output (mono; caller sums into both channels).
    pub fn next_sample(&mut self) -> f32 {
        if self.samples_remaining == 0 {
            return 0.0;
        }
        let t = self.samples_remaining as f32 / self.click_length_samples as f32;
        let envelope = t * t;
        let sample = libm::sinf(self.phase * core::f32::consts::TAU) * envelope;
        self.phase = (self.phase + self.phase_delta).fract();
        self.samples_remaining -= 1;
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_metronome_stays_silent_after_trigger() {
        let mut m = MetronomeGenerator::new(48000.0);
        m.trigger();
        for _ in 0..100 {
            assert_eq!(m.next_sample(), 0.0);
        }
    }

    #[test]
    fn enabled_metronome_produces_a_decaying_click() {
        let mut m = MetronomeGenerator::new(48000.0);
        m.set_enabled(true);
        m.trigger();
        let first = m.next_sample();
        assert!(first.is_finite());
        for _ in 0..m.click_length_samples {
            m.next_sample();
        }
        assert_eq!(m.next_sample(), 0.0);
    }
}
