//! Ring modulation: multiply the signal by a wavetable-driven carrier,
//! fading to dry when the carrier frequency is zero (spec §4.8
//! "Ring modulation").

use cadence_synth::voice::WaveTables;

use crate::trait_def::StereoEffect;

pub struct RingModulation {
    tables: WaveTables,
    phase: f32,
    phase_delta: f32,
    mix: f32,
    sample_rate: f32,
}

impl RingModulation {
    pub fn new(hz: f32, mix: f32, sample_rate: f32) -> Self {
        Self {
            tables: WaveTables::default(),
            phase: 0.0,
            phase_delta: hz / sample_rate,
            mix: mix.clamp(0.0, 1.0),
            sample_rate,
        }
    }

    pub fn set_hz(&mut self, hz: f32) {
        self.phase_delta = hz / self.sample_rate;
    }
}

impl StereoEffect for RingModulation {
    fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
        // hz == 0 is the "off" state: fade entirely back to dry regardless
        // of the authored mix, rather than multiplying by a frozen carrier
        // sample.
        if self.phase_delta == 0.0 {
            return (l, r);
        }

        let carrier = self.tables.sine_at(self.phase);
        self.phase += self.phase_delta;
        self.phase -= libm::floorf(self.phase);

        let modulated_l = l * carrier;
        let modulated_r = r * carrier;
        (l + (modulated_l - l) * self.mix, r + (modulated_r - r) * self.mix)
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let hz = self.phase_delta * self.sample_rate;
        self.sample_rate = sample_rate;
        self.set_hz(hz);
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hz_passes_signal_through() {
        let mut rm = RingModulation::new(0.0, 1.0, 48000.0);
        let (l, r) = rm.process(0.5, -0.5);
        assert!((l - 0.5).abs() < 1e-6);
        assert!((r + 0.5).abs() < 1e-6);
    }

    #[test]
    fn output_stays_within_input_bounds() {
        let mut rm = RingModulation::new(220.0, 1.0, 48000.0);
        for _ in 0..2000 {
            let (l, r) = rm.process(1.0, 1.0);
            assert!(l.abs() <= 1.0001 && r.abs() <= 1.0001);
        }
    }
}
