use crate::MIN_TIME;

/*
Linear ADSR
===========

    level
      1.0 ┐     ╱╲
          │    ╱  ╲_________
      S   │   ╱             ╲
          │  ╱               ╲
      0.0 └─╱─────────────────╲──→ time
           A    D      S       R

Stage durations are in seconds; each sample moves the level by

    step = distance / (seconds × sample_rate)

note_on restarts from zero. note_off releases from wherever the level is,
so an early release does not jump to the sustain level first. Release is
interpolated against a sample count fixed at note_off so it lands exactly
on zero.

Shape changes (set_shape) apply immediately, including to a note that is
already sounding: the engine calls it when a UI edit to an envelope control
reaches the audio thread.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    stage: EnvelopeState,
    level: f32,

    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::adsr(0.01, 0.1, 0.7, 0.3)
    }
}

impl Envelope {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let mut env = Self {
            attack_time: MIN_TIME,
            decay_time: MIN_TIME,
            sustain_level: 1.0,
            release_time: MIN_TIME,
            stage: EnvelopeState::Idle,
            level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        };
        env.set_shape(attack, decay, sustain, release);
        env
    }

    pub fn set_shape(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.attack_time = attack.max(MIN_TIME);
        self.decay_time = decay.max(MIN_TIME);
        self.sustain_level = sustain.clamp(0.0, 1.0);
        self.release_time = release.max(MIN_TIME);
    }

    /// Gate high: restart the attack from zero.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: ramp from the current level to zero.
    pub fn note_off(&mut self, sample_rate: f32) {
        if self.stage == EnvelopeState::Idle {
            return;
        }
        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance one sample and return the new level.
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        match self.stage {
            EnvelopeState::Idle => self.level = 0.0,
            EnvelopeState::Attack => {
                self.level += 1.0 / (self.attack_time * sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                let target = self.sustain_level;
                self.level -= (1.0 - target) / (self.decay_time * sample_rate);
                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Sustain => self.level = self.sustain_level,
            EnvelopeState::Release => {
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);
                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }
        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Advance `samples` samples without producing output.
    pub fn advance(&mut self, samples: usize, sample_rate: f32) -> f32 {
        for _ in 0..samples {
            self.next_sample(sample_rate);
        }
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeState::Idle
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    #[test]
    fn attack_reaches_full_level() {
        let mut env = Envelope::adsr(0.01, 0.1, 0.7, 0.2);
        env.note_on();
        env.advance((0.01 * SAMPLE_RATE) as usize, SAMPLE_RATE);
        assert!(env.level() > 0.99, "expected attack to reach full level");
        assert_ne!(env.state(), EnvelopeState::Attack);
    }

    #[test]
    fn settles_at_sustain() {
        let mut env = Envelope::adsr(0.01, 0.05, 0.6, 0.2);
        env.note_on();
        env.advance(200, SAMPLE_RATE);
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert!((env.level() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn release_reaches_idle() {
        let mut env = Envelope::adsr(0.01, 0.01, 0.5, 0.1);
        env.note_on();
        env.advance(100, SAMPLE_RATE);
        env.note_off(SAMPLE_RATE);
        env.advance((0.1 * SAMPLE_RATE) as usize + 1, SAMPLE_RATE);
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert_eq!(env.level(), 0.0);
        assert!(!env.is_active());
    }

    #[test]
    fn early_release_starts_from_current_level() {
        let mut env = Envelope::adsr(0.1, 0.1, 0.5, 0.1);
        env.note_on();
        env.advance(20, SAMPLE_RATE);
        let level = env.level();
        env.note_off(SAMPLE_RATE);
        let first = env.next_sample(SAMPLE_RATE);
        assert!((first - level).abs() < 1e-6);
    }

    #[test]
    fn note_off_when_idle_is_ignored() {
        let mut env = Envelope::default();
        env.note_off(SAMPLE_RATE);
        assert_eq!(env.state(), EnvelopeState::Idle);
    }
}
