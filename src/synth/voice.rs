use crate::dsp::{
    envelope::Envelope,
    filter::SVFilter,
    oscillator::{midi_note_to_freq, Oscillator, Waveform},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Active,    // Key held
    Releasing, // Key released, amp envelope in release
}

/// Per-block settings for one voice, already modulated for that voice.
#[derive(Debug, Clone, Copy)]
pub struct VoiceParams {
    pub waveform: Waveform,
    /// Pitch offset in semitones (tune + bend).
    pub transpose: f32,
    pub cutoff_hz: f32,
    pub resonance: f32,
}

/// Oscillator → lowpass → amp envelope, plus the voice's modulation envelope.
pub struct Voice {
    note: u8,
    velocity: u8,
    state: VoiceState,
    age: u64,
    osc: Oscillator,
    filter: SVFilter,
    amp: Envelope,
    mod_env: Envelope,
}

impl Voice {
    pub fn new(amp: Envelope, mod_env: Envelope) -> Self {
        Self {
            note: 0,
            velocity: 0,
            state: VoiceState::Free,
            age: 0,
            osc: Oscillator::new(),
            filter: SVFilter::new(),
            amp,
            mod_env,
        }
    }

    pub fn start(&mut self, note: u8, velocity: u8, age: u64) {
        if self.state == VoiceState::Free {
            self.osc.reset();
            self.filter.reset();
        }
        self.note = note;
        self.velocity = velocity;
        self.state = VoiceState::Active;
        self.age = age;
        self.amp.note_on();
        self.mod_env.note_on();
    }

    pub fn release(&mut self, sample_rate: f32) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.amp.note_off(sample_rate);
            self.mod_env.note_off(sample_rate);
        }
    }

    /// Render (overwriting `out`), then free the voice once its release ends.
    pub fn render(&mut self, out: &mut [f32], params: &VoiceParams, sample_rate: f32) {
        let frequency = midi_note_to_freq(self.note as f32 + params.transpose);
        let gain = self.velocity as f32 / 127.0;
        let (g, k) = SVFilter::coefficients(params.cutoff_hz, params.resonance, sample_rate);

        for sample in out.iter_mut() {
            let raw = self.osc.next_sample(params.waveform, frequency, sample_rate);
            let filtered = self.filter.next_sample(raw, g, k).lowpass;
            *sample = filtered * self.amp.next_sample(sample_rate) * gain;
        }

        if self.state == VoiceState::Releasing && !self.amp.is_active() {
            self.free();
        }
    }

    /// Advance the modulation envelope across a block and return its level.
    pub fn advance_mod_env(&mut self, samples: usize, sample_rate: f32) -> f32 {
        self.mod_env.advance(samples, sample_rate)
    }

    pub fn amp_envelope_mut(&mut self) -> &mut Envelope {
        &mut self.amp
    }

    pub fn mod_envelope_mut(&mut self) -> &mut Envelope {
        &mut self.mod_env
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VoiceState::Active | VoiceState::Releasing)
    }

    pub fn free(&mut self) {
        self.state = VoiceState::Free;
        self.note = 0;
        self.velocity = 0;
        self.amp.reset();
        self.mod_env.reset();
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }
}
