use crate::{
    dsp::envelope::Envelope,
    synth::voice::{Voice, VoiceState},
};

/// Fixed set of voices. Slot indices double as the voice index used by poly
/// modulation, so they never move.
pub struct VoicePool {
    voices: Vec<Voice>,
}

impl VoicePool {
    pub fn new(count: usize, amp: &Envelope, mod_env: &Envelope) -> Self {
        Self {
            voices: (0..count)
                .map(|_| Voice::new(amp.clone(), mod_env.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }

    /// Index of the voice to use for a new note: a free voice first, then the
    /// oldest releasing voice, then the oldest held voice.
    pub fn allocate(&self) -> Option<usize> {
        if let Some(idx) = self.voices.iter().position(Voice::is_free) {
            return Some(idx);
        }

        let oldest_in = |state: VoiceState| {
            self.voices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.state() == state)
                .min_by_key(|(_, v)| v.age())
                .map(|(idx, _)| idx)
        };

        oldest_in(VoiceState::Releasing).or_else(|| oldest_in(VoiceState::Active))
    }

    /// Held voice playing `note`, if any.
    pub fn find_held(&self, note: u8) -> Option<usize> {
        self.voices
            .iter()
            .position(|v| v.note() == note && v.state() == VoiceState::Active)
    }

    pub fn release_all(&mut self, sample_rate: f32) {
        for voice in &mut self.voices {
            voice.release(sample_rate);
        }
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }
}
