/// Note events sent from the control thread to the engine over an `rtrb` ring.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    PitchBend { cents: f32 },
    AllNotesOff,
}
