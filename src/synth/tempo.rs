/// Musical note length as a rational fraction of a whole note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteValue {
    /// Numerator: how many parts
    pub numerator: u32,
    /// Denominator: of what size (4 = quarter, 8 = eighth, etc.)
    pub denominator: u32,
}

impl NoteValue {
    pub const WHOLE: NoteValue = NoteValue::new(1, 1);
    pub const HALF: NoteValue = NoteValue::new(1, 2);
    pub const QUARTER: NoteValue = NoteValue::new(1, 4);
    pub const EIGHTH: NoteValue = NoteValue::new(1, 8);
    pub const SIXTEENTH: NoteValue = NoteValue::new(1, 16);
    pub const THIRTY_SECOND: NoteValue = NoteValue::new(1, 32);
    pub const SIXTY_FOURTH: NoteValue = NoteValue::new(1, 64);

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        NoteValue {
            numerator,
            denominator,
        }
    }

    /// Apply a dot: multiply duration by 3/2
    pub const fn dotted(self) -> Self {
        NoteValue {
            numerator: self.numerator * 3,
            denominator: self.denominator * 2,
        }
    }

    /// Three notes in the time of two: multiply duration by 2/3
    pub const fn triplet(self) -> Self {
        NoteValue {
            numerator: self.numerator * 2,
            denominator: self.denominator * 3,
        }
    }

    /// Length in quarter-note beats.
    pub fn beats(&self) -> f32 {
        (self.numerator * 4) as f32 / self.denominator as f32
    }

    /// Repetitions per second at `bpm` quarter notes per minute.
    pub fn hz_at(&self, bpm: f32) -> f32 {
        bpm / 60.0 / self.beats()
    }
}

/// Divisions selectable from a stepped tempo control, longest first.
pub const TEMPO_DIVISIONS: [NoteValue; 9] = [
    NoteValue::new(4, 1),
    NoteValue::new(2, 1),
    NoteValue::WHOLE,
    NoteValue::HALF,
    NoteValue::QUARTER,
    NoteValue::EIGHTH,
    NoteValue::SIXTEENTH,
    NoteValue::THIRTY_SECOND,
    NoteValue::SIXTY_FOURTH,
];

/// How a rate is chosen: free running in Hz, or locked to the tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStyle {
    Free,
    Tempo,
    Dotted,
    Triplet,
}

impl SyncStyle {
    /// Style selected by a stepped control value; out of range is `Free`.
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => SyncStyle::Tempo,
            2 => SyncStyle::Dotted,
            3 => SyncStyle::Triplet,
            _ => SyncStyle::Free,
        }
    }

    /// Rate in Hz: `free_hz` when free running, otherwise `division` (an
    /// index into [`TEMPO_DIVISIONS`], clamped) at `bpm`.
    pub fn rate(self, free_hz: f32, bpm: f32, division: usize) -> f32 {
        let value = TEMPO_DIVISIONS[division.min(TEMPO_DIVISIONS.len() - 1)];
        match self {
            SyncStyle::Free => free_hz,
            SyncStyle::Tempo => value.hz_at(bpm),
            SyncStyle::Dotted => value.dotted().hz_at(bpm),
            SyncStyle::Triplet => value.triplet().hz_at(bpm),
        }
    }
}
