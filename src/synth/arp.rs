//! Arpeggiator: turns held keys into a stepped note sequence.

/*
Step Timing
===========

One step lasts `sample_rate / rate_hz` samples. The step's note starts at the
step boundary and stops once `gate` of the step has elapsed:

    step        |-----------------|-----------------|
    gate 0.5    |########         |########         |
    note        60                64

The engine asks for `samples_until_event` and splits its block there, so note
starts and stops land on the exact sample regardless of block size.
*/

/// Keys tracked at once; presses beyond this are ignored.
pub const MAX_HELD_NOTES: usize = 16;

/// Fastest step rate, relative to the sample rate.
const MAX_RATE_RATIO: f32 = 0.25;
const MIN_RATE_HZ: f32 = 0.01;
const MIN_GATE: f32 = 0.01;
const MAX_OCTAVES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpPattern {
    Up,
    Down,
    UpDown,
    AsPlayed,
    Random,
}

impl ArpPattern {
    /// Pattern selected by a stepped control value, wrapping past the end.
    pub fn from_index(index: usize) -> Self {
        match index % 5 {
            0 => ArpPattern::Up,
            1 => ArpPattern::Down,
            2 => ArpPattern::UpDown,
            3 => ArpPattern::AsPlayed,
            _ => ArpPattern::Random,
        }
    }
}

/// Per-block arpeggiator settings, already resolved from controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArpSettings {
    /// Steps per second.
    pub rate_hz: f32,
    /// Fraction of each step the note is held.
    pub gate: f32,
    /// Octaves the held chord is repeated over.
    pub octaves: usize,
    pub pattern: ArpPattern,
}

impl ArpSettings {
    fn step_samples(&self, sample_rate: f32) -> f32 {
        let rate = if self.rate_hz.is_finite() {
            self.rate_hz
                .clamp(MIN_RATE_HZ, sample_rate * MAX_RATE_RATIO)
        } else {
            1.0
        };
        sample_rate / rate
    }

    fn gate_samples(&self, step: f32) -> f32 {
        let gate = if self.gate.is_finite() { self.gate } else { 1.0 };
        step * gate.clamp(MIN_GATE, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

#[derive(Debug, Clone, Copy)]
struct HeldNote {
    note: u8,
    velocity: u8,
}

pub struct Arpeggiator {
    /// Held keys in press order.
    played: Vec<HeldNote>,
    /// Held keys by ascending pitch.
    sorted: Vec<HeldNote>,
    step: usize,
    /// Samples into the current step.
    elapsed: f32,
    /// The current step's note has started.
    fired: bool,
    sounding: Option<u8>,
    rng: u32,
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self::new()
    }
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self {
            played: Vec::with_capacity(MAX_HELD_NOTES),
            sorted: Vec::with_capacity(MAX_HELD_NOTES),
            step: 0,
            elapsed: 0.0,
            fired: false,
            sounding: None,
            rng: 0x9E37_79B9,
        }
    }

    pub fn press(&mut self, note: u8, velocity: u8) {
        if let Some(held) = self.played.iter_mut().find(|h| h.note == note) {
            held.velocity = velocity;
            if let Some(held) = self.sorted.iter_mut().find(|h| h.note == note) {
                held.velocity = velocity;
            }
            return;
        }
        if self.played.len() >= MAX_HELD_NOTES {
            return;
        }
        if self.played.is_empty() {
            self.restart();
        }
        let held = HeldNote { note, velocity };
        self.played.push(held);
        let at = self.sorted.partition_point(|h| h.note < note);
        self.sorted.insert(at, held);
    }

    pub fn release(&mut self, note: u8) {
        self.played.retain(|h| h.note != note);
        self.sorted.retain(|h| h.note != note);
    }

    /// Forget every key. A sounding note still gets its `NoteOff` from `poll`.
    pub fn release_all(&mut self) {
        self.played.clear();
        self.sorted.clear();
    }

    /// Forget everything, including the sounding note.
    pub fn reset(&mut self) {
        self.release_all();
        self.sounding = None;
        self.restart();
    }

    pub fn held_count(&self) -> usize {
        self.played.len()
    }

    pub fn sounding(&self) -> Option<u8> {
        self.sounding
    }

    /// Next event due at the current position, if any. Call until `None`.
    pub fn poll(&mut self, settings: &ArpSettings, sample_rate: f32) -> Option<ArpEvent> {
        if self.played.is_empty() {
            self.restart();
            return self.sounding.take().map(|note| ArpEvent::NoteOff { note });
        }

        let step = settings.step_samples(sample_rate);
        let gate = settings.gate_samples(step);
        if self.elapsed >= step {
            self.elapsed = (self.elapsed - step) % step;
            self.step = self.step.wrapping_add(1);
            self.fired = false;
        }

        if let Some(note) = self.sounding {
            // A full-length gate runs into the next step's boundary.
            if self.elapsed >= gate || !self.fired {
                self.sounding = None;
                return Some(ArpEvent::NoteOff { note });
            }
            return None;
        }

        if !self.fired && self.elapsed < gate {
            self.fired = true;
            let held = self.note_for_step(settings);
            self.sounding = Some(held.note);
            return Some(ArpEvent::NoteOn {
                note: held.note,
                velocity: held.velocity,
            });
        }
        None
    }

    /// Samples from the current position to the next event (at least 1).
    /// `usize::MAX` when nothing is held.
    pub fn samples_until_event(&self, settings: &ArpSettings, sample_rate: f32) -> usize {
        if self.played.is_empty() {
            return usize::MAX;
        }
        let step = settings.step_samples(sample_rate);
        let target = if self.sounding.is_some() {
            settings.gate_samples(step).min(step)
        } else {
            step
        };
        (target - self.elapsed).ceil().max(1.0) as usize
    }

    pub fn advance(&mut self, samples: usize) {
        if !self.played.is_empty() {
            self.elapsed += samples as f32;
        }
    }

    fn restart(&mut self) {
        self.step = 0;
        self.elapsed = 0.0;
        self.fired = false;
    }

    fn note_for_step(&mut self, settings: &ArpSettings) -> HeldNote {
        let count = self.sorted.len();
        let len = count * settings.octaves.clamp(1, MAX_OCTAVES);
        let index = match settings.pattern {
            ArpPattern::Up | ArpPattern::AsPlayed => self.step % len,
            ArpPattern::Down => len - 1 - self.step % len,
            ArpPattern::UpDown if len < 2 => 0,
            ArpPattern::UpDown => {
                let period = 2 * len - 2;
                let k = self.step % period;
                if k < len {
                    k
                } else {
                    period - k
                }
            }
            ArpPattern::Random => self.next_random() as usize % len,
        };

        let source = match settings.pattern {
            ArpPattern::AsPlayed => &self.played,
            _ => &self.sorted,
        };
        let held = source[index % count];
        let octave = (index / count) as u32;
        HeldNote {
            note: (held.note as u32 + 12 * octave).min(127) as u8,
            velocity: held.velocity,
        }
    }

    // xorshift32
    fn next_random(&mut self) -> u32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn settings(pattern: ArpPattern, octaves: usize) -> ArpSettings {
        ArpSettings {
            rate_hz: 100.0,
            gate: 0.5,
            octaves,
            pattern,
        }
    }

    /// Notes started over `steps` steps.
    fn run(arp: &mut Arpeggiator, settings: &ArpSettings, steps: usize) -> Vec<u8> {
        let mut notes = Vec::new();
        let mut remaining = steps * 10;
        while remaining > 0 {
            while let Some(event) = arp.poll(settings, SAMPLE_RATE) {
                if let ArpEvent::NoteOn { note, .. } = event {
                    notes.push(note);
                }
            }
            let n = arp
                .samples_until_event(settings, SAMPLE_RATE)
                .min(remaining);
            arp.advance(n);
            remaining -= n;
        }
        notes
    }

    fn chord(arp: &mut Arpeggiator, notes: &[u8]) {
        for &note in notes {
            arp.press(note, 100);
        }
    }

    #[test]
    fn up_spans_octaves() {
        let mut arp = Arpeggiator::new();
        chord(&mut arp, &[64, 60, 67]);
        assert_eq!(
            run(&mut arp, &settings(ArpPattern::Up, 2), 7),
            vec![60, 64, 67, 72, 76, 79, 60]
        );
    }

    #[test]
    fn down_and_up_down() {
        let mut arp = Arpeggiator::new();
        chord(&mut arp, &[60, 64, 67]);
        assert_eq!(
            run(&mut arp, &settings(ArpPattern::Down, 1), 4),
            vec![67, 64, 60, 67]
        );

        let mut arp = Arpeggiator::new();
        chord(&mut arp, &[60, 64, 67]);
        assert_eq!(
            run(&mut arp, &settings(ArpPattern::UpDown, 1), 6),
            vec![60, 64, 67, 64, 60, 64]
        );
    }

    #[test]
    fn as_played_keeps_press_order() {
        let mut arp = Arpeggiator::new();
        chord(&mut arp, &[67, 60, 64]);
        assert_eq!(
            run(&mut arp, &settings(ArpPattern::AsPlayed, 1), 4),
            vec![67, 60, 64, 67]
        );
    }

    #[test]
    fn random_stays_within_held_notes() {
        let mut arp = Arpeggiator::new();
        chord(&mut arp, &[60, 62]);
        let notes = run(&mut arp, &settings(ArpPattern::Random, 2), 50);
        assert_eq!(notes.len(), 50);
        assert!(notes.iter().all(|n| [60, 62, 72, 74].contains(n)));
    }

    #[test]
    fn gate_sets_note_length() {
        let mut arp = Arpeggiator::new();
        arp.press(60, 90);
        let settings = ArpSettings {
            gate: 0.25,
            ..settings(ArpPattern::Up, 1)
        };
        let sample_rate = 4_000.0;

        assert_eq!(
            arp.poll(&settings, sample_rate),
            Some(ArpEvent::NoteOn {
                note: 60,
                velocity: 90
            })
        );
        assert_eq!(arp.poll(&settings, sample_rate), None);
        assert_eq!(arp.samples_until_event(&settings, sample_rate), 10);
        arp.advance(10);
        assert_eq!(
            arp.poll(&settings, sample_rate),
            Some(ArpEvent::NoteOff { note: 60 })
        );
        assert_eq!(arp.samples_until_event(&settings, sample_rate), 30);
    }

    #[test]
    fn full_gate_ties_into_next_step() {
        let mut arp = Arpeggiator::new();
        chord(&mut arp, &[60, 64]);
        let settings = ArpSettings {
            gate: 1.0,
            ..settings(ArpPattern::Up, 1)
        };
        arp.poll(&settings, SAMPLE_RATE);
        arp.advance(10);
        assert_eq!(
            arp.poll(&settings, SAMPLE_RATE),
            Some(ArpEvent::NoteOff { note: 60 })
        );
        assert_eq!(
            arp.poll(&settings, SAMPLE_RATE),
            Some(ArpEvent::NoteOn {
                note: 64,
                velocity: 100
            })
        );
    }

    #[test]
    fn releasing_every_key_stops_the_note() {
        let mut arp = Arpeggiator::new();
        arp.press(60, 100);
        let settings = settings(ArpPattern::Up, 1);
        arp.poll(&settings, SAMPLE_RATE);
        arp.release(60);
        assert_eq!(
            arp.poll(&settings, SAMPLE_RATE),
            Some(ArpEvent::NoteOff { note: 60 })
        );
        assert_eq!(arp.poll(&settings, SAMPLE_RATE), None);
        assert_eq!(arp.samples_until_event(&settings, SAMPLE_RATE), usize::MAX);
    }

    #[test]
    fn repeated_press_is_one_key() {
        let mut arp = Arpeggiator::new();
        arp.press(60, 10);
        arp.press(60, 120);
        assert_eq!(arp.held_count(), 1);
        assert_eq!(
            arp.poll(&settings(ArpPattern::Up, 1), SAMPLE_RATE),
            Some(ArpEvent::NoteOn {
                note: 60,
                velocity: 120
            })
        );
    }

    #[test]
    fn pattern_index_wraps() {
        assert_eq!(ArpPattern::from_index(2), ArpPattern::UpDown);
        assert_eq!(ArpPattern::from_index(5), ArpPattern::Up);
    }
}
