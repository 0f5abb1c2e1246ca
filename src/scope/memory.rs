use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::control::AtomicF32;

/*
Oscilloscope Memory
===================

A fixed-size ring the audio thread writes every output sample into, and a
display reads the most recent window from. The writer never waits for the
reader; the reader never asks the writer to pause.

    slots:   [ s5 | s6 | s7 | s8 | s4 ]      capacity 4, one spare slot
                                 ^
                          next write (cursor = 9)

    snapshot(3) -> [s6, s7, s8]

Why a spare slot
----------------

The cursor is published after each sample lands. While the writer is storing
sample N, the cursor still says N, and the slot being overwritten belongs to
sample N - (capacity + 1), which is outside every window a reader can ask
for. Without the spare slot, a full-size snapshot could race with that single
in-flight store.

A reader that is slow enough to be lapped during its copy drops the samples
that may have been overwritten from the front of its window. Each sample is a
single atomic, so values are never torn; at worst the window is shorter.
*/

struct Shared {
    slots: Box<[AtomicF32]>,
    capacity: usize,
    written: AtomicU64,
}

impl Shared {
    #[inline]
    fn slot(&self, index: u64) -> &AtomicF32 {
        &self.slots[(index % self.slots.len() as u64) as usize]
    }
}

/// Audio-thread end. Exactly one writer exists per memory.
pub struct MemoryWriter {
    shared: Arc<Shared>,
    cursor: u64,
}

/// Display end. Clone freely.
#[derive(Clone)]
pub struct MemoryReader {
    shared: Arc<Shared>,
}

/// Allocate a memory holding the last `capacity` samples (at least one).
pub fn memory(capacity: usize) -> (MemoryWriter, MemoryReader) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        slots: (0..=capacity).map(|_| AtomicF32::new(0.0)).collect(),
        capacity,
        written: AtomicU64::new(0),
    });
    (
        MemoryWriter {
            shared: shared.clone(),
            cursor: 0,
        },
        MemoryReader { shared },
    )
}

impl MemoryWriter {
    /// Record one sample. Non-finite samples are stored as silence.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        let sample = if sample.is_finite() { sample } else { 0.0 };
        self.shared.slot(self.cursor).store(sample);
        self.cursor += 1;
        self.shared.written.store(self.cursor, Ordering::Release);
    }

    pub fn write_block(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.write(sample);
        }
    }

    pub fn total_writes(&self) -> u64 {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

impl MemoryReader {
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn total_writes(&self) -> u64 {
        self.shared.written.load(Ordering::Acquire)
    }

    /// The most recent `min(count, total_writes, capacity)` samples, oldest first.
    pub fn snapshot(&self, count: usize) -> Vec<f32> {
        let mut out = vec![0.0; count.min(self.shared.capacity)];
        let len = self.snapshot_into(&mut out);
        out.truncate(len);
        out
    }

    /// Fill `out` with the most recent samples, oldest first. Returns how many
    /// leading entries of `out` are valid.
    pub fn snapshot_into(&self, out: &mut [f32]) -> usize {
        let shared = &*self.shared;
        let end = shared.written.load(Ordering::Acquire);
        let len = (out.len() as u64).min(end).min(shared.capacity as u64);
        let start = end - len;

        for (i, dst) in out[..len as usize].iter_mut().enumerate() {
            *dst = shared.slot(start + i as u64).load();
        }

        // Samples before `safe` may have been overwritten while we copied.
        let after = shared.written.load(Ordering::Acquire);
        let safe = after.saturating_sub(shared.capacity as u64);
        if safe > start {
            let skip = ((safe - start).min(len)) as usize;
            out.copy_within(skip..len as usize, 0);
            return len as usize - skip;
        }
        len as usize
    }

    /// Most recent sample, if anything has been written.
    pub fn latest(&self) -> Option<f32> {
        let end = self.total_writes();
        (end > 0).then(|| self.shared.slot(end - 1).load())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_before_any_write_is_empty() {
        let (_writer, reader) = memory(8);
        assert!(reader.snapshot(4).is_empty());
        assert_eq!(reader.latest(), None);
    }

    #[test]
    fn snapshot_returns_fewer_when_fewer_written() {
        let (mut writer, reader) = memory(8);
        writer.write_block(&[0.1, 0.2, 0.3]);
        assert_eq!(reader.snapshot(5), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn snapshot_returns_most_recent_in_write_order() {
        let (mut writer, reader) = memory(4);
        for i in 0..10 {
            writer.write(i as f32);
        }
        assert_eq!(reader.snapshot(3), vec![7.0, 8.0, 9.0]);
        assert_eq!(reader.snapshot(4), vec![6.0, 7.0, 8.0, 9.0]);
        // Never more than capacity.
        assert_eq!(reader.snapshot(100), vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(reader.latest(), Some(9.0));
    }

    #[test]
    fn snapshot_len_is_min_of_count_and_writes() {
        let capacity = 16;
        for writes in [0usize, 1, 5, 16, 17, 40] {
            let (mut writer, reader) = memory(capacity);
            for i in 0..writes {
                writer.write(i as f32);
            }
            for count in [0usize, 1, 3, 16] {
                let snap = reader.snapshot(count);
                assert_eq!(snap.len(), count.min(writes), "writes={writes} count={count}");
                let expected: Vec<f32> =
                    (writes - snap.len()..writes).map(|i| i as f32).collect();
                assert_eq!(snap, expected);
            }
        }
    }

    #[test]
    fn non_finite_samples_become_silence() {
        let (mut writer, reader) = memory(4);
        writer.write_block(&[f32::NAN, f32::INFINITY, 0.5]);
        assert_eq!(reader.snapshot(3), vec![0.0, 0.0, 0.5]);
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let (mut writer, reader) = memory(0);
        writer.write_block(&[1.0, 2.0]);
        assert_eq!(reader.capacity(), 1);
        assert_eq!(reader.snapshot(4), vec![2.0]);
    }

    #[test]
    fn concurrent_reader_sees_ordered_windows() {
        let (mut writer, reader) = memory(64);
        let handle = std::thread::spawn(move || {
            for i in 0..50_000 {
                writer.write(i as f32);
            }
        });

        let mut buf = [0.0f32; 32];
        for _ in 0..1_000 {
            let len = reader.snapshot_into(&mut buf);
            for pair in buf[..len].windows(2) {
                assert_eq!(pair[1], pair[0] + 1.0, "window out of order: {:?}", &buf[..len]);
            }
        }
        handle.join().unwrap();
        assert_eq!(reader.total_writes(), 50_000);
    }
}
