// Purpose - host-facing audio buffers

/// Deinterleaved output, one buffer per channel.
#[derive(Debug, Default)]
pub struct AudioOutput {
    pub buffers: Vec<Vec<f32>>,
}

/// Copy mono samples into every channel of an interleaved host buffer.
/// Returns frames written: the shorter of `mono` and the buffer.
pub fn spread_mono(mono: &[f32], interleaved: &mut [f32], channels: usize) -> usize {
    if channels == 0 {
        return 0;
    }
    let mut frames = 0;
    for (frame, &sample) in interleaved.chunks_exact_mut(channels).zip(mono.iter()) {
        frame.fill(sample);
        frames += 1;
    }
    frames
}
