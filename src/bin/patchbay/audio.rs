//! cpal output stream driving the engine

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, SupportedStreamConfig};
use tracing::warn;

use patchbay::{io::spread_mono, SynthEngine, MAX_BLOCK_SIZE};

pub struct OutputDevice {
    device: Device,
    config: SupportedStreamConfig,
}

impl OutputDevice {
    pub fn open_default() -> EyreResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;
        Ok(Self { device, config })
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate().0 as f32
    }

    pub fn channels(&self) -> usize {
        self.config.channels() as usize
    }

    /// Move the engine onto the audio thread and start playing.
    pub fn start(self, mut engine: SynthEngine) -> EyreResult<Stream> {
        let channels = self.channels();
        let mut block = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = self.device.build_output_stream(
            &self.config.into(),
            move |data: &mut [f32], _| {
                for frames in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                    let len = frames.len() / channels;
                    let mono = &mut block[..len];
                    engine.render_block(mono);
                    spread_mono(mono, frames, channels);
                }
            },
            |err| warn!(%err, "audio stream error"),
            None,
        )?;

        stream.play()?;
        Ok(stream)
    }
}
