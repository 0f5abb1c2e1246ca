use rtrb::{Consumer, Producer, RingBuffer};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    control::{channel, ControlId, ControlRegistry, ParamReceiver, ParamSender},
    dsp::{
        envelope::Envelope,
        filter::normalized_to_cutoff,
        lfo::{Lfo, LFO_WAVEFORMS},
        oscillator::Waveform,
    },
    error::Result,
    io::AudioOutput,
    manifest::synth_manifest,
    modulation::{ModulationManager, ModulationReader, OutputRegistry, SourceId},
    scope::{memory, MemoryReader, MemoryWriter},
    synth::{
        arp::{ArpEvent, ArpPattern, ArpSettings, Arpeggiator},
        message::SynthMessage,
        poly::VoicePool,
        tempo::SyncStyle,
        voice::{Voice, VoiceParams},
    },
    MAX_BLOCK_SIZE, MAX_VOICES,
};

/*
Processing Block
================

Every block runs the same fixed sequence on the audio thread:

  1. note messages        rtrb ring from the control thread
  2. parameter changes    dirty controls since the last block
  3. latch routing        one RoutingTable for the whole block
  4. sources              in the table's evaluation order
  5. voices               effective values per voice, render, sum
  6. output               volume, sanitize, copy into the scope memory

With `arp_on` set, keys go to the arpeggiator instead of the voices, and
steps 4 and 5 run once per segment between arpeggiator events so its notes
start and stop on the exact sample.

Sources are evaluated before any voice reads a destination, and in an order
where a source that modulates another source's rate runs first. Nothing in
the sequence allocates, locks, or waits on the control thread.
*/

/// Oscillator shapes selectable from `osc_waveform`, in control order.
const OSC_WAVEFORMS: [Waveform; 3] = [Waveform::Sine, Waveform::Saw, Waveform::Square];

/// Per-voice gain so a full chord stays below clipping.
const VOICE_HEADROOM: f32 = 0.25;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub voices: usize,
    /// Frames rendered per `process_block` call.
    pub block_size: usize,
    pub channels: usize,
    /// Samples kept for the oscilloscope.
    pub scope_capacity: usize,
    /// Capacity of the note message ring.
    pub note_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            voices: 8,
            block_size: 256,
            channels: 2,
            scope_capacity: 512,
            note_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn voices(mut self, voices: usize) -> Self {
        self.voices = voices;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn scope_capacity(mut self, capacity: usize) -> Self {
        self.scope_capacity = capacity;
        self
    }

    /// Pull every field into a range the engine can run with.
    fn sanitized(mut self) -> Self {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            self.sample_rate = EngineConfig::default().sample_rate;
        }
        self.voices = self.voices.clamp(1, MAX_VOICES);
        self.block_size = self.block_size.clamp(1, MAX_BLOCK_SIZE);
        self.channels = self.channels.max(1);
        self.scope_capacity = self.scope_capacity.max(1);
        self.note_capacity = self.note_capacity.max(1);
        self
    }
}

/// Control-thread side of an engine: everything a UI needs to drive it.
pub struct EngineHandles {
    pub params: ParamSender,
    pub notes: Producer<SynthMessage>,
    pub modulation: ModulationManager,
    pub scope: MemoryReader,
}

struct ControlIds {
    volume: ControlId,
    osc_waveform: ControlId,
    osc_tune: ControlId,
    filter_cutoff: ControlId,
    filter_resonance: ControlId,
    amp: [ControlId; 4],
    env1: [ControlId; 4],
    arp: ArpIds,
}

struct ArpIds {
    on: ControlId,
    frequency: ControlId,
    gate: ControlId,
    octaves: ControlId,
    pattern: ControlId,
    sync: ControlId,
    tempo: ControlId,
    bpm: ControlId,
}

impl ControlIds {
    fn resolve(controls: &ControlRegistry) -> Result<Self> {
        let adsr = |prefix: &str| -> Result<[ControlId; 4]> {
            Ok([
                controls.id(&format!("{prefix}_attack"))?,
                controls.id(&format!("{prefix}_decay"))?,
                controls.id(&format!("{prefix}_sustain"))?,
                controls.id(&format!("{prefix}_release"))?,
            ])
        };
        Ok(Self {
            volume: controls.id("volume")?,
            osc_waveform: controls.id("osc_waveform")?,
            osc_tune: controls.id("osc_tune")?,
            filter_cutoff: controls.id("filter_cutoff")?,
            filter_resonance: controls.id("filter_resonance")?,
            amp: adsr("amp")?,
            env1: adsr("env1")?,
            arp: ArpIds {
                on: controls.id("arp_on")?,
                frequency: controls.id("arp_frequency")?,
                gate: controls.id("arp_gate")?,
                octaves: controls.id("arp_octaves")?,
                pattern: controls.id("arp_pattern")?,
                sync: controls.id("arp_sync")?,
                tempo: controls.id("arp_tempo")?,
                bpm: controls.id("beats_per_minute")?,
            },
        })
    }
}

/// How the engine computes each declared source.
enum SourceProcessor {
    Lfo {
        lfo: Lfo,
        frequency: ControlId,
        waveform: ControlId,
    },
    Envelope,
    Velocity,
    KeyTrack,
    /// Declared but not computed by this engine; stays at zero.
    Idle,
}

pub struct SynthEngine {
    config: EngineConfig,
    params: ParamReceiver,
    notes: Consumer<SynthMessage>,
    modulation: ModulationReader,
    outputs: OutputRegistry,
    scope: MemoryWriter,
    ids: ControlIds,
    processors: Vec<SourceProcessor>,
    voices: VoicePool,
    arp: Arpeggiator,
    arp_enabled: bool,
    last_triggered: Option<usize>,
    bend_cents: f32,
    frame_counter: u64,
    mix_buf: Vec<f32>,
    voice_buf: Vec<f32>,
    lfo_buf: Vec<f32>,
}

fn envelope_from(controls: &ControlRegistry, ids: &[ControlId; 4]) -> Envelope {
    let [a, d, s, r] = ids.map(|id| controls.control(id).map_or(0.0, |c| c.value()));
    Envelope::adsr(a, d, s, r)
}

impl SynthEngine {
    /// Build an engine around the reference synth manifest. The engine goes to
    /// the audio thread; the handles stay with the UI.
    pub fn new(config: EngineConfig) -> Result<(Self, EngineHandles)> {
        let config = config.sanitized();
        let (controls, outputs) = synth_manifest().build(config.voices)?;
        let ids = ControlIds::resolve(&controls)?;

        let mut processors = Vec::with_capacity(outputs.len());
        for (_, source) in outputs.iter() {
            let name = source.name();
            let processor = match name {
                "env1" => SourceProcessor::Envelope,
                "velocity" => SourceProcessor::Velocity,
                "note" => SourceProcessor::KeyTrack,
                _ if name.starts_with("lfo") => SourceProcessor::Lfo {
                    lfo: Lfo::new(),
                    frequency: controls.id(&format!("{name}_frequency"))?,
                    waveform: controls.id(&format!("{name}_waveform"))?,
                },
                _ => SourceProcessor::Idle,
            };
            processors.push(processor);
        }

        let voices = VoicePool::new(
            config.voices,
            &envelope_from(&controls, &ids.amp),
            &envelope_from(&controls, &ids.env1),
        );

        let (param_tx, param_rx) = channel(&controls);
        let (note_tx, note_rx) = RingBuffer::<SynthMessage>::new(config.note_capacity);
        let (scope_tx, scope_rx) = memory(config.scope_capacity);
        let manager = ModulationManager::new(controls, outputs.clone());

        info!(
            sample_rate = config.sample_rate,
            voices = config.voices,
            block_size = config.block_size,
            "engine ready"
        );

        let engine = Self {
            modulation: manager.reader(),
            params: param_rx,
            notes: note_rx,
            outputs,
            scope: scope_tx,
            ids,
            processors,
            voices,
            arp: Arpeggiator::new(),
            arp_enabled: false,
            last_triggered: None,
            bend_cents: 0.0,
            frame_counter: 0,
            mix_buf: vec![0.0; config.block_size],
            voice_buf: vec![0.0; MAX_BLOCK_SIZE],
            lfo_buf: vec![0.0; MAX_BLOCK_SIZE],
            config,
        };
        let handles = EngineHandles {
            params: param_tx,
            notes: note_tx,
            modulation: manager,
            scope: scope_rx,
        };
        Ok((engine, handles))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn active_voices(&self) -> usize {
        self.voices.active_count()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame_counter
    }

    /// Render one configured block into every output channel.
    pub fn process_block(&mut self, output: &mut AudioOutput) {
        let frames = self.config.block_size;
        let mut mix = std::mem::take(&mut self.mix_buf);
        self.render_block(&mut mix[..frames]);

        // Only the first call (or a caller-changed shape) allocates.
        output.buffers.resize_with(self.config.channels, Vec::new);
        for channel in output.buffers.iter_mut() {
            channel.clear();
            channel.extend_from_slice(&mix[..frames]);
        }
        self.mix_buf = mix;
    }

    /// Render mono audio of any length.
    pub fn render_block(&mut self, out: &mut [f32]) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        self.sync_arp_mode();
        self.handle_messages();
        self.apply_param_changes();
        self.modulation.latch();

        let arp = self.arp_enabled.then(|| self.arp_settings());
        let sample_rate = self.config.sample_rate;
        let mut offset = 0;
        while offset < out.len() {
            let mut len = out.len() - offset;
            if let Some(settings) = &arp {
                while let Some(event) = self.arp.poll(settings, sample_rate) {
                    match event {
                        ArpEvent::NoteOn { note, velocity } => self.start_note(note, velocity),
                        ArpEvent::NoteOff { note } => self.release_note(note),
                    }
                }
                len = len.min(self.arp.samples_until_event(settings, sample_rate));
            }
            self.evaluate_sources(len);
            self.render_voices(&mut out[offset..offset + len]);
            self.arp.advance(len);
            offset += len;
        }

        self.scope.write_block(out);
        self.frame_counter += out.len() as u64;
    }

    /// Follow `arp_on`. Notes held under the previous mode are released.
    fn sync_arp_mode(&mut self) {
        let enabled = self
            .params
            .registry()
            .control(self.ids.arp.on)
            .is_some_and(|c| c.value() >= 0.5);
        if enabled != self.arp_enabled {
            self.arp_enabled = enabled;
            self.arp.reset();
            self.voices.release_all(self.config.sample_rate);
            info!(enabled, "arpeggiator switched");
        }
    }

    fn arp_settings(&self) -> ArpSettings {
        let ids = &self.ids.arp;
        let value = |id: ControlId| self.modulation.effective_value(id, None);
        let sync = SyncStyle::from_index(value(ids.sync).round() as usize);
        ArpSettings {
            rate_hz: sync.rate(
                value(ids.frequency),
                value(ids.bpm),
                value(ids.tempo).round() as usize,
            ),
            gate: value(ids.gate),
            octaves: value(ids.octaves).round() as usize,
            pattern: ArpPattern::from_index(value(ids.pattern).round() as usize),
        }
    }

    fn handle_messages(&mut self) {
        while let Ok(msg) = self.notes.pop() {
            match msg {
                SynthMessage::NoteOn { note, velocity: 0 } | SynthMessage::NoteOff { note } => {
                    if self.arp_enabled {
                        self.arp.release(note);
                    } else {
                        self.release_note(note);
                    }
                }
                SynthMessage::NoteOn { note, velocity } => {
                    if self.arp_enabled {
                        self.arp.press(note, velocity);
                    } else {
                        self.start_note(note, velocity);
                    }
                }
                SynthMessage::PitchBend { cents } => {
                    self.bend_cents = if cents.is_finite() {
                        cents.clamp(-2400.0, 2400.0)
                    } else {
                        0.0
                    };
                }
                SynthMessage::AllNotesOff => {
                    self.arp.release_all();
                    self.voices.release_all(self.config.sample_rate);
                }
            }
        }
    }

    fn start_note(&mut self, note: u8, velocity: u8) {
        if let Some(idx) = self.voices.allocate() {
            if let Some(voice) = self.voices.voice_mut(idx) {
                voice.start(note, velocity, self.frame_counter);
                self.last_triggered = Some(idx);
            }
        }
    }

    fn release_note(&mut self, note: u8) {
        if let Some(idx) = self.voices.find_held(note) {
            if let Some(voice) = self.voices.voice_mut(idx) {
                voice.release(self.config.sample_rate);
            }
        }
    }

    /// Rebuild envelope shapes when one of their controls was edited.
    fn apply_param_changes(&mut self) {
        let Self {
            params, ids, voices, ..
        } = self;
        let mut amp_changed = false;
        let mut env1_changed = false;
        params.drain(|change| {
            amp_changed |= ids.amp.contains(&change.id);
            env1_changed |= ids.env1.contains(&change.id);
        });

        let controls = params.registry();
        let value = |id: ControlId| controls.control(id).map_or(0.0, |c| c.value());
        if amp_changed {
            let [a, d, s, r] = ids.amp.map(value);
            for voice in voices.iter_mut() {
                voice.amp_envelope_mut().set_shape(a, d, s, r);
            }
        }
        if env1_changed {
            let [a, d, s, r] = ids.env1.map(value);
            for voice in voices.iter_mut() {
                voice.mod_envelope_mut().set_shape(a, d, s, r);
            }
        }
    }

    fn evaluate_sources(&mut self, len: usize) {
        let sample_rate = self.config.sample_rate;
        for i in 0..self.modulation.source_order().len() {
            let id = self.modulation.source_order()[i];
            let Some(processor) = self.processors.get_mut(id.index()) else {
                continue;
            };
            match processor {
                SourceProcessor::Lfo {
                    lfo,
                    frequency,
                    waveform,
                } => {
                    let hz = self.modulation.effective_value(*frequency, None);
                    let shape = self.modulation.effective_value(*waveform, None).round();
                    let value = lfo.process_block(
                        &mut self.lfo_buf[..len],
                        Waveform::from_index(shape as usize, &LFO_WAVEFORMS),
                        hz,
                        sample_rate,
                    );
                    self.outputs.write_mono(id, value);
                }
                SourceProcessor::Envelope => {
                    for (v, voice) in self.voices.iter_mut().enumerate() {
                        let level = if voice.is_active() {
                            voice.advance_mod_env(len, sample_rate)
                        } else {
                            0.0
                        };
                        self.outputs.write_voice(id, v, level);
                    }
                    self.mirror_last_triggered(id);
                }
                SourceProcessor::Velocity => {
                    self.write_per_voice(id, |voice| voice.velocity() as f32 / 127.0);
                }
                SourceProcessor::KeyTrack => {
                    // Middle C is 0; four octaves either side spans -1..1.
                    self.write_per_voice(id, |voice| (voice.note() as f32 - 60.0) / 48.0);
                }
                SourceProcessor::Idle => {}
            }
        }
    }

    fn write_per_voice(&mut self, id: SourceId, value: impl Fn(&Voice) -> f32) {
        for v in 0..self.voices.len() {
            let level = match self.voices.voice(v) {
                Some(voice) if voice.is_active() => value(voice),
                _ => 0.0,
            };
            self.outputs.write_voice(id, v, level);
        }
        self.mirror_last_triggered(id);
    }

    /// Poly sources meter the most recently triggered voice on their mono cell.
    fn mirror_last_triggered(&self, id: SourceId) {
        if let Some(v) = self.last_triggered {
            if let Some(source) = self.outputs.source(id) {
                self.outputs.write_mono(id, source.voice_value(v));
            }
        }
    }

    fn render_voices(&mut self, out: &mut [f32]) {
        let len = out.len();
        let sample_rate = self.config.sample_rate;
        out.fill(0.0);

        for v in 0..self.voices.len() {
            if !self.voices.voice(v).is_some_and(Voice::is_active) {
                continue;
            }
            let voice_ctx = Some(v);
            let shape = self
                .modulation
                .effective_value(self.ids.osc_waveform, voice_ctx)
                .round();
            let params = VoiceParams {
                waveform: Waveform::from_index(shape as usize, &OSC_WAVEFORMS),
                transpose: self.modulation.effective_value(self.ids.osc_tune, voice_ctx)
                    + self.bend_cents / 100.0,
                cutoff_hz: normalized_to_cutoff(
                    self.modulation
                        .effective_value(self.ids.filter_cutoff, voice_ctx),
                ),
                resonance: self
                    .modulation
                    .effective_value(self.ids.filter_resonance, voice_ctx),
            };

            let buf = &mut self.voice_buf[..len];
            if let Some(voice) = self.voices.voice_mut(v) {
                voice.render(buf, &params, sample_rate);
            }
            for (o, s) in out.iter_mut().zip(buf.iter()) {
                *o += s * VOICE_HEADROOM;
            }
        }

        let volume = self.modulation.effective_value(self.ids.volume, None);
        for sample in out.iter_mut() {
            let scaled = *sample * volume;
            *sample = if scaled.is_finite() {
                scaled.clamp(-1.0, 1.0)
            } else {
                0.0
            };
        }
    }
}
