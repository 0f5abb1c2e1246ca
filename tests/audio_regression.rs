use patchbay::{
    io::AudioOutput, synth::SynthMessage, EngineConfig, Notification, SynthEngine, VoiceContext,
};

fn collect(output: &AudioOutput) -> Vec<f32> {
    output
        .buffers
        .iter()
        .flat_map(|c| c.iter())
        .copied()
        .collect()
}

#[test]
fn renders_silence_without_notes() {
    let (mut engine, _handles) = SynthEngine::new(EngineConfig::default()).unwrap();
    let mut output = AudioOutput::default();
    engine.process_block(&mut output);
    let samples = collect(&output);
    assert_eq!(samples.len(), 2 * 256);
    assert!(samples.iter().all(|&s| s == 0.0));
}

#[test]
fn chord_stays_bounded_under_heavy_modulation() {
    let (mut engine, mut handles) = SynthEngine::new(EngineConfig::default()).unwrap();
    let routes = [
        ("lfo1", "filter_cutoff", 5.0, VoiceContext::Mono),
        ("env1", "filter_resonance", 5.0, VoiceContext::Poly),
        ("velocity", "osc_tune", 100.0, VoiceContext::Poly),
        ("lfo2", "volume", 10.0, VoiceContext::Mono),
        ("lfo2", "lfo1_frequency", 50.0, VoiceContext::Mono),
    ];
    for (source, destination, amount, context) in routes {
        handles
            .modulation
            .connect(source, destination, amount, context)
            .unwrap();
    }
    for note in [36, 48, 55, 60, 64, 67, 72, 96] {
        handles
            .notes
            .push(SynthMessage::NoteOn {
                note,
                velocity: 127,
            })
            .unwrap();
    }

    let mut output = AudioOutput::default();
    let mut heard = false;
    for _ in 0..200 {
        engine.process_block(&mut output);
        let samples = collect(&output);
        assert!(samples.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        heard |= samples.iter().any(|s| s.abs() > 1e-3);
    }
    assert!(heard);
    assert_eq!(engine.active_voices(), 8);
}

#[test]
fn scope_holds_the_latest_output() {
    let (mut engine, mut handles) =
        SynthEngine::new(EngineConfig::default().scope_capacity(256)).unwrap();
    handles
        .notes
        .push(SynthMessage::NoteOn {
            note: 57,
            velocity: 100,
        })
        .unwrap();

    let mut output = AudioOutput::default();
    for _ in 0..4 {
        engine.process_block(&mut output);
    }
    // The last block is exactly the scope's capacity.
    assert_eq!(handles.scope.snapshot(256), output.buffers[0]);
    assert_eq!(handles.scope.total_writes(), 4 * 256);
}

#[test]
fn volume_edit_takes_effect_next_block() {
    let (mut engine, mut handles) = SynthEngine::new(EngineConfig::default()).unwrap();
    handles
        .notes
        .push(SynthMessage::NoteOn {
            note: 60,
            velocity: 100,
        })
        .unwrap();
    let mut output = AudioOutput::default();
    engine.process_block(&mut output);
    assert!(collect(&output).iter().any(|s| s.abs() > 1e-4));

    handles
        .params
        .send("volume", -3.0, Notification::Send)
        .unwrap();
    engine.process_block(&mut output);
    assert!(collect(&output).iter().all(|&s| s == 0.0));
}

#[test]
fn pitch_bend_and_all_notes_off() {
    let (mut engine, mut handles) = SynthEngine::new(EngineConfig::default()).unwrap();
    for note in [60, 64] {
        handles
            .notes
            .push(SynthMessage::NoteOn {
                note,
                velocity: 100,
            })
            .unwrap();
    }
    handles
        .notes
        .push(SynthMessage::PitchBend { cents: f32::NAN })
        .unwrap();
    let mut output = AudioOutput::default();
    engine.process_block(&mut output);
    assert!(collect(&output).iter().all(|s| s.is_finite()));
    assert_eq!(engine.active_voices(), 2);

    handles.notes.push(SynthMessage::AllNotesOff).unwrap();
    // amp_release defaults to 0.3 s.
    for _ in 0..80 {
        engine.process_block(&mut output);
    }
    assert_eq!(engine.active_voices(), 0);
}
