//! Keyboard, mouse and form events routed into voices.

use lowkeys::{
    dsp::Waveform,
    graph::{AudioBackend, AudioGraph, NodeKind, Param},
    input::{ControlEvent, ControlSurface, InputEvent, InputRouter, Keymap},
    synth::{FilterChoice, VoiceKind},
};

const SAMPLE_RATE: f32 = 8_000.0;

fn router() -> InputRouter<AudioGraph> {
    InputRouter::new(AudioGraph::new(SAMPLE_RATE))
}

fn run(router: &mut InputRouter<AudioGraph>, seconds: f64) {
    let frames = (seconds * 100.0).round() as usize;
    let mut block = [0.0f32; 80];
    for _ in 0..frames {
        router.voices_mut().backend_mut().render(&mut block);
        router.tick();
    }
}

fn sounding_frequency(router: &InputRouter<AudioGraph>) -> Option<f32> {
    let voice = router.voices().active_voice()?;
    let graph = router.voices().backend();
    graph
        .param_value(Param::Frequency(voice.nodes.oscillator), graph.now())
        .ok()
}

#[test]
fn every_letter_plays_its_own_pitch() {
    let keymap = Keymap::new();
    let mut r = router();
    for binding in keymap.bindings() {
        r.handle(InputEvent::KeyDown(binding.key));
        assert_eq!(sounding_frequency(&r), Some(binding.frequency), "key {}", binding.key);
        r.handle(InputEvent::KeyUp(binding.key));
    }
    run(&mut r, 0.3);
    assert!(r.voices().is_idle());
    assert_eq!(r.voices().backend().node_count(), 0);
}

#[test]
fn controls_apply_to_the_next_note_only() {
    let mut r = router();
    r.handle(InputEvent::KeyDown('a'));
    let first = r.voices().active_voice().unwrap().nodes;

    r.handle(InputEvent::Control(ControlEvent::CycleWaveform));
    r.handle(InputEvent::Control(ControlEvent::CycleFilter));
    let graph = r.voices().backend();
    assert_eq!(
        graph.oscillator_info(first.oscillator).unwrap().waveform,
        Waveform::Sine
    );
    assert!(first.filter.is_none());

    r.handle(InputEvent::KeyUp('a'));
    r.handle(InputEvent::KeyDown('s'));
    let second = r.voices().active_voice().unwrap().nodes;
    let graph = r.voices().backend();
    assert_eq!(
        graph.oscillator_info(second.oscillator).unwrap().waveform,
        Waveform::Square
    );
    assert_eq!(graph.nodes_of_kind(NodeKind::Filter), vec![second.filter.unwrap()]);
    assert_eq!(
        graph.param_value(Param::Cutoff(second.filter.unwrap()), graph.now()),
        Ok(120.0)
    );
}

#[test]
fn typed_duration_controls_auto_stop() {
    let mut r = router();
    // Clear "1" and type "0.3".
    r.handle(InputEvent::Control(ControlEvent::Backspace));
    for c in "0.3".chars() {
        r.handle(InputEvent::Control(ControlEvent::Input(c)));
    }
    r.handle(InputEvent::MouseDown('m'));

    run(&mut r, 0.25);
    assert!(!r.voices().active_voice().unwrap().is_fading());
    run(&mut r, 0.1);
    assert!(r.voices().active_voice().unwrap().is_fading());
    assert!(!r.is_active('m'));
    run(&mut r, 0.2);
    assert!(r.voices().is_idle());
}

#[test]
fn garbage_duration_falls_back_to_one_second() {
    let mut r = router();
    r.handle(InputEvent::Control(ControlEvent::Backspace));
    r.handle(InputEvent::Control(ControlEvent::Input('.')));
    r.handle(InputEvent::KeyDown('z'));

    run(&mut r, 0.9);
    assert!(!r.voices().active_voice().unwrap().is_fading());
    run(&mut r, 0.2);
    assert!(r.voices().active_voice().unwrap().is_fading());
}

#[test]
fn drop_and_rise_sweep_the_sub_range() {
    let mut r = router();
    r.handle(InputEvent::Drop);
    let voice = r.voices().active_voice().unwrap();
    assert_eq!(voice.kind, VoiceKind::Sweep { start: 90.0, end: 20.0 });

    run(&mut r, 2.5);
    let mid = sounding_frequency(&r).unwrap();
    assert!((mid - 55.0).abs() < 0.5, "drop at 2.5 s is {mid} Hz");

    r.handle(InputEvent::Rise);
    let voice = r.voices().active_voice().unwrap();
    assert_eq!(voice.kind, VoiceKind::Sweep { start: 20.0, end: 90.0 });

    // The drop ramps out over a few ms and is then gone.
    run(&mut r, 0.01);
    assert_eq!(r.voices().backend().nodes_of_kind(NodeKind::Oscillator).len(), 1);
}

#[test]
fn sweep_form_drives_the_repeated_sweep() {
    let controls = ControlSurface::new()
        .with_sweep(25.0, 50.0, 2)
        .with_sweep_duration(1.0)
        .with_filter(FilterChoice::LowPass90);
    let mut r = router().with_controls(controls);
    r.handle(InputEvent::Sweep);

    match r.voices().active_voice().unwrap().kind {
        VoiceKind::RepeatedSweep { spec, segment, .. } => {
            assert_eq!((spec.start(), spec.end(), spec.repeats()), (25.0, 50.0, 2));
            assert_eq!(spec.duration(), 1.0);
            assert_eq!(segment, 0);
        }
        other => panic!("expected a repeated sweep, got {other}"),
    }
    // Sweeps ignore the filter selector.
    assert!(r.voices().active_voice().unwrap().nodes.filter.is_none());

    run(&mut r, 1.5);
    match r.voices().active_voice().unwrap().kind {
        VoiceKind::RepeatedSweep { segment, .. } => assert_eq!(segment, 1),
        other => panic!("expected a repeated sweep, got {other}"),
    }
    run(&mut r, 1.0);
    assert!(r.voices().is_idle());
    assert_eq!(r.voices().backend().node_count(), 0);
}

#[test]
fn rejected_form_keeps_the_current_voice() {
    let mut r = router().with_controls(ControlSurface::new().with_sweep(30.0, 60.0, 0));
    r.handle(InputEvent::KeyDown('k'));
    let before = r.voices().active_voice().unwrap().id;

    r.handle(InputEvent::Sweep);
    assert_eq!(r.voices().active_voice().unwrap().id, before);
    assert!(r.message().is_some());

    // Repeats is one step back from the first field. A good request clears
    // the message.
    r.handle(InputEvent::Control(ControlEvent::FocusPrev));
    r.handle(InputEvent::Control(ControlEvent::Backspace));
    r.handle(InputEvent::Control(ControlEvent::Input('3')));
    r.handle(InputEvent::Sweep);
    assert_eq!(r.message(), None);
    assert_ne!(r.voices().active_voice().unwrap().id, before);
}
