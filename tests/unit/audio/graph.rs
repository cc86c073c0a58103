use super::*;

fn tone_media(seconds: f32) -> MediaElement {
    let sr = 48_000u32;
    let n = (sr as f32 * seconds) as usize;
    let samples = (0..n)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin())
        .collect();
    MediaElement::new(AudioPcm::from_mono(sr, samples)).unwrap()
}

#[test]
fn ensure_without_source_is_missing_input() {
    let mut fx = FeatureExtractor::default();
    let err = fx.ensure_audio_graph(None).unwrap_err();
    assert!(err.is_missing_input());
    assert!(!fx.is_ready());
}

#[test]
fn ensure_builds_once() {
    let media = tone_media(0.5);
    let mut fx = FeatureExtractor::default();
    assert_eq!(fx.ensure_audio_graph(Some(&media)).unwrap(), GraphInit::Built);
    assert_eq!(
        fx.ensure_audio_graph(Some(&media)).unwrap(),
        GraphInit::AlreadyBuilt
    );
    assert_eq!(fx.graph().unwrap().state(), ContextState::Suspended);
    assert_eq!(fx.graph().unwrap().tap().sample_rate(), 48_000);
}

#[test]
fn snapshot_requires_graph() {
    let media = tone_media(0.5);
    let mut fx = FeatureExtractor::default();
    assert!(fx.snapshot(&media).unwrap_err().is_missing_input());
}

#[test]
fn suspended_context_reads_silence() {
    let mut media = tone_media(0.5);
    let mut fx = FeatureExtractor::new(0.0);
    fx.ensure_audio_graph(Some(&media)).unwrap();
    media.play();
    media.advance(0.2);
    let snap = fx.snapshot(&media).unwrap();
    assert_eq!(snap.mean(), 0.0);
    assert!(!snap.is_audio_playing());
}

#[test]
fn playback_start_resumes_and_produces_energy() {
    let mut media = tone_media(0.5);
    let mut fx = FeatureExtractor::new(0.0);
    media.play();
    fx.on_playback_start(&media).unwrap();
    assert_eq!(fx.graph().unwrap().state(), ContextState::Running);
    assert!(!fx.resume());

    media.advance(0.2);
    let snap = fx.snapshot(&media).unwrap();
    assert!(snap.is_audio_playing());
    // 440 Hz lands in bin 18-19 at 48 kHz / 2048.
    assert!(snap.bins()[18].max(snap.bins()[19]) > 200);
}

#[test]
fn smoothing_is_rebound_without_rebuilding() {
    let media = tone_media(0.5);
    let mut fx = FeatureExtractor::new(0.8);
    fx.ensure_audio_graph(Some(&media)).unwrap();
    fx.apply_smoothing(0.3);
    assert!((fx.graph().unwrap().analyser.smoothing() - 0.3).abs() < 1e-6);
    assert_eq!(
        fx.ensure_audio_graph(Some(&media)).unwrap(),
        GraphInit::AlreadyBuilt
    );
}

#[test]
fn tap_capture_writes_f32le_and_stops() {
    let media = tone_media(0.01);
    let mut fx = FeatureExtractor::default();
    fx.ensure_audio_graph(Some(&media)).unwrap();

    let mut track = fx.graph().unwrap().tap().capture(&media);
    assert!(track.is_live());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audio.f32le");
    track.write_f32le(&path).unwrap();
    let len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(len as usize, media.pcm().interleaved_f32.len() * 4);

    track.stop();
    assert!(!track.is_live());
    assert!(track.write_f32le(&path).unwrap_err().is_missing_input());
}
