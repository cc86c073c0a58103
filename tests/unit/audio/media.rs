use super::*;

fn one_second_ramp(sample_rate: u32) -> AudioPcm {
    let samples = (0..sample_rate).map(|i| i as f32 / sample_rate as f32).collect();
    AudioPcm::from_mono(sample_rate, samples)
}

#[test]
fn empty_audio_is_missing_input() {
    let err = MediaElement::new(AudioPcm::from_mono(48_000, Vec::new())).unwrap_err();
    assert!(err.is_missing_input());
}

#[test]
fn pcm_frames_and_duration() {
    let pcm = AudioPcm {
        sample_rate: 4,
        channels: 2,
        interleaved_f32: vec![0.0; 16],
    };
    assert_eq!(pcm.frames(), 8);
    assert!((pcm.duration_secs() - 2.0).abs() < 1e-12);
}

#[test]
fn mono_at_downmixes_channels() {
    let pcm = AudioPcm {
        sample_rate: 2,
        channels: 2,
        interleaved_f32: vec![1.0, 0.0, 0.5, 0.5],
    };
    assert_eq!(pcm.mono_at(0), 0.5);
    assert_eq!(pcm.mono_at(1), 0.5);
    assert_eq!(pcm.mono_at(2), 0.0);
}

#[test]
fn play_pause_emit_events_once() {
    let mut m = MediaElement::new(one_second_ramp(100)).unwrap();
    assert!(m.is_paused());
    m.play();
    m.play();
    m.pause();
    m.pause();
    assert_eq!(m.drain_events(), vec![MediaEvent::Play, MediaEvent::Pause]);
    assert!(m.drain_events().is_empty());
}

#[test]
fn advance_reaches_end_exactly_once() {
    let mut m = MediaElement::new(one_second_ramp(100)).unwrap();
    m.play();
    m.drain_events();

    m.advance(0.6);
    m.advance(0.6);
    m.advance(0.6);

    let events = m.drain_events();
    let ended = events.iter().filter(|e| **e == MediaEvent::Ended).count();
    assert_eq!(ended, 1);
    assert_eq!(events.last(), Some(&MediaEvent::Ended));
    assert!(m.is_paused());
    assert!(m.is_ended());
    assert_eq!(m.current_time(), m.duration());
}

#[test]
fn advance_is_ignored_while_paused() {
    let mut m = MediaElement::new(one_second_ramp(100)).unwrap();
    m.advance(0.5);
    assert_eq!(m.current_time(), 0.0);
    assert!(m.drain_events().is_empty());
}

#[test]
fn play_after_end_restarts() {
    let mut m = MediaElement::new(one_second_ramp(100)).unwrap();
    m.play();
    m.advance(2.0);
    m.drain_events();
    m.play();
    assert_eq!(m.current_time(), 0.0);
    assert!(!m.is_ended());
    assert_eq!(
        m.drain_events(),
        vec![
            MediaEvent::TimeUpdate { current_time: 0.0 },
            MediaEvent::Play
        ]
    );
}

#[test]
fn seek_clamps_to_track() {
    let mut m = MediaElement::new(one_second_ramp(100)).unwrap();
    m.seek(5.0);
    assert_eq!(m.current_time(), 1.0);
    m.seek(-1.0);
    assert_eq!(m.current_time(), 0.0);
    m.seek(f64::NAN);
    assert_eq!(m.current_time(), 0.0);
}

#[test]
fn read_window_is_silent_when_paused_and_pads_before_start() {
    let mut m = MediaElement::new(one_second_ramp(100)).unwrap();
    let mut buf = vec![1.0f32; 8];
    m.read_window(&mut buf);
    assert!(buf.iter().all(|&s| s == 0.0));

    m.play();
    m.advance(0.05);
    m.read_window(&mut buf);
    // Position 5 samples in: three leading zeros, then samples 0..5.
    assert_eq!(&buf[..3], &[0.0, 0.0, 0.0]);
    assert!((buf[7] - 0.04).abs() < 1e-6);
}

#[test]
fn decode_wav_scales_integer_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..4 {
        w.write_sample(16_384i16).unwrap();
        w.write_sample(-16_384i16).unwrap();
    }
    w.finalize().unwrap();

    let pcm = load_audio_file(&path).unwrap();
    assert_eq!(pcm.sample_rate, 8_000);
    assert_eq!(pcm.channels, 2);
    assert_eq!(pcm.frames(), 4);
    assert!((pcm.interleaved_f32[0] - 0.5).abs() < 1e-6);
    assert!((pcm.interleaved_f32[1] + 0.5).abs() < 1e-6);
}

#[test]
fn empty_wav_is_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    hound::WavWriter::create(&path, spec)
        .unwrap()
        .finalize()
        .unwrap();
    assert!(load_audio_file(&path).unwrap_err().is_missing_input());
}
