use super::*;
use crate::audio::media::AudioPcm;
use crate::config::model::ConfigHandle;
use crate::encode::encoder::InMemoryEncoder;
use crate::encode::format::StaticCapabilities;
use crate::foundation::core::AspectRatio;
use crate::render::frame::FrameRGBA;
use crate::scene::compositor::SceneAssets;
use crate::session::visualizer::VisualizerOpts;
use std::sync::{Arc, Mutex};

fn engine(seconds: f32) -> Visualizer {
    let sr = 8_000u32;
    let n = (sr as f32 * seconds) as usize;
    let samples = (0..n)
        .map(|i| if (i / 40) % 2 == 0 { 0.5 } else { -0.5 })
        .collect();
    let mut v = Visualizer::new(
        ConfigHandle::default(),
        SceneAssets::default(),
        VisualizerOpts {
            aspect: AspectRatio::Landscape,
            short_side: 18,
            seed: Some(3),
        },
    )
    .unwrap();
    v.load_audio(AudioPcm::from_mono(sr, samples)).unwrap();
    v
}

fn controller(
    caps: StaticCapabilities,
    requested: ExportFormat,
    dir: &Path,
) -> ExportController<InMemoryEncoder, StaticCapabilities> {
    ExportController::new(InMemoryEncoder::new(), caps, requested, dir)
}

#[test]
fn start_without_audio_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = Visualizer::new(
        ConfigHandle::default(),
        SceneAssets::default(),
        VisualizerOpts {
            short_side: 18,
            ..VisualizerOpts::default()
        },
    )
    .unwrap();
    let mut c = controller(
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    assert!(c.start(&mut v).unwrap_err().is_missing_input());
    assert_eq!(c.state(), ExportState::Idle);
}

#[test]
fn unsupported_capture_fails_before_recording() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.5);
    let mut c = controller(StaticCapabilities::none(), ExportFormat::Mp4H264Aac, dir.path());
    assert!(c.start(&mut v).unwrap_err().is_unsupported());
    assert_eq!(c.state(), ExportState::Failed);
    assert!(c.session().is_none());
    assert!(!v.extractor().is_ready());
    assert!(matches!(c.outcome(), Some(ExportOutcome::Failed { .. })));
}

#[test]
fn fallback_replaces_requested_format() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.5);
    let mut c = controller(
        StaticCapabilities::with_formats([ExportFormat::WebmVp9Opus]),
        ExportFormat::Mp4H264Aac,
        dir.path(),
    );
    let started = c.start(&mut v).unwrap();
    assert!(matches!(
        started,
        StartOutcome::Started {
            format: ExportFormat::WebmVp9Opus,
            warning: Some(_)
        }
    ));
    assert_eq!(c.requested_format(), ExportFormat::WebmVp9Opus);
    assert_eq!(c.warnings().len(), 1);
    let s = c.session().unwrap();
    assert_eq!(s.requested_format(), ExportFormat::Mp4H264Aac);
    assert_eq!(s.negotiated_format(), ExportFormat::WebmVp9Opus);
}

#[test]
fn start_rewinds_and_plays() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(1.0);
    v.seek(0.6);
    let mut c = controller(
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    c.start(&mut v).unwrap();
    let media = v.media().unwrap();
    assert_eq!(media.current_time(), 0.0);
    assert!(!media.is_paused());
    assert_eq!(c.state(), ExportState::Recording);
    assert_eq!(c.active_tracks(), 2);
    assert!(c.audio_tap_path().unwrap().exists());
}

#[test]
fn second_start_while_recording_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.5);
    let mut c = controller(
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    c.start(&mut v).unwrap();
    c.pump(&mut v).unwrap();
    let frames = c.session().unwrap().frames_captured();
    assert_eq!(c.start(&mut v).unwrap(), StartOutcome::AlreadyActive);
    assert_eq!(c.state(), ExportState::Recording);
    assert_eq!(c.session().unwrap().frames_captured(), frames);
}

#[test]
fn run_writes_one_file_and_restores_paused_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.5);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut c = controller(
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::Mp4H264Aac,
        dir.path(),
    )
    .with_progress(move |p| sink.lock().unwrap().push(p));

    let outcome = c.run(&mut v).unwrap();
    let ExportOutcome::Completed {
        path,
        mime_type,
        bytes,
        frames,
    } = outcome
    else {
        panic!("export did not complete");
    };
    assert_eq!(path, dir.path().join("visualizer-video.mp4"));
    assert_eq!(mime_type, ExportFormat::Mp4H264Aac.mime_type());
    assert_eq!(frames, 15);
    let frame_bytes = 32 * 18 * 4;
    // 0.5 s of mono f32 audio precedes the frames.
    assert_eq!(bytes, 4_000 * 4 + frames * frame_bytes);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), bytes);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    assert_eq!(c.state(), ExportState::Completed);
    assert_eq!(c.active_tracks(), 0);
    let tap = c.audio_tap_path().unwrap();
    assert!(tap.file_name().unwrap().to_string_lossy().starts_with("pulseviz-tap-"));
    assert!(!tap.exists());
    assert_eq!(c.progress_percent(), 100.0);
    assert!(v.media().unwrap().is_paused());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.iter().filter(|p| **p >= 100.0).count(), 1);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn playing_state_is_restored() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.2);
    v.play().unwrap();
    let mut c = controller(
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    c.run(&mut v).unwrap();
    assert!(!v.media().unwrap().is_paused());
}

#[test]
fn encoder_error_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.5);
    let mut c = ExportController::new(
        InMemoryEncoder::failing_after(3),
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    let err = c.run(&mut v).unwrap_err();
    assert!(matches!(err, PulseError::Encode(_)));
    assert_eq!(c.state(), ExportState::Failed);
    assert_eq!(c.active_tracks(), 0);
    assert!(!c.audio_tap_path().unwrap().exists());
    assert!(!c.output_path(ExportFormat::WebmVp9Opus).exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn controller_can_export_again_after_completion() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.2);
    let mut c = controller(
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    c.run(&mut v).unwrap();
    c.run(&mut v).unwrap();
    assert_eq!(c.state(), ExportState::Completed);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn ended_event_from_before_the_export_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(1.0);
    v.play().unwrap();
    v.media_mut().unwrap().advance(5.0);
    let mut c = controller(
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    let ExportOutcome::Completed { frames, .. } = c.run(&mut v).unwrap() else {
        panic!("export did not complete");
    };
    assert_eq!(frames, 30);
}

#[test]
fn release_stops_the_audio_track_and_removes_the_tap_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.2);
    let mut c = controller(
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    c.start(&mut v).unwrap();
    let mut session = c.session.take().unwrap();
    let tap = session.capture.audio_path.clone().unwrap();
    assert!(tap.exists());
    assert_eq!(session.capture.live_tracks(), 2);

    let released = ReleasedCapture::from_release(&mut session.capture);
    assert_eq!(released.tracks_open, 0);
    assert!(!session.capture.audio.is_live());
    assert_eq!(released.tap_file.as_deref(), Some(tap.as_path()));
    assert!(!tap.exists());
}

#[derive(Default)]
struct BrokenPipeEncoder {
    inner: InMemoryEncoder,
    finish_calls: u32,
}

impl MediaEncoder for BrokenPipeEncoder {
    fn start(&mut self, cfg: EncoderConfig) -> PulseResult<Receiver<EncoderEvent>> {
        self.inner.start(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> PulseResult<()> {
        if idx.0 >= 2 {
            return Err(PulseError::encode("broken pipe"));
        }
        self.inner.push_frame(idx, frame)
    }

    fn finish(&mut self) -> PulseResult<()> {
        self.finish_calls += 1;
        Err(PulseError::encode("flush after broken pipe"))
    }
}

#[test]
fn finish_error_after_a_push_failure_keeps_the_first_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut v = engine(0.5);
    let mut c = ExportController::new(
        BrokenPipeEncoder::default(),
        StaticCapabilities::with_formats(ExportFormat::ALL),
        ExportFormat::WebmVp9Opus,
        dir.path(),
    );
    let err = c.run(&mut v).unwrap_err();
    assert!(err.to_string().contains("broken pipe"));
    assert_eq!(c.encoder().finish_calls, 1);
    assert_eq!(c.state(), ExportState::Failed);
    assert!(
        matches!(c.outcome(), Some(ExportOutcome::Failed { reason }) if reason.contains("broken pipe"))
    );
    assert_eq!(c.active_tracks(), 0);
    assert!(!c.audio_tap_path().unwrap().exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
