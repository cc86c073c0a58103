use super::*;
use crate::audio::graph::ContextState;

fn tone(seconds: f32) -> AudioPcm {
    let sr = 48_000u32;
    let n = (sr as f32 * seconds) as usize;
    // Square wave: odd harmonics spread energy across the spectrum.
    let samples = (0..n)
        .map(|i| {
            if (i as f32 * 110.0 / sr as f32).fract() < 0.5 {
                0.6
            } else {
                -0.6
            }
        })
        .collect();
    AudioPcm::from_mono(sr, samples)
}

fn small_opts() -> VisualizerOpts {
    VisualizerOpts {
        aspect: AspectRatio::Landscape,
        short_side: 36,
        seed: Some(11),
    }
}

fn engine() -> Visualizer {
    Visualizer::new(ConfigHandle::default(), SceneAssets::default(), small_opts()).unwrap()
}

#[test]
fn surface_matches_aspect() {
    let mut v = engine();
    let c = v.surface().unwrap().canvas();
    assert_eq!((c.width, c.height), (64, 36));
    v.set_aspect(AspectRatio::Portrait).unwrap();
    let c = v.surface().unwrap().canvas();
    assert_eq!((c.width, c.height), (36, 64));
}

#[test]
fn play_without_audio_is_missing_input() {
    let mut v = engine();
    assert!(v.play().unwrap_err().is_missing_input());
    let report = v.tick(0.016).unwrap();
    assert_eq!(
        report.outcome,
        TickOutcome::Skipped(SkipReason::ExtractorNotReady)
    );
}

#[test]
fn ticks_skip_until_playback_builds_the_graph() {
    let mut v = engine();
    v.load_audio(tone(1.0)).unwrap();
    let report = v.tick(0.016).unwrap();
    assert_eq!(
        report.outcome,
        TickOutcome::Skipped(SkipReason::ExtractorNotReady)
    );

    v.play().unwrap();
    assert_eq!(
        v.extractor().graph().unwrap().state(),
        ContextState::Running
    );
    let report = v.tick(0.1).unwrap();
    assert_eq!(report.events[0], MediaEvent::Play);
    let TickOutcome::Drawn(stats) = report.outcome else {
        panic!("expected a drawn frame");
    };
    assert!(stats.playing);
}

#[test]
fn detached_surface_skips_ticks() {
    let mut v = engine();
    v.load_audio(tone(1.0)).unwrap();
    v.play().unwrap();
    let surface = v.detach_surface().unwrap();
    assert_eq!(
        v.tick(0.016).unwrap().outcome,
        TickOutcome::Skipped(SkipReason::NoSurface)
    );
    v.attach_surface(surface);
    assert!(matches!(
        v.tick(0.016).unwrap().outcome,
        TickOutcome::Drawn(_)
    ));
}

#[test]
fn reloading_audio_keeps_the_graph() {
    let mut v = engine();
    v.load_audio(tone(0.5)).unwrap();
    v.play().unwrap();
    v.load_audio(tone(0.25)).unwrap();
    assert!(v.extractor().is_ready());
    assert!(v.media().unwrap().is_paused());
    assert_eq!(v.media().unwrap().duration(), 0.25);
}

#[test]
fn config_replacement_is_seen_by_the_next_tick() {
    let mut v = engine();
    v.load_audio(tone(1.0)).unwrap();
    v.play().unwrap();
    v.tick(0.05).unwrap();
    v.config().select_preset("quantum").unwrap();
    v.tick(0.05).unwrap();
    assert_eq!(
        v.compositor().particles().behavior(),
        Some(crate::config::model::ParticleBehavior::VortexIn)
    );
}

#[test]
fn end_of_track_is_reported_once() {
    let mut v = engine();
    v.load_audio(tone(0.2)).unwrap();
    v.play().unwrap();
    let mut ended = 0;
    for _ in 0..10 {
        let report = v.tick(0.05).unwrap();
        ended += report
            .events
            .iter()
            .filter(|e| **e == MediaEvent::Ended)
            .count();
    }
    assert_eq!(ended, 1);
    assert!(v.media().unwrap().is_paused());
}

#[test]
fn capture_audio_builds_the_graph_and_taps_the_source() {
    let mut v = engine();
    assert!(v.capture_audio().unwrap_err().is_missing_input());

    v.load_audio(tone(0.5)).unwrap();
    let mut track = v.capture_audio().unwrap();
    assert!(v.extractor().is_ready());
    assert!(track.is_live());
    assert_eq!(track.pcm().unwrap().frames(), 24_000);
    track.stop();
    assert!(!track.is_live());
}
