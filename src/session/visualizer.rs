use crate::audio::graph::{AudioCaptureTrack, FeatureExtractor};
use crate::audio::media::{AudioPcm, MediaElement, MediaEvent};
use crate::config::model::ConfigHandle;
use crate::foundation::core::AspectRatio;
use crate::foundation::error::{PulseError, PulseResult};
use crate::render::frame::FrameRGBA;
use crate::render::surface::RasterSurface;
use crate::scene::compositor::{SceneAssets, SceneCompositor, SkipReason, TickOutcome};

/// Short-side resolution used when none is given.
pub const DEFAULT_SHORT_SIDE: u32 = 720;

/// Options for [`Visualizer::new`].
#[derive(Clone, Copy, Debug)]
pub struct VisualizerOpts {
    /// Surface aspect ratio.
    pub aspect: AspectRatio,
    /// Pixels on the short edge.
    pub short_side: u32,
    /// Fixed seed for particles and shake; `None` uses OS entropy.
    pub seed: Option<u64>,
}

impl Default for VisualizerOpts {
    fn default() -> Self {
        Self {
            aspect: AspectRatio::Landscape,
            short_side: DEFAULT_SHORT_SIDE,
            seed: None,
        }
    }
}

/// One tick's outcome plus the transport events it consumed.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Draw outcome.
    pub outcome: TickOutcome,
    /// Media events emitted since the previous tick, in order.
    pub events: Vec<MediaEvent>,
}

/// The engine: media transport, feature extraction, compositor and raster surface.
///
/// All mutable engine state lives here and is touched by one thread at a time (the frame loop or
/// the exporter).
#[derive(Debug)]
pub struct Visualizer {
    config: ConfigHandle,
    media: Option<MediaElement>,
    extractor: FeatureExtractor,
    compositor: SceneCompositor,
    surface: Option<RasterSurface>,
    short_side: u32,
    elapsed: f64,
}

impl Visualizer {
    /// Build an engine with a surface for `opts.aspect` and no audio loaded.
    pub fn new(config: ConfigHandle, assets: SceneAssets, opts: VisualizerOpts) -> PulseResult<Self> {
        let surface = RasterSurface::new(opts.aspect.canvas(opts.short_side))?;
        let compositor = match opts.seed {
            Some(seed) => SceneCompositor::with_seed(assets, seed),
            None => SceneCompositor::new(assets),
        };
        let smoothing = config.snapshot().smoothing;
        Ok(Self {
            config,
            media: None,
            extractor: FeatureExtractor::new(smoothing),
            compositor,
            surface: Some(surface),
            short_side: opts.short_side,
            elapsed: 0.0,
        })
    }

    /// Shared configuration handle.
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Replace the audio source. An existing analysis graph is kept.
    pub fn load_audio(&mut self, pcm: AudioPcm) -> PulseResult<()> {
        let media = MediaElement::new(pcm)?;
        tracing::info!(duration_s = media.duration(), "audio source loaded");
        self.media = Some(media);
        Ok(())
    }

    /// Loaded audio source.
    pub fn media(&self) -> Option<&MediaElement> {
        self.media.as_ref()
    }

    /// Loaded audio source, mutably.
    pub fn media_mut(&mut self) -> Option<&mut MediaElement> {
        self.media.as_mut()
    }

    /// Feature extractor.
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Compositor.
    pub fn compositor(&self) -> &SceneCompositor {
        &self.compositor
    }

    /// Mutable compositor (logo/background swaps).
    pub fn compositor_mut(&mut self) -> &mut SceneCompositor {
        &mut self.compositor
    }

    /// Start playback; builds the analysis graph on first use and resumes its context.
    pub fn play(&mut self) -> PulseResult<()> {
        let Some(media) = self.media.as_mut() else {
            return Err(PulseError::missing("no audio source loaded"));
        };
        media.play();
        self.extractor.on_playback_start(media)
    }

    /// Pause playback (no-op without a source).
    pub fn pause(&mut self) {
        if let Some(media) = self.media.as_mut() {
            media.pause();
        }
    }

    /// Seek playback (no-op without a source).
    pub fn seek(&mut self, seconds: f64) {
        if let Some(media) = self.media.as_mut() {
            media.seek(seconds);
        }
    }

    /// Open a capture track on the analysis graph's stream tap, building the graph if needed.
    pub fn capture_audio(&mut self) -> PulseResult<AudioCaptureTrack> {
        let Some(media) = self.media.as_ref() else {
            return Err(PulseError::missing("no audio source loaded"));
        };
        self.extractor.ensure_audio_graph(Some(media))?;
        let graph = self
            .extractor
            .graph()
            .ok_or_else(|| PulseError::missing("audio graph not initialized"))?;
        Ok(graph.tap().capture(media))
    }

    /// Reallocate the surface for a new aspect ratio.
    pub fn set_aspect(&mut self, aspect: AspectRatio) -> PulseResult<()> {
        self.surface = Some(RasterSurface::new(aspect.canvas(self.short_side))?);
        Ok(())
    }

    /// Attached raster surface.
    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    /// Detach the raster surface; later ticks are skipped until one is attached.
    pub fn detach_surface(&mut self) -> Option<RasterSurface> {
        self.surface.take()
    }

    /// Attach a raster surface.
    pub fn attach_surface(&mut self, surface: RasterSurface) {
        self.surface = Some(surface);
    }

    /// Copy of the last drawn frame.
    pub fn frame(&self) -> Option<FrameRGBA> {
        self.surface.as_ref().map(RasterSurface::frame)
    }

    /// Advance the media clock by `dt` seconds and draw one frame.
    pub fn tick(&mut self, dt: f64) -> PulseResult<TickReport> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += dt;

        let Some(media) = self.media.as_mut() else {
            return Ok(TickReport {
                outcome: TickOutcome::Skipped(SkipReason::ExtractorNotReady),
                events: Vec::new(),
            });
        };
        media.advance(dt);
        let events = media.drain_events();
        if events.contains(&MediaEvent::Play) {
            self.extractor.on_playback_start(media)?;
        }

        let config = self.config.snapshot();
        let outcome = self.compositor.tick(
            self.surface.as_mut(),
            &mut self.extractor,
            media,
            &config,
            self.elapsed,
        )?;
        Ok(TickReport { outcome, events })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/visualizer.rs"]
mod tests;
