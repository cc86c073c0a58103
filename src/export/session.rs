use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;
use crossbeam_channel::{Receiver, TryRecvError};

use crate::audio::graph::AudioCaptureTrack;
use crate::audio::media::MediaEvent;
use crate::encode::encoder::{AudioInputConfig, EncoderConfig, EncoderEvent, MediaEncoder};
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::format::{Capabilities, ExportFormat, negotiate};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{PulseError, PulseResult};
use crate::scene::compositor::TickOutcome;
use crate::session::visualizer::Visualizer;

/// Capture cadence of the raster stream.
pub const EXPORT_FPS: Fps = Fps { num: 30, den: 1 };

/// File stem of the exported video.
pub const OUTPUT_STEM: &str = "visualizer-video";

static TAP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Export lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportState {
    /// No export has run yet.
    Idle,
    /// Choosing the output format.
    Negotiating,
    /// Capturing frames while the track plays.
    Recording,
    /// Track ended; waiting for the encoder to flush.
    Finalizing,
    /// The output file was written.
    Completed,
    /// The export was aborted; no file was written.
    Failed,
}

impl ExportState {
    /// `true` while a session is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Recording | Self::Finalizing)
    }
}

/// Result of [`ExportController::start`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// Recording began in `format`.
    Started {
        /// Negotiated format.
        format: ExportFormat,
        /// Fallback warning, if the requested format was replaced.
        warning: Option<String>,
    },
    /// A session is already recording or finalizing; nothing changed.
    AlreadyActive,
}

/// Terminal outcome of one export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The video was written.
    Completed {
        /// Output file.
        path: PathBuf,
        /// Media type of the blob.
        mime_type: &'static str,
        /// Blob size.
        bytes: u64,
        /// Frames captured.
        frames: u64,
    },
    /// The export failed.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
}

/// Raster capture plus the tapped audio track for one session.
#[derive(Debug)]
struct CombinedCapture {
    audio: AudioCaptureTrack,
    audio_path: Option<PathBuf>,
    video_live: bool,
}

impl CombinedCapture {
    fn live_tracks(&self) -> usize {
        usize::from(self.audio.is_live()) + usize::from(self.video_live)
    }

    /// Stop both tracks and delete the audio tap file; returns the tap path it removed.
    fn release(&mut self) -> Option<PathBuf> {
        self.audio.stop();
        self.video_live = false;
        let path = self.audio_path.take()?;
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::debug!(path = %path.display(), error = %e, "audio tap file not removed");
        }
        Some(path)
    }
}

impl Drop for CombinedCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// What was left behind when a session's capture was released.
#[derive(Clone, Debug)]
struct ReleasedCapture {
    tracks_open: usize,
    tap_file: Option<PathBuf>,
}

impl ReleasedCapture {
    fn from_release(capture: &mut CombinedCapture) -> Self {
        let tap_file = capture.release();
        Self {
            tracks_open: capture.live_tracks(),
            tap_file,
        }
    }
}

/// State of one in-flight export.
#[derive(Debug)]
pub struct ExportSession {
    requested: ExportFormat,
    negotiated: ExportFormat,
    chunks: Vec<Vec<u8>>,
    progress: f64,
    resume_playing: bool,
    capture: CombinedCapture,
    events: Receiver<EncoderEvent>,
    next_frame: u64,
}

impl ExportSession {
    /// Format asked for when the session started.
    pub fn requested_format(&self) -> ExportFormat {
        self.requested
    }

    /// Format actually being encoded.
    pub fn negotiated_format(&self) -> ExportFormat {
        self.negotiated
    }

    /// Progress fraction in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Encoded chunks received so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Encoded bytes received so far.
    pub fn encoded_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }

    /// Frames handed to the encoder.
    pub fn frames_captured(&self) -> u64 {
        self.next_frame
    }
}

type ProgressFn = Box<dyn FnMut(f64) + Send>;

/// Drives one export at a time over a [`Visualizer`].
///
/// Frames are rendered at [`EXPORT_FPS`] with the media clock advanced by capture time, so an
/// export runs as fast as rendering and encoding allow.
pub struct ExportController<E, C> {
    encoder: E,
    capabilities: C,
    requested: ExportFormat,
    out_dir: PathBuf,
    state: ExportState,
    session: Option<ExportSession>,
    warnings: Vec<String>,
    outcome: Option<ExportOutcome>,
    released: Option<ReleasedCapture>,
    on_progress: Option<ProgressFn>,
}

impl<E, C> std::fmt::Debug for ExportController<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportController")
            .field("requested", &self.requested)
            .field("out_dir", &self.out_dir)
            .field("state", &self.state)
            .field("session", &self.session)
            .field("warnings", &self.warnings)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl<E: MediaEncoder, C: Capabilities> ExportController<E, C> {
    /// Create an idle controller writing into `out_dir`.
    pub fn new(
        encoder: E,
        capabilities: C,
        requested: ExportFormat,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            encoder,
            capabilities,
            requested,
            out_dir: out_dir.into(),
            state: ExportState::Idle,
            session: None,
            warnings: Vec::new(),
            outcome: None,
            released: None,
            on_progress: None,
        }
    }

    /// Register a listener called with progress percent (0-100) whenever it changes.
    pub fn with_progress(mut self, f: impl FnMut(f64) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Current state.
    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Requested format; replaced by the fallback after a downgrade.
    pub fn requested_format(&self) -> ExportFormat {
        self.requested
    }

    /// In-flight session.
    pub fn session(&self) -> Option<&ExportSession> {
        self.session.as_ref()
    }

    /// Warnings recorded by the last start.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Outcome of the last finished export.
    pub fn outcome(&self) -> Option<&ExportOutcome> {
        self.outcome.as_ref()
    }

    /// Progress percent of the in-flight session (100 after completion).
    pub fn progress_percent(&self) -> f64 {
        match (&self.session, self.state) {
            (Some(s), _) => s.progress * 100.0,
            (None, ExportState::Completed) => 100.0,
            _ => 0.0,
        }
    }

    /// Capture tracks still open: live ones while a session runs, otherwise whatever the last
    /// release failed to stop.
    pub fn active_tracks(&self) -> usize {
        match (&self.session, &self.released) {
            (Some(s), _) => s.capture.live_tracks(),
            (None, Some(r)) => r.tracks_open,
            (None, None) => 0,
        }
    }

    /// Temporary audio tap file of the current or last session.
    pub fn audio_tap_path(&self) -> Option<&Path> {
        match (&self.session, &self.released) {
            (Some(s), _) => s.capture.audio_path.as_deref(),
            (None, Some(r)) => r.tap_file.as_deref(),
            (None, None) => None,
        }
    }

    /// The encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Output path for `format`.
    pub fn output_path(&self, format: ExportFormat) -> PathBuf {
        output_path(&self.out_dir, format)
    }

    /// Negotiate a format, rewind and start recording.
    ///
    /// A start while recording or finalizing is a no-op. Without audio or a raster surface the
    /// request is rejected with `MissingInput` and the state is unchanged.
    #[tracing::instrument(skip_all, fields(requested = %self.requested))]
    pub fn start(&mut self, vis: &mut Visualizer) -> PulseResult<StartOutcome> {
        if self.state.is_active() {
            tracing::debug!(state = ?self.state, "export already active; start ignored");
            return Ok(StartOutcome::AlreadyActive);
        }
        if vis.media().is_none() {
            return Err(PulseError::missing("export needs a loaded audio source"));
        }
        if vis.surface().is_none() {
            return Err(PulseError::missing("export needs a raster surface"));
        }

        self.outcome = None;
        self.released = None;
        self.warnings.clear();
        self.state = ExportState::Negotiating;
        let negotiated = match negotiate(&self.capabilities, self.requested) {
            Ok(n) => n,
            Err(e) => {
                self.state = ExportState::Failed;
                self.outcome = Some(ExportOutcome::Failed {
                    reason: e.to_string(),
                });
                tracing::warn!(error = %e, "export negotiation failed");
                return Err(e);
            }
        };
        if let Some(w) = negotiated.warning.as_ref() {
            tracing::warn!(warning = %w, "export format downgraded");
            self.warnings.push(w.clone());
        }
        let requested = self.requested;
        self.requested = negotiated.format;

        let session = match self.begin_recording(vis, requested, negotiated.format) {
            Ok(s) => s,
            Err(e) => {
                self.state = ExportState::Failed;
                self.outcome = Some(ExportOutcome::Failed {
                    reason: e.to_string(),
                });
                tracing::warn!(error = %e, "export failed to start");
                return Err(e);
            }
        };
        self.session = Some(session);
        self.state = ExportState::Recording;
        tracing::info!(format = %negotiated.format, "export recording");
        Ok(StartOutcome::Started {
            format: negotiated.format,
            warning: negotiated.warning,
        })
    }

    fn begin_recording(
        &mut self,
        vis: &mut Visualizer,
        requested: ExportFormat,
        format: ExportFormat,
    ) -> PulseResult<ExportSession> {
        let resume_playing = vis.media().is_some_and(|m| !m.is_paused());
        vis.pause();
        vis.seek(0.0);
        // An Ended queued before the rewind must not finish this recording.
        if let Some(media) = vis.media_mut() {
            media.drain_events();
        }

        let canvas = vis
            .surface()
            .map(|s| s.canvas())
            .ok_or_else(|| PulseError::missing("export needs a raster surface"))?;
        let audio = vis.capture_audio()?;
        let mut capture = CombinedCapture {
            audio,
            audio_path: None,
            video_live: true,
        };

        let result = self.open_encoder(vis, &mut capture, canvas, format);
        match result {
            Ok(events) => Ok(ExportSession {
                requested,
                negotiated: format,
                chunks: Vec::new(),
                progress: 0.0,
                resume_playing,
                capture,
                events,
                next_frame: 0,
            }),
            Err(e) => {
                self.released = Some(ReleasedCapture::from_release(&mut capture));
                restore_playback(vis, resume_playing);
                Err(e)
            }
        }
    }

    fn open_encoder(
        &mut self,
        vis: &mut Visualizer,
        capture: &mut CombinedCapture,
        canvas: Canvas,
        format: ExportFormat,
    ) -> PulseResult<Receiver<EncoderEvent>> {
        let path = tap_path();
        capture.audio.write_f32le(&path)?;
        capture.audio_path = Some(path.clone());
        let pcm = capture
            .audio
            .pcm()
            .ok_or_else(|| PulseError::missing("audio capture track already stopped"))?;
        let cfg = EncoderConfig {
            width: canvas.width,
            height: canvas.height,
            fps: EXPORT_FPS,
            format,
            audio: Some(AudioInputConfig {
                path,
                sample_rate: pcm.sample_rate,
                channels: pcm.channels,
            }),
        };
        let events = self.encoder.start(cfg)?;
        vis.play()?;
        Ok(events)
    }

    /// Advance the export by one step.
    ///
    /// While recording this renders and captures one frame; while finalizing it waits for the
    /// encoder to flush and writes the file. Errors move the controller to `Failed` before they
    /// are returned.
    pub fn pump(&mut self, vis: &mut Visualizer) -> PulseResult<ExportState> {
        let step = match self.state {
            ExportState::Recording => self.record_step(vis),
            ExportState::Finalizing => self.finalize_step(vis),
            state => return Ok(state),
        };
        match step {
            Ok(()) => Ok(self.state),
            Err(e) => {
                if self.state == ExportState::Recording
                    && let Err(fe) = self.encoder.finish()
                {
                    tracing::debug!(error = %fe, "encoder finish after failure also failed");
                }
                self.fail(vis, &e);
                Err(e)
            }
        }
    }

    /// Start and pump until the export completes or fails.
    pub fn run(&mut self, vis: &mut Visualizer) -> PulseResult<ExportOutcome> {
        if let StartOutcome::AlreadyActive = self.start(vis)? {
            return Err(PulseError::validation("an export is already in progress"));
        }
        while self.pump(vis)?.is_active() {}
        self.outcome
            .clone()
            .ok_or_else(|| PulseError::encode("export stopped without an outcome"))
    }

    fn record_step(&mut self, vis: &mut Visualizer) -> PulseResult<()> {
        let report = vis.tick(EXPORT_FPS.frame_duration_secs())?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PulseError::encode("recording without a session"))?;

        if let TickOutcome::Drawn(_) = report.outcome {
            let frame = vis
                .frame()
                .ok_or_else(|| PulseError::missing("raster surface detached during export"))?;
            self.encoder
                .push_frame(FrameIndex(session.next_frame), &frame)?;
            session.next_frame += 1;
        }

        let duration = vis.media().map_or(0.0, |m| m.duration());
        let mut ended = false;
        for ev in report.events {
            match ev {
                MediaEvent::TimeUpdate { current_time } if duration > 0.0 => {
                    let p = (current_time / duration).clamp(0.0, 1.0);
                    if p != session.progress {
                        session.progress = p;
                        if let Some(f) = self.on_progress.as_mut() {
                            f(p * 100.0);
                        }
                    }
                }
                MediaEvent::Ended => ended = true,
                _ => {}
            }
        }

        loop {
            match session.events.try_recv() {
                Ok(EncoderEvent::Chunk(c)) => session.chunks.push(c),
                Ok(EncoderEvent::StreamEnded) => {
                    return Err(PulseError::encode("encoder ended before the track"));
                }
                Ok(EncoderEvent::Error(msg)) => return Err(PulseError::encode(msg)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(PulseError::encode("encoder event channel closed"));
                }
            }
        }

        if ended {
            session.capture.video_live = false;
            self.encoder.finish()?;
            self.state = ExportState::Finalizing;
            tracing::debug!(frames = session.next_frame, "export finalizing");
        }
        Ok(())
    }

    fn finalize_step(&mut self, vis: &mut Visualizer) -> PulseResult<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PulseError::encode("finalizing without a session"))?;
        match session.events.recv() {
            Ok(EncoderEvent::Chunk(c)) => {
                session.chunks.push(c);
                Ok(())
            }
            Ok(EncoderEvent::StreamEnded) => self.complete(vis),
            Ok(EncoderEvent::Error(msg)) => Err(PulseError::encode(msg)),
            Err(_) => Err(PulseError::encode(
                "encoder event channel closed before the stream ended",
            )),
        }
    }

    fn complete(&mut self, vis: &mut Visualizer) -> PulseResult<()> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| PulseError::encode("finalizing without a session"))?;
        let path = self.output_path(session.negotiated);
        let blob = session.chunks.concat();
        if let Err(e) = write_blob(&path, &blob) {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        let Some(mut session) = self.session.take() else {
            return Err(PulseError::encode("finalizing without a session"));
        };
        self.released = Some(ReleasedCapture::from_release(&mut session.capture));
        restore_playback(vis, session.resume_playing);
        tracing::info!(
            path = %path.display(),
            bytes = blob.len(),
            frames = session.next_frame,
            requested = %session.requested,
            "export completed"
        );
        self.outcome = Some(ExportOutcome::Completed {
            path,
            mime_type: session.negotiated.mime_type(),
            bytes: blob.len() as u64,
            frames: session.next_frame,
        });
        self.state = ExportState::Completed;
        Ok(())
    }

    fn fail(&mut self, vis: &mut Visualizer, err: &PulseError) {
        if let Some(mut session) = self.session.take() {
            self.released = Some(ReleasedCapture::from_release(&mut session.capture));
            restore_playback(vis, session.resume_playing);
        }
        tracing::warn!(error = %err, "export failed");
        self.outcome = Some(ExportOutcome::Failed {
            reason: err.to_string(),
        });
        self.state = ExportState::Failed;
    }
}

/// `<out_dir>/visualizer-video.<ext>`.
pub fn output_path(out_dir: &Path, format: ExportFormat) -> PathBuf {
    out_dir.join(format!("{OUTPUT_STEM}.{}", format.extension()))
}

fn write_blob(path: &Path, blob: &[u8]) -> PulseResult<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, blob).with_context(|| format!("write video '{}'", path.display()))?;
    Ok(())
}

fn tap_path() -> PathBuf {
    let n = TAP_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pulseviz-tap-{}-{n}.f32le", std::process::id()))
}

fn restore_playback(vis: &mut Visualizer, playing: bool) {
    if playing {
        if let Err(e) = vis.play() {
            tracing::warn!(error = %e, "could not resume playback after export");
        }
    } else {
        vis.pause();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/session.rs"]
mod tests;
