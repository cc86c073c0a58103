use std::collections::BTreeSet;
use std::io::{Read, Write as _};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::encode::encoder::{EncoderConfig, EncoderEvent, MediaEncoder};
use crate::encode::format::{Capabilities, ExportFormat};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{PulseError, PulseResult};
use crate::render::composite::flatten_over_opaque;
use crate::render::frame::FrameRGBA;

const CHUNK_SIZE: usize = 64 * 1024;

/// Capability probe backed by the system `ffmpeg` encoder list.
#[derive(Clone, Debug, Default)]
pub struct FfmpegCapabilities {
    available: bool,
    encoders: BTreeSet<String>,
}

impl FfmpegCapabilities {
    /// Run `ffmpeg -encoders` once and record what it can do.
    ///
    /// A missing or failing `ffmpeg` yields a probe with no capture support.
    pub fn probe() -> Self {
        let out = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        match out {
            Ok(out) if out.status.success() => {
                let encoders = parse_encoder_list(&String::from_utf8_lossy(&out.stdout));
                tracing::debug!(count = encoders.len(), "ffmpeg encoders probed");
                Self {
                    available: true,
                    encoders,
                }
            }
            Ok(out) => {
                tracing::warn!(status = %out.status, "ffmpeg -encoders failed");
                Self::default()
            }
            Err(e) => {
                tracing::debug!(error = %e, "ffmpeg not available");
                Self::default()
            }
        }
    }

    /// Probe from an already captured `ffmpeg -encoders` listing.
    pub fn from_listing(listing: &str) -> Self {
        Self {
            available: true,
            encoders: parse_encoder_list(listing),
        }
    }

    /// `true` when `name` is in the encoder list.
    pub fn has_encoder(&self, name: &str) -> bool {
        self.encoders.contains(name)
    }
}

impl Capabilities for FfmpegCapabilities {
    fn can_capture(&self) -> bool {
        self.available
    }

    fn is_type_supported(&self, format: ExportFormat) -> bool {
        self.available
            && self.has_encoder(format.video_encoder())
            && self.has_encoder(format.audio_encoder())
    }
}

/// Encoder names from `ffmpeg -encoders` output.
///
/// Entries look like ` V....D libx264   libx264 H.264 ...`; the banner above the `------`
/// separator is skipped.
pub fn parse_encoder_list(listing: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut in_table = false;
    for line in listing.lines() {
        let trimmed = line.trim();
        if !in_table {
            in_table = trimmed.starts_with("------");
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let (Some(flags), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        if flags.len() == 6 && flags.starts_with(['V', 'A', 'S']) {
            out.insert(name.to_string());
        }
    }
    out
}

/// Encoder that spawns the system `ffmpeg`, streams raw frames to stdin and reads the container
/// from stdout.
///
/// A reader thread forwards stdout in [`EncoderEvent::Chunk`]s as they are produced.
pub struct FfmpegEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    reader: Option<JoinHandle<()>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    tx: Option<Sender<EncoderEvent>>,
    scratch: Vec<u8>,
    cfg: Option<EncoderConfig>,
    last_idx: Option<FrameIndex>,
}

impl std::fmt::Debug for FfmpegEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEncoder")
            .field("running", &self.child.is_some())
            .field("cfg", &self.cfg)
            .field("last_idx", &self.last_idx)
            .finish()
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    /// Create an idle encoder.
    pub fn new() -> Self {
        Self {
            child: None,
            stdin: None,
            reader: None,
            stderr_drain: None,
            tx: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    fn command(cfg: &EncoderConfig) -> Command {
        let format = cfg.format;
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Input: opaque RGBA8 frames (flattened in push_frame).
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        if let Some(audio) = cfg.audio.as_ref() {
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path)
            .args(["-c:a", format.audio_encoder(), "-shortest"]);
        } else {
            cmd.arg("-an");
        }

        cmd.args(["-c:v", format.video_encoder(), "-pix_fmt", "yuv420p"]);
        match format {
            ExportFormat::WebmVp9Opus => {
                cmd.args(["-deadline", "realtime", "-cpu-used", "8", "-b:v", "0", "-crf", "32"]);
            }
            ExportFormat::Mp4H264Aac => {
                // stdout is not seekable: write a fragmented mp4.
                cmd.args([
                    "-preset",
                    "veryfast",
                    "-movflags",
                    "frag_keyframe+empty_moov+default_base_moof",
                ]);
            }
        }
        cmd.args(["-f", format.muxer(), "pipe:1"]);
        cmd
    }
}

impl MediaEncoder for FfmpegEncoder {
    #[tracing::instrument(skip_all, fields(format = %cfg.format, width = cfg.width, height = cfg.height))]
    fn start(&mut self, cfg: EncoderConfig) -> PulseResult<Receiver<EncoderEvent>> {
        if self.child.is_some() {
            return Err(PulseError::encode("ffmpeg encoder already running"));
        }
        cfg.validate()?;
        if !is_ffmpeg_on_path() {
            return Err(PulseError::unsupported(
                "ffmpeg is required for video export, but was not found on PATH",
            ));
        }

        let mut child = Self::command(&cfg).spawn().map_err(|e| {
            PulseError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PulseError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| PulseError::encode("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| PulseError::encode("failed to open ffmpeg stderr (unexpected)"))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let chunk_tx = tx.clone();
        let reader = std::thread::Builder::new()
            .name("pulseviz-ffmpeg-reader".to_string())
            .spawn(move || {
                let mut buf = vec![0u8; CHUNK_SIZE];
                loop {
                    match stdout.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if chunk_tx.send(EncoderEvent::Chunk(buf[..n].to_vec())).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                        Err(e) => {
                            let _ = chunk_tx
                                .send(EncoderEvent::Error(format!("ffmpeg stdout read failed: {e}")));
                            break;
                        }
                    }
                }
            })
            .map_err(|e| PulseError::Other(anyhow::anyhow!("spawn ffmpeg reader thread: {e}")))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!("ffmpeg encoder started");
        self.scratch = vec![0u8; cfg.width as usize * cfg.height as usize * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.reader = Some(reader);
        self.stderr_drain = Some(stderr_drain);
        self.tx = Some(tx);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(rx)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> PulseResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| PulseError::encode("ffmpeg encoder not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(PulseError::encode(
                "ffmpeg encoder received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(PulseError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(PulseError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_over_opaque(&frame.data, &mut self.scratch, [0, 0, 0])?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(PulseError::encode("ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            PulseError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn finish(&mut self) -> PulseResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| PulseError::encode("ffmpeg encoder not started"))?;
        let tx = self
            .tx
            .take()
            .ok_or_else(|| PulseError::encode("ffmpeg encoder not started"))?;

        if let Some(reader) = self.reader.take() {
            reader
                .join()
                .map_err(|_| PulseError::encode("ffmpeg reader thread panicked"))?;
        }
        let status = child
            .wait()
            .map_err(|e| PulseError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PulseError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| PulseError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        self.cfg = None;

        if status.success() {
            let _ = tx.send(EncoderEvent::StreamEnded);
            tracing::debug!("ffmpeg encoder finished");
        } else {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            let msg = format!("ffmpeg exited with status {}: {}", status, stderr.trim());
            tracing::warn!(%msg, "ffmpeg encoder failed");
            let _ = tx.send(EncoderEvent::Error(msg));
        }
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> PulseResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
