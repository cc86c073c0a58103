use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::core::Fps;
use crate::foundation::error::{PulseError, PulseResult};
use crate::scene::compositor::TickOutcome;
use crate::session::visualizer::Visualizer;

/// Counters published by a running [`FrameLoop`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks that drew a frame.
    pub drawn: u64,
    /// Ticks skipped (no surface or no audio graph).
    pub skipped: u64,
    /// Ticks that returned an error.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    drawn: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn load(&self) -> LoopStats {
        LoopStats {
            drawn: self.drawn.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Real-time frame scheduler running a [`Visualizer`] on its own thread.
///
/// The cancellation token is checked before every tick; [`FrameLoop::stop`] sets it, joins the
/// thread and hands the engine back.
#[derive(Debug)]
pub struct FrameLoop {
    cancel: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<Visualizer>>,
}

impl FrameLoop {
    /// Start ticking `visualizer` at `fps`, advancing its media by wall-clock time.
    pub fn spawn(mut visualizer: Visualizer, fps: Fps) -> PulseResult<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let period = Duration::from_secs_f64(fps.frame_duration_secs());

        let token = cancel.clone();
        let stats = counters.clone();
        let handle = std::thread::Builder::new()
            .name("pulseviz-frame-loop".to_string())
            .spawn(move || {
                let mut last = Instant::now();
                let mut next = last + period;
                while !token.load(Ordering::Acquire) {
                    let now = Instant::now();
                    let dt = now.duration_since(last).as_secs_f64();
                    last = now;
                    match visualizer.tick(dt) {
                        Ok(report) => match report.outcome {
                            TickOutcome::Drawn(_) => {
                                stats.drawn.fetch_add(1, Ordering::Relaxed);
                            }
                            TickOutcome::Skipped(reason) => {
                                stats.skipped.fetch_add(1, Ordering::Relaxed);
                                tracing::trace!(?reason, "tick skipped");
                            }
                        },
                        Err(e) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(error = %e, "tick failed");
                        }
                    }

                    let now = Instant::now();
                    if next > now {
                        std::thread::sleep(next - now);
                        next += period;
                    } else {
                        // Running behind: realign instead of bursting.
                        next = now + period;
                    }
                }
                visualizer
            })
            .map_err(|e| PulseError::Other(anyhow::anyhow!("spawn frame loop thread: {e}")))?;

        tracing::debug!(fps = fps.as_f64(), "frame loop started");
        Ok(Self {
            cancel,
            counters,
            handle: Some(handle),
        })
    }

    /// Current counters.
    pub fn stats(&self) -> LoopStats {
        self.counters.load()
    }

    /// `true` while the loop thread has not exited.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel, join and return the engine with the final counters.
    pub fn stop(mut self) -> PulseResult<(Visualizer, LoopStats)> {
        self.cancel.store(true, Ordering::Release);
        let handle = self
            .handle
            .take()
            .ok_or_else(|| PulseError::Other(anyhow::anyhow!("frame loop already joined")))?;
        let visualizer = handle
            .join()
            .map_err(|_| PulseError::Other(anyhow::anyhow!("frame loop thread panicked")))?;
        let stats = self.counters.load();
        tracing::debug!(?stats, "frame loop stopped");
        Ok((visualizer, stats))
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/frame_loop.rs"]
mod tests;
