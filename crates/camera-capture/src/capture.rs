//! Capture task: runs a frame source on a blocking thread and delivers
//! frames over a bounded channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{CameraError, CaptureConfig, FrameSource, VideoFrame};

/// Counters reported when the capture task ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames delivered to the channel
    pub captured: u64,
    /// Cycles where the source had no frame
    pub empty: u64,
    /// Frames dropped because the channel was full
    pub dropped: u64,
    /// Reads that failed and were skipped
    pub failed: u64,
}

/// Handle to a running capture task
pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    join: JoinHandle<Result<CaptureStats, CameraError>>,
}

impl CaptureHandle {
    /// Ask the capture loop to stop after the current read
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for the capture loop to exit
    pub async fn join(self) -> Result<CaptureStats, CameraError> {
        self.join
            .await
            .map_err(|e| CameraError::Stream(format!("capture task failed: {}", e)))?
    }
}

/// Spawns capture loops
pub struct CaptureTask;

impl CaptureTask {
    /// Start `source` and deliver its frames into a bounded channel.
    ///
    /// `None` items are the no-frame sentinel. The channel closes when the
    /// source stops streaming, fails, or `stop` is requested.
    pub fn spawn<S>(
        mut source: S,
        config: &CaptureConfig,
    ) -> (mpsc::Receiver<Option<VideoFrame>>, CaptureHandle)
    where
        S: FrameSource + 'static,
    {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let config = config.clone();

        info!(
            "Starting capture task: capacity={}, drop_when_full={}",
            config.channel_capacity, config.drop_when_full
        );

        let join = tokio::task::spawn_blocking(move || {
            let result = capture_loop(&mut source, &tx, &stop_flag, &config);
            source.stop();
            match &result {
                Ok(stats) => info!("Capture stopped: {:?}", stats),
                Err(e) => error!("Capture failed: {}", e),
            }
            result
        });

        (rx, CaptureHandle { stop, join })
    }
}

fn capture_loop<S: FrameSource>(
    source: &mut S,
    tx: &mpsc::Sender<Option<VideoFrame>>,
    stop: &AtomicBool,
    config: &CaptureConfig,
) -> Result<CaptureStats, CameraError> {
    let mut stats = CaptureStats::default();
    let mut consecutive_failures = 0;
    source.start()?;

    while source.is_streaming() && !stop.load(Ordering::SeqCst) {
        let frame = match source.read_frame() {
            Ok(frame) => {
                consecutive_failures = 0;
                frame
            }
            Err(CameraError::NotInitialized) => return Err(CameraError::NotInitialized),
            Err(e) => {
                stats.failed += 1;
                consecutive_failures += 1;
                if consecutive_failures > config.max_consecutive_failures {
                    return Err(e);
                }
                warn!("Frame read failed, skipping: {}", e);
                continue;
            }
        };
        if frame.is_none() {
            if !source.is_streaming() {
                break;
            }
            stats.empty += 1;
        }

        let delivered = frame.is_some();
        if config.drop_when_full {
            match tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    stats.dropped += 1;
                    debug!("Processing behind, frame dropped");
                    continue;
                }
                Err(TrySendError::Closed(_)) => break,
            }
        } else if tx.blocking_send(frame).is_err() {
            break;
        }

        if delivered {
            stats.captured += 1;
        }
    }

    if stop.load(Ordering::SeqCst) {
        debug!("Capture stop requested");
    } else if !source.is_streaming() {
        warn!("Frame source ended");
    }

    Ok(stats)
}
