//! Frame pipeline: process, convert and show each captured frame

use std::future::Future;

use camera_capture::VideoFrame;
use display::{BitmapConverter, DisplaySink, StatusLabel};
use dms::{DmsModule, EyeDetector, Status};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::MonitorError;

/// Counters for one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Frames shown with a status
    pub processed: u64,
    /// Cycles without a frame
    pub skipped: u64,
    /// Frames abandoned after an error
    pub failed: u64,
    /// Frames judged alert
    pub alert: u64,
    /// Frames judged drowsy
    pub drowsy: u64,
}

/// Per-frame processing chain
pub struct Pipeline<D> {
    dms: DmsModule<D>,
    converter: BitmapConverter,
    sinks: Vec<Box<dyn DisplaySink>>,
}

impl<D: EyeDetector> Pipeline<D> {
    pub fn new(
        dms: DmsModule<D>,
        converter: BitmapConverter,
        sinks: Vec<Box<dyn DisplaySink>>,
    ) -> Self {
        Self {
            dms,
            converter,
            sinks,
        }
    }

    /// Handle one capture cycle; `Ok(None)` when there was nothing to show
    pub fn handle_frame(
        &mut self,
        frame: Option<VideoFrame>,
    ) -> Result<Option<Status>, MonitorError> {
        let Some(processed) = self.dms.process(frame)? else {
            return Ok(None);
        };

        let bitmap = self.converter.to_bitmap(&processed.frame)?;
        let status = processed.analysis.status;
        let label = StatusLabel::from(status);

        for sink in &mut self.sinks {
            sink.show(&bitmap, &label, &processed.analysis)?;
        }

        Ok(Some(status))
    }

    /// Pull frames until the channel closes or `shutdown` resolves
    pub async fn run<F>(
        &mut self,
        mut frames: mpsc::Receiver<Option<VideoFrame>>,
        shutdown: F,
    ) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let mut summary = RunSummary::default();
        tokio::pin!(shutdown);

        info!("Pipeline running");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                item = frames.recv() => {
                    let Some(frame) = item else {
                        info!("Frame channel closed");
                        break;
                    };
                    self.record(frame, &mut summary);
                }
            }
        }

        summary
    }

    fn record(&mut self, frame: Option<VideoFrame>, summary: &mut RunSummary) {
        let sequence = frame.as_ref().map(|f| f.sequence);
        match self.handle_frame(frame) {
            Ok(Some(status)) => {
                summary.processed += 1;
                match status {
                    Status::Alert => summary.alert += 1,
                    Status::Drowsy => summary.drowsy += 1,
                }
            }
            Ok(None) => {
                debug!("Cycle skipped");
                summary.skipped += 1;
            }
            Err(e) => {
                warn!("Frame {:?} dropped: {}", sequence, e);
                summary.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::PixelFormat;
    use display::{AccelerationMode, DisplayError};
    use dms::detector::{self, DetectionParams};
    use dms::{DmsConfig, DmsError, EyeRegion, FrameAnalysis};
    use image::{GrayImage, RgbaImage};
    use std::sync::{Arc, Mutex};

    /// Sink that records every label it is shown
    struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    impl DisplaySink for Recorder {
        fn show(
            &mut self,
            _bitmap: &RgbaImage,
            label: &StatusLabel,
            _analysis: &FrameAnalysis,
        ) -> Result<(), DisplayError> {
            self.0.lock().unwrap().push(label.text);
            Ok(())
        }
    }

    fn frame(sequence: u32) -> VideoFrame {
        VideoFrame::new(vec![90; 16 * 16 * 3], 16, 16, PixelFormat::Bgr24, 0, sequence)
    }

    fn eye() -> EyeRegion {
        EyeRegion {
            x: 2,
            y: 2,
            width: 4,
            height: 4,
        }
    }

    /// Detector replays `script` in call order: `Some(n)` finds n eyes,
    /// `None` fails
    fn pipeline(
        mode: AccelerationMode,
        script: Vec<Option<usize>>,
    ) -> (Pipeline<impl EyeDetector>, Arc<Mutex<Vec<&'static str>>>) {
        let mut script = script.into_iter();
        let detector = detector::from_fn(move |_: &GrayImage, _: &DetectionParams| {
            match script.next().flatten() {
                Some(n) => Ok(vec![eye(); n]),
                None => Err(DmsError::Detection("model crashed".into())),
            }
        });
        let dms = DmsModule::new(DmsConfig::default(), detector).unwrap();
        let shown = Arc::new(Mutex::new(Vec::new()));
        let sinks: Vec<Box<dyn DisplaySink>> = vec![Box::new(Recorder(shown.clone()))];
        (
            Pipeline::new(dms, BitmapConverter::new(mode), sinks),
            shown,
        )
    }

    #[tokio::test]
    async fn test_run_until_channel_closes() {
        let (mut pipeline, shown) =
            pipeline(AccelerationMode::Cpu, vec![Some(2), Some(0), Some(1)]);
        let (tx, rx) = mpsc::channel(8);

        tx.send(Some(frame(0))).await.unwrap();
        tx.send(None).await.unwrap();
        tx.send(Some(frame(1))).await.unwrap();
        tx.send(Some(frame(2))).await.unwrap();
        drop(tx);

        let summary = pipeline.run(rx, std::future::pending()).await;

        assert_eq!(
            summary,
            RunSummary {
                processed: 3,
                skipped: 1,
                failed: 0,
                alert: 2,
                drowsy: 1,
            }
        );
        assert_eq!(*shown.lock().unwrap(), vec!["Alert", "Drowsy!", "Alert"]);
    }

    #[tokio::test]
    async fn test_failed_frame_does_not_stop_run() {
        let (mut pipeline, shown) = pipeline(AccelerationMode::Cpu, vec![None, Some(1)]);
        let (tx, rx) = mpsc::channel(8);

        tx.send(Some(frame(0))).await.unwrap();
        tx.send(Some(frame(1))).await.unwrap();
        drop(tx);

        let summary = pipeline.run(rx, std::future::pending()).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 1);
        assert_eq!(*shown.lock().unwrap(), vec!["Alert"]);
    }

    #[cfg(not(feature = "opencv"))]
    #[tokio::test]
    async fn test_misconfigured_display_fails_each_frame() {
        let (mut pipeline, shown) =
            pipeline(AccelerationMode::OpenCl, vec![Some(1), Some(0)]);
        let (tx, rx) = mpsc::channel(8);

        tx.send(Some(frame(0))).await.unwrap();
        tx.send(Some(frame(1))).await.unwrap();
        drop(tx);

        let summary = pipeline.run(rx, std::future::pending()).await;
        assert_eq!(summary.failed, 2);
        assert!(shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let (mut pipeline, _shown) = pipeline(AccelerationMode::Cpu, vec![]);
        let (_tx, rx) = mpsc::channel::<Option<VideoFrame>>(1);

        let summary = pipeline.run(rx, async {}).await;
        assert_eq!(summary, RunSummary::default());
    }
}
