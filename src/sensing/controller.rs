use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::tracking::SessionController;

use super::capabilities::FrameSource;
use super::loop_worker::{frame_loop, pump_frames, Capabilities, FrameLoopStats};

/// Frames buffered between capture and processing.
const FRAME_CHANNEL_CAPACITY: usize = 4;

/// Owns the capture pump and frame loop tasks for one camera.
#[derive(Default)]
pub struct SensingController {
    loop_handle: Option<JoinHandle<FrameLoopStats>>,
    pump_handle: Option<JoinHandle<Result<u64>>>,
    cancel_token: Option<CancellationToken>,
}

impl SensingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.loop_handle.is_some()
    }

    pub fn start_sensing(
        &mut self,
        controller: SessionController,
        capabilities: Capabilities,
        source: Box<dyn FrameSource>,
    ) -> Result<()> {
        if self.loop_handle.is_some() {
            bail!("sensing already active");
        }

        let cancel_token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        let pump_handle = pump_frames(source, tx, cancel_token.clone());
        let loop_handle = tokio::spawn(frame_loop(controller, capabilities, rx, cancel_token.clone()));
        info!("Sensing started");

        self.pump_handle = Some(pump_handle);
        self.loop_handle = Some(loop_handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Wait for the source to run dry and the loop to drain it.
    pub async fn wait(&mut self) -> Result<FrameLoopStats> {
        self.join().await
    }

    pub async fn stop_sensing(&mut self) -> Result<FrameLoopStats> {
        if let Some(token) = self.cancel_token.as_ref() {
            token.cancel();
        }
        self.join().await
    }

    async fn join(&mut self) -> Result<FrameLoopStats> {
        self.cancel_token = None;

        let stats = match self.loop_handle.take() {
            Some(handle) => handle.await.context("frame loop task failed to join")?,
            None => FrameLoopStats::default(),
        };

        if let Some(handle) = self.pump_handle.take() {
            // The loop has exited, so the receiver is gone and the pump's
            // next send fails.
            match handle.await.context("frame pump task failed to join")? {
                Ok(sent) => info!("Frame pump sent {sent} frame(s)"),
                Err(err) => warn!("Frame pump stopped with error: {err:?}"),
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::ChannelSink;
    use crate::profiles::SurfaceProfiles;
    use crate::sensing::{ContactTracker, HandLandmarks, SurfaceLocalizer};
    use crate::settings::StationSettings;
    use image::RgbImage;
    use std::sync::Arc;

    struct NoHands;

    impl ContactTracker for NoHands {
        fn track(&self, _: &RgbImage) -> Result<Vec<HandLandmarks>> {
            Ok(Vec::new())
        }
    }

    struct Frames(u32);

    impl FrameSource for Frames {
        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            if self.0 == 0 {
                return Ok(None);
            }
            self.0 -= 1;
            Ok(Some(RgbImage::new(32, 24)))
        }
    }

    fn parts() -> (SessionController, Capabilities) {
        let (sink, _rx) = ChannelSink::new();
        let controller = SessionController::new(
            StationSettings::default(),
            SurfaceProfiles::default(),
            Arc::new(sink),
        );
        let capabilities = Capabilities {
            detector: None,
            tracker: Arc::new(NoHands),
            localizer: SurfaceLocalizer::default(),
        };
        (controller, capabilities)
    }

    #[tokio::test]
    async fn drains_source_and_rejects_double_start() {
        let (controller, capabilities) = parts();
        let mut sensing = SensingController::new();
        sensing
            .start_sensing(controller.clone(), capabilities.clone(), Box::new(Frames(5)))
            .unwrap();
        assert!(sensing
            .start_sensing(controller.clone(), capabilities, Box::new(Frames(1)))
            .is_err());

        let stats = sensing.wait().await.unwrap();
        assert_eq!(stats.frames_seen, 5);
        assert!(!sensing.is_running());
        assert!(controller.snapshot().await.surface_boxes > 0);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let mut sensing = SensingController::new();
        assert_eq!(sensing.stop_sensing().await.unwrap(), FrameLoopStats::default());
    }
}
