use anyhow::{Context, Result};
use image::RgbImage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::tracking::{SessionController, SessionStatus};

use super::capabilities::{
    ContactPoint, ContactTracker, FramePacket, FrameSource, ObjectDetector,
};
use super::localizer::SurfaceLocalizer;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// The vision collaborators the frame loop drives.
#[derive(Clone)]
pub struct Capabilities {
    pub detector: Option<Arc<dyn ObjectDetector>>,
    pub tracker: Arc<dyn ContactTracker>,
    pub localizer: SurfaceLocalizer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLoopStats {
    pub frames_seen: u64,
    pub frames_localized: u64,
    pub frames_tracked: u64,
    pub frames_dropped: u64,
}

/// Consume frames until cancelled or the channel closes. Idle frames refresh
/// the surface preview; recording frames feed contacts to the accumulator.
pub async fn frame_loop(
    controller: SessionController,
    capabilities: Capabilities,
    mut frames: mpsc::Receiver<FramePacket>,
    cancel_token: CancellationToken,
) -> FrameLoopStats {
    let mut stats = FrameLoopStats::default();
    let mut last_sequence: Option<u64> = None;
    let verbose = controller.station().debug;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_info!("frame loop shutting down");
                break;
            }
            packet = frames.recv() => {
                let Some(packet) = packet else {
                    log_info!("frame source closed, frame loop exiting");
                    break;
                };
                stats.frames_seen += 1;

                if last_sequence.is_some_and(|last| packet.sequence <= last) {
                    log_warn!(
                        "dropping out-of-order frame {} (last processed {:?})",
                        packet.sequence,
                        last_sequence
                    );
                    stats.frames_dropped += 1;
                    continue;
                }
                last_sequence = Some(packet.sequence);

                match process_frame(&controller, &capabilities, packet.frame).await {
                    Ok(FrameOutcome::Localized) => stats.frames_localized += 1,
                    Ok(FrameOutcome::Tracked(contacts)) => {
                        stats.frames_tracked += 1;
                        if verbose {
                            log_debug!("frame {}: {} contact(s)", packet.sequence, contacts);
                        }
                    }
                    Ok(FrameOutcome::Skipped) => {}
                    Err(err) => log_error!("frame {} failed: {err:?}", packet.sequence),
                }
            }
        }
    }

    stats
}

enum FrameOutcome {
    Localized,
    Tracked(usize),
    Skipped,
}

async fn process_frame(
    controller: &SessionController,
    capabilities: &Capabilities,
    frame: Arc<RgbImage>,
) -> Result<FrameOutcome> {
    let (width, height) = frame.dimensions();

    match controller.status().await {
        SessionStatus::Idle => {
            let localizer = capabilities.localizer.clone();
            let detector = capabilities.detector.clone();
            let found = tokio::task::spawn_blocking(move || {
                localizer.localize(&frame, detector.as_deref())
            })
            .await
            .context("localizer worker join failed")?;

            controller.update_preview(width, height, found).await;
            Ok(FrameOutcome::Localized)
        }
        SessionStatus::Recording => {
            let tracker = Arc::clone(&capabilities.tracker);
            let tracked = tokio::task::spawn_blocking(move || tracker.track(&frame))
                .await
                .context("tracker worker join failed")?;

            let hands = match tracked {
                Ok(hands) => hands,
                Err(err) => {
                    log_warn!("contact tracker failed, skipping frame: {err:?}");
                    return Ok(FrameOutcome::Skipped);
                }
            };

            let scale = controller.accumulator_config().landmark_radius_scale;
            let contacts: Vec<ContactPoint> = hands
                .iter()
                .filter_map(|hand| hand.to_contact(width, height, scale))
                .collect();
            if contacts.is_empty() {
                return Ok(FrameOutcome::Skipped);
            }

            if controller.apply_contacts(&contacts).await {
                Ok(FrameOutcome::Tracked(contacts.len()))
            } else {
                Ok(FrameOutcome::Skipped)
            }
        }
        SessionStatus::Finished => Ok(FrameOutcome::Skipped),
    }
}

/// Pull frames from a blocking source into the loop's channel, numbering them
/// in capture order. Resolves to the number of frames sent.
pub fn pump_frames(
    mut source: Box<dyn FrameSource>,
    tx: mpsc::Sender<FramePacket>,
    cancel_token: CancellationToken,
) -> JoinHandle<Result<u64>> {
    tokio::task::spawn_blocking(move || {
        let mut sequence = 0u64;
        while !cancel_token.is_cancelled() {
            let Some(frame) = source.next_frame().context("frame source failed")? else {
                break;
            };
            let packet = FramePacket {
                sequence,
                frame: Arc::new(frame),
            };
            if tx.blocking_send(packet).is_err() {
                break;
            }
            sequence += 1;
        }
        Ok(sequence)
    })
}
