use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::sensing::{LocalizerStage, SurfaceBox};

use super::heatmap::{AccumulatorConfig, ContactAccumulator, Heatmap, SurfaceMask};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Recording,
    Finished,
}

/// Latest localizer result seen while idle; what a session would start on.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSurface {
    pub frame_width: u32,
    pub frame_height: u32,
    pub stage: LocalizerStage,
    pub boxes: Vec<SurfaceBox>,
}

/// Everything `finish` hands out of the lock for discretization.
#[derive(Debug)]
pub struct FrozenSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub heatmap: Heatmap,
    pub mask: SurfaceMask,
    pub boxes: Vec<SurfaceBox>,
    pub frames_applied: u64,
}

/// The single in-flight session. Only ever touched through the controller's
/// mutex.
#[derive(Debug, Default)]
pub struct TrackerState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub started_instant: Option<Instant>,
    pub preview: Option<PreviewSurface>,
    /// Boxes captured at start; fixed for the session.
    pub surface_boxes: Vec<SurfaceBox>,
    pub accumulator: Option<ContactAccumulator>,
    pub coverage_percent: f64,
    pub high_touch_done: bool,
    pub frames_applied: u64,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate mask and heatmap from the preview. The preview itself is kept
    /// so the surface stays visible after reset.
    pub fn begin_session(
        &mut self,
        session_id: String,
        started_at: DateTime<Utc>,
        now: Instant,
        preview: &PreviewSurface,
        config: AccumulatorConfig,
    ) {
        let mask = SurfaceMask::from_boxes(preview.frame_width, preview.frame_height, &preview.boxes);
        self.status = SessionStatus::Recording;
        self.session_id = Some(session_id);
        self.started_at = Some(started_at);
        self.started_instant = Some(now);
        self.surface_boxes = preview.boxes.clone();
        self.accumulator = Some(ContactAccumulator::new(mask, config));
        self.coverage_percent = 0.0;
        self.high_touch_done = false;
        self.frames_applied = 0;
    }

    /// Move to `Finished` and take the session-scoped data out. `None` when
    /// the bundle is incomplete, which only a bug can cause.
    pub fn finish(&mut self) -> Option<FrozenSession> {
        self.status = SessionStatus::Finished;
        let (heatmap, mask) = self.accumulator.take()?.freeze();
        Some(FrozenSession {
            session_id: self.session_id.take()?,
            started_at: self.started_at.take()?,
            heatmap,
            mask,
            boxes: std::mem::take(&mut self.surface_boxes),
            frames_applied: self.frames_applied,
        })
    }

    /// Back to a startable idle state. Keeps the preview.
    pub fn reset(&mut self) {
        let preview = self.preview.take();
        *self = Self {
            preview,
            ..Self::default()
        };
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            elapsed_secs: self
                .started_instant
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0),
            coverage_percent: self.coverage_percent,
            high_touch_done: self.high_touch_done,
            frames_applied: self.frames_applied,
            surface_stage: self.preview.as_ref().map(|p| p.stage),
            surface_boxes: self
                .preview
                .as_ref()
                .map(|p| p.boxes.len())
                .unwrap_or(0),
        }
    }
}

/// Primitive copy of the state for status reporting; no pixel buffers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: f64,
    pub coverage_percent: f64,
    /// Advisory edge-band signal, never persisted.
    pub high_touch_done: bool,
    pub frames_applied: u64,
    pub surface_stage: Option<LocalizerStage>,
    pub surface_boxes: usize,
}
