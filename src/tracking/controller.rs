use std::{sync::Arc, time::Instant};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    delivery::{spawn_delivery, SessionSink},
    grid::{heatmap_to_grid, high_touch_mask},
    models::SessionRecord,
    profiles::SurfaceProfiles,
    sensing::{ContactPoint, Localization, SurfaceBox},
    settings::StationSettings,
};

use super::heatmap::AccumulatorConfig;
use super::state::{FrozenSession, PreviewSurface, SessionSnapshot, SessionStatus, TrackerState};

/// Shared handle over the one in-flight session. The frame loop and the
/// start/stop control path hold clones of the same controller.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<TrackerState>>,
    station: Arc<StationSettings>,
    profiles: Arc<SurfaceProfiles>,
    sink: Arc<dyn SessionSink>,
}

impl SessionController {
    pub fn new(
        station: StationSettings,
        profiles: SurfaceProfiles,
        sink: Arc<dyn SessionSink>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState::new())),
            station: Arc::new(station),
            profiles: Arc::new(profiles),
            sink,
        }
    }

    pub fn station(&self) -> &StationSettings {
        &self.station
    }

    pub fn accumulator_config(&self) -> AccumulatorConfig {
        self.station.accumulator
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Record the latest surface candidates. Ignored unless idle: the boxes a
    /// session records on are fixed at start.
    pub async fn update_preview(&self, frame_width: u32, frame_height: u32, found: Localization) {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Idle {
            return;
        }
        state.preview = Some(PreviewSurface {
            frame_width,
            frame_height,
            stage: found.stage,
            boxes: found.boxes,
        });
    }

    /// Accumulate one frame's contacts. Returns false when not recording.
    pub async fn apply_contacts(&self, contacts: &[ContactPoint]) -> bool {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Recording {
            return false;
        }
        let Some(acc) = state.accumulator.as_mut() else {
            return false;
        };

        for contact in contacts {
            acc.apply(*contact);
        }
        let coverage = acc.live_coverage_percent();
        let high_touch_done = acc.high_touch_done();

        state.coverage_percent = coverage;
        state.high_touch_done = high_touch_done;
        state.frames_applied += 1;
        true
    }

    pub async fn start_session(&self) -> Result<SessionSnapshot> {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Idle {
            bail!("session already recording");
        }
        let preview = match state.preview.clone() {
            Some(preview) if !preview.boxes.is_empty() => preview,
            _ => bail!("no surface detected; cannot start session"),
        };

        let session_id = Uuid::new_v4().to_string();
        state.begin_session(
            session_id.clone(),
            Utc::now(),
            Instant::now(),
            &preview,
            self.station.accumulator,
        );
        info!(
            "Session {} started on {} box(es), frame {}x{}",
            session_id,
            preview.boxes.len(),
            preview.frame_width,
            preview.frame_height
        );
        Ok(state.snapshot())
    }

    /// Finish the recording, hand the record to the sink without waiting on
    /// it, and return to idle.
    pub async fn stop_session(&self) -> Result<SessionRecord> {
        let ended_at = Utc::now();

        let frozen = {
            let mut state = self.state.lock().await;
            if state.status != SessionStatus::Recording {
                bail!("no active session to stop");
            }
            match state.finish() {
                Some(frozen) => frozen,
                None => {
                    state.reset();
                    bail!("session state was incomplete at stop");
                }
            }
        };

        let built = self.build_record(frozen, ended_at);
        match &built {
            Ok(record) => {
                info!(
                    "Session {} finished after {:.1}s, grid {}x{}",
                    record.session_id,
                    record.duration_secs(),
                    record.grid_h,
                    record.grid_w
                );
                spawn_delivery(Arc::clone(&self.sink), record.clone());
            }
            Err(err) => error!("Failed to assemble session record: {err:?}"),
        }

        self.state.lock().await.reset();
        built
    }

    fn build_record(&self, frozen: FrozenSession, ended_at: DateTime<Utc>) -> Result<SessionRecord> {
        let surface = SurfaceBox::largest(&frozen.boxes)
            .ok_or_else(|| anyhow!("session {} has no surface box", frozen.session_id))?;

        let surface_type = self.station.surface_type.clone();
        let profile = self.profiles.resolve_or_default(&surface_type);
        let grid = heatmap_to_grid(&frozen.heatmap, surface, profile.grid_h, profile.grid_w);
        let mask = high_touch_mask(profile.pattern, profile.grid_h, profile.grid_w);

        Ok(SessionRecord {
            session_id: frozen.session_id,
            surface_id: self.station.surface_id.clone(),
            surface_type,
            room_id: self.station.room_id.clone(),
            cleaner_id: self.station.cleaner_id.clone(),
            start_time: frozen.started_at,
            end_time: ended_at,
            grid_h: profile.grid_h,
            grid_w: profile.grid_w,
            coverage_count_grid: grid.to_rows(),
            high_touch_mask: Some(mask.to_wire()),
            wipe_events: Some(Vec::new()),
            camera_id: self.station.camera_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::ChannelSink;
    use crate::sensing::LocalizerStage;
    use std::time::Duration;

    fn controller() -> (SessionController, tokio::sync::mpsc::UnboundedReceiver<SessionRecord>) {
        controller_for(StationSettings::default())
    }

    fn controller_for(
        station: StationSettings,
    ) -> (SessionController, tokio::sync::mpsc::UnboundedReceiver<SessionRecord>) {
        let (sink, rx) = ChannelSink::new();
        let controller =
            SessionController::new(station, SurfaceProfiles::default(), Arc::new(sink));
        (controller, rx)
    }

    fn whole_frame(width: u32, height: u32) -> Localization {
        Localization {
            stage: LocalizerStage::TargetClass,
            boxes: vec![
                SurfaceBox::new(0, 0, 10, 10),
                SurfaceBox::new(0, 0, width as i32, height as i32),
            ],
        }
    }

    #[tokio::test]
    async fn start_requires_a_surface() {
        let (controller, _rx) = controller();
        let err = controller.start_session().await.unwrap_err();
        assert!(err.to_string().contains("no surface"));
        assert_eq!(controller.status().await, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn start_twice_fails_and_stop_while_idle_fails() {
        let (controller, _rx) = controller();
        assert!(controller.stop_session().await.is_err());

        controller.update_preview(60, 40, whole_frame(60, 40)).await;
        controller.start_session().await.unwrap();
        assert!(controller.start_session().await.is_err());
        assert_eq!(controller.status().await, SessionStatus::Recording);
    }

    #[tokio::test]
    async fn contacts_are_ignored_while_idle() {
        let (controller, _rx) = controller();
        let applied = controller
            .apply_contacts(&[ContactPoint { x: 5, y: 5, radius: 3 }])
            .await;
        assert!(!applied);
    }

    #[tokio::test]
    async fn stop_delivers_record_and_resets() {
        let (controller, mut rx) = controller();
        controller.update_preview(60, 40, whole_frame(60, 40)).await;
        let started = controller.start_session().await.unwrap();

        for _ in 0..60 {
            assert!(controller
                .apply_contacts(&[ContactPoint { x: 30, y: 20, radius: 100 }])
                .await);
        }
        let snap = controller.snapshot().await;
        assert!((snap.coverage_percent - 100.0).abs() < 1e-9);
        assert_eq!(snap.frames_applied, 60);

        let record = controller.stop_session().await.unwrap();
        assert_eq!(Some(record.session_id.clone()), started.session_id);
        assert_eq!((record.grid_h, record.grid_w), (20, 30));
        assert_eq!(record.coverage_count_grid.len(), 20);
        assert!(record.coverage_count_grid.iter().all(|row| row.iter().all(|v| *v == 10)));
        assert_eq!(record.wipe_events, Some(Vec::new()));
        assert!(record.end_time >= record.start_time);

        // Back to idle with the preview kept, so the next session can start.
        assert_eq!(controller.status().await, SessionStatus::Idle);
        controller.start_session().await.unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered, record);
    }

    #[tokio::test]
    async fn preview_is_frozen_while_recording() {
        let (controller, _rx) = controller();
        controller.update_preview(60, 40, whole_frame(60, 40)).await;
        controller.start_session().await.unwrap();

        controller
            .update_preview(
                60,
                40,
                Localization {
                    stage: LocalizerStage::Fallback,
                    boxes: vec![SurfaceBox::new(1, 1, 2, 2)],
                },
            )
            .await;
        let snap = controller.snapshot().await;
        assert_eq!(snap.surface_stage, Some(LocalizerStage::TargetClass));
        assert_eq!(snap.surface_boxes, 2);
    }

    #[tokio::test]
    async fn unregistered_surface_keeps_its_own_high_touch_rule() {
        let station = StationSettings {
            surface_type: "sink".into(),
            ..StationSettings::default()
        };
        let (controller, _rx) = controller_for(station);
        controller.update_preview(60, 40, whole_frame(60, 40)).await;
        controller.start_session().await.unwrap();

        let record = controller.stop_session().await.unwrap();
        assert_eq!(record.surface_type, "sink");
        assert_eq!((record.grid_h, record.grid_w), (20, 30));

        let mask = record.high_touch_mask.unwrap();
        assert!(mask[0].iter().all(|v| *v == 0));
        for (r, row) in mask.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                let central = (6..13).contains(&r) && (10..20).contains(&c);
                assert_eq!(*v, u8::from(central), "cell ({r}, {c})");
            }
        }
    }
}
