use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::analytics::{run_pipeline, PipelineInput, ScoringConfig};
use crate::models::{SessionMetrics, SessionRecord};

use super::validation::IngestValidator;

/// Receiver of finished session records. Implementations may block; they are
/// always called off the async runtime.
pub trait SessionSink: Send + Sync {
    fn deliver(&self, record: &SessionRecord) -> Result<()>;
}

/// Best-effort single attempt, not awaited by the caller. Failures are logged
/// and go no further.
pub fn spawn_delivery(sink: Arc<dyn SessionSink>, record: SessionRecord) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || match sink.deliver(&record) {
        Ok(()) => info!("Delivered session {}", record.session_id),
        Err(err) => error!("Failed to deliver session {}: {err:?}", record.session_id),
    })
}

/// Forwards records into an in-process channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionSink for ChannelSink {
    fn deliver(&self, record: &SessionRecord) -> Result<()> {
        self.tx
            .send(record.clone())
            .map_err(|_| anyhow!("session receiver dropped"))
    }
}

/// Writes `<dir>/<session_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }
}

impl SessionSink for JsonFileSink {
    fn deliver(&self, record: &SessionRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(&record.session_id);
        let serialized = serde_json::to_string_pretty(record)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Failed to write session to {}", path.display()))
    }
}

/// The ingestion side in-process: validate, score, keep the metrics by
/// session id.
pub struct ScoringSink {
    validator: Mutex<IngestValidator>,
    config: ScoringConfig,
    metrics: Mutex<HashMap<String, SessionMetrics>>,
}

impl ScoringSink {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            validator: Mutex::new(IngestValidator::new()),
            config,
            metrics: Mutex::new(HashMap::new()),
        }
    }

    pub fn metrics_for(&self, session_id: &str) -> Option<SessionMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    pub fn scored(&self) -> usize {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl SessionSink for ScoringSink {
    fn deliver(&self, record: &SessionRecord) -> Result<()> {
        let accepted = self
            .validator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .accept(record.clone())
            .with_context(|| format!("Session {} rejected", record.session_id))?;

        let metrics = run_pipeline(
            PipelineInput {
                grid: &accepted.grid,
                mask: accepted.mask.as_ref(),
                wipe_events: accepted.record.wipe_events.as_deref(),
                duration_secs: accepted.record.duration_secs(),
                overwipe_threshold: self.config.overwipe_threshold,
            },
            &self.config,
        )?;

        info!(
            "Session {} scored {:.1} (coverage {:.1}%, worst risk {})",
            record.session_id,
            metrics.quality_score,
            metrics.coverage_percent,
            metrics.worst_risk.as_str()
        );
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.session_id.clone(), metrics);
        Ok(())
    }
}
