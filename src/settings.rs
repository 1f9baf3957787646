use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::error::SettingsError;
use crate::sensing::LocalizerConfig;
use crate::tracking::AccumulatorConfig;

/// Identity of the camera station plus per-station tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StationSettings {
    pub surface_id: String,
    pub surface_type: String,
    pub room_id: Option<String>,
    pub cleaner_id: Option<String>,
    pub camera_id: Option<String>,
    /// Verbose per-frame logging.
    pub debug: bool,
    pub localizer: LocalizerConfig,
    pub accumulator: AccumulatorConfig,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            surface_id: "TRAY_1".into(),
            surface_type: "tray".into(),
            room_id: None,
            cleaner_id: None,
            camera_id: Some("WEBCAM_1".into()),
            debug: false,
            localizer: LocalizerConfig::default(),
            accumulator: AccumulatorConfig::default(),
        }
    }
}

impl StationSettings {
    /// Tuning that would make every frame fail is rejected up front.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.localizer.validate()?;
        self.accumulator.validate()
    }

    /// Apply `CLEANSIGHT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(room) = lookup("CLEANSIGHT_ROOM_ID") {
            self.room_id = Some(room);
        }
        if let Some(surface_type) = lookup("CLEANSIGHT_SURFACE_TYPE") {
            self.surface_type = surface_type;
        }
        if let Some(cleaner) = lookup("CLEANSIGHT_CLEANER_ID") {
            self.cleaner_id = Some(cleaner);
        }
        if let Some(camera) = lookup("CLEANSIGHT_CAMERA_ID") {
            self.camera_id = Some(camera);
        }
        if let Some(debug) = lookup("CLEANSIGHT_DEBUG") {
            self.debug = debug == "1" || debug.eq_ignore_ascii_case("true");
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<StationSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unparseable settings at {}: {err}", path.display());
                StationSettings::default()
            })
        } else {
            StationSettings::default()
        };
        data.apply_env_overrides();
        data.validate()
            .with_context(|| format!("Invalid station settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn station(&self) -> StationSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_station(&self, settings: StationSettings) -> Result<()> {
        settings.validate().context("Refusing invalid station settings")?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: StationSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        data.validate()
            .with_context(|| format!("Invalid station settings in {}", self.path.display()))?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &StationSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
