//! Static per-surface-type configuration: output grid size and the rule that
//! marks infection-critical cells.

use std::{collections::BTreeMap, fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

pub const DEFAULT_SURFACE_TYPE: &str = "tray";

/// Where the contact-critical zones sit on a surface archetype.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HighTouchPattern {
    /// Top `band` rows plus left `band` columns (flat tray-like surfaces).
    TopLeftBands { band: usize },
    /// First and last `band` columns (long rail-like surfaces).
    EndBands { band: usize },
    /// Middle third in both directions (compact handle-like surfaces).
    CentralBlock,
}

impl HighTouchPattern {
    /// Built-in rule for a surface type. Unknown types get the central block.
    pub fn for_surface_type(surface_type: &str) -> Self {
        match surface_type {
            "tray" => HighTouchPattern::TopLeftBands { band: 3 },
            "bedrail" => HighTouchPattern::EndBands { band: 5 },
            _ => HighTouchPattern::CentralBlock,
        }
    }

    fn band(&self) -> Option<usize> {
        match self {
            HighTouchPattern::TopLeftBands { band } | HighTouchPattern::EndBands { band } => {
                Some(*band)
            }
            HighTouchPattern::CentralBlock => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurfaceProfile {
    pub grid_h: usize,
    pub grid_w: usize,
    pub pattern: HighTouchPattern,
}

impl SurfaceProfile {
    pub fn new(grid_h: usize, grid_w: usize, pattern: HighTouchPattern) -> Self {
        Self {
            grid_h,
            grid_w,
            pattern,
        }
    }

    fn validate(&self, surface_type: &str) -> Result<(), ProfileError> {
        if self.grid_h == 0 || self.grid_w == 0 {
            return Err(ProfileError::NonPositiveDimensions {
                surface_type: surface_type.to_string(),
                grid_h: self.grid_h,
                grid_w: self.grid_w,
            });
        }
        if self.pattern.band() == Some(0) {
            return Err(ProfileError::EmptyBand(surface_type.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfilesFile {
    profiles: BTreeMap<String, SurfaceProfile>,
}

/// Immutable registry loaded once at startup.
#[derive(Debug, Clone)]
pub struct SurfaceProfiles {
    profiles: BTreeMap<String, SurfaceProfile>,
}

impl Default for SurfaceProfiles {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        for (surface_type, grid_h, grid_w) in [("tray", 20, 30), ("bedrail", 10, 40), ("handle", 12, 12)]
        {
            profiles.insert(
                surface_type.to_string(),
                SurfaceProfile::new(grid_h, grid_w, HighTouchPattern::for_surface_type(surface_type)),
            );
        }
        Self { profiles }
    }
}

impl SurfaceProfiles {
    /// Validate every entry; any malformed profile rejects the whole set.
    pub fn from_map(profiles: BTreeMap<String, SurfaceProfile>) -> Result<Self, ProfileError> {
        for (surface_type, profile) in &profiles {
            profile.validate(surface_type)?;
        }
        Ok(Self { profiles })
    }

    pub fn from_json(contents: &str) -> Result<Self, ProfileError> {
        let file: ProfilesFile = serde_json::from_str(contents)?;
        Self::from_map(file.profiles)
    }

    /// Built-in profiles when `path` does not exist, otherwise the file's.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if !path.exists() {
            info!(
                "No surface profile file at {}, using built-in profiles",
                path.display()
            );
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let profiles = Self::from_json(&contents)?;
        info!(
            "Loaded {} surface profiles from {}",
            profiles.profiles.len(),
            path.display()
        );
        Ok(profiles)
    }

    pub fn get(&self, surface_type: &str) -> Result<&SurfaceProfile, ProfileError> {
        self.profiles
            .get(surface_type)
            .ok_or_else(|| ProfileError::UnknownSurfaceType(surface_type.to_string()))
    }

    /// The profile for `surface_type`. Unregistered types borrow the tray's
    /// grid size (or the built-in 20×30) but keep their own high-touch rule.
    pub fn resolve_or_default(&self, surface_type: &str) -> SurfaceProfile {
        if let Some(profile) = self.profiles.get(surface_type) {
            return *profile;
        }
        let (grid_h, grid_w) = self
            .profiles
            .get(DEFAULT_SURFACE_TYPE)
            .map_or((20, 30), |tray| (tray.grid_h, tray.grid_w));
        SurfaceProfile::new(grid_h, grid_w, HighTouchPattern::for_surface_type(surface_type))
    }

    pub fn surface_types(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
