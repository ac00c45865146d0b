use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Rider preferences the playback session reads at `init`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RideSettings {
    #[serde(default)]
    pub ftp: Option<f64>,
    #[serde(default)]
    pub use_erg_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    #[serde(default)]
    ride: RideSettings,
}

/// JSON-file-backed preferences. Without a path nothing is persisted.
pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn in_memory(ride: RideSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(UserSettings { ride }),
        }
    }

    pub fn ride_settings(&self) -> Result<RideSettings> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        Ok(guard.ride)
    }

    pub fn update_ride_settings(&self, settings: RideSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        guard.ride = settings;
        self.persist(&guard)
    }

    pub fn set_ftp(&self, ftp: f64) -> Result<()> {
        if !(ftp.is_finite() && ftp > 0.0) {
            return Err(anyhow!("ftp must be a positive number, got {ftp}"));
        }
        let mut settings = self.ride_settings()?;
        settings.ftp = Some(ftp);
        self.update_ride_settings(settings)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = fs::read_to_string(path)?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = data;
        Ok(())
    }
}
