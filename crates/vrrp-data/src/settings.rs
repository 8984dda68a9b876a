//! Settings for the VRRP configuration store

use crate::types::{DEFAULT_ADVERT_INTERVAL, DEFAULT_DESCRIPTOR_BUCKETS, DEFAULT_PRIORITY};
use common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub indexes: IndexSettings,

    #[serde(default)]
    pub instance_defaults: InstanceDefaults,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Settings {
    fn validate(&self) -> std::result::Result<(), validator::ValidationErrors> {
        self.indexes.validate()?;
        self.instance_defaults.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Dispatch index sizing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IndexSettings {
    /// Descriptors at or above this value are not indexed
    #[validate(range(min = 1, max = 65536))]
    pub descriptor_buckets: usize,
}

/// Values applied to every new instance
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct InstanceDefaults {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_advert_interval")]
    pub advert_interval: Duration,

    #[validate(range(min = 1, max = 255))]
    pub priority: u8,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoggingSettings {
    pub level: Option<String>,

    #[validate(custom = "validate_log_format")]
    pub format: Option<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            descriptor_buckets: DEFAULT_DESCRIPTOR_BUCKETS,
        }
    }
}

impl Default for InstanceDefaults {
    fn default() -> Self {
        Self {
            advert_interval: DEFAULT_ADVERT_INTERVAL,
            priority: DEFAULT_PRIORITY,
        }
    }
}

// Custom validators

fn validate_advert_interval(interval: &Duration) -> std::result::Result<(), ValidationError> {
    let millis = interval.as_millis();
    if !(10..=255_000).contains(&millis) {
        return Err(ValidationError::new("advert_interval_out_of_range"));
    }
    Ok(())
}

fn validate_log_format(format: &str) -> std::result::Result<(), ValidationError> {
    match format {
        "text" | "json" => Ok(()),
        _ => Err(ValidationError::new("log_format_unknown")),
    }
}

impl LoggingSettings {
    /// Install the tracing subscriber described by these settings.
    pub fn init_tracing(&self) {
        let level = self.level.as_deref().unwrap_or("info");
        let json = self.format.as_deref() == Some("json");
        common::logging::init_with(level, json);
    }
}

impl Settings {
    /// Load settings from default search paths
    pub fn load() -> Result<Self> {
        match Self::find_settings_file() {
            Some(path) => {
                tracing::info!("Loading settings from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate settings from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(contents)?;
        settings.validate().map_err(Error::config)?;
        Ok(settings)
    }

    /// Find settings file in standard locations
    fn find_settings_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/seesaw/vrrp-data.yaml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config/seesaw/vrrp-data.yaml"));
        }

        paths.push(PathBuf::from("./vrrp-data.yaml"));

        paths.into_iter().find(|p| p.is_file())
    }
}
