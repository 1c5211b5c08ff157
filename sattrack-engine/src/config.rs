use anyhow::Context;
use sattrack_common::GeoLocation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "SATTRACK_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub observer: ObserverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Delay between calculation ticks
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Calculation ticks per `satellite-data-updated` notification
    #[serde(default = "default_throttle_interval")]
    pub throttle_interval: u32,

    /// Three-line element file loaded at startup
    #[serde(default)]
    pub elements_file: Option<String>,

    /// NORAD catalog numbers selected at startup
    #[serde(default)]
    pub initial_selection: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    #[serde(default = "default_observer_name")]
    pub name: String,

    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    #[serde(default)]
    pub elevation_m: Option<f64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_retention_days() -> u64 {
    3
}

fn default_refresh_interval_ms() -> u64 {
    1000
}

fn default_throttle_interval() -> u32 {
    1
}

fn default_observer_name() -> String {
    "Home".to_string()
}

fn default_latitude() -> f64 {
    51.4779
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_retention_days: default_log_retention_days(),
            tracking: TrackingConfig::default(),
            observer: ObserverConfig::default(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            throttle_interval: default_throttle_interval(),
            elements_file: None,
            initial_selection: Vec::new(),
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            name: default_observer_name(),
            latitude: default_latitude(),
            longitude: 0.0,
            elevation_m: None,
        }
    }
}

impl ObserverConfig {
    pub fn location(&self) -> GeoLocation {
        GeoLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            elevation_m: self.elevation_m,
        }
    }
}

impl TrackerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: TrackerConfig = toml::from_str(content)?;
        Ok(config)
    }
}

pub static CONFIG: OnceLock<TrackerConfig> = OnceLock::new();

/// Load the config file into [`CONFIG`]. A missing file means defaults.
///
/// Returns the path that was read, or `None` when defaults were used.
/// Logging is not up yet when this runs, so the caller reports it.
pub fn read_config() -> anyhow::Result<Option<String>> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let (config, source) = if Path::new(&path).exists() {
        (TrackerConfig::from_file(&path)?, Some(path))
    } else {
        (TrackerConfig::default(), None)
    };

    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Configuration already loaded"))?;

    Ok(source)
}

/// Live tracking settings, read fresh by the scheduler on every tick
#[derive(Debug)]
pub struct TrackingSettings {
    refresh_interval_ms: AtomicU64,
    throttle_interval: AtomicU32,
}

impl TrackingSettings {
    pub fn new(refresh_interval_ms: u64, throttle_interval: u32) -> Self {
        Self {
            refresh_interval_ms: AtomicU64::new(refresh_interval_ms),
            throttle_interval: AtomicU32::new(throttle_interval),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_refresh_interval(&self, interval: Duration) {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.refresh_interval_ms.store(millis, Ordering::Relaxed);
    }

    pub fn throttle_interval(&self) -> u32 {
        self.throttle_interval.load(Ordering::Relaxed)
    }

    pub fn set_throttle_interval(&self, ticks: u32) {
        self.throttle_interval.store(ticks, Ordering::Relaxed);
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self::from(&TrackingConfig::default())
    }
}

impl From<&TrackingConfig> for TrackingSettings {
    fn from(config: &TrackingConfig) -> Self {
        Self::new(config.refresh_interval_ms, config.throttle_interval)
    }
}
