// MIT License - Copyright (c) 2026 Peter Wright

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SpcError};

/// Entity categories the bridge publishes and controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Zones,
    Secteurs,
    Doors,
    Outputs,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Zones,
        Category::Secteurs,
        Category::Doors,
        Category::Outputs,
    ];

    /// The topic segment for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Zones => "zones",
            Category::Secteurs => "secteurs",
            Category::Doors => "doors",
            Category::Outputs => "outputs",
        }
    }

    pub fn from_topic_segment(s: &str) -> Option<Self> {
        match s {
            "zones" => Some(Category::Zones),
            "secteurs" => Some(Category::Secteurs),
            "doors" => Some(Category::Doors),
            "outputs" => Some(Category::Outputs),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category boolean matrix, used for both `information` and `controle`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub zones: bool,
    pub secteurs: bool,
    pub doors: bool,
    pub outputs: bool,
}

impl FeatureFlags {
    pub const fn all(enabled: bool) -> Self {
        Self {
            zones: enabled,
            secteurs: enabled,
            doors: enabled,
            outputs: enabled,
        }
    }

    pub fn get(&self, category: Category) -> bool {
        match category {
            Category::Zones => self.zones,
            Category::Secteurs => self.secteurs,
            Category::Doors => self.doors,
            Category::Outputs => self.outputs,
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::all(false)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub spc: SpcSection,
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub watchdog: WatchdogSection,
}

/// `spc:` section — panel connection and session persistence.
#[derive(Debug, Clone, Deserialize)]
pub struct SpcSection {
    /// Panel base URL, e.g. `http://192.168.1.10`.
    pub host: String,
    pub user: String,
    pub pin: String,
    #[serde(default = "default_language")]
    pub language: u32,
    #[serde(default = "default_cache_dir")]
    pub session_cache_dir: PathBuf,
    #[serde(default = "default_min_login_interval")]
    pub min_login_interval_sec: u64,
}

fn default_language() -> u32 {
    253
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("/var/lib/acre_exp")
}
fn default_min_login_interval() -> u64 {
    60
}

/// `mqtt:` section — broker connection and publish options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttSection {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub base_topic: String,
    pub client_id: String,
    pub qos: u8,
    pub retain: bool,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            user: String::new(),
            pass: String::new(),
            base_topic: "spc".to_string(),
            client_id: "spc42-watchdog".to_string(),
            qos: 0,
            retain: true,
        }
    }
}

/// `watchdog:` section — scan intervals and the feature-flag matrices.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchdogSection {
    /// Fast state-scan period, seconds (min 0.2).
    pub refresh_interval: f64,
    /// Controller-status scan period, seconds.
    pub controller_refresh_interval: f64,
    /// Log every published change at info level.
    pub log_changes: bool,
    pub information: FeatureFlags,
    pub controle: FeatureFlags,
}

impl Default for WatchdogSection {
    fn default() -> Self {
        Self {
            refresh_interval: 2.0,
            controller_refresh_interval: 60.0,
            log_changes: true,
            information: FeatureFlags::all(true),
            controle: FeatureFlags::all(false),
        }
    }
}

impl Config {
    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SpcError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Config = serde_yaml::from_str(&text)
            .map_err(|e| SpcError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn normalize(&mut self) {
        let host = self.spc.host.trim().trim_end_matches('/');
        self.spc.host = if host.is_empty() || host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        self.mqtt.base_topic = self.mqtt.base_topic.trim_matches('/').to_string();
    }

    fn validate(&self) -> Result<()> {
        if self.spc.host.is_empty() {
            return Err(SpcError::Config("spc.host is required".into()));
        }
        if self.mqtt.qos > 2 {
            return Err(SpcError::Config(format!(
                "mqtt.qos must be 0, 1 or 2 (got {})",
                self.mqtt.qos
            )));
        }
        if self.mqtt.base_topic.is_empty() {
            return Err(SpcError::Config("mqtt.base_topic must not be empty".into()));
        }
        if !self.watchdog.refresh_interval.is_finite() || self.watchdog.refresh_interval < 0.2 {
            return Err(SpcError::Config(format!(
                "watchdog.refresh_interval must be >= 0.2s (got {})",
                self.watchdog.refresh_interval
            )));
        }
        if !(self.watchdog.controller_refresh_interval > 0.0)
            || !self.watchdog.controller_refresh_interval.is_finite()
        {
            return Err(SpcError::Config(
                "watchdog.controller_refresh_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
