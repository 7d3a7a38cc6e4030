use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::orchestration::scheduler::{DrainPolicy, SchedulerConfig};
use crate::{klog_debug, Error, Result};

/// Orchestrator configuration, persisted as TOML under ~/.keel.
///
/// `max_concurrent` is deliberately required: the deployment must supply
/// the global dispatch cap explicitly, it is never defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub max_concurrent: usize,
    #[serde(default)]
    pub drain_policy: DrainPolicy,
    pub stage_timeout_ms: Option<u64>,
    pub max_dispatch_per_drain: Option<usize>,
}

impl Config {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            drain_policy: DrainPolicy::default(),
            stage_timeout_ms: None,
            max_dispatch_per_drain: None,
        }
    }

    pub fn keel_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".keel"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::keel_dir()?.join("keel.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        klog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            return Err(Error::Validation(format!(
                "config file not found at {} (max_concurrent must be supplied)",
                path.display()
            )));
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        klog_debug!(
            "Config loaded: max_concurrent={}, drain_policy={:?}, stage_timeout_ms={:?}",
            config.max_concurrent,
            config.drain_policy,
            config.stage_timeout_ms
        );
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let keel_dir = Self::keel_dir()?;
        if !keel_dir.exists() {
            fs::create_dir_all(&keel_dir)?;
        }
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        klog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::Validation(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the scheduler-facing view of this configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent: self.max_concurrent,
            drain_policy: self.drain_policy,
            stage_timeout_ms: self.stage_timeout_ms,
            max_dispatch_per_drain: self.max_dispatch_per_drain,
        }
    }
}
