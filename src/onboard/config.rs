use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const APP_DIR: &str = "profile-onboard";
const CONFIG_FILE: &str = "onboard.toml";
const PROGRESS_FILE: &str = "progress.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OnboardConfig {
    pub general: GeneralConfig,
    pub autosave: AutosaveConfig,
    pub account: AccountConfig,
    pub experience: ExperienceConfig,
    pub skills: SkillsConfig,
    pub store: StoreConfig,
}

impl OnboardConfig {
    /// Default location: `<config dir>/profile-onboard/onboard.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self, super::error::OnboardError> {
        match Self::default_path() {
            Some(path) => Self::load_from(path),
            None => {
                info!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, super::error::OnboardError> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: OnboardConfig = toml::from_str(&content)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Dry run mode - progress is kept in memory and nothing touches disk
    pub dryrun: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    /// Quiet period after the last edit before a background save is attempted
    pub debounce_ms: u64,
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 6000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub min_summary_length: usize,
    pub max_summary_length: usize,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            min_summary_length: 10,
            max_summary_length: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExperienceConfig {
    pub min_job_title_length: usize,
    pub min_company_length: usize,
    pub min_description_length: usize,
    pub max_description_length: usize,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            min_job_title_length: 3,
            min_company_length: 2,
            min_description_length: 20,
            max_description_length: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub max_count: usize,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            min_length: 2,
            max_length: 30,
            max_count: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Progress file for the file-backed store
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Configured path, falling back to `<data dir>/profile-onboard/progress.json`.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join(PROGRESS_FILE)
        })
    }
}
