use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::info;

use crate::error::{Error, Result};

pub const DEFAULT_EXTRACTED_DIR: &str = "raw ground motion data";
pub const DEFAULT_OUTPUT_FILE: &str = "acceleration_data.csv";

/// What to do when the canonical extraction folder is left over from an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExistingDirPolicy {
    #[default]
    Replace,
    Refuse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Browser download target, extraction scratch space and output location.
    pub work_dir: PathBuf,
    pub extracted_dir_name: String,
    pub on_existing_extracted_dir: ExistingDirPolicy,
    pub browser_path: Option<PathBuf>,
    pub headless: bool,
    pub element_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub stable_polls: u32,
    pub output_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            work_dir: PathBuf::from("."),
            extracted_dir_name: DEFAULT_EXTRACTED_DIR.to_string(),
            on_existing_extracted_dir: ExistingDirPolicy::Replace,
            browser_path: None,
            headless: false,
            element_timeout_secs: 100,
            download_timeout_secs: 300,
            poll_interval_ms: 1000,
            stable_polls: 3,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Configuration(format!("settings file {:?} does not exist", path)));
        }
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!("failed to parse settings file {:?}: {}", path, e))
        })?;
        settings.validate()?;
        info!("Loaded settings from {:?}.", path);
        Ok(settings)
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.extracted_dir_name.trim().is_empty()
            || self.extracted_dir_name.contains(['/', '\\'])
        {
            return Err(Error::Configuration(format!(
                "extracted_dir_name '{}' must be a plain folder name",
                self.extracted_dir_name
            )));
        }
        if self.poll_interval_ms == 0 || self.stable_polls == 0 {
            return Err(Error::Configuration(
                "poll_interval_ms and stable_polls must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.work_dir.join(&self.output_file)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
