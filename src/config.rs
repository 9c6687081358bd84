//! User configuration and preferences

use crate::async_preview::{CACHE_SIZE, DEFAULT_THUMBNAIL_WAIT};
use crate::catalog::DEFAULT_SCREENSHOT_PATTERNS;
use crate::error::{Result, SweepError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Screenshots fetched per session when nothing else is configured
pub const DEFAULT_CANDIDATE_LIMIT: usize = 300;

/// Longest side of a requested thumbnail, in pixels
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 640;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Library directory used when none is given on the command line
    pub library_dir: Option<PathBuf>,
    pub candidate_limit: usize,
    pub thumbnail_size: u32,
    pub thumbnail_wait_ms: u64,
    pub thumbnail_cache_size: usize,
    /// Case-insensitive file-name fragments that mark a screenshot
    pub screenshot_patterns: Vec<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            library_dir: None,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            thumbnail_wait_ms: DEFAULT_THUMBNAIL_WAIT.as_millis() as u64,
            thumbnail_cache_size: CACHE_SIZE,
            screenshot_patterns: DEFAULT_SCREENSHOT_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl UserConfig {
    /// Get the config file path (~/.config/shotswp/config.json)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("shotswp").join("config.json"))
    }

    /// Load config from the default location, or defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path().ok_or_else(|| {
            SweepError::ConfigError("Could not determine config directory".to_string())
        })?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            SweepError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            SweepError::ConfigError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or_else(|| {
            SweepError::ConfigError("Could not determine config directory".to_string())
        })?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SweepError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            SweepError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, contents).map_err(|e| {
            SweepError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    pub fn thumbnail_wait(&self) -> Duration {
        Duration::from_millis(self.thumbnail_wait_ms)
    }
}
