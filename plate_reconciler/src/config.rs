use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};
use crate::plate_reconciliation::recovery::RecoveryParams;
use crate::plate_reconciliation::validator::RegexPlateFormat;
use crate::plate_reconciliation::validator::ITALIAN_PLATE_PATTERN;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Frames consulted on each side of the reconciled frame.
    pub window: usize,
    /// Sightings required both before and after a frame to synthesise a plate.
    pub min_occurrences: usize,
    /// Largest edit distance at which a current plate matches a recovered code.
    pub max_edit_distance: usize,
    /// Keep plates failing the format check after recovery.
    pub keep_invalid: bool,
    pub plate_pattern: String,
    /// Worker threads used by the batch driver.
    pub workers: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            window: 5,
            min_occurrences: 3,
            max_edit_distance: 2,
            keep_invalid: false,
            plate_pattern: ITALIAN_PLATE_PATTERN.to_string(),
            workers: 4,
        }
    }
}

impl ReconcileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ReconcileError::io(path, e))?;
        let config: ReconcileConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(ReconcileError::InvalidConfig(
                "window must be at least 1".to_string(),
            ));
        }
        if self.min_occurrences == 0 {
            return Err(ReconcileError::InvalidConfig(
                "min_occurrences must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ReconcileError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        self.plate_format()?;
        Ok(())
    }

    pub fn plate_format(&self) -> Result<RegexPlateFormat> {
        RegexPlateFormat::new(&self.plate_pattern)
    }

    pub fn recovery_params(&self) -> RecoveryParams {
        RecoveryParams {
            window: self.window,
            min_occurrences: self.min_occurrences,
            max_edit_distance: self.max_edit_distance,
        }
    }
}

/// Command line settings, applied on top of the configuration file.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frames used on each side to recover plates
    #[arg(long)]
    pub window: Option<usize>,

    #[arg(long)]
    pub min_occurrences: Option<usize>,

    #[arg(long)]
    pub max_edit_distance: Option<usize>,

    /// Keep plates that fail the format check
    #[arg(long)]
    pub keep_invalid: bool,

    /// Plate grammar as a regular expression
    #[arg(long)]
    pub plate_pattern: Option<String>,

    #[arg(long)]
    pub workers: Option<usize>,
}

impl ConfigOverrides {
    pub fn resolve(&self) -> Result<ReconcileConfig> {
        let mut config = match &self.config {
            Some(path) => ReconcileConfig::load(path)?,
            None => ReconcileConfig::default(),
        };
        if let Some(window) = self.window {
            config.window = window;
        }
        if let Some(min_occurrences) = self.min_occurrences {
            config.min_occurrences = min_occurrences;
        }
        if let Some(max_edit_distance) = self.max_edit_distance {
            config.max_edit_distance = max_edit_distance;
        }
        if self.keep_invalid {
            config.keep_invalid = true;
        }
        if let Some(pattern) = &self.plate_pattern {
            config.plate_pattern = pattern.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.validate()?;
        Ok(config)
    }
}
