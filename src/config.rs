// ⚙️ Pipeline Configuration
// Taxonomies and cohort cadence as data, loadable from a JSON file.
//
// Example:
// {
//   "cohort": { "start_year": 2019, "periods_per_year": 2 },
//   "status": { "name": "status", "fallback": "Not Accelerated", "rules": [...] }
// }
//
// Sections left out of the file keep their defaults.

use crate::cohort::CohortConfig;
use crate::error::PipelineError;
use crate::taxonomy::Taxonomy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cohort: CohortConfig,
    pub industry: Taxonomy,
    pub status: Taxonomy,
    pub faculty: Taxonomy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            cohort: CohortConfig::default(),
            industry: Taxonomy::industry(),
            status: Taxonomy::status(),
            faculty: Taxonomy::faculty(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file. Validation happens in `Pipeline::new`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Every check that must pass before any aggregate is produced
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        self.cohort.validate()?;
        self.industry.validate()?;
        self.status.validate()?;
        self.faculty.validate()?;
        Ok(())
    }
}
