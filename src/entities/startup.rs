// 🚀 Startup Entity
// Raw record plus the classified row shape used by the joins

use super::{lenient_count, SourceRecord};
use crate::taxonomy::{explode, Taxonomy};
use serde::{Deserialize, Serialize};

// ============================================================================
// RAW RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Startup {
    /// Join key, unique per startup
    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    /// Comma-separated industry tags
    #[serde(rename = "Industry", default)]
    pub industry: Option<String>,

    #[serde(rename = "Status", default)]
    pub status: Option<String>,

    /// Program track the startup is enrolled in
    #[serde(rename = "Path", default)]
    pub path: Option<String>,

    #[serde(rename = "Num Of Founders", default, deserialize_with = "lenient_count")]
    pub num_of_founders: Option<u32>,
}

impl SourceRecord for Startup {
    const ENTITY: &'static str = "startups";
    const COLUMNS: &'static [&'static str] = &["Name", "Industry", "Status", "Path", "Num Of Founders"];
    const KEY_COLUMN: &'static str = "Name";
}

impl Startup {
    pub fn new(name: &str) -> Self {
        Startup {
            name: Some(name.to_string()),
            ..Startup::default()
        }
    }

    pub fn with_industry(mut self, industry: &str) -> Self {
        self.industry = Some(industry.to_string());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn with_founder_count(mut self, count: u32) -> Self {
        self.num_of_founders = Some(count);
        self
    }

    /// One row for this startup, status classified, industry left unsplit
    pub fn classify(&self, status: &Taxonomy) -> StartupRow {
        StartupRow {
            name: self.name.clone(),
            industry_raw: self.industry.clone(),
            industry_tag: None,
            industry: None,
            status: status.classify(self.status.as_deref()).to_string(),
            status_raw: self.status.clone(),
            path: self.path.clone(),
            num_of_founders: self.num_of_founders,
        }
    }

    /// One row per industry tag (at least one), each tag classified
    pub fn explode(&self, industry: &Taxonomy, status: &Taxonomy) -> Vec<StartupRow> {
        let base = self.classify(status);

        explode(self.industry.as_deref(), industry)
            .into_iter()
            .map(|(tag, category)| StartupRow {
                industry_tag: tag,
                industry: Some(category),
                ..base.clone()
            })
            .collect()
    }
}

// ============================================================================
// CLASSIFIED ROW
// ============================================================================

/// A startup after classification.
///
/// Rows from `Startup::classify` carry no industry; rows from
/// `Startup::explode` carry exactly one tag and its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartupRow {
    pub name: Option<String>,
    pub industry_raw: Option<String>,
    pub industry_tag: Option<String>,
    pub industry: Option<String>,
    pub status: String,
    pub status_raw: Option<String>,
    pub path: Option<String>,
    pub num_of_founders: Option<u32>,
}

impl StartupRow {
    pub fn key(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
