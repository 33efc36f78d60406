// 👤 Founder Entity
// One row per founder; `Startup` references Startup.Name exactly as stored

use super::SourceRecord;
use crate::taxonomy::Taxonomy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Founder {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,

    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,

    /// Faculty exactly as entered
    #[serde(rename = "Faculty", default)]
    pub faculty: Option<String>,

    /// Foreign key: startup name
    #[serde(rename = "Startup", default)]
    pub startup: Option<String>,

    /// Path the founder applied through (not the startup's program track)
    #[serde(rename = "Path", default)]
    pub path: Option<String>,

    /// Closed-set faculty, filled by `normalize_faculty`
    #[serde(rename = "Faculty Category", skip_deserializing)]
    pub faculty_category: Option<String>,
}

impl SourceRecord for Founder {
    const ENTITY: &'static str = "founders";
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Gender", "Faculty", "Startup", "Path"];
    const KEY_COLUMN: &'static str = "Startup";
}

impl Founder {
    pub fn new(id: &str, name: &str, startup: &str) -> Self {
        Founder {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            startup: Some(startup.to_string()),
            ..Founder::default()
        }
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn with_faculty(mut self, faculty: &str) -> Self {
        self.faculty = Some(faculty.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Map the raw faculty onto the taxonomy; unmatched values land on the
    /// taxonomy fallback ("External" by default).
    pub fn normalize_faculty(&mut self, taxonomy: &Taxonomy) {
        self.faculty_category = Some(taxonomy.classify(self.faculty.as_deref()).to_string());
    }

    pub fn is_normalized(&self) -> bool {
        self.faculty_category.is_some()
    }
}
