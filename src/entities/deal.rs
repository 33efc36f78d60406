// 🤝 Deal Entity
// A funding deal tied to a startup by name, placed in time by its cohort

use super::SourceRecord;
use crate::cohort::CohortResolver;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Deal {
    /// Foreign key: startup name
    #[serde(rename = "Startup", default)]
    pub startup: Option<String>,

    /// Raw cohort label ("3", "Cohort 5", "Current", administrative markers)
    #[serde(rename = "Cohort", default)]
    pub cohort: Option<String>,

    #[serde(rename = "Cohort Ordinal", skip_deserializing)]
    pub cohort_ordinal: Option<u32>,

    /// Derived from the cohort; None keeps the deal out of yearly views
    #[serde(rename = "Year", skip_deserializing)]
    pub year: Option<i32>,
}

impl SourceRecord for Deal {
    const ENTITY: &'static str = "deals";
    const COLUMNS: &'static [&'static str] = &["Startup", "Cohort"];
    const KEY_COLUMN: &'static str = "Startup";
}

impl Deal {
    pub fn new(startup: &str, cohort: &str) -> Self {
        Deal {
            startup: Some(startup.to_string()),
            cohort: Some(cohort.to_string()),
            ..Deal::default()
        }
    }

    /// Parse the cohort label once into ordinal and year
    pub fn resolve_cohort(&mut self, resolver: &CohortResolver) {
        let resolution = resolver.resolve_cohort(self.cohort.as_deref());
        self.cohort_ordinal = resolution.ordinal;
        self.year = resolution.year;
    }
}
