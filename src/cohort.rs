// 📅 Cohort Resolver
// Turns the heterogeneous "Cohort" field into an ordinal and a calendar year
//
//   year = start_year + (ordinal - 1) / periods_per_year
//
// Malformed input never fails: it resolves to (None, None) and the deal
// drops out of year-indexed views only.

use crate::error::PipelineError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static FIRST_DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("cohort digit pattern is valid"));

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    /// Calendar year of cohort 1
    pub start_year: i32,

    /// Cohorts started per calendar year
    pub periods_per_year: u32,

    /// Label meaning "the cohort running now"
    pub current_label: String,

    /// Ordinal assigned to `current_label`
    pub current_ordinal: u32,

    /// Administrative labels that are not real cohorts
    pub excluded_labels: Vec<String>,
}

impl Default for CohortConfig {
    fn default() -> Self {
        CohortConfig {
            start_year: 2019,
            periods_per_year: 2,
            current_label: "Current".to_string(),
            current_ordinal: 12,
            excluded_labels: vec![
                "Pre-Cohort".to_string(),
                "Administrative".to_string(),
                "Admin".to_string(),
                "N/A".to_string(),
                "-".to_string(),
            ],
        }
    }
}

impl CohortConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.periods_per_year == 0 {
            return Err(PipelineError::Config(
                "cohort periods_per_year must be at least 1".to_string(),
            ));
        }
        if self.current_ordinal == 0 {
            return Err(PipelineError::Config(
                "cohort current_ordinal must be at least 1".to_string(),
            ));
        }
        if self.current_label.trim().is_empty() {
            return Err(PipelineError::Config(
                "cohort current_label must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    fn is_excluded(&self, label: &str) -> bool {
        self.excluded_labels
            .iter()
            .any(|excluded| excluded.trim().eq_ignore_ascii_case(label))
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CohortResolution {
    pub ordinal: Option<u32>,
    pub year: Option<i32>,
}

impl CohortResolution {
    pub fn unresolved() -> Self {
        CohortResolution::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.year.is_some()
    }
}

/// Resolver bound to a validated `CohortConfig`.
#[derive(Debug, Clone)]
pub struct CohortResolver {
    config: CohortConfig,
}

impl CohortResolver {
    pub fn new(config: CohortConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(CohortResolver { config })
    }

    pub fn config(&self) -> &CohortConfig {
        &self.config
    }

    /// `resolve_cohort(raw) -> (ordinal, year)`
    pub fn resolve_cohort(&self, raw: Option<&str>) -> CohortResolution {
        let label = match raw.map(str::trim) {
            Some(label) if !label.is_empty() => label,
            _ => return CohortResolution::unresolved(),
        };

        if self.config.is_excluded(label) {
            return CohortResolution::unresolved();
        }

        if label.eq_ignore_ascii_case(self.config.current_label.trim()) {
            return self.resolve_ordinal(i64::from(self.config.current_ordinal));
        }

        parse_ordinal(label)
            .map(|ordinal| self.resolve_ordinal(ordinal))
            .unwrap_or_default()
    }

    /// Year for an ordinal; ordinals below 1 have no year.
    pub fn year_for_ordinal(&self, ordinal: i64) -> Option<i32> {
        if ordinal < 1 {
            return None;
        }
        let offset = (ordinal - 1) / i64::from(self.config.periods_per_year);
        i32::try_from(i64::from(self.config.start_year) + offset).ok()
    }

    fn resolve_ordinal(&self, ordinal: i64) -> CohortResolution {
        match (u32::try_from(ordinal).ok(), self.year_for_ordinal(ordinal)) {
            (Some(ordinal), Some(year)) => CohortResolution {
                ordinal: Some(ordinal),
                year: Some(year),
            },
            _ => CohortResolution::unresolved(),
        }
    }
}

/// First digit run as a signed number.
///
/// A minus sign counts only at the start of a word ("-1", "Cohort -3"), so
/// hyphenated labels like "Cohort-3" stay positive.
fn parse_ordinal(label: &str) -> Option<i64> {
    let digits = FIRST_DIGIT_RUN.find(label)?;
    let value = digits.as_str().parse::<i64>().ok()?;

    let negative = label[..digits.start()]
        .strip_suffix('-')
        .map_or(false, |rest| rest.is_empty() || rest.ends_with(char::is_whitespace));

    Some(if negative { -value } else { value })
}

// ============================================================================
// TESTS
// ============================================================================
