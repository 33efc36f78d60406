// 🔗 Entity Merger - Founders, Startups and Deals into fact tables
//
// Three equi-joins on the startup name, each with a fixed join kind:
//
//   merge_founder_startup : Founder ⨝ Startup           (left)
//   merge_startup_deal    : Startup ⨝ Deal              (left)
//   merge_full            : (Founder ⨝ Startup) ⨝ Deal  (inner, then left)
//
// Keys compare exactly as stored. A null key never matches anything,
// including another null. Right-hand duplicates fan out the left row once
// per match.
//
// "Path" exists on both the founder side (application path) and the startup
// side (program track); joined rows expose them as "Founder Path" and
// "Startup Path" and there is no bare "Path" dimension.

use crate::aggregate::{number, text, FactRow};
use crate::entities::{Deal, Founder, StartupRow};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// KEY INDEX
// ============================================================================

/// Right-hand rows grouped by key, each group in input order
fn index_by_key<'a, T>(rows: &'a [T], key: impl Fn(&T) -> Option<&str>) -> HashMap<&'a str, Vec<&'a T>> {
    let mut index: HashMap<&'a str, Vec<&'a T>> = HashMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            index.entry(k).or_default().push(row);
        }
    }
    index
}

// ============================================================================
// FOUNDER ⨝ STARTUP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FounderStartupRow {
    pub founder_id: Option<String>,
    pub founder_name: Option<String>,
    pub gender: Option<String>,
    /// Normalized faculty category
    pub faculty: Option<String>,
    pub faculty_raw: Option<String>,
    pub founder_path: Option<String>,
    /// Founder-side key, kept even when no startup matched
    pub startup: Option<String>,
    pub industry: Option<String>,
    pub status: Option<String>,
    pub status_raw: Option<String>,
    pub startup_path: Option<String>,
    pub num_of_founders: Option<u32>,
}

impl FounderStartupRow {
    fn new(founder: &Founder, startup: Option<&StartupRow>) -> Self {
        FounderStartupRow {
            founder_id: founder.id.clone(),
            founder_name: founder.name.clone(),
            gender: founder.gender.clone(),
            faculty: founder.faculty_category.clone(),
            faculty_raw: founder.faculty.clone(),
            founder_path: founder.path.clone(),
            startup: founder.startup.clone(),
            industry: startup.and_then(|s| s.industry.clone()),
            status: startup.map(|s| s.status.clone()),
            status_raw: startup.and_then(|s| s.status_raw.clone()),
            startup_path: startup.and_then(|s| s.path.clone()),
            num_of_founders: startup.and_then(|s| s.num_of_founders),
        }
    }

    pub fn has_startup(&self) -> bool {
        self.status.is_some()
    }
}

const FOUNDER_STARTUP_DIMENSIONS: &[&str] = &[
    "Founder ID",
    "Founder Name",
    "Gender",
    "Faculty",
    "Faculty Raw",
    "Founder Path",
    "Startup",
    "Industry",
    "Status",
    "Status Raw",
    "Startup Path",
    "Num Of Founders",
];

impl FactRow for FounderStartupRow {
    const TABLE: &'static str = "founder-startup";
    const DIMENSIONS: &'static [&'static str] = FOUNDER_STARTUP_DIMENSIONS;

    fn value(&self, dimension: &str) -> Option<Cow<'_, str>> {
        match dimension {
            "Founder ID" => text(&self.founder_id),
            "Founder Name" => text(&self.founder_name),
            "Gender" => text(&self.gender),
            "Faculty" => text(&self.faculty),
            "Faculty Raw" => text(&self.faculty_raw),
            "Founder Path" => text(&self.founder_path),
            "Startup" => text(&self.startup),
            "Industry" => text(&self.industry),
            "Status" => text(&self.status),
            "Status Raw" => text(&self.status_raw),
            "Startup Path" => text(&self.startup_path),
            "Num Of Founders" => number(self.num_of_founders),
            _ => None,
        }
    }
}

/// Founder ⨝ Startup, left join on `Founder.startup = Startup.name`.
///
/// Every founder appears at least once. Passing exploded startup rows fans
/// each founder out once per tag; the pipeline passes unexploded rows.
pub fn merge_founder_startup(founders: &[Founder], startups: &[StartupRow]) -> Vec<FounderStartupRow> {
    let index = index_by_key(startups, StartupRow::key);
    let mut rows = Vec::with_capacity(founders.len());
    let mut unmatched = 0usize;

    for founder in founders {
        match founder.startup.as_deref().and_then(|k| index.get(k)) {
            Some(matches) => rows.extend(matches.iter().map(|&s| FounderStartupRow::new(founder, Some(s)))),
            None => {
                unmatched += 1;
                rows.push(FounderStartupRow::new(founder, None));
            }
        }
    }

    debug!(rows = rows.len(), unmatched, "founder-startup join");
    rows
}

// ============================================================================
// STARTUP ⨝ DEAL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartupDealRow {
    pub startup: Option<String>,
    pub industry_tag: Option<String>,
    pub industry: Option<String>,
    pub status: String,
    pub startup_path: Option<String>,
    pub num_of_founders: Option<u32>,
    pub cohort: Option<String>,
    pub cohort_ordinal: Option<u32>,
    pub year: Option<i32>,
}

impl StartupDealRow {
    fn new(startup: &StartupRow, deal: Option<&Deal>) -> Self {
        StartupDealRow {
            startup: startup.name.clone(),
            industry_tag: startup.industry_tag.clone(),
            industry: startup.industry.clone(),
            status: startup.status.clone(),
            startup_path: startup.path.clone(),
            num_of_founders: startup.num_of_founders,
            cohort: deal.and_then(|d| d.cohort.clone()),
            cohort_ordinal: deal.and_then(|d| d.cohort_ordinal),
            year: deal.and_then(|d| d.year),
        }
    }
}

impl FactRow for StartupDealRow {
    const TABLE: &'static str = "startup-deal";
    const DIMENSIONS: &'static [&'static str] = &[
        "Startup",
        "Industry Tag",
        "Industry",
        "Status",
        "Startup Path",
        "Num Of Founders",
        "Cohort",
        "Cohort Ordinal",
        "Year",
    ];

    fn value(&self, dimension: &str) -> Option<Cow<'_, str>> {
        match dimension {
            "Startup" => text(&self.startup),
            "Industry Tag" => text(&self.industry_tag),
            "Industry" => text(&self.industry),
            "Status" => Some(Cow::Borrowed(self.status.as_str())),
            "Startup Path" => text(&self.startup_path),
            "Num Of Founders" => number(self.num_of_founders),
            "Cohort" => text(&self.cohort),
            "Cohort Ordinal" => number(self.cohort_ordinal),
            "Year" => number(self.year),
            _ => None,
        }
    }
}

/// Startup ⨝ Deal, left join on `Startup.name = Deal.startup`.
///
/// A startup with k deals yields k rows per startup row; with none it
/// yields one row with a null cohort and year.
pub fn merge_startup_deal(startups: &[StartupRow], deals: &[Deal]) -> Vec<StartupDealRow> {
    let index = index_by_key(deals, |d: &Deal| d.startup.as_deref());
    let mut rows = Vec::with_capacity(startups.len().max(deals.len()));
    let mut without_deal = 0usize;

    for startup in startups {
        match startup.key().and_then(|k| index.get(k)) {
            Some(matches) => rows.extend(matches.iter().map(|&d| StartupDealRow::new(startup, Some(d)))),
            None => {
                without_deal += 1;
                rows.push(StartupDealRow::new(startup, None));
            }
        }
    }

    debug!(rows = rows.len(), without_deal, "startup-deal join");
    rows
}

// ============================================================================
// FOUNDER ⨝ STARTUP ⨝ DEAL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullRow {
    #[serde(flatten)]
    pub profile: FounderStartupRow,
    pub cohort: Option<String>,
    pub cohort_ordinal: Option<u32>,
    pub year: Option<i32>,
}

/// Deal-side dimensions appended to the founder profile in the full join
const DEAL_DIMENSIONS: &[&str] = &["Cohort", "Cohort Ordinal", "Year"];

const FULL_DIMENSIONS_LEN: usize = FOUNDER_STARTUP_DIMENSIONS.len() + DEAL_DIMENSIONS.len();

const FULL_DIMENSIONS: [&str; FULL_DIMENSIONS_LEN] =
    concat_dimensions(FOUNDER_STARTUP_DIMENSIONS, DEAL_DIMENSIONS);

const fn concat_dimensions<const N: usize>(head: &[&'static str], tail: &[&'static str]) -> [&'static str; N] {
    let mut out = [""; N];
    let mut i = 0;
    while i < head.len() {
        out[i] = head[i];
        i += 1;
    }
    let mut j = 0;
    while j < tail.len() {
        out[head.len() + j] = tail[j];
        j += 1;
    }
    out
}

impl FactRow for FullRow {
    const TABLE: &'static str = "full";
    const DIMENSIONS: &'static [&'static str] = &FULL_DIMENSIONS;

    fn value(&self, dimension: &str) -> Option<Cow<'_, str>> {
        match dimension {
            "Cohort" => text(&self.cohort),
            "Cohort Ordinal" => number(self.cohort_ordinal),
            "Year" => number(self.year),
            other => self.profile.value(other),
        }
    }
}

/// Founder ⨝ Startup (inner) ⨝ Deal (left).
///
/// Founders whose startup is missing from the startup table are dropped
/// here, unlike `merge_founder_startup`.
pub fn merge_full(founders: &[Founder], startups: &[StartupRow], deals: &[Deal]) -> Vec<FullRow> {
    let startup_index = index_by_key(startups, StartupRow::key);
    let deal_index = index_by_key(deals, |d: &Deal| d.startup.as_deref());
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for founder in founders {
        let Some(matches) = founder.startup.as_deref().and_then(|k| startup_index.get(k)) else {
            dropped += 1;
            continue;
        };

        for &startup in matches {
            let profile = FounderStartupRow::new(founder, Some(startup));
            match startup.key().and_then(|k| deal_index.get(k)) {
                Some(deals) => rows.extend(deals.iter().map(|deal| FullRow {
                    profile: profile.clone(),
                    cohort: deal.cohort.clone(),
                    cohort_ordinal: deal.cohort_ordinal,
                    year: deal.year,
                })),
                None => rows.push(FullRow {
                    profile,
                    cohort: None,
                    cohort_ordinal: None,
                    year: None,
                }),
            }
        }
    }

    debug!(rows = rows.len(), dropped, "full join");
    rows
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::{CohortConfig, CohortResolver};
    use crate::entities::Startup;
    use crate::taxonomy::Taxonomy;

    fn founder(id: &str, startup: &str) -> Founder {
        let mut f = Founder::new(id, id, startup)
            .with_gender("Female")
            .with_faculty("Engineering")
            .with_path("Open Call");
        f.normalize_faculty(&Taxonomy::faculty());
        f
    }

    fn exploded(name: &str, industry: &str) -> Vec<StartupRow> {
        Startup::new(name)
            .with_industry(industry)
            .with_status("Invested")
            .with_path("Venture Track")
            .explode(&Taxonomy::industry(), &Taxonomy::status())
    }

    fn unexploded(name: &str, industry: &str) -> StartupRow {
        Startup::new(name)
            .with_industry(industry)
            .with_status("Invested")
            .with_path("Venture Track")
            .classify(&Taxonomy::status())
    }

    fn deal(startup: &str, cohort: &str) -> Deal {
        let resolver = CohortResolver::new(CohortConfig::default()).unwrap();
        let mut d = Deal::new(startup, cohort);
        d.resolve_cohort(&resolver);
        d
    }

    #[test]
    fn test_founder_startup_is_left_join() {
        let founders = vec![founder("F1", "Acme"), founder("F2", "Ghost")];
        let startups = vec![unexploded("Acme", "AI")];

        let rows = merge_founder_startup(&founders, &startups);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status.as_deref(), Some("Invested"));
        assert!(rows[0].has_startup());
        assert_eq!(rows[1].startup.as_deref(), Some("Ghost"));
        assert_eq!(rows[1].status, None);
        assert_eq!(rows[1].startup_path, None);
    }

    #[test]
    fn test_founder_startup_on_unexploded_data_keeps_founder_count() {
        let founders = vec![founder("F1", "Acme"), founder("F2", "Acme"), founder("F3", "Acme")];
        let startups = vec![unexploded("Acme", "AI, Health")];

        assert_eq!(merge_founder_startup(&founders, &startups).len(), 3);
    }

    #[test]
    fn test_founder_startup_fans_out_over_exploded_rows() {
        let founders = vec![founder("F1", "Acme")];
        let startups = exploded("Acme", "AI, Health");

        let rows = merge_founder_startup(&founders, &startups);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].industry.as_deref(), Some("Technology"));
        assert_eq!(rows[1].industry.as_deref(), Some("Health"));
    }

    #[test]
    fn test_keys_are_case_and_whitespace_sensitive() {
        let founders = vec![founder("F1", "acme"), founder("F2", "Acme "), founder("F3", "Acme")];
        let startups = vec![unexploded("Acme", "AI")];

        let rows = merge_founder_startup(&founders, &startups);

        let matched: Vec<bool> = rows.iter().map(|r| r.has_startup()).collect();
        assert_eq!(matched, vec![false, false, true]);
    }

    #[test]
    fn test_null_keys_never_match() {
        let mut orphan = founder("F1", "x");
        orphan.startup = None;
        let mut nameless = unexploded("x", "AI");
        nameless.name = None;

        let rows = merge_founder_startup(&[orphan], &[nameless]);

        assert_eq!(rows.len(), 1);
        assert!(!rows[0].has_startup());
    }

    #[test]
    fn test_paths_stay_namespaced() {
        let rows = merge_founder_startup(&[founder("F1", "Acme")], &[unexploded("Acme", "AI")]);

        assert_eq!(rows[0].value("Founder Path").as_deref(), Some("Open Call"));
        assert_eq!(rows[0].value("Startup Path").as_deref(), Some("Venture Track"));
        assert!(!FounderStartupRow::DIMENSIONS.contains(&"Path"));
        assert!(!FullRow::DIMENSIONS.contains(&"Path"));
    }

    #[test]
    fn test_startup_deal_cardinality_on_exploded_data() {
        let startups = exploded("Acme", "AI, Health");
        let deals = vec![deal("Acme", "1"), deal("Acme", "3"), deal("Acme", "Current")];

        let rows = merge_startup_deal(&startups, &deals);

        assert_eq!(rows.len(), 2 * 3);
        let years: Vec<Option<i32>> = rows.iter().map(|r| r.year).collect();
        assert_eq!(
            years,
            vec![Some(2019), Some(2020), Some(2024), Some(2019), Some(2020), Some(2024)]
        );
    }

    #[test]
    fn test_startup_without_deal_keeps_null_year() {
        let startups = exploded("Lonely", "Food");

        let rows = merge_startup_deal(&startups, &[deal("Other", "2")]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, None);
        assert_eq!(rows[0].cohort, None);
        assert_eq!(rows[0].industry.as_deref(), Some("Agriculture & Food"));
    }

    #[test]
    fn test_full_join_drops_founders_without_startup() {
        let founders = vec![founder("F1", "Acme"), founder("F2", "Ghost")];
        let startups = vec![unexploded("Acme", "AI")];
        let deals = vec![deal("Acme", "2"), deal("Acme", "4")];

        let rows = merge_full(&founders, &startups, &deals);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.profile.founder_id.as_deref() == Some("F1")));
        assert_eq!(rows[0].year, Some(2019));
        assert_eq!(rows[1].year, Some(2020));
    }

    #[test]
    fn test_full_join_keeps_startups_without_deals() {
        let founders = vec![founder("F1", "Acme")];
        let startups = vec![unexploded("Acme", "AI")];

        let rows = merge_full(&founders, &startups, &[]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, None);
        assert_eq!(rows[0].value("Gender").as_deref(), Some("Female"));
        assert_eq!(rows[0].value("Year"), None);
    }

    #[test]
    fn test_full_row_exposes_profile_dimensions() {
        let rows = merge_full(&[founder("F1", "Acme")], &[unexploded("Acme", "AI")], &[deal("Acme", "5")]);

        assert_eq!(rows[0].value("Status").as_deref(), Some("Invested"));
        assert_eq!(rows[0].value("Faculty").as_deref(), Some("Engineering"));
        assert_eq!(rows[0].value("Cohort Ordinal").as_deref(), Some("5"));
        assert_eq!(rows[0].value("Year").as_deref(), Some("2021"));
    }

    #[test]
    fn test_full_dimensions_extend_founder_startup() {
        let (profile, deal) = FullRow::DIMENSIONS.split_at(FounderStartupRow::DIMENSIONS.len());

        assert_eq!(profile, FounderStartupRow::DIMENSIONS);
        assert_eq!(deal, ["Cohort", "Cohort Ordinal", "Year"]);
    }

    #[test]
    fn test_every_full_dimension_resolves() {
        let rows = merge_full(&[founder("F1", "Acme")], &[unexploded("Acme", "AI")], &[deal("Acme", "5")]);

        let missing: Vec<&str> = FullRow::DIMENSIONS
            .iter()
            .copied()
            .filter(|d| rows[0].value(d).is_none())
            .collect();
        // unexploded rows carry no industry, and no founder count was given
        assert_eq!(missing, vec!["Industry", "Num Of Founders"]);
    }
}
