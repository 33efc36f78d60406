// 📊 Aggregator - Group-by counts and percentages over fact tables
//
// aggregate(table, group_by, filters) -> ordered (dimension-tuple, count)
//
// - A filter value of "All" is a no-op; unknown filter dimensions are ignored
// - Rows with a null in any group-by dimension are left out of that view
// - Groups come out in first-appearance order; sorting belongs to the caller
// - Percentages divide by an explicitly named base, never an implicit total

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Filter value meaning "every value of this dimension"
pub const ALL: &str = "All";

// ============================================================================
// FACT ROW
// ============================================================================

/// A row of a joined fact table, addressable by dimension name.
pub trait FactRow {
    /// Table name used in error messages
    const TABLE: &'static str;

    /// Every dimension this table exposes
    const DIMENSIONS: &'static [&'static str];

    /// Value of `dimension` for this row; `None` is null.
    fn value(&self, dimension: &str) -> Option<Cow<'_, str>>;
}

pub(crate) fn text(value: &Option<String>) -> Option<Cow<'_, str>> {
    value.as_deref().map(Cow::Borrowed)
}

pub(crate) fn number<T: ToString>(value: Option<T>) -> Option<Cow<'static, str>> {
    value.map(|v| Cow::Owned(v.to_string()))
}

fn check_dimension<R: FactRow>(dimension: &str) -> Result<()> {
    if R::DIMENSIONS.contains(&dimension) {
        Ok(())
    } else {
        Err(PipelineError::UnknownDimension {
            table: R::TABLE.to_string(),
            dimension: dimension.to_string(),
            available: R::DIMENSIONS.iter().map(|d| d.to_string()).collect(),
        })
    }
}

// ============================================================================
// FILTERS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters(BTreeMap<String, String>);

impl Filters {
    pub fn new() -> Self {
        Filters::default()
    }

    pub fn with(mut self, dimension: &str, value: &str) -> Self {
        self.0.insert(dimension.to_string(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Filters that actually restrict rows of `R`
    fn active<R: FactRow>(&self) -> Vec<(&str, &str)> {
        self.0
            .iter()
            .filter(|(dimension, value)| {
                if !R::DIMENSIONS.contains(&dimension.as_str()) {
                    debug!(table = R::TABLE, dimension = %dimension, "ignoring filter on unknown dimension");
                    return false;
                }
                value.as_str() != ALL
            })
            .map(|(dimension, value)| (dimension.as_str(), value.as_str()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Filters(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    /// One value per group-by dimension, in group-by order
    pub key: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupShare {
    pub key: Vec<String>,
    pub count: usize,
    /// Sum of counts sharing this group's base values
    pub base_total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub dimensions: Vec<String>,
    pub groups: Vec<GroupCount>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Count for an exact key, 0 when the group is absent
    pub fn count_of(&self, key: &[&str]) -> usize {
        self.groups
            .iter()
            .find(|g| g.key.iter().map(String::as_str).eq(key.iter().copied()))
            .map(|g| g.count)
            .unwrap_or(0)
    }

    /// Percentage of each group within its `base` dimensions.
    ///
    /// With groups (Status, Gender) and base ["Gender"], each cell is the
    /// share of that gender's founders who have that status. An empty base
    /// divides by the grand total.
    pub fn shares(&self, base: &[&str]) -> Result<Vec<GroupShare>> {
        let positions = base
            .iter()
            .map(|dimension| {
                self.dimensions
                    .iter()
                    .position(|d| d == dimension)
                    .ok_or_else(|| PipelineError::InvalidShareBase {
                        dimension: dimension.to_string(),
                    })
            })
            .collect::<Result<Vec<usize>>>()?;

        let project = |key: &[String]| -> Vec<String> {
            positions.iter().map(|&i| key[i].clone()).collect()
        };

        let mut totals: HashMap<Vec<String>, usize> = HashMap::new();
        for group in &self.groups {
            *totals.entry(project(&group.key)).or_insert(0) += group.count;
        }

        Ok(self
            .groups
            .iter()
            .map(|group| {
                let base_total = totals.get(&project(&group.key)).copied().unwrap_or(0);
                let percentage = if base_total == 0 {
                    0.0
                } else {
                    group.count as f64 * 100.0 / base_total as f64
                };
                GroupShare {
                    key: group.key.clone(),
                    count: group.count,
                    base_total,
                    percentage,
                }
            })
            .collect())
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Count rows per combination of `group_by` values after `filters`.
pub fn aggregate<R: FactRow>(rows: &[R], group_by: &[&str], filters: &Filters) -> Result<Aggregation> {
    for dimension in group_by {
        check_dimension::<R>(dimension)?;
    }
    let active = filters.active::<R>();

    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<GroupCount> = Vec::new();

    for row in rows.iter().filter(|row| passes_filters(*row, &active)) {
        let key: Option<Vec<String>> = group_by
            .iter()
            .map(|dimension| row.value(dimension).map(Cow::into_owned))
            .collect();

        let Some(key) = key else {
            continue;
        };

        match index.get(&key) {
            Some(&position) => groups[position].count += 1,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(GroupCount { key, count: 1 });
            }
        }
    }

    Ok(Aggregation {
        dimensions: group_by.iter().map(|d| d.to_string()).collect(),
        groups,
    })
}

/// Rows that pass `filters`, in input order
pub fn filter_rows<'a, R: FactRow>(rows: &'a [R], filters: &Filters) -> Vec<&'a R> {
    let active = filters.active::<R>();
    rows.iter().filter(|row| passes_filters(*row, &active)).collect()
}

/// Dropdown values for a dimension: "All", then distinct non-null values sorted.
///
/// Values sort by number when every one of them parses as a number
/// ("2" before "10"), as text otherwise.
pub fn filter_options<R: FactRow>(rows: &[R], dimension: &str) -> Result<Vec<String>> {
    check_dimension::<R>(dimension)?;

    let distinct: BTreeSet<String> = rows
        .iter()
        .filter_map(|row| row.value(dimension).map(Cow::into_owned))
        .collect();
    let mut values: Vec<String> = distinct.into_iter().collect();

    let numbers: Option<Vec<f64>> = values.iter().map(|v| v.trim().parse::<f64>().ok()).collect();
    if let Some(numbers) = numbers {
        let mut keyed: Vec<(f64, String)> = numbers.into_iter().zip(values).collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        values = keyed.into_iter().map(|(_, value)| value).collect();
    }

    Ok(std::iter::once(ALL.to_string()).chain(values).collect())
}

fn passes_filters<R: FactRow>(row: &R, active: &[(&str, &str)]) -> bool {
    active
        .iter()
        .all(|(dimension, expected)| row.value(dimension).as_deref() == Some(*expected))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        status: Option<String>,
        gender: Option<String>,
        faculty: Option<String>,
        year: Option<i32>,
    }

    impl FactRow for Row {
        const TABLE: &'static str = "test";
        const DIMENSIONS: &'static [&'static str] = &["Status", "Gender", "Faculty", "Year"];

        fn value(&self, dimension: &str) -> Option<Cow<'_, str>> {
            match dimension {
                "Status" => text(&self.status),
                "Gender" => text(&self.gender),
                "Faculty" => text(&self.faculty),
                "Year" => number(self.year),
                _ => None,
            }
        }
    }

    fn row(status: &str, gender: &str, faculty: &str, year: Option<i32>) -> Row {
        Row {
            status: Some(status.to_string()),
            gender: Some(gender.to_string()),
            faculty: Some(faculty.to_string()),
            year,
        }
    }

    fn repeat(n: usize, status: &str, gender: &str) -> Vec<Row> {
        (0..n).map(|_| row(status, gender, "Engineering", None)).collect()
    }

    fn sample() -> Vec<Row> {
        vec![
            row("Invested", "Female", "Engineering", Some(2020)),
            row("Active", "Male", "Business", Some(2021)),
            row("Invested", "Male", "Engineering", None),
            row("Invested", "Female", "Engineering", Some(2020)),
        ]
    }

    #[test]
    fn test_counts_per_group_in_first_appearance_order() {
        let agg = aggregate(&sample(), &["Faculty", "Status"], &Filters::new()).unwrap();

        assert_eq!(agg.dimensions, vec!["Faculty", "Status"]);
        assert_eq!(
            agg.groups,
            vec![
                GroupCount { key: vec!["Engineering".into(), "Invested".into()], count: 3 },
                GroupCount { key: vec!["Business".into(), "Active".into()], count: 1 },
            ]
        );
        assert_eq!(agg.total(), 4);
    }

    #[test]
    fn test_group_by_order_is_caller_order() {
        let agg = aggregate(&sample(), &["Status", "Faculty"], &Filters::new()).unwrap();

        assert_eq!(agg.groups[0].key, vec!["Invested", "Engineering"]);
        assert_eq!(agg.count_of(&["Invested", "Engineering"]), 3);
        assert_eq!(agg.count_of(&["Engineering", "Invested"]), 0);
    }

    #[test]
    fn test_all_filter_is_a_no_op() {
        let rows = sample();
        let with_all = aggregate(&rows, &["Faculty"], &Filters::new().with("Status", ALL)).unwrap();
        let without = aggregate(&rows, &["Faculty"], &Filters::new()).unwrap();

        assert_eq!(with_all, without);
    }

    #[test]
    fn test_filter_restricts_to_exact_value() {
        let agg = aggregate(&sample(), &["Gender"], &Filters::new().with("Status", "Invested")).unwrap();

        assert_eq!(agg.count_of(&["Female"]), 2);
        assert_eq!(agg.count_of(&["Male"]), 1);

        let none = aggregate(&sample(), &["Gender"], &Filters::new().with("Status", "invested")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_unknown_filter_dimension_is_ignored() {
        let rows = sample();
        let filtered = aggregate(&rows, &["Gender"], &Filters::new().with("Planet", "Mars")).unwrap();
        let plain = aggregate(&rows, &["Gender"], &Filters::new()).unwrap();

        assert_eq!(filtered, plain);
    }

    #[test]
    fn test_unknown_group_by_dimension_is_an_error() {
        let err = aggregate(&sample(), &["Path"], &Filters::new()).unwrap_err();

        assert!(matches!(err, PipelineError::UnknownDimension { ref dimension, .. } if dimension == "Path"));
    }

    #[test]
    fn test_null_group_values_are_excluded() {
        let by_year = aggregate(&sample(), &["Year"], &Filters::new()).unwrap();
        assert_eq!(by_year.total(), 3);
        assert_eq!(by_year.count_of(&["2020"]), 2);

        let by_status = aggregate(&sample(), &["Status"], &Filters::new()).unwrap();
        assert_eq!(by_status.total(), 4);
    }

    #[test]
    fn test_empty_input_gives_empty_result() {
        let rows: Vec<Row> = Vec::new();
        let agg = aggregate(&rows, &["Status"], &Filters::new().with("Gender", "Female")).unwrap();

        assert!(agg.is_empty());
        assert!(agg.shares(&["Status"]).unwrap().is_empty());
    }

    #[test]
    fn test_shares_use_the_named_base() {
        // Female total 10, Male total 20, Invested total 15, grand total 30:
        // every candidate denominator gives a different answer.
        let mut rows = repeat(3, "Invested", "Female");
        rows.extend(repeat(12, "Invested", "Male"));
        rows.extend(repeat(7, "Graduated", "Female"));
        rows.extend(repeat(8, "Graduated", "Male"));

        let agg = aggregate(&rows, &["Status", "Gender"], &Filters::new()).unwrap();

        let per_gender = agg.shares(&["Gender"]).unwrap();
        let invested_female = per_gender.iter().find(|s| s.key == ["Invested", "Female"]).unwrap();
        assert_eq!(invested_female.base_total, 10);
        assert_eq!(invested_female.percentage, 30.0);

        let per_status = agg.shares(&["Status"]).unwrap();
        let invested_female = per_status.iter().find(|s| s.key == ["Invested", "Female"]).unwrap();
        assert_eq!(invested_female.base_total, 15);
        assert_eq!(invested_female.percentage, 20.0);

        let global = agg.shares(&[]).unwrap();
        let invested_female = global.iter().find(|s| s.key == ["Invested", "Female"]).unwrap();
        assert_eq!(invested_female.base_total, 30);
        assert_eq!(invested_female.percentage, 10.0);
    }

    #[test]
    fn test_shares_within_base_sum_to_hundred() {
        let agg = aggregate(&sample(), &["Status", "Gender"], &Filters::new()).unwrap();
        let shares = agg.shares(&["Gender"]).unwrap();

        for gender in ["Female", "Male"] {
            let sum: f64 = shares.iter().filter(|s| s.key[1] == gender).map(|s| s.percentage).sum();
            assert!((sum - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_share_base_must_be_grouped() {
        let agg = aggregate(&sample(), &["Status"], &Filters::new()).unwrap();

        assert!(matches!(
            agg.shares(&["Gender"]),
            Err(PipelineError::InvalidShareBase { .. })
        ));
    }

    #[test]
    fn test_filter_options_all_then_sorted_values() {
        let options = filter_options(&sample(), "Status").unwrap();
        assert_eq!(options, vec!["All", "Active", "Invested"]);

        let years = filter_options(&sample(), "Year").unwrap();
        assert_eq!(years, vec!["All", "2020", "2021"]);
    }

    #[test]
    fn test_filter_options_sort_numbers_by_value() {
        let rows: Vec<Row> = [12, 2, 10, 3, 2]
            .iter()
            .map(|&ordinal| row("Active", "Male", "Law", Some(ordinal)))
            .collect();

        assert_eq!(filter_options(&rows, "Year").unwrap(), vec!["All", "2", "3", "10", "12"]);
    }

    #[test]
    fn test_filter_options_mixed_values_sort_as_text() {
        let rows = vec![
            row("10", "Male", "Law", None),
            row("9", "Male", "Law", None),
            row("Active", "Male", "Law", None),
        ];

        assert_eq!(filter_options(&rows, "Status").unwrap(), vec!["All", "10", "9", "Active"]);
    }

    #[test]
    fn test_filter_rows_keeps_input_order() {
        let rows = sample();
        let kept = filter_rows(&rows, &Filters::new().with("Gender", "Male"));

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].status.as_deref(), Some("Active"));
    }

    #[test]
    fn test_filters_from_iterator() {
        let filters: Filters = vec![("Status", "All"), ("Gender", "Female")].into_iter().collect();

        assert_eq!(filters, Filters::new().with("Gender", "Female").with("Status", ALL));
    }
}
