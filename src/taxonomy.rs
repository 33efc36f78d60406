// 🏷️ Taxonomy Classifier - Categories as Data
// Ordered keyword tables mapping free-text labels to a closed category set

use crate::error::PipelineError;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// One category and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyRule {
    /// Category returned when any keyword matches
    pub category: String,

    /// Case-insensitive substrings
    pub keywords: Vec<String>,
}

impl TaxonomyRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        TaxonomyRule {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// `normalized` must already be trimmed and lower-cased.
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| normalized.contains(&keyword.trim().to_lowercase()))
    }
}

// ============================================================================
// TAXONOMY
// ============================================================================

/// Ordered category table with its own fallback.
///
/// Keyword spaces overlap ("inactive" contains "active", "retail" contains
/// "ai"), so rule order is part of the configuration: the first rule that
/// matches wins. Serde keeps the `rules` array in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub rules: Vec<TaxonomyRule>,
    pub fallback: String,
}

impl Taxonomy {
    pub fn new(name: &str, fallback: &str) -> Self {
        Taxonomy {
            name: name.to_string(),
            rules: Vec::new(),
            fallback: fallback.to_string(),
        }
    }

    /// Append a rule after all existing ones
    pub fn with_rule(mut self, category: &str, keywords: &[&str]) -> Self {
        self.rules.push(TaxonomyRule::new(category, keywords));
        self
    }

    /// Load a taxonomy from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read taxonomy file: {:?}", path.as_ref()))?;

        let taxonomy: Taxonomy =
            serde_json::from_str(&content).context("Failed to parse taxonomy JSON")?;

        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// Classify a label. Always returns exactly one category.
    pub fn classify(&self, label: Option<&str>) -> &str {
        let normalized = match label {
            Some(raw) => raw.trim().to_lowercase(),
            None => return &self.fallback,
        };

        if normalized.is_empty() {
            return &self.fallback;
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(&normalized))
            .map(|rule| rule.category.as_str())
            .unwrap_or(&self.fallback)
    }

    /// Categories in declaration order, fallback last
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !categories.contains(&rule.category.as_str()) {
                categories.push(&rule.category);
            }
        }
        if !categories.contains(&self.fallback.as_str()) {
            categories.push(&self.fallback);
        }
        categories
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Reject tables that would classify silently wrong.
    ///
    /// An empty keyword is a substring of every label, so it would capture
    /// everything after it in order.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        if self.fallback.trim().is_empty() {
            return Err(PipelineError::Config(format!(
                "taxonomy '{}' has an empty fallback category",
                self.name
            )));
        }

        for rule in &self.rules {
            if rule.category.trim().is_empty() {
                return Err(PipelineError::Config(format!(
                    "taxonomy '{}' has a rule with an empty category",
                    self.name
                )));
            }
            if rule.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(PipelineError::Config(format!(
                    "taxonomy '{}': category '{}' has an empty keyword",
                    self.name, rule.category
                )));
            }
        }

        Ok(())
    }

    // ========================================================================
    // OBSERVED TAXONOMIES
    // ========================================================================

    pub fn industry() -> Self {
        Taxonomy::new("industry", "Other")
            .with_rule(
                "Technology",
                &[
                    "ai", "software", "tech", "saas", "app", "data", "iot", "blockchain",
                    "cyber", "robot", "cloud",
                ],
            )
            .with_rule(
                "Health",
                &["health", "medic", "bio", "pharma", "care", "wellness", "clinic"],
            )
            .with_rule("Education", &["edu", "learning", "school", "training"])
            .with_rule("Finance", &["fintech", "financ", "bank", "payment", "insur"])
            .with_rule(
                "Energy & Environment",
                &["energy", "solar", "clean", "climate", "green", "environment", "water"],
            )
            .with_rule("Agriculture & Food", &["agri", "food", "farm"])
            .with_rule("Retail & E-commerce", &["retail", "commerce", "fashion", "shop"])
            .with_rule("Media & Entertainment", &["media", "game", "gaming", "entertainment", "music"])
    }

    pub fn status() -> Self {
        Taxonomy::new("status", "Unknown")
            .with_rule("Invested", &["invest", "funded"])
            .with_rule("Graduated", &["graduat", "alumni", "completed"])
            // before Active: "inactive" contains "active"
            .with_rule("Inactive", &["inactive", "closed", "dropped", "withdrawn", "paused"])
            .with_rule("Active", &["active", "ongoing", "in progress", "accelerat"])
    }

    pub fn faculty() -> Self {
        Taxonomy::new("faculty", "External")
            // before Science: "computer science" contains "science"
            .with_rule("Computer Science", &["computer", "informatic", "computing"])
            .with_rule("Engineering", &["engineer"])
            .with_rule("Medicine", &["medic", "nursing", "pharmac", "dentist"])
            .with_rule("Business", &["business", "economic", "management", "commerce"])
            .with_rule("Law", &["law", "legal"])
            .with_rule("Science", &["science", "physic", "chemi", "biolog", "math"])
            .with_rule("Arts & Humanities", &["art", "humanit", "design", "architect"])
    }
}

// ============================================================================
// FREE-FUNCTION CONTRACT
// ============================================================================

/// `classify(label, taxonomy) -> category`
pub fn classify<'a>(label: Option<&str>, taxonomy: &'a Taxonomy) -> &'a str {
    taxonomy.classify(label)
}

/// Split a comma-separated tag list, trimming tokens and dropping empty ones.
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Classify each tag independently: one `(tag, category)` per tag.
///
/// A label with no usable tag still yields one entry, `(None, fallback)`,
/// so every startup survives explosion with at least one row.
pub fn explode(raw: Option<&str>, taxonomy: &Taxonomy) -> Vec<(Option<String>, String)> {
    let tags = split_tags(raw);
    if tags.is_empty() {
        return vec![(None, taxonomy.fallback.clone())];
    }

    tags.into_iter()
        .map(|tag| {
            let category = taxonomy.classify(Some(&tag)).to_string();
            (Some(tag), category)
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_first_match_wins_in_declaration_order() {
        let taxonomy = Taxonomy::new("t", "Other")
            .with_rule("First", &["bio"])
            .with_rule("Second", &["biotech"]);

        assert_eq!(taxonomy.classify(Some("Biotech")), "First");

        let reversed = Taxonomy::new("t", "Other")
            .with_rule("Second", &["biotech"])
            .with_rule("First", &["bio"]);

        assert_eq!(reversed.classify(Some("Biotech")), "Second");
    }

    #[test]
    fn test_label_is_trimmed_and_case_insensitive() {
        let taxonomy = Taxonomy::industry();

        assert_eq!(taxonomy.classify(Some("  HEALTHCARE  ")), "Health");
        assert_eq!(taxonomy.classify(Some("Banking")), "Finance");
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let taxonomy = Taxonomy::new("t", "Other").with_rule("Tech", &["SaaS"]);

        assert_eq!(taxonomy.classify(Some("b2b saas platform")), "Tech");
    }

    #[test]
    fn test_null_and_blank_labels_get_fallback() {
        let taxonomy = Taxonomy::faculty();

        assert_eq!(taxonomy.classify(None), "External");
        assert_eq!(taxonomy.classify(Some("")), "External");
        assert_eq!(taxonomy.classify(Some("   ")), "External");
    }

    #[test]
    fn test_unmatched_label_gets_taxonomy_fallback() {
        assert_eq!(Taxonomy::industry().classify(Some("Tourism")), "Other");
        assert_eq!(Taxonomy::status().classify(Some("???")), "Unknown");
        assert_eq!(Taxonomy::faculty().classify(Some("Not a student")), "External");
    }

    #[test]
    fn test_classify_is_total() {
        let taxonomies = [Taxonomy::industry(), Taxonomy::status(), Taxonomy::faculty()];
        let labels = [
            None,
            Some(""),
            Some(" "),
            Some(","),
            Some("AI"),
            Some("ünïcödé"),
            Some("Inactive"),
            Some("Faculty of Law"),
            Some("1234"),
        ];

        for taxonomy in &taxonomies {
            let known = taxonomy.categories();
            for label in labels {
                let category = taxonomy.classify(label);
                assert!(!category.is_empty());
                assert!(known.contains(&category), "{} not in {:?}", category, known);
            }
        }
    }

    #[test]
    fn test_status_order_keeps_inactive_out_of_active() {
        let taxonomy = Taxonomy::status();

        assert_eq!(taxonomy.classify(Some("Inactive")), "Inactive");
        assert_eq!(taxonomy.classify(Some("Active")), "Active");
        assert_eq!(taxonomy.classify(Some("Invested (Seed)")), "Invested");
    }

    #[test]
    fn test_faculty_order_keeps_computer_science_distinct() {
        let taxonomy = Taxonomy::faculty();

        assert_eq!(taxonomy.classify(Some("Computer Science")), "Computer Science");
        assert_eq!(taxonomy.classify(Some("Natural Sciences")), "Science");
        assert_eq!(taxonomy.classify(Some("Faculty of Engineering")), "Engineering");
    }

    #[test]
    fn test_known_false_positive_substring_matches() {
        // Substring matching is the policy: short keywords hit inside
        // unrelated words. These results are expected, not bugs.
        let taxonomy = Taxonomy::industry();

        assert_eq!(taxonomy.classify(Some("Said")), "Technology");
        assert_eq!(taxonomy.classify(Some("Retail")), "Technology");
        assert_eq!(taxonomy.classify(Some("Happy Pets")), "Technology");
    }

    #[test]
    fn test_free_function_matches_method() {
        let taxonomy = Taxonomy::industry();

        assert_eq!(classify(Some("EdTech"), &taxonomy), taxonomy.classify(Some("EdTech")));
    }

    #[test]
    fn test_split_tags_trims_and_drops_empty_tokens() {
        assert_eq!(split_tags(Some(" AI , Health,, ")), vec!["AI", "Health"]);
        assert!(split_tags(Some("")).is_empty());
        assert!(split_tags(None).is_empty());
    }

    #[test]
    fn test_explode_one_entry_per_tag() {
        let taxonomy = Taxonomy::industry();
        let rows = explode(Some("AI, Health"), &taxonomy);

        assert_eq!(
            rows,
            vec![
                (Some("AI".to_string()), "Technology".to_string()),
                (Some("Health".to_string()), "Health".to_string()),
            ]
        );
    }

    #[test]
    fn test_explode_empty_industry_keeps_one_row() {
        let taxonomy = Taxonomy::industry();

        assert_eq!(explode(None, &taxonomy), vec![(None, "Other".to_string())]);
        assert_eq!(explode(Some(" , "), &taxonomy), vec![(None, "Other".to_string())]);
    }

    #[test]
    fn test_categories_in_declaration_order() {
        let taxonomy = Taxonomy::new("t", "Other")
            .with_rule("B", &["b"])
            .with_rule("A", &["a"])
            .with_rule("B", &["bb"]);

        assert_eq!(taxonomy.categories(), vec!["B", "A", "Other"]);
        assert_eq!(taxonomy.rule_count(), 3);
    }

    #[test]
    fn test_validate_rejects_empty_keyword_and_fallback() {
        let empty_keyword = Taxonomy::new("t", "Other").with_rule("A", &["a", " "]);
        assert!(matches!(empty_keyword.validate(), Err(PipelineError::Config(_))));

        let empty_fallback = Taxonomy::new("t", "").with_rule("A", &["a"]);
        assert!(matches!(empty_fallback.validate(), Err(PipelineError::Config(_))));

        assert!(Taxonomy::industry().validate().is_ok());
    }

    #[test]
    fn test_from_file_preserves_rule_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "name": "sector",
                "fallback": "Uncategorized",
                "rules": [
                    {{ "category": "Deep Tech", "keywords": ["quantum", "tech"] }},
                    {{ "category": "Tech", "keywords": ["tech"] }}
                ]
            }}"#
        )
        .unwrap();

        let taxonomy = Taxonomy::from_file(file.path()).unwrap();

        assert_eq!(taxonomy.classify(Some("Tech")), "Deep Tech");
        assert_eq!(taxonomy.classify(Some("Food")), "Uncategorized");
    }

    #[test]
    fn test_from_file_rejects_invalid_taxonomy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "name": "x", "fallback": "", "rules": [] }}"#).unwrap();

        assert!(Taxonomy::from_file(file.path()).is_err());
    }
}
