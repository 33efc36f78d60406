// Entity Models - Founders, Startups, Deals
//
// Each entity is read as-is from its CSV source, then derived once:
// - Founder: faculty normalized in place
// - Startup: status classified, industry exploded into one row per tag
// - Deal: cohort resolved in place into ordinal + year
//
// The startup name is the only join key and is kept exactly as stored.

pub mod deal;
pub mod founder;
pub mod startup;

pub use deal::Deal;
pub use founder::Founder;
pub use startup::{Startup, StartupRow};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// A typed row of one of the three raw sources.
pub trait SourceRecord: DeserializeOwned {
    /// Human-readable source name used in warnings
    const ENTITY: &'static str;

    /// Columns the loader expects in the header
    const COLUMNS: &'static [&'static str];

    /// Column holding the startup-name join key
    const KEY_COLUMN: &'static str;
}

/// Parse a count column leniently: "3", " 3 " and "3.0" are 3; anything
/// else (blank, "three", "-1", "2.5") is null rather than a row failure.
pub(crate) fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| parse_count(&value)))
}

fn parse_count(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if let Ok(count) = trimmed.parse::<u32>() {
        return Some(count);
    }

    let float = trimmed.parse::<f64>().ok()?;
    if float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= f64::from(u32::MAX) {
        Some(float as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_accepts_integers_and_whole_floats() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count(" 4 "), Some(4));
        assert_eq!(parse_count("2.0"), Some(2));
    }

    #[test]
    fn test_parse_count_rejects_everything_else() {
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("three"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("2.5"), None);
        assert_eq!(parse_count("NaN"), None);
    }
}
