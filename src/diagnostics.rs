// ⚠️ Diagnostics - Recoverable problems surfaced to the dashboard
//
// Nothing here stops the batch. A missing column is synthesized as null and
// a malformed row is skipped; both leave a PipelineWarning behind so the
// presentation layer can show what was degraded.

use serde::{Deserialize, Serialize};

// ============================================================================
// SEVERITY & KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Every join on this source will miss
    Critical,
    /// Data degraded but still usable
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Expected column absent; synthesized as all-null
    MissingColumn,
    /// Join-key column absent; synthesized as all-null
    MissingKeyColumn,
    /// Record the CSV reader could not decode; skipped
    MalformedRow,
    /// Header row not valid UTF-8; decoded lossily
    MalformedHeader,
}

// ============================================================================
// WARNING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineWarning {
    pub severity: Severity,
    pub kind: WarningKind,
    /// "founders", "startups" or "deals"
    pub source: String,
    pub column: Option<String>,
    /// 1-indexed, header is line 1
    pub line: Option<u64>,
    pub message: String,
}

impl PipelineWarning {
    pub fn missing_column(source: &str, column: &str, is_key: bool) -> Self {
        if is_key {
            PipelineWarning {
                severity: Severity::Critical,
                kind: WarningKind::MissingKeyColumn,
                source: source.to_string(),
                column: Some(column.to_string()),
                line: None,
                message: format!(
                    "join key column '{}' missing from {}; no {} row can match",
                    column, source, source
                ),
            }
        } else {
            PipelineWarning {
                severity: Severity::Warning,
                kind: WarningKind::MissingColumn,
                source: source.to_string(),
                column: Some(column.to_string()),
                line: None,
                message: format!("column '{}' missing from {}; filled with nulls", column, source),
            }
        }
    }

    pub fn malformed_row(source: &str, line: Option<u64>, reason: &str) -> Self {
        PipelineWarning {
            severity: Severity::Warning,
            kind: WarningKind::MalformedRow,
            source: source.to_string(),
            column: None,
            line,
            message: format!("skipped unreadable {} row: {}", source, reason),
        }
    }

    pub fn malformed_header(source: &str) -> Self {
        PipelineWarning {
            severity: Severity::Warning,
            kind: WarningKind::MalformedHeader,
            source: source.to_string(),
            column: None,
            line: Some(1),
            message: format!(
                "{} header is not valid UTF-8; undecodable column names will not match",
                source
            ),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "[{}:{}] {}", self.source, line, self.message),
            None => write!(f, "[{}] {}", self.source, self.message),
        }
    }
}

/// One-line summary for logs and the CLI
pub fn summarize(warnings: &[PipelineWarning]) -> String {
    let count = |kind: WarningKind| warnings.iter().filter(|w| w.kind == kind).count();

    format!(
        "Warnings: {} ({} critical) - missing columns: {}, missing keys: {}, skipped rows: {}, bad headers: {}",
        warnings.len(),
        warnings.iter().filter(|w| w.is_critical()).count(),
        count(WarningKind::MissingColumn),
        count(WarningKind::MissingKeyColumn),
        count(WarningKind::MalformedRow),
        count(WarningKind::MalformedHeader),
    )
}
