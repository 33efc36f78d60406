// Accelerator Insights - Core Library
// Load → classify → resolve cohorts → merge → aggregate, for the CLI and tests

pub mod error;          // Fatal errors (config, query shape)
pub mod diagnostics;    // Non-fatal warnings (missing columns, bad rows)
pub mod taxonomy;       // Keyword taxonomies: industry, status, faculty
pub mod cohort;         // Cohort label → ordinal → year
pub mod entities;       // Founder, Startup, Deal records
pub mod loader;         // CSV sources → SourceSnapshot
pub mod merge;          // Founder/Startup/Deal joins
pub mod aggregate;      // Group-by counts, filters, percentages
pub mod config;         // PipelineConfig (JSON)
pub mod pipeline;       // Pipeline, FactTables, FactCache
pub mod logging;

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use diagnostics::{PipelineWarning, Severity, WarningKind};
pub use taxonomy::{classify, explode, split_tags, Taxonomy, TaxonomyRule};
pub use cohort::{CohortConfig, CohortResolution, CohortResolver};
pub use entities::{Deal, Founder, SourceRecord, Startup, StartupRow};
pub use loader::{read_table, LoadedTable, SnapshotId, SourceSnapshot};
pub use merge::{
    merge_founder_startup, merge_full, merge_startup_deal,
    FounderStartupRow, FullRow, StartupDealRow,
};
pub use aggregate::{
    aggregate, filter_options, filter_rows,
    Aggregation, FactRow, Filters, GroupCount, GroupShare, ALL,
};
pub use config::PipelineConfig;
pub use pipeline::{FactCache, FactTableKind, FactTables, Pipeline};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
