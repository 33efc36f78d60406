// ⛔ Fatal errors
// Row-level problems are never errors (they become PipelineWarnings);
// only configuration and query-shape mistakes end up here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown dimension '{dimension}' for {table} (available: {})", available.join(", "))]
    UnknownDimension {
        table: String,
        dimension: String,
        available: Vec<String>,
    },

    #[error("Percentage base '{dimension}' is not one of the group-by dimensions")]
    InvalidShareBase { dimension: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
