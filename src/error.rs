// 🚨 Error Types - Pipeline failure taxonomy
//
// Only configuration and structural input problems are errors.
// Row-level problems become RowRejection values (see record.rs), and
// malformed amounts/dates are normalized to 0 / the sentinel date.

use thiserror::Error;

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

/// Errors while loading region definitions.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read region config: {0}")]
    Io(#[from] std::io::Error),

    /// Region definitions are not valid JSON for `RegionConfig`.
    #[error("Invalid region config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two definitions share a region code.
    #[error("Duplicate region code '{0}'")]
    DuplicateRegion(String),

    /// A definition has a blank region code.
    #[error("Region code must not be empty")]
    EmptyRegionCode,
}

// ============================================================================
// PIPELINE ERRORS (fatal for a whole batch)
// ============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unknown region code.
    #[error("No configuration registered for region '{0}'")]
    ConfigNotFound(String),

    /// Input matrix is absent or not a sequence of rows.
    #[error("Invalid input matrix: {0}")]
    InvalidInput(String),

    /// A region names a processor or classifier the catalog doesn't have.
    #[error("Region '{region}' names unknown {kind} strategy '{name}'")]
    UnknownStrategy {
        region: String,
        kind: &'static str,
        name: String,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
