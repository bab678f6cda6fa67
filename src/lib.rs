// Remittance Normalizer - Core Library
// Exposes all modules for use in the CLI and tests

pub mod error;
pub mod raw;       // Input cells and matrices
pub mod sanitize;  // Fail-soft text / amount / date coercion
pub mod region;    // Region configuration registry
pub mod record;    // Normalized records and rejections
pub mod classify;  // Record classifiers
pub mod processor; // Row → record mapping
pub mod strategy;  // Strategy name → implementation
pub mod pipeline;  // Batch orchestration
pub mod quality;   // Downstream diagnostics

// Re-export commonly used types
pub use error::{ConfigError, PipelineError, PipelineResult};
pub use raw::{CellValue, RawRow, is_blank_row, matrix_from_json};
pub use sanitize::{
    to_text, to_amount, format_amount, to_date, to_date_with_hint,
    unknown_date, is_unknown_date, sanitize_name,
};
pub use region::{
    Currency, DateFormat, NumberFormat, RegionConfig, RegionRegistry,
};
pub use record::{
    SourceSystem, TransactionRecord, RemittanceRecord,
    RejectionReason, RowRejection,
};
pub use classify::{
    Category, Classification, Classifier, ClassificationRule, MatchField,
    RuleClassifier, SignClassifier,
};
pub use processor::{
    ColumnLayout, RowContext, RowOutcome, RowProcessor,
    StandardProcessor, CommaDecimalProcessor,
};
pub use strategy::{RegionStrategy, StrategyCatalog};
pub use pipeline::{BatchPipeline, BatchResult, BatchSummary, PipelineOptions};
pub use quality::{QualityEngine, QualityIssue, QualityReport, QualitySummary, Severity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
