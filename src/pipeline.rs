// 🔁 Batch Pipeline - Matrix → BatchResult
//
// Resolves the region once, runs the region's processor over every row and
// partitions the outcomes. Row failures never abort the batch; only an
// unknown region or a structurally invalid matrix does.

use crate::error::PipelineResult;
use crate::processor::{RowContext, RowOutcome};
use crate::raw::{is_blank_row, matrix_from_json, RawRow};
use crate::record::{RemittanceRecord, RowRejection, SourceSystem};
use crate::region::{RegionConfig, RegionRegistry};
use crate::sanitize::format_amount;
use crate::strategy::{RegionStrategy, StrategyCatalog};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::panic;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Worker threads; 1 processes rows on the calling thread
    pub workers: usize,

    /// Batches smaller than this stay sequential regardless of `workers`
    pub parallel_threshold: usize,

    /// Drop all-blank rows instead of rejecting them
    pub skip_blank_rows: bool,

    /// Tag stamped on every produced record
    pub source_system: SourceSystem,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            workers: 1,
            parallel_threshold: 1024,
            skip_blank_rows: false,
            source_system: SourceSystem::Remittance,
        }
    }
}

// ============================================================================
// BATCH RESULT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total_rows: usize,
    pub valid: usize,
    pub rejected: usize,
    pub skipped_blank: usize,
    /// Records whose amount normalized to 0 (possibly a malformed cell)
    pub zero_amounts: usize,
    /// Records dated with the unknown sentinel
    pub unknown_dates: usize,
}

/// Records and rejections, both in source row order
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub region: String,
    pub records: Vec<RemittanceRecord>,
    pub rejections: Vec<RowRejection>,
    pub summary: BatchSummary,
}

impl BatchResult {
    /// Sum of record amounts (mixed currencies are not converted)
    ///
    /// None when the sum does not fit in a Decimal.
    pub fn total_amount(&self) -> Option<Decimal> {
        self.records
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.transaction.amount))
    }

    /// Display form of `total_amount`
    pub fn total_display(&self) -> String {
        self.total_amount()
            .map(format_amount)
            .unwrap_or_else(|| "overflow".to_string())
    }

    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Region {}: {} rows, {} records, {} rejected, {} blank skipped, total {}",
            self.region,
            self.summary.total_rows,
            self.summary.valid,
            self.summary.rejected,
            self.summary.skipped_blank,
            self.total_display()
        )
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct BatchPipeline {
    registry: Arc<RegionRegistry>,
    catalog: Arc<StrategyCatalog>,
    options: PipelineOptions,
}

impl BatchPipeline {
    /// Wire a registry to a strategy catalog
    ///
    /// Fails if any registered region names a strategy the catalog lacks,
    /// so a misconfigured region is caught before the first batch.
    pub fn new(registry: Arc<RegionRegistry>, catalog: StrategyCatalog) -> PipelineResult<Self> {
        for config in registry.configs() {
            catalog.resolve(config)?;
        }

        Ok(BatchPipeline {
            registry,
            catalog: Arc::new(catalog),
            options: PipelineOptions::default(),
        })
    }

    /// Built-in regions with built-in strategies
    pub fn builtin() -> PipelineResult<Self> {
        let registry = RegionRegistry::builtin()?;
        Self::new(Arc::new(registry), StrategyCatalog::builtin())
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Normalize a decoded matrix (header row already removed)
    pub fn run(&self, rows: &[RawRow], region_code: &str) -> PipelineResult<BatchResult> {
        let config = self.registry.get_config(region_code)?;
        let strategy = self.catalog.resolve(config)?;

        info!(
            region = %config.code,
            rows = rows.len(),
            processor = strategy.processor.name(),
            classifier = strategy.classifier.name(),
            "Starting remittance batch"
        );

        let outcomes = self.process_rows(rows, config, &strategy);

        let mut summary = BatchSummary {
            total_rows: rows.len(),
            ..BatchSummary::default()
        };
        let mut records = Vec::with_capacity(rows.len());
        let mut rejections = Vec::new();

        for outcome in outcomes {
            match outcome {
                None => summary.skipped_blank += 1,
                Some(RowOutcome::Record(record)) => {
                    if record.transaction.amount.is_zero() {
                        summary.zero_amounts += 1;
                    }
                    if !record.transaction.has_known_date() {
                        summary.unknown_dates += 1;
                    }
                    records.push(*record);
                }
                Some(RowOutcome::Rejected(rejection)) => {
                    debug!(row = rejection.row_number, reason = %rejection.reason, "{}", rejection.message);
                    rejections.push(rejection);
                }
            }
        }

        summary.valid = records.len();
        summary.rejected = rejections.len();

        if records.is_empty() && !rejections.is_empty() {
            warn!(region = %config.code, rejected = summary.rejected, "Every row in the batch was rejected");
        }

        info!(
            region = %config.code,
            valid = summary.valid,
            rejected = summary.rejected,
            skipped_blank = summary.skipped_blank,
            zero_amounts = summary.zero_amounts,
            unknown_dates = summary.unknown_dates,
            "Remittance batch complete"
        );

        Ok(BatchResult {
            region: config.code.clone(),
            records,
            rejections,
            summary,
        })
    }

    /// Normalize a matrix given as JSON (array of arrays of cells)
    pub fn run_json(&self, matrix: &Value, region_code: &str) -> PipelineResult<BatchResult> {
        // Resolve the region first so an unknown region wins over bad input
        self.registry.get_config(region_code)?;
        let rows = matrix_from_json(matrix)?;
        self.run(&rows, region_code)
    }

    // ========================================================================
    // ROW EXECUTION
    // ========================================================================

    /// One outcome per input row, in input order (None = skipped blank row)
    fn process_rows(
        &self,
        rows: &[RawRow],
        config: &RegionConfig,
        strategy: &RegionStrategy,
    ) -> Vec<Option<RowOutcome>> {
        let workers = self.options.workers.max(1);
        if workers == 1 || rows.len() < self.options.parallel_threshold || rows.len() < 2 {
            return self.process_chunk(rows, 0, config, strategy);
        }

        // Contiguous chunks joined in spawn order keep row order intact
        let chunk_size = rows.len().div_ceil(workers);

        thread::scope(|scope| {
            let handles: Vec<_> = rows
                .chunks(chunk_size)
                .enumerate()
                .map(|(idx, chunk)| {
                    scope.spawn(move || self.process_chunk(chunk, idx * chunk_size, config, strategy))
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        })
    }

    fn process_chunk(
        &self,
        rows: &[RawRow],
        offset: usize,
        config: &RegionConfig,
        strategy: &RegionStrategy,
    ) -> Vec<Option<RowOutcome>> {
        rows.iter()
            .enumerate()
            .map(|(idx, row)| {
                if self.options.skip_blank_rows && is_blank_row(row) {
                    return None;
                }

                let ctx = RowContext {
                    row_number: offset + idx,
                    config,
                    classifier: strategy.classifier.as_ref(),
                    source_system: self.options.source_system,
                };
                Some(strategy.processor.normalize(row, &ctx))
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
