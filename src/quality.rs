// ✅ Record Diagnostics - Flag what fail-soft parsing let through
//
// The pipeline zeroes malformed amounts and uses the sentinel for bad dates
// instead of failing. Consumers that care run these checks on the result.
// Nothing here changes a record or feeds back into the pipeline.

use crate::classify::Category;
use crate::pipeline::BatchResult;
use crate::record::RemittanceRecord;
use crate::sanitize::{format_amount, is_unknown_date};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// ISSUES & REPORTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Record carries no usable financial fact
    Warning,  // Value is questionable (likely fail-soft default)
    Info,     // Valid but worth a look
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub field: String,
    pub issue: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub row_number: usize,
    pub record_id: String,
    pub issues: Vec<QualityIssue>,
    pub needs_review: bool,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "Row {}: {} issues ({} critical)",
            self.row_number,
            self.issues.len(),
            self.issues
                .iter()
                .filter(|i| i.severity == Severity::Critical)
                .count()
        )
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub records: usize,
    pub needs_review: usize,
    pub critical: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl QualitySummary {
    pub fn summary(&self) -> String {
        format!(
            "{} records inspected, {} need review ({} critical, {} warnings, {} info)",
            self.records, self.needs_review, self.critical, self.warnings, self.infos
        )
    }
}

// ============================================================================
// QUALITY ENGINE
// ============================================================================

pub struct QualityEngine {
    /// Allowed |discount + credit + debit - balance|
    balance_tolerance: Decimal,
}

impl QualityEngine {
    pub fn new() -> Self {
        QualityEngine {
            balance_tolerance: Decimal::new(1, 2),
        }
    }

    pub fn with_tolerance(balance_tolerance: Decimal) -> Self {
        QualityEngine {
            balance_tolerance: balance_tolerance.abs(),
        }
    }

    /// Inspect one record
    pub fn inspect(&self, record: &RemittanceRecord) -> QualityReport {
        let mut issues = Vec::new();

        self.check_usable(record, &mut issues);
        self.check_amount(record, &mut issues);
        self.check_dates(record, &mut issues);
        self.check_balance(record, &mut issues);
        self.check_category(record, &mut issues);

        let needs_review = issues.iter().any(|i| i.severity != Severity::Info);

        QualityReport {
            row_number: record.row_number,
            record_id: record.transaction.id.clone(),
            issues,
            needs_review,
        }
    }

    /// Inspect every record of a batch, in record order
    pub fn inspect_batch(&self, result: &BatchResult) -> Vec<QualityReport> {
        result.records.iter().map(|r| self.inspect(r)).collect()
    }

    pub fn batch_summary(&self, reports: &[QualityReport]) -> QualitySummary {
        let mut summary = QualitySummary {
            records: reports.len(),
            ..QualitySummary::default()
        };

        for report in reports {
            if report.needs_review {
                summary.needs_review += 1;
            }
            for issue in &report.issues {
                match issue.severity {
                    Severity::Critical => summary.critical += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => summary.infos += 1,
                }
            }
        }

        summary
    }

    // ========================================================================
    // CHECKS
    // ========================================================================

    fn check_usable(&self, record: &RemittanceRecord, issues: &mut Vec<QualityIssue>) {
        if record.transaction.amount.is_zero() && !record.transaction.has_known_date() {
            issues.push(QualityIssue {
                severity: Severity::Critical,
                field: "amount,date".to_string(),
                issue: "Both amount and date fell back to defaults".to_string(),
                recommendation: "Check the source row; it may not be a line item".to_string(),
            });
        }
    }

    fn check_amount(&self, record: &RemittanceRecord, issues: &mut Vec<QualityIssue>) {
        if record.transaction.amount.is_zero() {
            issues.push(QualityIssue {
                severity: Severity::Warning,
                field: "amount".to_string(),
                issue: "Amount is zero".to_string(),
                recommendation: "Verify the amount cell was not malformed".to_string(),
            });
        }
    }

    fn check_dates(&self, record: &RemittanceRecord, issues: &mut Vec<QualityIssue>) {
        if !record.transaction.has_known_date() {
            issues.push(QualityIssue {
                severity: Severity::Warning,
                field: "date".to_string(),
                issue: "Neither payment nor invoice date could be read".to_string(),
                recommendation: "Fix the date cells (DD-MMM-YYYY or the region layout)".to_string(),
            });
            return;
        }

        let both_known = !is_unknown_date(record.payment_date) && !is_unknown_date(record.invoice_date);
        if both_known && record.payment_date < record.invoice_date {
            issues.push(QualityIssue {
                severity: Severity::Info,
                field: "payment_date".to_string(),
                issue: format!(
                    "Paid {} before invoice date {}",
                    record.payment_date, record.invoice_date
                ),
                recommendation: "Confirm this is a prepayment".to_string(),
            });
        }
    }

    /// discount + credit + debit should equal balance (diagnostic only)
    fn check_balance(&self, record: &RemittanceRecord, issues: &mut Vec<QualityIssue>) {
        let parts = [record.discount_amount, record.credit_amount, record.debit_amount];
        if parts.iter().all(Decimal::is_zero) && record.balance_amount.is_zero() {
            return;
        }

        let sum = parts
            .iter()
            .try_fold(Decimal::ZERO, |acc, part| acc.checked_add(*part));
        let difference = sum.and_then(|s| s.checked_sub(record.balance_amount));

        let (sum, difference) = match (sum, difference) {
            (Some(sum), Some(difference)) => (sum, difference.abs()),
            _ => {
                issues.push(QualityIssue {
                    severity: Severity::Warning,
                    field: "balance".to_string(),
                    issue: "Discount + credit + debit overflows against balance".to_string(),
                    recommendation: "Check the adjustment columns for malformed amounts".to_string(),
                });
                return;
            }
        };

        if difference > self.balance_tolerance {
            issues.push(QualityIssue {
                severity: Severity::Warning,
                field: "balance".to_string(),
                issue: format!(
                    "Discount + credit + debit = {} but balance = {} (off by {})",
                    format_amount(sum),
                    format_amount(record.balance_amount),
                    format_amount(difference)
                ),
                recommendation: "Reconcile the adjustment columns against the balance".to_string(),
            });
        }
    }

    fn check_category(&self, record: &RemittanceRecord, issues: &mut Vec<QualityIssue>) {
        if record.category == Category::Uncategorized {
            let issue = if record.raw_category.is_empty() {
                "No rule matched and the row has no category".to_string()
            } else {
                format!("Unrecognized category '{}'", record.raw_category)
            };
            issues.push(QualityIssue {
                severity: Severity::Info,
                field: "category".to_string(),
                issue,
                recommendation: "Add a classification rule or category alias".to_string(),
            });
        }
    }
}

impl Default for QualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
