use crate::classify::{Category, Classification};
use crate::raw::{CellValue, RawRow};
use crate::region::Currency;
use crate::sanitize::{is_unknown_date, sanitize_name};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Which system a record came from, for cross-system reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceSystem {
    Remittance,
    BankStatement,
    Ledger,
}

impl SourceSystem {
    /// Short code for internal use
    pub fn code(&self) -> &'static str {
        match self {
            SourceSystem::Remittance => "REMIT",
            SourceSystem::BankStatement => "BANK",
            SourceSystem::Ledger => "LEDGER",
        }
    }
}

// ============================================================================
// TRANSACTION RECORD (base)
// ============================================================================

/// Normalized transaction shared by every source system
///
/// `date` is either a real calendar date or the unknown sentinel
/// (`sanitize::unknown_date`). `amount` is always a finite decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Stable identity (UUID v4)
    pub id: String,
    pub source_system: SourceSystem,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: Currency,
    pub reference_number: String,
    pub description: String,
}

impl TransactionRecord {
    pub fn new(
        source_system: SourceSystem,
        date: NaiveDate,
        amount: Decimal,
        currency: Currency,
        reference_number: String,
        description: String,
    ) -> Self {
        TransactionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            source_system,
            date,
            amount,
            currency,
            reference_number,
            description,
        }
    }

    pub fn has_known_date(&self) -> bool {
        !is_unknown_date(self.date)
    }
}

// ============================================================================
// REMITTANCE RECORD
// ============================================================================

/// One remittance line item, typed and classified
///
/// Discount/credit/debit/balance are recorded as found; their arithmetic
/// consistency is checked (if at all) by `quality`, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceRecord {
    #[serde(flatten)]
    pub transaction: TransactionRecord,

    /// 0-based row index in the source matrix
    pub row_number: usize,

    pub payee_name: String,
    pub vendor_site: String,
    pub payment_number: String,
    pub payment_date: NaiveDate,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub po_number: String,

    pub discount_amount: Decimal,
    pub credit_amount: Decimal,
    pub debit_amount: Decimal,
    pub balance_amount: Decimal,

    pub category: Category,

    /// Category text as it appeared in the row, before classification
    pub raw_category: String,

    /// Rule that produced `category`, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_rule: Option<String>,
}

impl RemittanceRecord {
    pub fn apply_classification(&mut self, classification: Classification) {
        self.category = classification.category;
        self.raw_category = classification.raw_category;
        self.classification_rule = classification.rule_id;
    }

    /// Content hash for matching the same payment across systems
    ///
    /// Identity is `transaction.id`; this is only for matching, so two
    /// records with equal content share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}",
            self.transaction.date,
            self.transaction.amount.normalize(),
            self.transaction.currency.code(),
            self.transaction.reference_number,
            self.payee_name.to_lowercase()
        ));
        format!("{:x}", hasher.finalize())
    }

    /// File/resource-safe name, e.g. for per-record exports
    pub fn resource_name(&self) -> String {
        sanitize_name(&format!("{}_{}", self.payee_name, self.invoice_number))
    }
}

// ============================================================================
// ROW REJECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RejectionReason {
    /// Row too short for the layout, or a required cell is blank
    MissingRequiredField { field: String },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::MissingRequiredField { field } => {
                write!(f, "MissingRequiredField({})", field)
            }
        }
    }
}

/// A row that could not become a record, kept with its reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
    pub row_number: usize,
    pub raw_row: RawRow,
    pub reason: RejectionReason,
    pub message: String,
}

impl RowRejection {
    pub fn missing_field(row_number: usize, row: &[CellValue], field: &str, message: String) -> Self {
        RowRejection {
            row_number,
            raw_row: row.to_vec(),
            reason: RejectionReason::MissingRequiredField {
                field: field.to_string(),
            },
            message,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
