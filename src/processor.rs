// 🏗️ Row-to-Record Mapper
// One raw row + region config → exactly one record or one rejection
//
// Processors are region-selectable strategies. They never log, persist or
// touch shared state; everything they produce is in the returned RowOutcome.

use crate::classify::{Category, Classifier};
use crate::raw::CellValue;
use crate::record::{RemittanceRecord, RowRejection, SourceSystem, TransactionRecord};
use crate::region::{Currency, RegionConfig};
use crate::sanitize::{is_unknown_date, to_amount, to_date_with_hint, to_text};
use rust_decimal::Decimal;

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

/// Column index → field mapping agreed with the ingestion side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub version: &'static str,
    pub payee_name: usize,
    pub vendor_site: usize,
    pub payment_number: usize,
    pub payment_date: usize,
    /// Reference number (required)
    pub invoice_number: usize,
    pub invoice_date: usize,
    pub po_number: usize,
    pub description: usize,
    /// Signed line amount (required)
    pub amount: usize,
    pub discount: usize,
    pub credit: usize,
    pub debit: usize,
    pub balance: usize,
    pub category_hint: usize,
    pub currency: usize,
    /// Rows shorter than this are rejected outright
    pub required_columns: usize,
}

impl ColumnLayout {
    pub const V1: ColumnLayout = ColumnLayout {
        version: "v1",
        payee_name: 0,
        vendor_site: 1,
        payment_number: 2,
        payment_date: 3,
        invoice_number: 4,
        invoice_date: 5,
        po_number: 6,
        description: 7,
        amount: 8,
        discount: 9,
        credit: 10,
        debit: 11,
        balance: 12,
        category_hint: 13,
        currency: 14,
        required_columns: 9,
    };

    /// Required fields as (column, field name), checked in this order
    fn required_fields(&self) -> [(usize, &'static str); 2] {
        [(self.invoice_number, "invoice_number"), (self.amount, "amount")]
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout::V1
    }
}

// ============================================================================
// PROCESSOR CAPABILITY
// ============================================================================

/// Everything a processor needs besides the row itself
pub struct RowContext<'a> {
    /// 0-based row index in the matrix
    pub row_number: usize,
    pub config: &'a RegionConfig,
    pub classifier: &'a dyn Classifier,
    pub source_system: SourceSystem,
}

/// Exactly one of record / rejection per row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Record(Box<RemittanceRecord>),
    Rejected(RowRejection),
}

impl RowOutcome {
    pub fn is_record(&self) -> bool {
        matches!(self, RowOutcome::Record(_))
    }
}

/// Region-selectable row normalization strategy
pub trait RowProcessor: Send + Sync {
    /// Strategy name regions refer to
    fn name(&self) -> &str;

    fn layout(&self) -> &ColumnLayout;

    fn normalize(&self, row: &[CellValue], ctx: &RowContext<'_>) -> RowOutcome;
}

// ============================================================================
// STANDARD PROCESSOR (dot-decimal regions)
// ============================================================================

pub struct StandardProcessor {
    layout: ColumnLayout,
}

impl StandardProcessor {
    pub fn new() -> Self {
        StandardProcessor {
            layout: ColumnLayout::V1,
        }
    }

    pub fn with_layout(layout: ColumnLayout) -> Self {
        StandardProcessor { layout }
    }
}

impl Default for StandardProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RowProcessor for StandardProcessor {
    fn name(&self) -> &str {
        "standard"
    }

    fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    fn normalize(&self, row: &[CellValue], ctx: &RowContext<'_>) -> RowOutcome {
        map_row(&self.layout, row, ctx, |cell, _| to_text(cell))
    }
}

// ============================================================================
// COMMA-DECIMAL PROCESSOR (1.234,50 regions)
// ============================================================================

/// Converts locale numerals before the shared amount parsing
///
/// Only text cells are rewritten; numeric cells from the decoder are
/// already machine numbers.
pub struct CommaDecimalProcessor {
    layout: ColumnLayout,
}

impl CommaDecimalProcessor {
    pub fn new() -> Self {
        CommaDecimalProcessor {
            layout: ColumnLayout::V1,
        }
    }

    pub fn with_layout(layout: ColumnLayout) -> Self {
        CommaDecimalProcessor { layout }
    }
}

impl Default for CommaDecimalProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RowProcessor for CommaDecimalProcessor {
    fn name(&self) -> &str {
        "comma_decimal"
    }

    fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    fn normalize(&self, row: &[CellValue], ctx: &RowContext<'_>) -> RowOutcome {
        map_row(&self.layout, row, ctx, |cell, config| match cell {
            CellValue::Text(text) => config.number_format.canonicalize(text.trim()),
            other => to_text(other),
        })
    }
}

// ============================================================================
// SHARED MAPPING
// ============================================================================

fn text_at(row: &[CellValue], idx: usize) -> String {
    row.get(idx).map(to_text).unwrap_or_default()
}

/// Map one row through the layout
///
/// `amount_text` turns an amount cell into text `to_amount` understands.
fn map_row<F>(layout: &ColumnLayout, row: &[CellValue], ctx: &RowContext<'_>, amount_text: F) -> RowOutcome
where
    F: Fn(&CellValue, &RegionConfig) -> String,
{
    let row_number = ctx.row_number;
    let config = ctx.config;

    if row.len() < layout.required_columns {
        let field = layout
            .required_fields()
            .iter()
            .find(|(col, _)| *col >= row.len())
            .map(|(_, name)| *name)
            .unwrap_or("amount");

        return RowOutcome::Rejected(RowRejection::missing_field(
            row_number,
            row,
            field,
            format!(
                "Row {} has {} columns, layout {} requires {}",
                row_number,
                row.len(),
                layout.version,
                layout.required_columns
            ),
        ));
    }

    for (col, field) in layout.required_fields() {
        if row.get(col).map_or(true, CellValue::is_blank) {
            return RowOutcome::Rejected(RowRejection::missing_field(
                row_number,
                row,
                field,
                format!("Row {} is missing required field '{}' (column {})", row_number, field, col),
            ));
        }
    }

    let money = |idx: usize| -> Decimal {
        match row.get(idx) {
            Some(cell) => to_amount(&amount_text(cell, config)),
            None => Decimal::ZERO,
        }
    };

    let date_hint = config.date_format.chrono_pattern();
    let payment_date = to_date_with_hint(&text_at(row, layout.payment_date), date_hint);
    let invoice_date = to_date_with_hint(&text_at(row, layout.invoice_date), date_hint);

    // A remittance line is dated by its payment; fall back to the invoice
    let date = if is_unknown_date(payment_date) {
        invoice_date
    } else {
        payment_date
    };

    let currency = Currency::from_code(&text_at(row, layout.currency)).unwrap_or(config.currency);
    let invoice_number = text_at(row, layout.invoice_number);

    let mut record = RemittanceRecord {
        transaction: TransactionRecord::new(
            ctx.source_system,
            date,
            money(layout.amount),
            currency,
            invoice_number.clone(),
            text_at(row, layout.description),
        ),
        row_number,
        payee_name: text_at(row, layout.payee_name),
        vendor_site: text_at(row, layout.vendor_site),
        payment_number: text_at(row, layout.payment_number),
        payment_date,
        invoice_number,
        invoice_date,
        po_number: text_at(row, layout.po_number),
        discount_amount: money(layout.discount),
        credit_amount: money(layout.credit),
        debit_amount: money(layout.debit),
        balance_amount: money(layout.balance),
        category: Category::Uncategorized,
        raw_category: text_at(row, layout.category_hint),
        classification_rule: None,
    };

    let classification = ctx.classifier.classify(&record);
    record.apply_classification(classification);

    RowOutcome::Record(Box::new(record))
}

// ============================================================================
// TESTS
// ============================================================================
