// 🏷️ Record Classifier - Rules as Data
// Assigns a business category to a normalized remittance record
//
// Every classifier is total: when nothing matches the record is
// Uncategorized, so callers never handle a classification failure.

use crate::record::RemittanceRecord;
use anyhow::{Context as AnyhowContext, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Invoice,
    CreditMemo,
    DebitMemo,
    Discount,
    Payment,
    Refund,
    Fee,
    TaxWithholding,
    Adjustment,
    Uncategorized,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Invoice => "Invoice",
            Category::CreditMemo => "Credit Memo",
            Category::DebitMemo => "Debit Memo",
            Category::Discount => "Discount",
            Category::Payment => "Payment",
            Category::Refund => "Refund",
            Category::Fee => "Fee",
            Category::TaxWithholding => "Tax Withholding",
            Category::Adjustment => "Adjustment",
            Category::Uncategorized => "Uncategorized",
        }
    }

    /// Map the category text remittance exports put in their own column
    ///
    /// "CM", "credit_memo", "Credit Note" → CreditMemo, etc.
    pub fn from_alias(text: &str) -> Option<Category> {
        let normalized = text
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let category = match normalized.as_str() {
            "inv" | "invoice" | "standard" | "standard invoice" => Category::Invoice,
            "cm" | "credit" | "credit memo" | "credit note" => Category::CreditMemo,
            "dm" | "debit" | "debit memo" | "debit note" => Category::DebitMemo,
            "disc" | "discount" => Category::Discount,
            "pmt" | "payment" | "prepayment" => Category::Payment,
            "refund" => Category::Refund,
            "fee" | "charge" | "bank charge" => Category::Fee,
            "tds" | "wht" | "withholding" | "withholding tax" => Category::TaxWithholding,
            "adj" | "adjustment" => Category::Adjustment,
            _ => return None,
        };
        Some(category)
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    /// Pre-classification category text from the row (may be empty)
    pub raw_category: String,
    pub rule_id: Option<String>,
    pub confidence: f64,
}

impl Classification {
    /// Fallback when no rule applies
    pub fn uncategorized(raw_category: &str) -> Self {
        Classification {
            category: Category::Uncategorized,
            raw_category: raw_category.to_string(),
            rule_id: None,
            confidence: 0.0,
        }
    }

    /// Use the row's own category column when it names a known category
    fn from_hint(raw_category: &str) -> Option<Self> {
        Category::from_alias(raw_category).map(|category| Classification {
            category,
            raw_category: raw_category.to_string(),
            rule_id: Some("hint".to_string()),
            confidence: 1.0,
        })
    }
}

// ============================================================================
// CLASSIFIER CAPABILITY
// ============================================================================

/// Region-selectable classification strategy
///
/// Implementations must be pure: same record in, same category out.
pub trait Classifier: Send + Sync {
    /// Strategy name regions refer to
    fn name(&self) -> &str;

    fn classify(&self, record: &RemittanceRecord) -> Classification;
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// Which record field a rule pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Reference,
    Description,
    #[default]
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Rule ID for tracking
    pub id: String,

    /// Pattern to match (supports wildcards with *)
    pub pattern: String,

    #[serde(default)]
    pub field: MatchField,

    pub category: Category,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,

    #[serde(default)]
    pub description: Option<String>,

    /// Priority (higher = applied first)
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Plain patterns must start a word ("fee" matches "Wire fees", not "coffee")
    #[serde(default)]
    pub word_start: bool,
}

fn default_priority() -> i32 {
    0
}

impl ClassificationRule {
    pub fn new(id: &str, pattern: &str, field: MatchField, category: Category, priority: i32) -> Self {
        ClassificationRule {
            id: id.to_string(),
            pattern: pattern.to_string(),
            field,
            category,
            confidence: 0.9,
            description: None,
            priority,
            word_start: false,
        }
    }

    /// Same rule, matching only at the start of a word
    pub fn at_word_start(mut self) -> Self {
        self.word_start = true;
        self
    }

    /// Check if pattern matches the given text (case-insensitive)
    ///
    /// Without `*` the pattern matches anywhere in the text (or only at a
    /// word start with `word_start`). With `*` the pieces must appear in
    /// order, anchored at both ends.
    pub fn matches(&self, text: &str) -> bool {
        let pattern = self.pattern.to_lowercase();
        let text = text.to_lowercase();

        if !pattern.contains('*') {
            if pattern.is_empty() {
                return false;
            }
            if !self.word_start {
                return text.contains(&pattern);
            }
            return text.match_indices(&pattern).any(|(idx, _)| {
                text[..idx]
                    .chars()
                    .next_back()
                    .map_or(true, |prev| !prev.is_alphanumeric())
            });
        }

        let parts: Vec<&str> = pattern.split('*').collect();
        let first = parts[0];
        let last = parts[parts.len() - 1];

        if !text.starts_with(first) {
            return false;
        }

        let mut pos = first.len();
        for part in &parts[1..parts.len() - 1] {
            if part.is_empty() {
                continue;
            }
            match text[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }

        text[pos..].ends_with(last)
    }

    fn matches_record(&self, record: &RemittanceRecord) -> bool {
        let reference = &record.transaction.reference_number;
        let description = &record.transaction.description;

        match self.field {
            MatchField::Reference => self.matches(reference),
            MatchField::Description => self.matches(description),
            MatchField::Any => self.matches(reference) || self.matches(description),
        }
    }
}

// ============================================================================
// RULE CLASSIFIER
// ============================================================================

/// Category hint first, then prioritized rules, then Uncategorized
pub struct RuleClassifier {
    name: String,
    rules: Vec<ClassificationRule>,
}

impl RuleClassifier {
    /// Create a classifier with no rules (hints only)
    pub fn new(name: &str) -> Self {
        RuleClassifier {
            name: name.to_string(),
            rules: Vec::new(),
        }
    }

    /// Create classifier from a list of rules
    pub fn from_rules(name: &str, mut rules: Vec<ClassificationRule>) -> Self {
        // Stable sort keeps file order among equal priorities
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        RuleClassifier {
            name: name.to_string(),
            rules,
        }
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(name: &str, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<ClassificationRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(RuleClassifier::from_rules(name, rules))
    }

    /// Rules shared by every region
    pub fn standard() -> Self {
        RuleClassifier::from_rules("standard", standard_rules())
    }

    /// Standard rules plus TDS (tax deducted at source) withholding lines
    pub fn india() -> Self {
        let mut rules = standard_rules();
        rules.push(ClassificationRule {
            description: Some("Tax deducted at source".to_string()),
            confidence: 0.95,
            ..ClassificationRule::new("tds", "tds", MatchField::Any, Category::TaxWithholding, 60)
        });
        rules.push(ClassificationRule::new(
            "gst-adjustment",
            "gst*adj*",
            MatchField::Description,
            Category::Adjustment,
            55,
        ));
        RuleClassifier::from_rules("india", rules)
    }

    pub fn add_rule(&mut self, rule: ClassificationRule) {
        self.rules.push(rule);
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Classifier for RuleClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, record: &RemittanceRecord) -> Classification {
        let raw = record.raw_category.as_str();

        if let Some(hinted) = Classification::from_hint(raw) {
            return hinted;
        }

        // Find first matching rule (already sorted by priority)
        for rule in &self.rules {
            if rule.matches_record(record) {
                return Classification {
                    category: rule.category,
                    raw_category: raw.to_string(),
                    rule_id: Some(rule.id.clone()),
                    confidence: rule.confidence,
                };
            }
        }

        Classification::uncategorized(raw)
    }
}

fn standard_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new("credit-memo-ref", "CM*", MatchField::Reference, Category::CreditMemo, 50),
        ClassificationRule::new("debit-memo-ref", "DM*", MatchField::Reference, Category::DebitMemo, 50),
        ClassificationRule::new("invoice-ref", "INV*", MatchField::Reference, Category::Invoice, 40),
        ClassificationRule::new("refund", "refund", MatchField::Description, Category::Refund, 30),
        ClassificationRule::new("credit-note", "credit note", MatchField::Description, Category::CreditMemo, 30),
        ClassificationRule::new("credit-memo", "credit memo", MatchField::Description, Category::CreditMemo, 30),
        ClassificationRule::new("withholding", "withholding", MatchField::Description, Category::TaxWithholding, 25),
        ClassificationRule::new("discount", "discount", MatchField::Description, Category::Discount, 20),
        ClassificationRule::new("bank-fee", "fee", MatchField::Description, Category::Fee, 20).at_word_start(),
        ClassificationRule::new("bank-charge", "charge", MatchField::Description, Category::Fee, 15).at_word_start(),
        ClassificationRule::new("adjustment", "adjust", MatchField::Description, Category::Adjustment, 10),
        ClassificationRule::new("payment", "payment", MatchField::Description, Category::Payment, 5),
    ]
}

// ============================================================================
// SIGN CLASSIFIER
// ============================================================================

/// Category hint first, then the amount sign
///
/// For regions whose exports carry no usable references: negative lines
/// are credits against the payee, positive lines are invoices.
pub struct SignClassifier;

impl SignClassifier {
    pub fn new() -> Self {
        SignClassifier
    }
}

impl Default for SignClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for SignClassifier {
    fn name(&self) -> &str {
        "amount_sign"
    }

    fn classify(&self, record: &RemittanceRecord) -> Classification {
        let raw = record.raw_category.as_str();

        if let Some(hinted) = Classification::from_hint(raw) {
            return hinted;
        }

        let amount = record.transaction.amount;
        let (category, rule_id) = if amount < Decimal::ZERO {
            (Category::CreditMemo, "negative-amount")
        } else if amount > Decimal::ZERO {
            (Category::Invoice, "positive-amount")
        } else {
            return Classification::uncategorized(raw);
        };

        Classification {
            category,
            raw_category: raw.to_string(),
            rule_id: Some(rule_id.to_string()),
            confidence: 0.6,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SourceSystem, TransactionRecord};
    use crate::region::Currency;
    use crate::sanitize::unknown_date;
    use std::io::Write;
    use std::str::FromStr;

    fn create_test_record(reference: &str, description: &str, amount: &str, hint: &str) -> RemittanceRecord {
        RemittanceRecord {
            transaction: TransactionRecord::new(
                SourceSystem::Remittance,
                unknown_date(),
                Decimal::from_str(amount).unwrap(),
                Currency::Usd,
                reference.to_string(),
                description.to_string(),
            ),
            row_number: 0,
            payee_name: "ACME".to_string(),
            vendor_site: String::new(),
            payment_number: String::new(),
            payment_date: unknown_date(),
            invoice_number: reference.to_string(),
            invoice_date: unknown_date(),
            po_number: String::new(),
            discount_amount: Decimal::ZERO,
            credit_amount: Decimal::ZERO,
            debit_amount: Decimal::ZERO,
            balance_amount: Decimal::ZERO,
            category: Category::Uncategorized,
            raw_category: hint.to_string(),
            classification_rule: None,
        }
    }

    #[test]
    fn test_exact_pattern_match() {
        let rule = ClassificationRule::new("t1", "REFUND", MatchField::Any, Category::Refund, 0);

        assert!(rule.matches("Customer refund for order 7"));
        assert!(rule.matches("refund"));
        assert!(!rule.matches("Invoice 7"));
    }

    #[test]
    fn test_wildcard_pattern() {
        let rule = ClassificationRule::new("t2", "CM*", MatchField::Reference, Category::CreditMemo, 0);

        assert!(rule.matches("CM-1001"));
        assert!(rule.matches("cm42"));
        assert!(!rule.matches("INV-CM-1"));

        let middle = ClassificationRule::new("t3", "gst*adj*", MatchField::Description, Category::Adjustment, 0);
        assert!(middle.matches("GST rate adjustment Q3"));
        assert!(!middle.matches("adjustment GST"));

        let overlap = ClassificationRule::new("t4", "ab*bc", MatchField::Any, Category::Fee, 0);
        assert!(!overlap.matches("abc"));
        assert!(overlap.matches("ab-bc"));
    }

    #[test]
    fn test_hint_wins_over_rules() {
        let classifier = RuleClassifier::standard();
        let record = create_test_record("INV-1", "refund", "10", "Credit Note");

        let result = classifier.classify(&record);
        assert_eq!(result.category, Category::CreditMemo);
        assert_eq!(result.raw_category, "Credit Note");
        assert_eq!(result.rule_id.as_deref(), Some("hint"));
    }

    #[test]
    fn test_reference_and_description_rules() {
        let classifier = RuleClassifier::standard();

        let cm = classifier.classify(&create_test_record("CM-77", "", "-5", ""));
        assert_eq!(cm.category, Category::CreditMemo);
        assert_eq!(cm.rule_id.as_deref(), Some("credit-memo-ref"));

        let fee = classifier.classify(&create_test_record("X-1", "Wire fee", "-15", ""));
        assert_eq!(fee.category, Category::Fee);
    }

    #[test]
    fn test_fee_rules_match_whole_words_only() {
        let classifier = RuleClassifier::standard();
        let category = |description: &str| classifier.classify(&create_test_record("X-1", description, "-5", "")).category;

        assert_eq!(category("Wire fee"), Category::Fee);
        assert_eq!(category("Fees for March"), Category::Fee);
        assert_eq!(category("bank-charges"), Category::Fee);
        assert_eq!(category("coffee"), Category::Uncategorized);
        assert_eq!(category("surcharge"), Category::Uncategorized);
        assert_eq!(category("surcharge refund"), Category::Refund);

        let plain = ClassificationRule::new("t5", "fee", MatchField::Any, Category::Fee, 0);
        assert!(plain.matches("coffee"));
        assert!(!plain.clone().at_word_start().matches("coffee"));
        assert!(plain.at_word_start().matches("coffee fee"));
    }

    #[test]
    fn test_rule_priority() {
        let mut classifier = RuleClassifier::new("test");

        classifier.add_rule(ClassificationRule::new("general", "payment", MatchField::Description, Category::Payment, 1));
        classifier.add_rule(ClassificationRule::new("specific", "payment refund", MatchField::Description, Category::Refund, 100));

        let result = classifier.classify(&create_test_record("R-1", "Payment refund", "-3", ""));
        assert_eq!(result.category, Category::Refund);
        assert_eq!(result.rule_id.as_deref(), Some("specific"));
    }

    #[test]
    fn test_no_match_is_uncategorized() {
        let classifier = RuleClassifier::standard();
        let result = classifier.classify(&create_test_record("X-9", "misc", "12", "weird label"));

        assert_eq!(result.category, Category::Uncategorized);
        assert_eq!(result.raw_category, "weird label");
        assert_eq!(result.rule_id, None);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_india_rules_add_tds() {
        let record = create_test_record("X-1", "TDS u/s 194C", "-200", "");

        assert_eq!(RuleClassifier::standard().classify(&record).category, Category::Uncategorized);
        assert_eq!(RuleClassifier::india().classify(&record).category, Category::TaxWithholding);
        assert!(RuleClassifier::india().rule_count() > RuleClassifier::standard().rule_count());
    }

    #[test]
    fn test_sign_classifier() {
        let classifier = SignClassifier::new();

        assert_eq!(classifier.classify(&create_test_record("A", "", "-1", "")).category, Category::CreditMemo);
        assert_eq!(classifier.classify(&create_test_record("A", "", "1", "")).category, Category::Invoice);
        assert_eq!(classifier.classify(&create_test_record("A", "", "0", "")).category, Category::Uncategorized);
        assert_eq!(classifier.classify(&create_test_record("A", "", "-1", "ADJ")).category, Category::Adjustment);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifiers: Vec<Box<dyn Classifier>> = vec![
            Box::new(RuleClassifier::standard()),
            Box::new(RuleClassifier::india()),
            Box::new(SignClassifier::new()),
        ];
        let records = [
            create_test_record("CM-1", "", "-5", ""),
            create_test_record("", "", "0", ""),
            create_test_record("Z", "discount taken", "3", "???"),
        ];

        for classifier in &classifiers {
            for record in &records {
                assert_eq!(classifier.classify(record), classifier.classify(record));
            }
        }
    }

    #[test]
    fn test_category_aliases() {
        assert_eq!(Category::from_alias(" credit_memo "), Some(Category::CreditMemo));
        assert_eq!(Category::from_alias("DEBIT-NOTE"), Some(Category::DebitMemo));
        assert_eq!(Category::from_alias("INV"), Some(Category::Invoice));
        assert_eq!(Category::from_alias(""), None);
        assert_eq!(Category::from_alias("unknown"), None);
    }

    #[test]
    fn test_rules_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"rebate","pattern":"rebate","field":"description","category":"Discount","confidence":0.8,"priority":5}}]"#
        )
        .unwrap();

        let classifier = RuleClassifier::from_file("custom", file.path()).unwrap();
        assert_eq!(classifier.rule_count(), 1);
        assert_eq!(classifier.name(), "custom");

        let result = classifier.classify(&create_test_record("R", "Volume rebate", "-4", ""));
        assert_eq!(result.category, Category::Discount);
        assert_eq!(result.confidence, 0.8);
    }
}
