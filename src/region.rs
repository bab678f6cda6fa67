// 🌍 Region Configuration Registry
//
// One immutable RegionConfig per market: currency, date layout, number
// separators, localized labels and the names of the processor/classifier
// strategies to use. Built once, injected into the pipeline, read without
// locks afterwards.

use crate::error::{ConfigError, PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

const BUILTIN_REGIONS: &str = include_str!("../config/regions.json");

// ============================================================================
// CURRENCY
// ============================================================================

/// Currencies a record may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Cad,
    Gbp,
    Eur,
    Inr,
    Mxn,
    Aud,
    Jpy,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cad => "CAD",
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
            Currency::Mxn => "MXN",
            Currency::Aud => "AUD",
            Currency::Jpy => "JPY",
        }
    }

    /// Look up a currency by code, case-insensitive
    pub fn from_code(code: &str) -> Option<Currency> {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::Usd),
            "CAD" => Some(Currency::Cad),
            "GBP" => Some(Currency::Gbp),
            "EUR" => Some(Currency::Eur),
            "INR" => Some(Currency::Inr),
            "MXN" => Some(Currency::Mxn),
            "AUD" => Some(Currency::Aud),
            "JPY" => Some(Currency::Jpy),
            _ => None,
        }
    }
}

// ============================================================================
// DATE & NUMBER FORMATS
// ============================================================================

/// Date layout identifier used by a region's source files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "DD-MMM-YYYY")]
    DayMonthAbbrevYear,
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
    #[serde(rename = "DD.MM.YYYY")]
    DayMonthYearDotted,
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
}

impl DateFormat {
    pub fn id(&self) -> &'static str {
        match self {
            DateFormat::DayMonthAbbrevYear => "DD-MMM-YYYY",
            DateFormat::MonthDayYear => "MM/DD/YYYY",
            DateFormat::DayMonthYear => "DD/MM/YYYY",
            DateFormat::DayMonthYearDotted => "DD.MM.YYYY",
            DateFormat::Iso => "YYYY-MM-DD",
        }
    }

    /// chrono layout for `sanitize::to_date_with_hint`
    pub fn chrono_pattern(&self) -> &'static str {
        match self {
            DateFormat::DayMonthAbbrevYear => "%d-%b-%Y",
            DateFormat::MonthDayYear => "%m/%d/%Y",
            DateFormat::DayMonthYear => "%d/%m/%Y",
            DateFormat::DayMonthYearDotted => "%d.%m.%Y",
            DateFormat::Iso => "%Y-%m-%d",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub decimal_separator: char,
    pub thousands_separator: char,
}

impl NumberFormat {
    /// Rewrite a locale numeral into the dot-decimal form `to_amount` reads
    ///
    /// Dot-decimal formats are returned unchanged. For space-grouped locales
    /// the non-breaking space variants count as the separator too.
    pub fn canonicalize(&self, text: &str) -> String {
        if self.decimal_separator == '.' {
            return text.to_string();
        }

        text.chars()
            .filter(|c| !self.is_thousands_separator(*c))
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }

    fn is_thousands_separator(&self, c: char) -> bool {
        if self.thousands_separator == ' ' {
            c == ' ' || c == '\u{a0}' || c == '\u{202f}'
        } else {
            c == self.thousands_separator
        }
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            decimal_separator: '.',
            thousands_separator: ',',
        }
    }
}

// ============================================================================
// REGION CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Unique key, stored upper-case
    pub code: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    pub currency: Currency,
    pub date_format: DateFormat,

    #[serde(default)]
    pub number_format: NumberFormat,

    /// Name of the RowProcessor strategy
    pub processor: String,

    /// Name of the Classifier strategy
    pub classifier: String,

    /// Localized UI labels keyed by field name
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl RegionConfig {
    /// Localized label, or the key itself when the region has none
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.labels.get(key).map(String::as_str).unwrap_or(key)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Immutable lookup of region configurations by code
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    configs: HashMap<String, RegionConfig>,
}

impl RegionRegistry {
    /// Build a registry, normalizing codes and rejecting duplicates
    pub fn from_configs(configs: Vec<RegionConfig>) -> Result<Self, ConfigError> {
        let mut by_code = HashMap::with_capacity(configs.len());

        for mut config in configs {
            let code = normalize_code(&config.code);
            if code.is_empty() {
                return Err(ConfigError::EmptyRegionCode);
            }
            if by_code.contains_key(&code) {
                return Err(ConfigError::DuplicateRegion(code));
            }
            config.code = code.clone();
            by_code.insert(code, config);
        }

        tracing::info!(regions = by_code.len(), "Loaded region configurations");

        Ok(RegionRegistry { configs: by_code })
    }

    /// Load from a JSON array of region definitions
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let configs: Vec<RegionConfig> = serde_json::from_str(json)?;
        Self::from_configs(configs)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Regions shipped with the crate (config/regions.json)
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_REGIONS)
    }

    /// Resolve a region code (trimmed, case-insensitive)
    pub fn get_config(&self, code: &str) -> PipelineResult<&RegionConfig> {
        self.configs
            .get(&normalize_code(code))
            .ok_or_else(|| PipelineError::ConfigNotFound(code.trim().to_string()))
    }

    pub fn supported_regions(&self) -> BTreeSet<String> {
        self.configs.keys().cloned().collect()
    }

    pub fn configs(&self) -> impl Iterator<Item = &RegionConfig> {
        self.configs.values()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_config(code: &str) -> RegionConfig {
        RegionConfig {
            code: code.to_string(),
            name: format!("Region {}", code),
            currency: Currency::Usd,
            date_format: DateFormat::MonthDayYear,
            number_format: NumberFormat::default(),
            processor: "standard".to_string(),
            classifier: "standard".to_string(),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_builtin_registry_loads() {
        let registry = RegionRegistry::builtin().unwrap();
        let regions = registry.supported_regions();

        for code in ["US", "CA", "GB", "DE", "FR", "IN", "MX"] {
            assert!(regions.contains(code), "missing {code}");
        }

        let de = registry.get_config("DE").unwrap();
        assert_eq!(de.currency, Currency::Eur);
        assert_eq!(de.number_format.decimal_separator, ',');
        assert_eq!(de.processor, "comma_decimal");
        assert_eq!(de.label("amount"), "Betrag");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = RegionRegistry::from_configs(vec![create_test_config("us")]).unwrap();
        assert_eq!(registry.get_config(" Us ").unwrap().code, "US");
    }

    #[test]
    fn test_unknown_region_is_config_not_found() {
        let registry = RegionRegistry::from_configs(vec![create_test_config("US")]).unwrap();
        match registry.get_config("ZZ") {
            Err(PipelineError::ConfigNotFound(code)) => assert_eq!(code, "ZZ"),
            other => panic!("expected ConfigNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_and_empty_codes_rejected() {
        let dup = RegionRegistry::from_configs(vec![create_test_config("US"), create_test_config("us")]);
        assert!(matches!(dup, Err(ConfigError::DuplicateRegion(code)) if code == "US"));

        let empty = RegionRegistry::from_configs(vec![create_test_config("  ")]);
        assert!(matches!(empty, Err(ConfigError::EmptyRegionCode)));
    }

    #[test]
    fn test_label_falls_back_to_key() {
        let mut config = create_test_config("US");
        config.labels.insert("amount".into(), "Amount Paid".into());
        assert_eq!(config.label("amount"), "Amount Paid");
        assert_eq!(config.label("balance"), "balance");
    }

    #[test]
    fn test_number_format_canonicalize() {
        let german = NumberFormat { decimal_separator: ',', thousands_separator: '.' };
        assert_eq!(german.canonicalize("1.234,50"), "1234.50");
        assert_eq!(german.canonicalize("(1.234,50)"), "(1234.50)");

        let french = NumberFormat { decimal_separator: ',', thousands_separator: ' ' };
        assert_eq!(french.canonicalize("1 234,50 €"), "1234.50€");
        assert_eq!(french.canonicalize("1\u{202f}234,50"), "1234.50");

        assert_eq!(NumberFormat::default().canonicalize("1,234.50"), "1,234.50");
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::from_code("eur"), Some(Currency::Eur));
        assert_eq!(Currency::from_code("XYZ"), None);
        assert_eq!(Currency::Inr.code(), "INR");
        assert_eq!(serde_json::to_string(&Currency::Mxn).unwrap(), "\"MXN\"");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"code":"AU","currency":"AUD","date_format":"DD/MM/YYYY","processor":"standard","classifier":"standard"}}]"#
        )
        .unwrap();

        let registry = RegionRegistry::from_file(file.path()).unwrap();
        let au = registry.get_config("AU").unwrap();
        assert_eq!(au.currency, Currency::Aud);
        assert_eq!(au.number_format, NumberFormat::default());
        assert_eq!(au.date_format.chrono_pattern(), "%d/%m/%Y");
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let result = RegionRegistry::from_file("/nonexistent/regions.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
