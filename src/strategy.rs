// 🔀 Strategy Catalog - Name → processor / classifier
//
// Regions name their strategies as strings; the catalog turns those names
// into shared trait objects. Adding a region-specific strategy means
// registering one more value here, no existing code changes.

use crate::classify::{Classifier, RuleClassifier, SignClassifier};
use crate::error::{PipelineError, PipelineResult};
use crate::processor::{CommaDecimalProcessor, RowProcessor, StandardProcessor};
use crate::region::RegionConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// The pair of strategies one region runs with
#[derive(Clone)]
pub struct RegionStrategy {
    pub processor: Arc<dyn RowProcessor>,
    pub classifier: Arc<dyn Classifier>,
}

pub struct StrategyCatalog {
    processors: HashMap<String, Arc<dyn RowProcessor>>,
    classifiers: HashMap<String, Arc<dyn Classifier>>,
}

impl StrategyCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        StrategyCatalog {
            processors: HashMap::new(),
            classifiers: HashMap::new(),
        }
    }

    /// Catalog with every strategy the crate ships
    pub fn builtin() -> Self {
        let mut catalog = StrategyCatalog::new();

        catalog.register_processor(Arc::new(StandardProcessor::new()));
        catalog.register_processor(Arc::new(CommaDecimalProcessor::new()));

        catalog.register_classifier(Arc::new(RuleClassifier::standard()));
        catalog.register_classifier(Arc::new(RuleClassifier::india()));
        catalog.register_classifier(Arc::new(SignClassifier::new()));

        catalog
    }

    /// Register under the processor's own name (replaces an existing one)
    pub fn register_processor(&mut self, processor: Arc<dyn RowProcessor>) {
        self.processors.insert(processor.name().to_string(), processor);
    }

    pub fn register_classifier(&mut self, classifier: Arc<dyn Classifier>) {
        self.classifiers.insert(classifier.name().to_string(), classifier);
    }

    pub fn processor(&self, name: &str) -> Option<Arc<dyn RowProcessor>> {
        self.processors.get(name).cloned()
    }

    pub fn classifier(&self, name: &str) -> Option<Arc<dyn Classifier>> {
        self.classifiers.get(name).cloned()
    }

    /// Resolve the strategies a region names
    pub fn resolve(&self, config: &RegionConfig) -> PipelineResult<RegionStrategy> {
        let processor = self.processor(&config.processor).ok_or_else(|| PipelineError::UnknownStrategy {
            region: config.code.clone(),
            kind: "processor",
            name: config.processor.clone(),
        })?;

        let classifier = self.classifier(&config.classifier).ok_or_else(|| PipelineError::UnknownStrategy {
            region: config.code.clone(),
            kind: "classifier",
            name: config.classifier.clone(),
        })?;

        Ok(RegionStrategy { processor, classifier })
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionRegistry;

    #[test]
    fn test_builtin_catalog_covers_builtin_regions() {
        let registry = RegionRegistry::builtin().unwrap();
        let catalog = StrategyCatalog::builtin();

        for config in registry.configs() {
            let strategy = catalog.resolve(config).unwrap();
            assert_eq!(strategy.processor.name(), config.processor);
            assert_eq!(strategy.classifier.name(), config.classifier);
        }
    }

    #[test]
    fn test_unknown_strategy_names() {
        let registry = RegionRegistry::builtin().unwrap();
        let mut config = registry.get_config("US").unwrap().clone();

        config.processor = "lakh_grouping".to_string();
        match StrategyCatalog::builtin().resolve(&config) {
            Err(PipelineError::UnknownStrategy { kind, name, .. }) => {
                assert_eq!(kind, "processor");
                assert_eq!(name, "lakh_grouping");
            }
            _ => panic!("expected UnknownStrategy"),
        }

        config.processor = "standard".to_string();
        config.classifier = "ml".to_string();
        assert!(matches!(
            StrategyCatalog::builtin().resolve(&config),
            Err(PipelineError::UnknownStrategy { kind: "classifier", .. })
        ));
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut catalog = StrategyCatalog::new();
        assert!(catalog.classifier("standard").is_none());

        catalog.register_classifier(Arc::new(RuleClassifier::new("standard")));
        catalog.register_classifier(Arc::new(RuleClassifier::standard()));
        assert!(catalog.classifier("standard").is_some());
        assert_eq!(catalog.classifiers.len(), 1);
    }
}
