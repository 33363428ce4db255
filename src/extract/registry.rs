//! Registry mapping content types to extractors.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::utils::normalize_mime;

use super::{
    HtmlExtractor, MailExtractor, OfficeExtractor, PdfExtractor, PlainTextExtractor, TextExtractor,
};

/// Lookup table from normalized content type to extractor.
///
/// Built once at startup from the configured extractor ids. Registration is
/// last-write-wins per content type, so a custom extractor registered after
/// the built-ins replaces them for the types it claims.
#[derive(Default)]
pub struct ExtractorRegistry {
    by_type: HashMap<String, Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured extractor ids.
    ///
    /// Unknown ids are logged and skipped; a misconfigured list never aborts
    /// startup.
    pub fn from_ids(ids: &[String]) -> Self {
        let mut registry = Self::new();
        for id in ids {
            match id.as_str() {
                "plain" => registry.register(Arc::new(PlainTextExtractor)),
                "html" => registry.register(Arc::new(HtmlExtractor)),
                "pdf" => registry.register(Arc::new(PdfExtractor)),
                "office" => registry.register(Arc::new(OfficeExtractor)),
                "mail" => registry.register(Arc::new(MailExtractor)),
                other => {
                    warn!(extractor = %other, "unknown extractor id in config, skipping");
                }
            }
        }
        registry
    }

    /// Register `extractor` for every content type it declares.
    pub fn register(&mut self, extractor: Arc<dyn TextExtractor>) {
        for content_type in extractor.content_types() {
            let key = normalize_mime(content_type);
            let previous = self.by_type.insert(key.clone(), extractor.clone());
            match previous {
                Some(old) => debug!(
                    content_type = %key,
                    old = old.name(),
                    new = extractor.name(),
                    "replaced extractor registration"
                ),
                None => debug!(
                    content_type = %key,
                    extractor = extractor.name(),
                    "registered extractor"
                ),
            }
        }
    }

    /// Find the extractor for a content type. A miss is an expected outcome,
    /// not an error.
    pub fn lookup(&self, content_type: &str) -> Option<Arc<dyn TextExtractor>> {
        self.by_type.get(&normalize_mime(content_type)).cloned()
    }

    /// All registered content types, sorted.
    pub fn content_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.by_type.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;
    use std::path::Path;

    struct FixedExtractor {
        name: &'static str,
        types: &'static [&'static str],
    }

    impl TextExtractor for FixedExtractor {
        fn name(&self) -> &'static str {
            self.name
        }

        fn content_types(&self) -> &'static [&'static str] {
            self.types
        }

        fn extract(
            &self,
            _path: &Path,
            _content_type: &str,
            _encoding: Option<&str>,
        ) -> Result<String, ExtractError> {
            Ok(String::new())
        }
    }

    #[test]
    fn lookup_normalizes_content_type() {
        let registry = ExtractorRegistry::from_ids(&["plain".to_string()]);
        let hit = registry.lookup("Text/Plain; charset=UTF-8");
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().name(), "plain");
    }

    #[test]
    fn unknown_type_misses() {
        let registry = ExtractorRegistry::from_ids(&["plain".to_string()]);
        assert!(registry.lookup("application/x-unknown").is_none());
    }

    #[test]
    fn unknown_id_is_skipped() {
        let registry =
            ExtractorRegistry::from_ids(&["plain".to_string(), "bogus".to_string()]);
        assert_eq!(registry.len(), 3); // text/plain, text/csv, text/markdown
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ExtractorRegistry::new();
        registry.register(Arc::new(FixedExtractor {
            name: "first",
            types: &["text/plain"],
        }));
        registry.register(Arc::new(FixedExtractor {
            name: "second",
            types: &["text/plain"],
        }));

        assert_eq!(registry.lookup("text/plain").unwrap().name(), "second");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn content_types_are_sorted() {
        let registry = ExtractorRegistry::from_ids(&[
            "pdf".to_string(),
            "plain".to_string(),
            "html".to_string(),
        ]);
        let types = registry.content_types();
        let mut sorted = types.clone();
        sorted.sort();
        assert_eq!(types, sorted);
        assert!(types.contains(&"application/pdf".to_string()));
    }
}
