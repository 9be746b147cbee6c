//! Multi-stage triage: decides whether a container needs a translated
//! resource or should be skipped, and why.
//!
//! Checks run in a fixed order and the first hit wins. Classification never
//! fails: anything that goes wrong while opening or reading the container
//! becomes a skip with a `scan error` reason so the surrounding scan keeps
//! going.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive::{self, ArchiveError};
use crate::config::{AppConfig, RESERVED_KEYS};

/// Loader manifest consulted for an author-declared API flag.
const LOADER_MANIFEST: &str = "fabric.mod.json";

/// Classifier verdict for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum Disposition {
    NeedsTranslation,
    Skip(String),
}

impl Disposition {
    pub fn is_skip(&self) -> bool {
        matches!(self, Disposition::Skip(_))
    }

    pub fn reason(&self) -> &str {
        match self {
            Disposition::NeedsTranslation => "needs translation",
            Disposition::Skip(reason) => reason,
        }
    }
}

/// Applies the triage policy to one container at a time. Cheap to share
/// across the scan pool.
#[derive(Debug, Clone)]
pub struct ModClassifier {
    config: Arc<AppConfig>,
}

impl ModClassifier {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// Classify `container` against `target_locale`. Infallible by contract.
    pub fn classify(&self, container: &Path, target_locale: &str) -> Disposition {
        let name = container
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_lowercase();

        if self
            .config
            .denylist
            .iter()
            .any(|ignored| name.contains(&ignored.to_lowercase()))
        {
            return Disposition::Skip("ignored: core/library".to_string());
        }

        match self.inspect(container, target_locale) {
            Ok(disposition) => disposition,
            Err(err) => {
                debug!(container = %container.display(), error = %err, "scan error");
                Disposition::Skip(format!("scan error: {err}"))
            }
        }
    }

    fn inspect(
        &self,
        container: &Path,
        target_locale: &str,
    ) -> Result<Disposition, ArchiveError> {
        let entries = archive::list_entries(container)?;
        let names: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();

        if names.iter().any(|n| *n == LOADER_MANIFEST) && self.author_declared_api(container) {
            return Ok(Disposition::Skip(
                "ignored: author-declared API".to_string(),
            ));
        }

        let lang_files: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| archive::is_lang_resource(n))
            .collect();

        let Some(base_resource) = lang_files
            .iter()
            .copied()
            .find(|n| archive::is_base_lang_resource(n))
        else {
            return Ok(Disposition::Skip(
                "missing base language resource".to_string(),
            ));
        };

        let target_name = format!("/{}.json", target_locale.to_lowercase());
        if lang_files.iter().any(|n| {
            let lower = n.to_lowercase();
            lower.ends_with(&target_name) || lower == target_name[1..]
        }) {
            return Ok(Disposition::Skip("already has target locale".to_string()));
        }

        let base_text = archive::read_entry_string(container, base_resource)?;
        let Ok(serde_json::Value::Object(base)) = serde_json::from_str(&base_text) else {
            return Ok(Disposition::Skip("base resource malformed".to_string()));
        };
        let translatable = base
            .keys()
            .filter(|key| !RESERVED_KEYS.contains(&key.as_str()))
            .count();
        if translatable == 0 {
            return Ok(Disposition::Skip("no translatable content".to_string()));
        }

        if !self.has_content_footprint(&names, lang_files.len()) {
            return Ok(Disposition::Skip(
                "likely API/library: no content footprint".to_string(),
            ));
        }

        Ok(Disposition::NeedsTranslation)
    }

    /// A package counts as genuine content when any of the four footprint
    /// signals holds. The path markers are tuning; the OR stays fixed.
    fn has_content_footprint(&self, names: &[&str], lang_file_count: usize) -> bool {
        if lang_file_count > 1 {
            return true;
        }
        let markers = &self.config.footprint;
        names.iter().any(|n| {
            let lower = n.to_lowercase();
            lower.contains(&markers.gui_textures)
                || lower.contains(&markers.guide_books)
                || lower.contains(&markers.advancements)
        })
    }

    /// True when the loader manifest parses and explicitly marks the package
    /// as an API/library. A malformed manifest is treated as no declaration.
    fn author_declared_api(&self, container: &Path) -> bool {
        let Ok(text) = archive::read_entry_string(container, LOADER_MANIFEST) else {
            return false;
        };
        let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&text) else {
            return false;
        };
        manifest
            .pointer("/custom/modmenu/api")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Archive-backed cases live in tests/pipeline_test.rs; these cover the
    // pure name-based stage, which must decide without touching the file.
    #[test]
    fn denylist_matches_substring_case_insensitive() {
        let classifier = ModClassifier::new(Arc::new(AppConfig::default()));
        let verdict = classifier.classify(Path::new("/nowhere/Fabric-API-0.92.jar"), "zh_tw");
        assert_eq!(verdict, Disposition::Skip("ignored: core/library".into()));

        let verdict = classifier.classify(Path::new("/nowhere/sodium-extra.jar"), "zh_tw");
        assert!(verdict.is_skip());
    }

    #[test]
    fn unreadable_container_becomes_scan_error_skip() {
        let classifier = ModClassifier::new(Arc::new(AppConfig::default()));
        let verdict = classifier.classify(Path::new("/nowhere/missing-mod.jar"), "zh_tw");
        assert!(verdict.is_skip());
        assert!(verdict.reason().starts_with("scan error:"));
    }
}
