//! Builds the patch set for one container: locates every base-language
//! resource, translates its entries and renders the target-locale resource.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::archive;
use crate::config::{LocaleRegistry, RESERVED_KEYS};
use crate::rewriter::PatchSet;
use crate::translate::TranslationClient;

const SOURCE_LOCALE: &str = "en_us";

/// Patch set plus per-resource outcome notes for the run summary.
#[derive(Debug, Default)]
pub struct ResourceReport {
    pub patch: PatchSet,
    pub notes: Vec<String>,
}

/// Translates the base-language resources of one container at a time.
/// Mutation-free: the output is an in-memory patch set, never disk writes.
pub struct ResourceTranslator<'a> {
    client: &'a mut TranslationClient,
    locales: &'a LocaleRegistry,
}

impl<'a> ResourceTranslator<'a> {
    pub fn new(client: &'a mut TranslationClient, locales: &'a LocaleRegistry) -> Self {
        Self { client, locales }
    }

    /// Produce the patch set for `container`. Per-resource failures become
    /// notes; the remaining resources are still processed.
    pub async fn translate_container(
        &mut self,
        container: &Path,
        target_locale: &str,
    ) -> ResourceReport {
        let mut report = ResourceReport::default();

        let entries = match archive::list_entries(container) {
            Ok(entries) => entries,
            Err(err) => {
                report.notes.push(format!("failed to open container: {err}"));
                return report;
            }
        };

        let base_resources: Vec<String> = entries
            .into_iter()
            .filter(|e| !e.is_dir && archive::is_base_lang_resource(&e.path))
            .map(|e| e.path)
            .collect();

        for source_path in base_resources {
            match self.translate_resource(container, &source_path, target_locale).await {
                Ok(Some((target_path, bytes))) => {
                    report
                        .notes
                        .push(format!("{source_path} -> {target_path}: ok"));
                    report.patch.insert(target_path, bytes);
                }
                Ok(None) => {
                    debug!(resource = %source_path, "no translatable content, skipping");
                }
                Err(reason) => {
                    warn!(resource = %source_path, %reason, "resource failed");
                    report
                        .notes
                        .push(format!("failed to process {source_path}: {reason}"));
                }
            }
        }

        report
    }

    async fn translate_resource(
        &mut self,
        container: &Path,
        source_path: &str,
        target_locale: &str,
    ) -> Result<Option<(String, Vec<u8>)>, String> {
        let text = archive::read_entry_string(container, source_path)
            .map_err(|err| err.to_string())?;
        let base: Map<String, Value> =
            serde_json::from_str(&text).map_err(|err| format!("malformed JSON: {err}"))?;

        if !base
            .keys()
            .any(|key| !RESERVED_KEYS.contains(&key.as_str()))
        {
            return Ok(None);
        }

        let mut target = seed_metadata(self.locales, target_locale);
        for (key, value) in &base {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            // The translation boundary only accepts text; non-string leaves
            // are stringified first and come back as strings.
            let source_text = leaf_text(value);
            let translated = self
                .client
                .translate(&source_text, SOURCE_LOCALE, target_locale)
                .await;
            target.insert(key.clone(), Value::String(translated));
        }

        let target_path = archive::lang_target_path(source_path, target_locale);
        let bytes = serde_json::to_string_pretty(&target)
            .map_err(|err| err.to_string())?
            .into_bytes();
        Ok(Some((target_path, bytes)))
    }
}

/// The three reserved locale-metadata keys, seeded from the registry. An
/// unregistered locale falls back to its raw code.
fn seed_metadata(locales: &LocaleRegistry, target_locale: &str) -> Map<String, Value> {
    let mut map = Map::new();
    match locales.get(target_locale) {
        Some(info) => {
            map.insert("language".to_string(), Value::String(info.name.clone()));
            map.insert(
                "language.code".to_string(),
                Value::String(info.code.clone()),
            );
            map.insert(
                "language.region".to_string(),
                Value::String(info.region.clone()),
            );
        }
        None => {
            map.insert(
                "language".to_string(),
                Value::String(target_locale.to_string()),
            );
            map.insert(
                "language.code".to_string(),
                Value::String(target_locale.to_string()),
            );
            map.insert("language.region".to_string(), Value::String(String::new()));
        }
    }
    map
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_comes_from_registry() {
        let locales = LocaleRegistry::built_in();
        let map = seed_metadata(&locales, "zh_tw");
        assert_eq!(map["language"], "繁體中文");
        assert_eq!(map["language.code"], "zh_tw");
        assert_eq!(map["language.region"], "台灣");

        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["language", "language.code", "language.region"]);
    }

    #[test]
    fn unknown_locale_falls_back_to_code() {
        let locales = LocaleRegistry::built_in();
        let map = seed_metadata(&locales, "eo_uy");
        assert_eq!(map["language"], "eo_uy");
        assert_eq!(map["language.region"], "");
    }

    #[test]
    fn non_string_leaves_are_stringified() {
        assert_eq!(leaf_text(&Value::String("Hello".into())), "Hello");
        assert_eq!(leaf_text(&Value::Bool(true)), "true");
        assert_eq!(leaf_text(&serde_json::json!(42)), "42");
        assert_eq!(leaf_text(&serde_json::json!(["a", "b"])), r#"["a","b"]"#);
    }
}
