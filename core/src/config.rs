//! Run configuration: denylist, locale registry, terminology tables and the
//! content-footprint markers used by the classifier.
//!
//! Everything here is loaded once at startup and passed into components by
//! reference; nothing reads ambient global state.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Reserved locale-metadata keys of a language resource. These are never
/// translated; they are seeded from the locale registry instead.
pub const RESERVED_KEYS: [&str; 3] = ["language", "language.code", "language.region"];

/// Display metadata for one locale, used both for the reserved keys of a
/// generated resource and for the tagged fallback prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleInfo {
    pub name: String,
    pub code: String,
    pub region: String,
}

impl LocaleInfo {
    fn new(name: &str, code: &str, region: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            region: region.to_string(),
        }
    }
}

/// Known target locales, keyed by resource file stem (`zh_tw`, `ko_kr`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleRegistry {
    locales: BTreeMap<String, LocaleInfo>,
}

impl Default for LocaleRegistry {
    fn default() -> Self {
        Self::built_in()
    }
}

impl LocaleRegistry {
    pub fn built_in() -> Self {
        let mut locales = BTreeMap::new();
        for (key, name, code, region) in [
            ("en_us", "English", "en_us", "United States"),
            ("zh_tw", "繁體中文", "zh_tw", "台灣"),
            ("zh_cn", "简体中文", "zh_cn", "中国大陆"),
            ("ja_jp", "日本語", "ja_jp", "日本"),
            ("ko_kr", "한국어", "ko_kr", "대한민국"),
            ("de_de", "Deutsch", "de_de", "Deutschland"),
            ("fr_fr", "Français", "fr_fr", "France"),
            ("es_es", "Español", "es_es", "España"),
            ("pt_br", "Português", "pt_br", "Brasil"),
            ("ru_ru", "Русский", "ru_ru", "Россия"),
            ("it_it", "Italiano", "it_it", "Italia"),
            ("vi_vn", "Tiếng Việt", "vi_vn", "Việt Nam"),
        ] {
            locales.insert(key.to_string(), LocaleInfo::new(name, code, region));
        }
        Self { locales }
    }

    pub fn get(&self, locale: &str) -> Option<&LocaleInfo> {
        self.locales.get(&locale.to_lowercase())
    }

    /// Display name for a locale, falling back to the raw code for locales
    /// outside the registry.
    pub fn display_name(&self, locale: &str) -> String {
        self.get(locale)
            .map(|info| info.name.clone())
            .unwrap_or_else(|| locale.to_string())
    }

    pub fn codes(&self) -> impl Iterator<Item = &String> {
        self.locales.keys()
    }
}

/// Map a resource locale code (`zh_tw`) to the code the remote translation
/// service expects. Chinese variants need the region to pick the script;
/// everything else uses the primary language subtag.
pub fn remote_lang_code(locale: &str) -> String {
    let lower = locale.to_lowercase();
    match lower.as_str() {
        "zh_tw" => "zh-TW".to_string(),
        "zh_cn" => "zh-CN".to_string(),
        _ => lower
            .split(['_', '-'])
            .next()
            .unwrap_or(&lower)
            .to_string(),
    }
}

/// Path substrings the classifier treats as evidence of player-facing
/// content. The OR-of-four semantics is fixed; the substrings themselves are
/// tuning and stay configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootprintMarkers {
    #[serde(default = "default_gui_marker")]
    pub gui_textures: String,
    #[serde(default = "default_book_marker")]
    pub guide_books: String,
    #[serde(default = "default_advancement_marker")]
    pub advancements: String,
}

fn default_gui_marker() -> String {
    "textures/gui".to_string()
}

fn default_book_marker() -> String {
    "patchouli_books".to_string()
}

fn default_advancement_marker() -> String {
    "advancements".to_string()
}

impl Default for FootprintMarkers {
    fn default() -> Self {
        Self {
            gui_textures: default_gui_marker(),
            guide_books: default_book_marker(),
            advancements: default_advancement_marker(),
        }
    }
}

/// Core/API/library package identifiers that are never worth translating.
/// Matched case-insensitively as substrings of the container file name.
pub fn default_denylist() -> Vec<String> {
    [
        "fabric-api",
        "fabric-loader",
        "sodium",
        "iris",
        "lithium",
        "indium",
        "c2me",
        "cloth-config",
        "architectury",
        "geckolib",
        "modernfix",
        "modmenu",
        "forge",
        "minecraft",
        "bclib",
        "betterend",
        "betternether",
        "porting_lib",
        "puzzleslib",
        "bookshelf",
        "moonlight",
        "cardinal-components",
        "owo-lib",
        "pehkui",
        "spell_engine",
        "resourcefullib",
        "yungsapi",
        "attributefix",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Built-in terminology glossaries for the offline fallback, keyed by locale.
/// English term -> localized term; substitution is whole-word and
/// longest-key-first.
pub fn default_terminology() -> BTreeMap<String, BTreeMap<String, String>> {
    let zh_tw: &[(&str, &str)] = &[
        ("Copper", "銅"),
        ("Aluminum", "鋁"),
        ("Aluminium", "鋁"),
        ("Lead", "鉛"),
        ("Silver", "銀"),
        ("Nickel", "鎳"),
        ("Uranium", "鈾"),
        ("Constantan", "康銅"),
        ("Electrum", "琥珀金"),
        ("Steel", "鋼"),
        ("Iron", "鐵"),
        ("Gold", "金"),
        ("Tin", "錫"),
        ("Zinc", "鋅"),
        ("Brass", "黃銅"),
        ("Ingot", "錠"),
        ("Ore", "礦"),
        ("Block", "方塊"),
        ("Plate", "板"),
        ("Dust", "粉"),
        ("Nugget", "粒"),
        ("Stick", "棒"),
        ("Rod", "桿"),
        ("Tool", "工具"),
        ("Machine", "機器"),
        ("Generator", "發電機"),
        ("Engineer", "工程師"),
        ("Workbench", "工作台"),
        ("Furnace", "熔爐"),
        ("Crucible", "坩堝"),
        ("Conveyor", "輸送帶"),
        ("Pump", "泵"),
        ("Tank", "儲罐"),
        ("Silo", "筒倉"),
        ("Barrel", "桶"),
        ("Bucket", "桶"),
        ("Helmet", "頭盔"),
        ("Chestplate", "胸甲"),
        ("Leggings", "護腿"),
        ("Boots", "靴子"),
        ("Fluid", "流體"),
        ("Item", "物品"),
        ("Wire", "電線"),
        ("Cable", "電纜"),
        ("Pipe", "管"),
        ("Manual", "手冊"),
        ("Pickaxe", "鎬"),
        ("Shovel", "鏟"),
        ("Axe", "斧"),
        ("Hoe", "鋤"),
        ("Sword", "劍"),
    ];
    let zh_cn: &[(&str, &str)] = &[
        ("Copper", "铜"),
        ("Aluminum", "铝"),
        ("Aluminium", "铝"),
        ("Lead", "铅"),
        ("Silver", "银"),
        ("Nickel", "镍"),
        ("Uranium", "铀"),
        ("Constantan", "康铜"),
        ("Electrum", "琥珀金"),
        ("Steel", "钢"),
        ("Iron", "铁"),
        ("Gold", "金"),
        ("Tin", "锡"),
        ("Zinc", "锌"),
        ("Brass", "黄铜"),
        ("Ingot", "锭"),
        ("Ore", "矿石"),
        ("Block", "方块"),
        ("Plate", "板"),
        ("Dust", "粉"),
        ("Nugget", "粒"),
        ("Stick", "棒"),
        ("Rod", "杆"),
        ("Tool", "工具"),
        ("Machine", "机器"),
        ("Generator", "发电机"),
        ("Engineer", "工程师"),
        ("Workbench", "工作台"),
        ("Furnace", "熔炉"),
        ("Crucible", "坩埚"),
        ("Conveyor", "传送带"),
        ("Pump", "泵"),
        ("Tank", "储罐"),
        ("Silo", "筒仓"),
        ("Barrel", "桶"),
        ("Bucket", "桶"),
        ("Helmet", "头盔"),
        ("Chestplate", "胸甲"),
        ("Leggings", "护腿"),
        ("Boots", "靴子"),
        ("Fluid", "流体"),
        ("Item", "物品"),
        ("Wire", "电线"),
        ("Cable", "电缆"),
        ("Pipe", "管"),
        ("Manual", "手册"),
        ("Pickaxe", "镐"),
        ("Shovel", "铲"),
        ("Axe", "斧"),
        ("Hoe", "锄"),
        ("Sword", "剑"),
    ];

    let mut tables = BTreeMap::new();
    for (locale, pairs) in [("zh_tw", zh_tw), ("zh_cn", zh_cn)] {
        tables.insert(
            locale.to_string(),
            pairs
                .iter()
                .map(|(en, local)| (en.to_string(), local.to_string()))
                .collect(),
        );
    }
    tables
}

fn default_container_extension() -> String {
    "jar".to_string()
}

fn default_scan_concurrency() -> usize {
    16
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_translation_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Container file extension scanned for (without dot).
    #[serde(default = "default_container_extension")]
    pub container_extension: String,

    /// Ceiling for simultaneous classification tasks.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// Per-request timeout against the remote translation service.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Remote translation endpoint. Overridable so tests can point the
    /// client at a local mock server.
    #[serde(default = "default_translation_endpoint")]
    pub translation_endpoint: String,

    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,

    #[serde(default)]
    pub footprint: FootprintMarkers,

    #[serde(default)]
    pub locales: LocaleRegistry,

    #[serde(default = "default_terminology")]
    pub terminology: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            container_extension: default_container_extension(),
            scan_concurrency: default_scan_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            translation_endpoint: default_translation_endpoint(),
            denylist: default_denylist(),
            footprint: FootprintMarkers::default(),
            locales: LocaleRegistry::default(),
            terminology: default_terminology(),
        }
    }
}

impl AppConfig {
    /// Load configuration overrides from a JSON file. Missing fields fall
    /// back to the built-in defaults via serde.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read config file: {e}"))?;
        serde_json::from_str(&content).map_err(|e| format!("failed to parse config: {e}"))
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("failed to serialize config: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let registry = LocaleRegistry::built_in();
        assert_eq!(registry.get("ZH_TW").unwrap().name, "繁體中文");
        assert!(registry.get("tlh_tlh").is_none());
        assert_eq!(registry.display_name("tlh_tlh"), "tlh_tlh");
    }

    #[test]
    fn remote_codes_keep_chinese_script() {
        assert_eq!(remote_lang_code("zh_tw"), "zh-TW");
        assert_eq!(remote_lang_code("ZH_CN"), "zh-CN");
        assert_eq!(remote_lang_code("ja_jp"), "ja");
        assert_eq!(remote_lang_code("ko_kr"), "ko");
    }

    #[test]
    fn config_json_roundtrip_with_defaults() {
        let config = AppConfig::default();
        let json = config.to_json().unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.scan_concurrency, 16);
        assert_eq!(parsed.container_extension, "jar");

        // Partial overrides keep defaults for everything else.
        let partial: AppConfig = serde_json::from_str(r#"{"scanConcurrency": 4}"#).unwrap();
        assert_eq!(partial.scan_concurrency, 4);
        assert!(!partial.denylist.is_empty());
        assert_eq!(partial.footprint.gui_textures, "textures/gui");
    }

    #[test]
    fn terminology_has_both_chinese_variants() {
        let tables = default_terminology();
        assert_eq!(tables["zh_tw"]["Iron"], "鐵");
        assert_eq!(tables["zh_cn"]["Iron"], "铁");
    }
}
