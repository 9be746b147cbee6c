//! Container boundary: listing and reading entries of a mod archive.
//!
//! A container is a deflate-based archive (`.jar`) holding a mod's compiled
//! resources. This module only reads; rewriting lives in [`crate::rewriter`].

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use zip::read::ZipArchive;

/// Error type for container access.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("entry not found in archive: {0}")]
    EntryNotFound(String),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// One file inside a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Entry path inside the archive (e.g. "assets/mymod/lang/en_us.json")
    pub path: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Compressed size in bytes
    pub compressed_size: u64,
    /// Directory marker entry
    pub is_dir: bool,
}

/// Whether a path looks like a container we process (extension match,
/// case-insensitive).
pub fn is_container_file(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// List every entry of a container, directory markers included.
pub fn list_entries(container: &Path) -> ArchiveResult<Vec<ArchiveEntry>> {
    let file = File::open(container)?;
    let mut archive = ZipArchive::new(file)?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        entries.push(ArchiveEntry {
            path: entry.name().to_string(),
            size: entry.size(),
            compressed_size: entry.compressed_size(),
            is_dir: entry.is_dir(),
        });
    }
    Ok(entries)
}

/// Read the raw bytes of one entry.
pub fn read_entry(container: &Path, entry_path: &str) -> ArchiveResult<Vec<u8>> {
    let file = File::open(container)?;
    let mut archive = ZipArchive::new(file)?;

    let mut entry = archive
        .by_name(entry_path)
        .map_err(|_| ArchiveError::EntryNotFound(entry_path.to_string()))?;

    let mut contents = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Read one entry as UTF-8 text, stripping a BOM if present.
pub fn read_entry_string(container: &Path, entry_path: &str) -> ArchiveResult<String> {
    let bytes = read_entry(container, entry_path)?;
    let content = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(&bytes[3..]).to_string()
    } else {
        String::from_utf8_lossy(&bytes).to_string()
    };
    Ok(content)
}

/// Whether an entry path is a JSON language resource: a `lang/` path segment
/// (case-insensitive) with a `.json` filename.
pub fn is_lang_resource(entry_path: &str) -> bool {
    let lower = entry_path.to_lowercase();
    (lower.contains("/lang/") || lower.starts_with("lang/")) && lower.ends_with(".json")
}

/// Whether an entry is the base-language resource (`en_us.json`, any casing).
pub fn is_base_lang_resource(entry_path: &str) -> bool {
    is_lang_resource(entry_path) && entry_path.to_lowercase().ends_with("en_us.json")
}

/// Whether an entry is a code-signature artifact that must not survive a
/// patched container: `.SF`/`.RSA`/`.DSA`/`.EC` under `META-INF`.
pub fn is_signature_entry(entry_path: &str) -> bool {
    let upper = entry_path.to_uppercase();
    upper.contains("META-INF")
        && (upper.ends_with(".SF")
            || upper.ends_with(".RSA")
            || upper.ends_with(".DSA")
            || upper.ends_with(".EC"))
}

/// Target path for a translated resource: same directory as the source entry,
/// filename replaced by `<target>.json`.
pub fn lang_target_path(source_path: &str, target_locale: &str) -> String {
    match source_path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{target_locale}.json"),
        None => format!("{target_locale}.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_container_extension() {
        assert!(is_container_file(Path::new("mod.jar"), "jar"));
        assert!(is_container_file(Path::new("MOD.JAR"), "jar"));
        assert!(!is_container_file(Path::new("mod.zip"), "jar"));
        assert!(!is_container_file(Path::new("mod.jar.backup"), "jar"));
    }

    #[test]
    fn detects_lang_resources() {
        assert!(is_lang_resource("assets/mymod/lang/en_us.json"));
        assert!(is_lang_resource("assets/mymod/LANG/zh_tw.json"));
        assert!(is_lang_resource("lang/en_us.json"));
        assert!(!is_lang_resource("assets/mymod/lang/en_us.lang"));
        assert!(!is_lang_resource("assets/mymod/textures/lang.png"));

        assert!(is_base_lang_resource("assets/mymod/lang/en_us.json"));
        assert!(is_base_lang_resource("assets/mymod/lang/EN_US.json"));
        assert!(!is_base_lang_resource("assets/mymod/lang/zh_tw.json"));
    }

    #[test]
    fn detects_signature_entries() {
        assert!(is_signature_entry("META-INF/MODSIGN.SF"));
        assert!(is_signature_entry("META-INF/MODSIGN.RSA"));
        assert!(is_signature_entry("meta-inf/sign.dsa"));
        assert!(is_signature_entry("META-INF/KEYS.EC"));
        assert!(!is_signature_entry("META-INF/MANIFEST.MF"));
        assert!(!is_signature_entry("assets/mymod/lang/en_us.json"));
    }

    #[test]
    fn builds_target_paths() {
        assert_eq!(
            lang_target_path("assets/mymod/lang/en_us.json", "zh_tw"),
            "assets/mymod/lang/zh_tw.json"
        );
        assert_eq!(lang_target_path("en_us.json", "ko_kr"), "ko_kr.json");
    }
}
