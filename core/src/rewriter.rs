//! Crash-safe container rewrite: backup, rebuild into a temp file, atomic
//! swap, restore on failure.
//!
//! After `commit` returns, exactly one of two states holds on disk: the
//! container carries the full patch set, or it is byte-identical to its
//! pre-attempt state. Untouched entries are raw-copied so their compression
//! method and attributes survive; signature artifacts are dropped because a
//! patched container must not ship a now-invalid signature.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info};
use zip::read::ZipArchive;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::archive;
use crate::backup::{BackupError, BackupManager};

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

/// In-memory patch for one container: target entry name -> new bytes.
/// Iteration order is the sorted entry-name order.
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    entries: std::collections::BTreeMap<String, Vec<u8>>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry_path: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(entry_path.into(), bytes);
    }

    pub fn get(&self, entry_path: &str) -> Option<&Vec<u8>> {
        self.entries.get(entry_path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.entries.iter()
    }
}

/// Commits patch sets to containers with backup/restore guarantees.
#[derive(Debug, Clone)]
pub struct ArchiveRewriter {
    backups: BackupManager,
}

impl ArchiveRewriter {
    pub fn new(backups: BackupManager) -> Self {
        Self { backups }
    }

    /// Apply `patch` to `container`. A backup is ensured before any mutation;
    /// failure to create one aborts with the original untouched. On any
    /// rebuild/swap failure the backup is copied back over the container (the
    /// backup file itself is kept) and the error is returned.
    ///
    /// Returns the backup path on success so the caller can apply its backup
    /// retention policy.
    pub fn commit(&self, container: &Path, patch: &PatchSet) -> Result<PathBuf, RewriteError> {
        let backup = self.backups.create(container)?;

        match self.rebuild_and_swap(container, patch) {
            Ok(()) => {
                info!(container = %container.display(), entries = patch.len(), "container patched");
                Ok(backup)
            }
            Err(err) => {
                error!(container = %container.display(), error = %err, "rewrite failed, restoring backup");
                if let Err(restore_err) = self.backups.restore_copy(&backup, container) {
                    error!(
                        container = %container.display(),
                        error = %restore_err,
                        "failed to restore backup"
                    );
                }
                Err(err)
            }
        }
    }

    fn rebuild_and_swap(&self, container: &Path, patch: &PatchSet) -> Result<(), RewriteError> {
        let source_file = File::open(container)?;
        let mut source = ZipArchive::new(source_file)?;

        // Fixed iteration order so identical inputs produce identical bytes.
        let mut order: Vec<(usize, String)> = Vec::with_capacity(source.len());
        for i in 0..source.len() {
            let name = source.by_index_raw(i)?.name().to_string();
            order.push((i, name));
        }
        order.sort_by(|a, b| a.1.cmp(&b.1));

        let temp = temp_path(container);
        let output = File::create(&temp)?;
        let mut writer = ZipWriter::new(output);
        let options = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        let mut consumed: HashSet<&str> = HashSet::new();
        for (index, name) in &order {
            if archive::is_signature_entry(name) {
                continue;
            }
            if let Some(bytes) = patch.get(name) {
                writer.start_file(name.as_str(), options.clone())?;
                writer.write_all(bytes)?;
                consumed.insert(name.as_str());
            } else {
                // Untouched entries keep their original compression.
                let entry = source.by_index_raw(*index)?;
                writer.raw_copy_file(entry)?;
            }
        }

        for (name, bytes) in patch.iter() {
            if consumed.contains(name.as_str()) {
                continue;
            }
            writer.start_file(name.as_str(), options.clone())?;
            writer.write_all(bytes)?;
        }

        let output = writer.finish()?;
        output.sync_all()?;
        drop(output);

        replace_file(&temp, container)?;
        Ok(())
    }
}

fn temp_path(container: &Path) -> PathBuf {
    let mut name = container.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn replace_file(temp: &Path, target: &Path) -> io::Result<()> {
    #[cfg(target_os = "windows")]
    {
        use std::io::ErrorKind;
        if let Err(err) = fs::rename(temp, target) {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(target)?;
                fs::rename(temp, target)?;
            } else {
                return Err(err);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    {
        fs::rename(temp, target)
    }
}
