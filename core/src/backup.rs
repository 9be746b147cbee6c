//! Per-container backups: pristine pre-patch copies with a deterministic,
//! reversible naming scheme (`mod.jar` -> `mod.jar.backup`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

const BACKUP_SUFFIX: &str = "backup";

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("could not create backup: {0}")]
    Create(String),
}

/// Creates, locates and restores container backups.
#[derive(Debug, Clone)]
pub struct BackupManager {
    container_extension: String,
}

impl BackupManager {
    pub fn new(container_extension: &str) -> Self {
        Self {
            container_extension: container_extension.to_string(),
        }
    }

    /// Backup path for a container: the container name plus a `.backup`
    /// suffix, next to the original.
    pub fn backup_path(&self, container: &Path) -> PathBuf {
        let mut name = container.as_os_str().to_os_string();
        name.push(format!(".{BACKUP_SUFFIX}"));
        PathBuf::from(name)
    }

    /// Original container path for a backup file, if the name matches the
    /// backup convention.
    pub fn original_path(&self, backup: &Path) -> Option<PathBuf> {
        let name = backup.to_str()?;
        let stripped = name.strip_suffix(&format!(".{BACKUP_SUFFIX}"))?;
        if !stripped
            .to_lowercase()
            .ends_with(&format!(".{}", self.container_extension.to_lowercase()))
        {
            return None;
        }
        Some(PathBuf::from(stripped))
    }

    /// Ensure a backup exists for `container` and return its path.
    ///
    /// Idempotent: an existing backup is kept untouched so the oldest
    /// pristine state survives repeated runs.
    pub fn create(&self, container: &Path) -> Result<PathBuf, BackupError> {
        let backup = self.backup_path(container);
        if backup.exists() {
            info!(backup = %backup.display(), "backup already present, keeping it");
            return Ok(backup);
        }
        fs::copy(container, &backup).map_err(|err| BackupError::Create(err.to_string()))?;
        info!(backup = %backup.display(), "backup created");
        Ok(backup)
    }

    /// Move the backup back over the container path, consuming the backup.
    /// Returns `false` (leaving everything as-is) when the backup is missing
    /// or the move fails.
    pub fn restore(&self, backup: &Path, container: &Path) -> bool {
        if !backup.exists() {
            return false;
        }
        match fs::rename(backup, container) {
            Ok(()) => {
                info!(container = %container.display(), "backup restored");
                true
            }
            Err(err) => {
                warn!(backup = %backup.display(), error = %err, "failed to restore backup");
                false
            }
        }
    }

    /// Copy the backup over the container path, keeping the backup file.
    /// Used by the rewrite rollback so the pristine copy survives for later
    /// attempts.
    pub fn restore_copy(&self, backup: &Path, container: &Path) -> io::Result<()> {
        fs::copy(backup, container)?;
        Ok(())
    }

    /// Restore every discoverable backup directly inside `directory`,
    /// returning how many succeeded.
    pub fn restore_all(&self, directory: &Path) -> io::Result<usize> {
        let mut restored = 0;
        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(original) = self.original_path(&path) else {
                continue;
            };
            if self.restore(&path, &original) {
                restored += 1;
            }
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn backup_naming_is_reversible() {
        let manager = BackupManager::new("jar");
        let container = Path::new("/mods/ModA.jar");
        let backup = manager.backup_path(container);
        assert_eq!(backup, Path::new("/mods/ModA.jar.backup"));
        assert_eq!(manager.original_path(&backup).unwrap(), container);

        // Unrelated files never map back to a container.
        assert!(manager.original_path(Path::new("/mods/notes.txt")).is_none());
        assert!(manager
            .original_path(Path::new("/mods/archive.zip.backup"))
            .is_none());
    }

    #[test]
    fn create_keeps_first_backup() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("ModA.jar");
        fs::write(&container, b"first state").unwrap();

        let manager = BackupManager::new("jar");
        let backup = manager.create(&container).unwrap();
        assert_eq!(fs::read(&backup).unwrap(), b"first state");

        // A second request after the container changed is a no-op.
        fs::write(&container, b"second state").unwrap();
        let again = manager.create(&container).unwrap();
        assert_eq!(again, backup);
        assert_eq!(fs::read(&backup).unwrap(), b"first state");
    }

    #[test]
    fn restore_moves_backup_over_container() {
        let dir = TempDir::new().unwrap();
        let container = dir.path().join("ModA.jar");
        fs::write(&container, b"original").unwrap();

        let manager = BackupManager::new("jar");
        let backup = manager.create(&container).unwrap();
        fs::write(&container, b"patched").unwrap();

        assert!(manager.restore(&backup, &container));
        assert_eq!(fs::read(&container).unwrap(), b"original");
        assert!(!backup.exists());

        // Restoring again reports failure without touching anything.
        assert!(!manager.restore(&backup, &container));
        assert_eq!(fs::read(&container).unwrap(), b"original");
    }

    #[test]
    fn restore_all_discovers_backups() {
        let dir = TempDir::new().unwrap();
        let manager = BackupManager::new("jar");
        for name in ["a.jar", "b.jar"] {
            let container = dir.path().join(name);
            fs::write(&container, b"pristine").unwrap();
            manager.create(&container).unwrap();
            fs::write(&container, b"patched").unwrap();
        }
        fs::write(dir.path().join("c.jar"), b"never backed up").unwrap();

        let restored = manager.restore_all(dir.path()).unwrap();
        assert_eq!(restored, 2);
        assert_eq!(fs::read(dir.path().join("a.jar")).unwrap(), b"pristine");
        assert_eq!(fs::read(dir.path().join("b.jar")).unwrap(), b"pristine");
    }
}
