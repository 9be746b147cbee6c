//! Directory scan: enumerates containers (non-recursive) and classifies them
//! on a bounded worker pool.
//!
//! Classification is read-only file I/O, so each verdict runs on the blocking
//! pool behind a semaphore. Every enumerated container produces exactly one
//! result; completion order is non-deterministic and callers re-sort when
//! they need stable output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;

use crate::archive;
use crate::classifier::ModClassifier;

/// Per-completion progress callback: `(done, total)`.
pub type ScanProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Scan results, partitioned by verdict. Order within each partition is not
/// a contract.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Containers queued for translation, with the verdict reason.
    pub queued: Vec<(PathBuf, String)>,
    /// Containers left alone, with the skip reason.
    pub skipped: Vec<(PathBuf, String)>,
}

impl ScanOutcome {
    pub fn total(&self) -> usize {
        self.queued.len() + self.skipped.len()
    }
}

/// Classify every container directly inside `directory` with at most
/// `concurrency` classifications in flight.
pub async fn scan(
    directory: &Path,
    target_locale: &str,
    classifier: &ModClassifier,
    container_extension: &str,
    concurrency: usize,
    progress: Option<ScanProgress>,
) -> std::io::Result<ScanOutcome> {
    let containers = enumerate_containers(directory, container_extension)?;
    let total = containers.len() as u64;
    info!(count = total, directory = %directory.display(), "scanning containers");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for path in containers {
        let semaphore = Arc::clone(&semaphore);
        let classifier = classifier.clone();
        let target = target_locale.to_string();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore open");
            let verdict_path = path.clone();
            let verdict = tokio::task::spawn_blocking(move || {
                classifier.classify(&verdict_path, &target)
            })
            .await;
            (path, verdict)
        });
    }

    let mut outcome = ScanOutcome::default();
    let mut done = 0u64;
    while let Some(joined) = tasks.join_next().await {
        // Both join layers collapse to a skip so no container is dropped.
        let (path, verdict) = match joined {
            Ok(result) => result,
            Err(err) => {
                outcome
                    .skipped
                    .push((PathBuf::new(), format!("scan error: {err}")));
                continue;
            }
        };
        let disposition = match verdict {
            Ok(disposition) => disposition,
            Err(err) => crate::classifier::Disposition::Skip(format!("scan error: {err}")),
        };

        done += 1;
        if let Some(progress) = &progress {
            progress(done, total);
        }

        let reason = disposition.reason().to_string();
        if disposition.is_skip() {
            outcome.skipped.push((path, reason));
        } else {
            outcome.queued.push((path, reason));
        }
    }

    Ok(outcome)
}

fn enumerate_containers(directory: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut containers = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && archive::is_container_file(&path, extension) {
            containers.push(path);
        }
    }
    Ok(containers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::TempDir;

    #[tokio::test]
    async fn every_container_yields_one_result() {
        let dir = TempDir::new().unwrap();
        // Not real archives: classification degrades to scan-error skips,
        // but each file must still be accounted for exactly once.
        for i in 0..5 {
            fs::write(dir.path().join(format!("broken-{i}.jar")), b"not a zip").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let config = Arc::new(AppConfig::default());
        let classifier = ModClassifier::new(Arc::clone(&config));
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_clone = Arc::clone(&ticks);
        let progress: ScanProgress = Arc::new(move |_, _| {
            ticks_clone.fetch_add(1, Ordering::SeqCst);
        });

        let outcome = scan(dir.path(), "zh_tw", &classifier, "jar", 4, Some(progress))
            .await
            .unwrap();

        assert_eq!(outcome.total(), 5);
        assert_eq!(outcome.queued.len(), 0);
        assert_eq!(ticks.load(Ordering::SeqCst), 5);
        for (_, reason) in &outcome.skipped {
            assert!(reason.starts_with("scan error:"));
        }
    }

    #[tokio::test]
    async fn denylisted_names_skip_without_valid_archive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("fabric-api-0.92.jar"), b"junk").unwrap();

        let config = Arc::new(AppConfig::default());
        let classifier = ModClassifier::new(config);
        let outcome = scan(dir.path(), "zh_tw", &classifier, "jar", 16, None)
            .await
            .unwrap();

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].1, "ignored: core/library");
    }
}
