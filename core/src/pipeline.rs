//! End-to-end run orchestration: scan, then translate and commit one
//! container at a time.
//!
//! Only classification runs in parallel. Translation shares one rate-limited
//! remote endpoint and rewriting touches shared filesystem state, so both
//! stay strictly sequential; one commit finishes (success or restore) before
//! the next begins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::backup::BackupManager;
use crate::classifier::ModClassifier;
use crate::config::AppConfig;
use crate::resource::ResourceTranslator;
use crate::rewriter::ArchiveRewriter;
use crate::scanner::{self, ScanProgress};
use crate::translate::TranslationClient;

/// What happens to a container's backup once its patch attempt concludes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupPolicy {
    #[default]
    Keep,
    DeleteOnSuccess,
    DeleteAll,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub directory: PathBuf,
    pub target_locale: String,
    pub backup_policy: BackupPolicy,
}

/// Frontend hook for long-running stages. All methods default to no-ops.
pub trait ProgressObserver: Send + Sync {
    fn scan_progress(&self, _done: u64, _total: u64) {}
    fn container_started(&self, _container: &Path, _index: usize, _total: usize) {}
    fn container_finished(&self, _container: &Path, _success: bool) {}
}

/// Observer that ignores everything.
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerResult {
    pub container: PathBuf,
    pub detail: String,
}

/// Structured outcome of one run; the externally observable contract for
/// scripted invocation.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub target_locale: String,
    pub succeeded: Vec<ContainerResult>,
    pub failed: Vec<ContainerResult>,
    pub skipped: Vec<ContainerResult>,
}

impl RunSummary {
    /// Skip reasons aggregated into reason -> count.
    pub fn skip_histogram(&self) -> BTreeMap<String, usize> {
        let mut histogram = BTreeMap::new();
        for result in &self.skipped {
            *histogram.entry(result.detail.clone()).or_insert(0) += 1;
        }
        histogram
    }
}

/// The whole triage-and-patch pipeline wired together.
pub struct Pipeline {
    config: Arc<AppConfig>,
    classifier: ModClassifier,
    client: TranslationClient,
    backups: BackupManager,
    rewriter: ArchiveRewriter,
}

impl Pipeline {
    pub fn new(config: Arc<AppConfig>) -> Result<Self, reqwest::Error> {
        let classifier = ModClassifier::new(Arc::clone(&config));
        let client = TranslationClient::new(&config)?;
        let backups = BackupManager::new(&config.container_extension);
        let rewriter = ArchiveRewriter::new(backups.clone());
        Ok(Self {
            config,
            classifier,
            client,
            backups,
            rewriter,
        })
    }

    pub async fn run(
        &mut self,
        options: &RunOptions,
        observer: Arc<dyn ProgressObserver>,
    ) -> anyhow::Result<RunSummary> {
        let started_at = Local::now();

        let scan_observer = Arc::clone(&observer);
        let progress: ScanProgress = Arc::new(move |done, total| {
            scan_observer.scan_progress(done, total);
        });
        let outcome = scanner::scan(
            &options.directory,
            &options.target_locale,
            &self.classifier,
            &self.config.container_extension,
            self.config.scan_concurrency,
            Some(progress),
        )
        .await
        .with_context(|| format!("failed to scan {}", options.directory.display()))?;

        let mut queue = outcome.queued;
        queue.sort_by_key(|(path, _)| {
            path.file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        });

        let skipped: Vec<ContainerResult> = outcome
            .skipped
            .into_iter()
            .map(|(container, detail)| ContainerResult { container, detail })
            .collect();

        let total = queue.len();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (index, (container, _)) in queue.into_iter().enumerate() {
            observer.container_started(&container, index + 1, total);
            let result = self.process_container(&container, options).await;
            observer.container_finished(&container, result.is_ok());
            match result {
                Ok(detail) => succeeded.push(ContainerResult { container, detail }),
                Err(detail) => failed.push(ContainerResult { container, detail }),
            }
        }

        info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            skipped = skipped.len(),
            "run finished"
        );
        Ok(RunSummary {
            started_at,
            finished_at: Local::now(),
            target_locale: options.target_locale.clone(),
            succeeded,
            failed,
            skipped,
        })
    }

    /// Translate and commit one container. Ok carries the per-resource
    /// notes; Err carries the failure reason. Either way the container ends
    /// in a consistent state.
    async fn process_container(
        &mut self,
        container: &Path,
        options: &RunOptions,
    ) -> Result<String, String> {
        let mut translator = ResourceTranslator::new(&mut self.client, &self.config.locales);
        let report = translator
            .translate_container(container, &options.target_locale)
            .await;

        if report.patch.is_empty() {
            let detail = if report.notes.is_empty() {
                "no translatable content produced".to_string()
            } else {
                report.notes.join("; ")
            };
            return Err(detail);
        }

        let committed = self.rewriter.commit(container, &report.patch);
        let success = committed.is_ok();
        self.apply_backup_policy(container, options.backup_policy, success);

        match committed {
            Ok(_) => Ok(report.notes.join("; ")),
            Err(err) => Err(err.to_string()),
        }
    }

    fn apply_backup_policy(&self, container: &Path, policy: BackupPolicy, success: bool) {
        let delete = match policy {
            BackupPolicy::Keep => false,
            BackupPolicy::DeleteOnSuccess => success,
            BackupPolicy::DeleteAll => true,
        };
        if !delete {
            return;
        }
        let backup = self.backups.backup_path(container);
        if backup.exists() {
            if let Err(err) = std::fs::remove_file(&backup) {
                warn!(backup = %backup.display(), error = %err, "failed to delete backup");
            }
        }
    }

    /// Bulk restore for the `restore` frontend mode.
    pub fn restore_all(&self, directory: &Path) -> std::io::Result<usize> {
        self.backups.restore_all(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_repeated_reasons() {
        let summary = RunSummary {
            started_at: Local::now(),
            finished_at: Local::now(),
            target_locale: "zh_tw".into(),
            succeeded: vec![],
            failed: vec![],
            skipped: vec![
                ContainerResult {
                    container: "a.jar".into(),
                    detail: "ignored: core/library".into(),
                },
                ContainerResult {
                    container: "b.jar".into(),
                    detail: "ignored: core/library".into(),
                },
                ContainerResult {
                    container: "c.jar".into(),
                    detail: "missing base language resource".into(),
                },
            ],
        };

        let histogram = summary.skip_histogram();
        assert_eq!(histogram["ignored: core/library"], 2);
        assert_eq!(histogram["missing base language resource"], 1);
    }
}
