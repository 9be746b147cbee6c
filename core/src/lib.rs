pub mod archive;
pub mod backup;
pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod protector;
pub mod resource;
pub mod rewriter;
pub mod scanner;
pub mod translate;

pub use archive::{is_container_file, list_entries, read_entry, ArchiveEntry, ArchiveError};
pub use backup::{BackupError, BackupManager};
pub use classifier::{Disposition, ModClassifier};
pub use config::{AppConfig, FootprintMarkers, LocaleInfo, LocaleRegistry, RESERVED_KEYS};
pub use pipeline::{
    BackupPolicy, ContainerResult, NoProgress, Pipeline, ProgressObserver, RunOptions, RunSummary,
};
pub use protector::{ProtectedText, Protector};
pub use resource::{ResourceReport, ResourceTranslator};
pub use rewriter::{ArchiveRewriter, PatchSet, RewriteError};
pub use scanner::{scan, ScanOutcome, ScanProgress};
pub use translate::{RetryPolicy, TranslationClient};
