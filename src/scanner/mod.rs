pub mod classifier;
pub mod dependency_parser;
pub mod file_classifier;
pub mod git_history;
pub mod indicators;
pub mod metadata_extractor;
pub mod project_scanner;

pub use classifier::{ClassifierOptions, ProjectClassifier, DEFAULT_THRESHOLD, STRICT_THRESHOLD};
pub use file_classifier::FileCategory;
pub use git_history::{CommitStats, GitHistory};
pub use indicators::{DirectoryScore, IndicatorTable, IndicatorTier};
pub use metadata_extractor::{
    ExtractorOptions, MetadataExtractor, DEFAULT_IGNORE_DIRS, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_MANIFEST_SIZE,
};
pub use project_scanner::{ProjectScanner, ScanOutcome};
