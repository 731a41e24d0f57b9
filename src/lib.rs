pub mod config;
pub mod models;
pub mod output;
pub mod scanner;
pub mod source;
pub mod utils;

// 重新导出常用类型
pub use models::{AnalysisReport, Classification, DirectoryNode, ProjectMetadata};
pub use scanner::{ClassifierOptions, IndicatorTable, MetadataExtractor, ProjectClassifier, ProjectScanner};
pub use source::{open_source, FileSource, SourceError};
