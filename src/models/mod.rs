pub mod classification;
pub mod directory_node;
pub mod project;
pub mod scan_result;

pub use classification::{Classification, ClassificationStats};
pub use directory_node::{DirectoryNode, IndicatorMatch};
pub use project::{CoverageEstimate, LargestFile, ProjectMetadata};
pub use scan_result::{AnalysisMetadata, AnalysisReport, ReportSummary};
