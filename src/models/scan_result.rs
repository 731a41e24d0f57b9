use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::ProjectMetadata;

/// 分析报告的元信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// 分析的输入（目录或压缩包）
    pub source: String,

    /// 分析时间
    pub analysis_timestamp: DateTime<Utc>,

    /// 使用的分数阈值
    pub threshold: i32,

    /// 项目数量
    pub total_projects: usize,
}

/// 所有项目的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// 文件总数
    pub total_files: usize,

    /// 总字节数
    pub total_size_bytes: u64,

    /// 出现过的语言（排序去重）
    pub languages_used: Vec<String>,

    /// 出现过的框架（排序去重）
    pub frameworks_used: Vec<String>,
}

/// 元数据分析报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_metadata: AnalysisMetadata,

    /// 每个项目的元数据
    pub projects: Vec<ProjectMetadata>,

    pub summary: ReportSummary,
}

impl AnalysisReport {
    /// 创建新的报告
    pub fn new(source: impl Into<String>, threshold: i32) -> Self {
        Self {
            analysis_metadata: AnalysisMetadata {
                source: source.into(),
                analysis_timestamp: Utc::now(),
                threshold,
                total_projects: 0,
            },
            projects: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    /// 添加项目到报告
    pub fn add_project(&mut self, project: ProjectMetadata) {
        self.projects.push(project);
        self.update_summary();
    }

    /// 更新汇总信息
    fn update_summary(&mut self) {
        let projects = &self.projects;

        self.analysis_metadata.total_projects = projects.len();
        self.summary.total_files = projects.iter().map(|p| p.total_files).sum();
        self.summary.total_size_bytes = projects.iter().map(|p| p.total_size).sum();

        self.summary.languages_used = projects
            .iter()
            .flat_map(|p| p.languages.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        self.summary.frameworks_used = projects
            .iter()
            .flat_map(|p| p.frameworks.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
    }

    /// 按条件过滤项目
    pub fn filter_projects<F>(&self, predicate: F) -> Vec<&ProjectMetadata>
    where
        F: Fn(&ProjectMetadata) -> bool,
    {
        self.projects.iter().filter(|p| predicate(p)).collect()
    }

    /// 使用指定语言的项目
    pub fn projects_using(&self, language: &str) -> Vec<&ProjectMetadata> {
        self.filter_projects(|p| p.languages.contains_key(language))
    }
}
