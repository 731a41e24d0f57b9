use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 测试覆盖程度估计（按测试文件与代码文件的比例）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageEstimate {
    /// 没有测试文件
    None,
    /// 比例低于 0.2
    Low,
    /// 比例在 0.2 到 0.5 之间
    Medium,
    /// 比例不低于 0.5
    High,
}

impl CoverageEstimate {
    /// 根据文件数量估计覆盖程度
    pub fn estimate(code_files: usize, test_files: usize) -> Self {
        if test_files == 0 {
            return CoverageEstimate::None;
        }

        let ratio = if code_files > 0 {
            test_files as f64 / code_files as f64
        } else {
            0.0
        };

        if ratio >= 0.5 {
            CoverageEstimate::High
        } else if ratio >= 0.2 {
            CoverageEstimate::Medium
        } else {
            CoverageEstimate::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageEstimate::None => "none",
            CoverageEstimate::Low => "low",
            CoverageEstimate::Medium => "medium",
            CoverageEstimate::High => "high",
        }
    }
}

/// 项目中最大的文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestFile {
    /// 逻辑路径
    pub path: String,

    /// 字节数
    pub size: u64,
}

/// 单个项目的确定性元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// 项目名称（根目录项目使用来源名称）
    pub project_name: String,

    /// 项目根目录的逻辑路径
    pub project_path: String,

    /// 文件最多的语言
    pub primary_language: Option<String>,

    /// 语言 -> 代码文件数量（不含测试文件）
    pub languages: BTreeMap<String, usize>,

    /// 文件总数
    pub total_files: usize,

    /// 文件总大小
    pub total_size: u64,

    /// 代码文件数量
    pub code_files: usize,

    /// 测试文件数量
    pub test_files: usize,

    /// 文档文件数量
    pub doc_files: usize,

    /// 配置文件数量
    pub config_files: usize,

    /// 超过大小限制、未参与分类的文件数量
    pub skipped_files: usize,

    /// 包管理生态 -> 依赖包名称
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// 检测到的框架
    pub frameworks: Vec<String>,

    pub has_tests: bool,
    pub has_readme: bool,
    pub has_docker: bool,
    pub has_ci_cd: bool,
    pub is_git_repo: bool,

    /// 测试覆盖程度估计
    pub test_coverage_estimate: CoverageEstimate,

    /// 项目根目录到最深文件之间的目录层数
    pub directory_depth: usize,

    /// 最大的文件
    pub largest_file: Option<LargestFile>,

    /// 文件中最新的修改时间
    pub last_modified_date: Option<DateTime<Utc>>,

    /// 提交总数（只统计本地目录中的仓库）
    pub total_commits: usize,

    /// 最近一次提交的时间
    pub last_commit_date: Option<DateTime<Utc>>,
}

impl ProjectMetadata {
    /// 创建空的元数据记录
    pub fn new(project_name: impl Into<String>, project_path: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            project_path: project_path.into(),
            primary_language: None,
            languages: BTreeMap::new(),
            total_files: 0,
            total_size: 0,
            code_files: 0,
            test_files: 0,
            doc_files: 0,
            config_files: 0,
            skipped_files: 0,
            dependencies: BTreeMap::new(),
            frameworks: Vec::new(),
            has_tests: false,
            has_readme: false,
            has_docker: false,
            has_ci_cd: false,
            is_git_repo: false,
            test_coverage_estimate: CoverageEstimate::None,
            directory_depth: 0,
            largest_file: None,
            last_modified_date: None,
            total_commits: 0,
            last_commit_date: None,
        }
    }

    /// 依赖包总数
    pub fn dependency_count(&self) -> usize {
        self.dependencies.values().map(|deps| deps.len()).sum()
    }

    /// 语言列表的显示文本
    pub fn languages_display(&self) -> String {
        if self.languages.is_empty() {
            return "-".to_string();
        }
        self.languages
            .iter()
            .map(|(language, count)| format!("{}({})", language, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
