use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

use crate::models::{AnalysisReport, Classification, DirectoryNode};
use crate::scanner::{IndicatorTable, IndicatorTier};
use crate::utils::{format_size, format_timestamp};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 表格格式
    Table,
    /// JSON 格式
    Json,
    /// CSV 格式
    Csv,
}

/// 根目录显示为 `.`
fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}

/// CSV 字段转义
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// 渲染分类结果
///
/// `show_all` 为 false 时表格和 CSV 只列出项目；JSON 总是输出完整的映射。
pub fn render_classification(
    classification: &Classification,
    format: OutputFormat,
    show_all: bool,
) -> Result<String> {
    let rows: Vec<&DirectoryNode> = classification
        .nodes
        .values()
        .filter(|node| show_all || node.is_project)
        .collect();

    match format {
        OutputFormat::Json => Ok(classification.to_json(true)?),
        OutputFormat::Csv => {
            let mut out = String::from("path,is_project,score,subproject_count,has_files,indicators\n");
            for node in rows {
                let indicators = node
                    .indicators_found
                    .iter()
                    .map(|m| format!("{}:{}", m.name, m.weight))
                    .collect::<Vec<_>>()
                    .join(";");
                out.push_str(&csv_row(&[
                    node.path.clone(),
                    node.is_project.to_string(),
                    node.score.to_string(),
                    node.subproject_count.to_string(),
                    node.has_files.to_string(),
                    indicators,
                ]));
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Table => {
            let width = rows
                .iter()
                .map(|node| display_path(&node.path).chars().count())
                .max()
                .unwrap_or(0)
                .max(4);

            let mut out = String::new();
            writeln!(out, "{:<width$}  {:<4}  {:>5}  {:>6}  指标", "路径", "项目", "分数", "子项目")?;
            for node in rows {
                writeln!(
                    out,
                    "{:<width$}  {:<4}  {:>5}  {:>6}  {}",
                    display_path(&node.path),
                    if node.is_project { "是" } else { "-" },
                    node.score,
                    node.subproject_count,
                    node.indicators_display()
                )?;
            }

            let stats = &classification.stats;
            writeln!(
                out,
                "\n共 {} 个目录，{} 个项目（阈值 {}，暂定 {}，降级 {}，吸收 {}，无法读取 {}）",
                stats.directories,
                classification.project_count(),
                classification.threshold,
                stats.provisional_projects,
                stats.demoted_containers,
                stats.absorbed_projects,
                stats.unreadable_directories
            )?;
            Ok(out)
        }
    }
}

/// 渲染元数据报告
pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => {
            let mut out = String::from(
                "project_name,project_path,primary_language,total_files,total_size,code_files,test_files,doc_files,config_files,dependencies,frameworks,directory_depth,test_coverage,total_commits,last_commit_date,last_modified_date\n",
            );
            for project in &report.projects {
                out.push_str(&csv_row(&[
                    project.project_name.clone(),
                    project.project_path.clone(),
                    project.primary_language.clone().unwrap_or_default(),
                    project.total_files.to_string(),
                    project.total_size.to_string(),
                    project.code_files.to_string(),
                    project.test_files.to_string(),
                    project.doc_files.to_string(),
                    project.config_files.to_string(),
                    project.dependency_count().to_string(),
                    project.frameworks.join(";"),
                    project.directory_depth.to_string(),
                    project.test_coverage_estimate.as_str().to_string(),
                    project.total_commits.to_string(),
                    project.last_commit_date.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    project.last_modified_date.map(|t| t.to_rfc3339()).unwrap_or_default(),
                ]));
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Table => {
            let meta = &report.analysis_metadata;
            let mut out = String::new();
            writeln!(out, "来源: {}", meta.source)?;
            writeln!(out, "时间: {}", format_timestamp(&meta.analysis_timestamp))?;
            writeln!(out, "阈值: {}  项目: {}", meta.threshold, meta.total_projects)?;

            for project in &report.projects {
                writeln!(out, "\n📁 {} ({})", project.project_name, display_path(&project.project_path))?;
                writeln!(
                    out,
                    "   文件: {} 个，{}（代码 {}，测试 {}，文档 {}，配置 {}）",
                    project.total_files,
                    format_size(project.total_size),
                    project.code_files,
                    project.test_files,
                    project.doc_files,
                    project.config_files
                )?;
                writeln!(out, "   语言: {}", project.languages_display())?;
                if !project.frameworks.is_empty() {
                    writeln!(out, "   框架: {}", project.frameworks.join(", "))?;
                }
                for (ecosystem, deps) in &project.dependencies {
                    writeln!(out, "   依赖 [{}]: {}", ecosystem, deps.join(", "))?;
                }
                writeln!(
                    out,
                    "   测试: {}  README: {}  Docker: {}  CI/CD: {}  Git: {}",
                    project.test_coverage_estimate.as_str(),
                    yes_no(project.has_readme),
                    yes_no(project.has_docker),
                    yes_no(project.has_ci_cd),
                    yes_no(project.is_git_repo)
                )?;
                if let Some(date) = &project.last_commit_date {
                    writeln!(
                        out,
                        "   提交: {} 次，最近 {}",
                        project.total_commits,
                        format_timestamp(date)
                    )?;
                }
                if let Some(date) = &project.last_modified_date {
                    writeln!(out, "   最后修改: {}", format_timestamp(date))?;
                }
                if let Some(largest) = &project.largest_file {
                    writeln!(out, "   最大文件: {} ({})", largest.path, format_size(largest.size))?;
                }
            }

            let summary = &report.summary;
            writeln!(
                out,
                "\n汇总: {} 个文件，{}，语言 {}，框架 {}",
                summary.total_files,
                format_size(summary.total_size_bytes),
                summary.languages_used.join(", "),
                summary.frameworks_used.join(", ")
            )?;
            Ok(out)
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "有"
    } else {
        "无"
    }
}

/// 按强弱分组列出指标表
pub fn render_indicators(table: &IndicatorTable) -> String {
    let mut out = String::new();
    for tier in [
        IndicatorTier::Strong,
        IndicatorTier::Medium,
        IndicatorTier::Weak,
        IndicatorTier::Negative,
    ] {
        let entries: Vec<(&str, i32)> = table
            .iter()
            .filter(|(_, weight)| IndicatorTier::from_weight(*weight) == tier)
            .collect();
        if entries.is_empty() {
            continue;
        }

        out.push_str(&format!("[{}]\n", tier));
        for (name, weight) in entries {
            out.push_str(&format!("  {:<24} {:>+4}\n", name, weight));
        }
    }
    out
}

/// 输出到文件或标准输出
pub fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("无法写入输出文件 {}", path.display()))?;
            tracing::info!("结果已保存到 {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndicatorMatch, ProjectMetadata};
    use std::collections::BTreeMap;

    fn sample() -> Classification {
        let mut web = DirectoryNode::new("web");
        web.is_project = true;
        web.score = 80;
        web.has_files = true;
        web.indicators_found.push(IndicatorMatch::new("package.json", 80));

        let mut root = DirectoryNode::new("");
        root.subproject_count = 1;

        let mut docs = DirectoryNode::new("docs, notes");
        docs.has_files = true;

        let mut nodes = BTreeMap::new();
        for node in [root, web, docs] {
            nodes.insert(node.path.clone(), node);
        }
        Classification {
            nodes,
            ..Classification::empty(50)
        }
    }

    #[test]
    fn test_table_lists_projects_only_by_default() {
        let table = render_classification(&sample(), OutputFormat::Table, false).unwrap();
        assert!(table.contains("package.json (+80)"));
        assert!(!table.contains("docs, notes"));

        let all = render_classification(&sample(), OutputFormat::Table, true).unwrap();
        assert!(all.contains("docs, notes"));
    }

    #[test]
    fn test_csv_escapes_fields() {
        let csv = render_classification(&sample(), OutputFormat::Csv, true).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "path,is_project,score,subproject_count,has_files,indicators");
        assert_eq!(lines[1], ",false,0,1,false,");
        assert_eq!(lines[2], "\"docs, notes\",false,0,0,true,");
        assert_eq!(lines[3], "web,true,80,0,true,package.json:80");
    }

    #[test]
    fn test_json_is_full_map() {
        let json = render_classification(&sample(), OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nodes"].as_object().unwrap().len(), 3);
        assert_eq!(value["nodes"]["web"]["is_project"], true);
    }

    #[test]
    fn test_report_csv() {
        let mut report = AnalysisReport::new("demo", 50);
        let mut project = ProjectMetadata::new("web", "web");
        project.frameworks = vec!["React".into(), "Vite".into()];
        report.add_project(project);

        let csv = render_report(&report, OutputFormat::Csv).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("web,web,,0,0,"));
        assert!(row.contains("React;Vite"));
        assert!(row.ends_with(",none,0,,"));
    }

    #[test]
    fn test_report_includes_history() {
        let mut report = AnalysisReport::new("demo", 50);
        let mut project = ProjectMetadata::new("api", "api");
        project.total_commits = 3;
        project.last_commit_date = chrono::DateTime::from_timestamp(0, 0);
        project.last_modified_date = chrono::DateTime::from_timestamp(86_400, 0);
        report.add_project(project);

        let csv = render_report(&report, OutputFormat::Csv).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",3,1970-01-01T00:00:00+00:00,1970-01-02T00:00:00+00:00"));

        let table = render_report(&report, OutputFormat::Table).unwrap();
        assert!(table.contains("提交: 3 次"));
        assert!(table.contains("最后修改: "));
    }

    #[test]
    fn test_render_indicators_groups_by_tier() {
        let table = IndicatorTable::empty()
            .with("package.json", 80)
            .with("node_modules", -50);
        let out = render_indicators(&table);
        let strong = out.find("package.json").unwrap();
        let negative = out.find("node_modules").unwrap();
        assert!(strong < negative);
        assert!(out.contains("-50"));
    }
}
