use std::collections::BTreeSet;

use crate::models::{AnalysisReport, Classification, CoverageEstimate, LargestFile, ProjectMetadata};
use crate::scanner::dependency_parser::{manifest_ecosystem, parse_manifest};
use crate::scanner::file_classifier::{classify_file, FileCategory};
use crate::scanner::git_history::{CommitStats, GitHistory};
use crate::source::{base_name, FileEntry, FileSource};

/// 提取元数据时不进入的目录（依赖缓存、版本控制、IDE、构建输出）
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "__MACOSX",
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "venv",
    "env",
    ".venv",
    "virtualenv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".cache",
    "build",
    "dist",
    "target",
    "bin",
    "obj",
    ".next",
    ".nuxt",
    ".idea",
    ".vscode",
    ".vs",
];

/// 默认的单文件大小上限（20 MiB）
pub const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// 默认的依赖清单大小上限（1 MiB）
pub const DEFAULT_MAX_MANIFEST_SIZE: u64 = 1024 * 1024;

/// 通过文件名识别的框架
const FRAMEWORK_FILES: &[(&str, &str)] = &[
    ("manage.py", "Django"),
    ("angular.json", "Angular"),
    ("next.config.js", "Next.js"),
    ("next.config.mjs", "Next.js"),
    ("next.config.ts", "Next.js"),
    ("nuxt.config.js", "Nuxt"),
    ("nuxt.config.ts", "Nuxt"),
    ("dockerfile", "Docker"),
    ("docker-compose.yml", "Docker"),
    ("docker-compose.yaml", "Docker"),
    ("deployment.yaml", "Kubernetes"),
    ("service.yaml", "Kubernetes"),
];

/// CI/CD 配置的路径片段（小写）
const CI_CD_PATHS: &[&str] = &[
    ".github/workflows/",
    ".gitlab-ci.yml",
    ".travis.yml",
    "jenkinsfile",
    ".circleci/",
    "azure-pipelines.yml",
    ".drone.yml",
];

/// 项目根目录下出现即视为 git 仓库
const GIT_MARKERS: &[&str] = &[".git", ".gitignore", ".gitattributes"];

/// 依赖包名对应的框架
fn framework_for_dependency(name: &str) -> Option<&'static str> {
    let name = name.to_lowercase();
    let framework = match name.as_str() {
        "django" => "Django",
        "flask" => "Flask",
        "fastapi" => "FastAPI",
        "react" => "React",
        "vue" => "Vue",
        "@angular/core" => "Angular",
        "next" => "Next.js",
        "nuxt" => "Nuxt",
        "express" => "Express",
        "svelte" => "Svelte",
        "actix-web" => "Actix",
        "axum" => "Axum",
        "rocket" => "Rocket",
        "rails" => "Rails",
        "laravel/framework" => "Laravel",
        "github.com/gin-gonic/gin" => "Gin",
        "spring-core" | "spring-context" | "spring-webmvc" => "Spring",
        n if n.starts_with("spring-boot") || n.contains(":spring-boot") => "Spring Boot",
        _ => return None,
    };
    Some(framework)
}

/// 元数据提取参数
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// 不进入的目录名
    pub ignore_dirs: BTreeSet<String>,

    /// 超过该大小的文件只计入总数，不参与分类
    pub max_file_size: u64,

    /// 超过该大小的依赖清单不解析
    pub max_manifest_size: u64,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_manifest_size: DEFAULT_MAX_MANIFEST_SIZE,
        }
    }
}

/// 项目元数据提取器
///
/// 只消费分类结果中的项目路径，不会重新判断项目边界。
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractor {
    options: ExtractorOptions,
}

impl MetadataExtractor {
    pub fn new(options: ExtractorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// 为分类结果中的每个项目生成元数据报告
    pub fn extract(&self, source: &dyn FileSource, classification: &Classification) -> AnalysisReport {
        let mut report = AnalysisReport::new(source.label(), classification.threshold);

        for node in classification.projects() {
            let name = if node.is_root() {
                source.label().to_string()
            } else {
                node.name().to_string()
            };
            report.add_project(self.extract_project(source, &node.path, &name));
        }

        tracing::info!(
            "元数据提取完成: {} 个项目，{} 个文件",
            report.analysis_metadata.total_projects,
            report.summary.total_files
        );
        report
    }

    /// 提取单个项目的元数据
    pub fn extract_project(
        &self,
        source: &dyn FileSource,
        project_path: &str,
        project_name: &str,
    ) -> ProjectMetadata {
        let mut metadata = ProjectMetadata::new(project_name, project_path);
        let skip_dir = |name: &str| self.options.ignore_dirs.contains(name);
        let files = source.walk_files(project_path, &skip_dir);

        let mut frameworks = BTreeSet::new();
        let mut largest: Option<&FileEntry> = None;

        for file in &files {
            let relative = relative_to(&file.path, project_path);
            let file_name = base_name(&file.path);
            let lower_name = file_name.to_lowercase();

            metadata.total_files += 1;
            metadata.total_size += file.size;
            metadata.directory_depth = metadata.directory_depth.max(relative.matches('/').count());
            if largest.map_or(true, |l| file.size > l.size) {
                largest = Some(file);
            }
            if file.modified > metadata.last_modified_date {
                metadata.last_modified_date = file.modified;
            }

            if lower_name.starts_with("readme") {
                metadata.has_readme = true;
            }
            if lower_name.contains("dockerfile") || lower_name.contains("docker-compose") {
                metadata.has_docker = true;
            }
            if is_ci_cd_path(relative) {
                metadata.has_ci_cd = true;
            }
            if let Some((_, framework)) = FRAMEWORK_FILES.iter().find(|(name, _)| *name == lower_name) {
                frameworks.insert(framework.to_string());
            }

            if file.size > self.options.max_file_size {
                tracing::debug!("文件过大，跳过分类: {} ({} 字节)", file.path, file.size);
                metadata.skipped_files += 1;
                continue;
            }

            match classify_file(relative) {
                FileCategory::Code(language) => {
                    metadata.code_files += 1;
                    *metadata.languages.entry(language.to_string()).or_insert(0) += 1;
                }
                FileCategory::Test(_) => metadata.test_files += 1,
                FileCategory::Doc => metadata.doc_files += 1,
                FileCategory::Config => metadata.config_files += 1,
                FileCategory::Other => {}
            }

            if let Some(ecosystem) = manifest_ecosystem(file_name) {
                if let Some(deps) = self.read_manifest(source, file) {
                    metadata
                        .dependencies
                        .entry(ecosystem.to_string())
                        .or_default()
                        .extend(deps);
                }
            }
        }

        for deps in metadata.dependencies.values_mut() {
            deps.sort();
            deps.dedup();
        }
        for dep in metadata.dependencies.values().flatten() {
            if let Some(framework) = framework_for_dependency(dep) {
                frameworks.insert(framework.to_string());
            }
        }

        metadata.frameworks = frameworks.into_iter().collect();
        metadata.primary_language = primary_language(&metadata);
        metadata.has_tests = metadata.test_files > 0;
        metadata.test_coverage_estimate =
            CoverageEstimate::estimate(metadata.code_files, metadata.test_files);
        metadata.is_git_repo = self.is_git_repo(source, project_path);
        if metadata.is_git_repo {
            if let Some(stats) = self.commit_stats(source, project_path) {
                metadata.total_commits = stats.total_commits;
                metadata.last_commit_date = stats.last_commit_date;
            }
        }
        metadata.largest_file = largest.map(|file| LargestFile {
            path: file.path.clone(),
            size: file.size,
        });

        tracing::debug!(
            "{}: {} 个文件，{} 个依赖",
            metadata.project_name,
            metadata.total_files,
            metadata.dependency_count()
        );
        metadata
    }

    /// 读取并解析依赖清单，失败时记录警告并返回 `None`
    fn read_manifest(&self, source: &dyn FileSource, file: &FileEntry) -> Option<Vec<String>> {
        if file.size > self.options.max_manifest_size {
            tracing::warn!("依赖清单过大，跳过: {} ({} 字节)", file.path, file.size);
            return None;
        }

        let bytes = match source.read_bytes(&file.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("无法读取依赖清单 {}: {}", file.path, err);
                return None;
            }
        };

        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                tracing::warn!("依赖清单不是 UTF-8 文本: {}", file.path);
                return None;
            }
        };

        match parse_manifest(base_name(&file.path), &content) {
            Ok(deps) => Some(deps),
            Err(err) => {
                tracing::warn!("忽略格式错误的依赖清单 {}: {:#}", file.path, err);
                None
            }
        }
    }

    /// 本地目录中仓库的提交统计，压缩包中的仓库不读取
    fn commit_stats(&self, source: &dyn FileSource, project_path: &str) -> Option<CommitStats> {
        let repo_path = source.local_path(project_path)?;
        match GitHistory::new().commit_stats(&repo_path) {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!("无法读取 git 历史 {}: {:#}", repo_path.display(), err);
                None
            }
        }
    }

    fn is_git_repo(&self, source: &dyn FileSource, project_path: &str) -> bool {
        match source.list_children(project_path) {
            Ok(children) => children
                .iter()
                .any(|child| GIT_MARKERS.contains(&child.name.as_str())),
            Err(err) => {
                tracing::warn!("无法读取项目目录 {:?}: {}", project_path, err);
                false
            }
        }
    }
}

/// 文件相对于项目根目录的路径
fn relative_to<'a>(path: &'a str, project_path: &str) -> &'a str {
    if project_path.is_empty() {
        return path;
    }
    path.strip_prefix(project_path)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

fn is_ci_cd_path(relative: &str) -> bool {
    let lower = format!("/{}", relative.to_lowercase());
    CI_CD_PATHS
        .iter()
        .any(|marker| lower.contains(&format!("/{}", marker)))
}

/// 代码文件最多的语言，数量相同时取名称靠前的
fn primary_language(metadata: &ProjectMetadata) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for (language, count) in &metadata.languages {
        if best.map_or(true, |(_, c)| *count > c) {
            best = Some((language, *count));
        }
    }
    best.map(|(language, _)| language.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ArchiveSource, DirectorySource};
    use chrono::{DateTime, NaiveDate};
    use git2::{Repository, Signature, Time};
    use std::fs;
    use std::io::{Cursor, Write};
    use std::path::Path;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write(root: &Path, path: &str, content: &str) {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    #[test]
    fn test_relative_and_ci_paths() {
        assert_eq!(relative_to("api/src/app.py", "api"), "src/app.py");
        assert_eq!(relative_to("src/app.py", ""), "src/app.py");
        assert!(is_ci_cd_path(".github/workflows/ci.yml"));
        assert!(is_ci_cd_path("Jenkinsfile"));
        assert!(!is_ci_cd_path("docs/github.md"));
    }

    #[test]
    fn test_framework_for_dependency() {
        assert_eq!(framework_for_dependency("Flask"), Some("Flask"));
        assert_eq!(framework_for_dependency("spring-boot-starter-web"), Some("Spring Boot"));
        assert_eq!(
            framework_for_dependency("org.springframework.boot:spring-boot-starter"),
            Some("Spring Boot")
        );
        assert_eq!(framework_for_dependency("requests"), None);
    }

    #[test]
    fn test_extract_python_project() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "api/requirements.txt", "flask==2.0\nrequests\n");
        write(root, "api/app.py", "print('hi')");
        write(root, "api/utils/helpers.py", "x = 1");
        write(root, "api/tests/test_app.py", "def test(): pass");
        write(root, "api/README.md", "# api");
        write(root, "api/Dockerfile", "FROM python");
        write(root, "api/.gitignore", "*.pyc");
        write(root, "api/.github/workflows/ci.yml", "on: push");
        write(root, "api/node_modules/pkg/index.js", "module.exports = 1");

        let source = DirectorySource::new(root).unwrap();
        let metadata = MetadataExtractor::default().extract_project(&source, "api", "api");

        assert_eq!(metadata.project_path, "api");
        // node_modules 不会被遍历
        assert_eq!(metadata.total_files, 8);
        assert_eq!(metadata.code_files, 2);
        assert_eq!(metadata.test_files, 1);
        assert_eq!(metadata.languages.get("python"), Some(&2));
        assert_eq!(metadata.primary_language.as_deref(), Some("python"));
        assert_eq!(metadata.doc_files, 2);
        assert_eq!(metadata.config_files, 1);
        assert_eq!(
            metadata.dependencies.get("python"),
            Some(&vec!["flask".to_string(), "requests".to_string()])
        );
        assert_eq!(metadata.frameworks, vec!["Docker", "Flask"]);
        assert!(metadata.has_readme);
        assert!(metadata.has_docker);
        assert!(metadata.has_ci_cd);
        assert!(metadata.has_tests);
        assert!(metadata.is_git_repo);
        assert_eq!(metadata.test_coverage_estimate, CoverageEstimate::High);
        assert_eq!(metadata.directory_depth, 2);
    }

    #[test]
    fn test_malformed_manifest_is_omitted() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "package.json", "{ \"dependencies\": ");
        write(root, "go.mod", "module x\n\nrequire github.com/gin-gonic/gin v1.9.0\n");
        write(root, "main.go", "package main");

        let source = DirectorySource::new(root).unwrap();
        let metadata = MetadataExtractor::default().extract_project(&source, "", "demo");

        assert!(!metadata.dependencies.contains_key("javascript"));
        assert_eq!(
            metadata.dependencies.get("go"),
            Some(&vec!["github.com/gin-gonic/gin".to_string()])
        );
        assert_eq!(metadata.frameworks, vec!["Gin"]);
        assert!(!metadata.is_git_repo);
        assert_eq!(metadata.total_commits, 0);
        assert_eq!(metadata.last_commit_date, None);
    }

    #[test]
    fn test_commit_history_of_local_repository() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "api/main.go", "package main");
        write(root, "web/package.json", "{}");

        let repo = Repository::init(root.join("api")).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("main.go")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::new("dev", "dev@example.com", &Time::new(1_700_000_000, 0)).unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "init", &tree, &[])
            .unwrap();

        let source = DirectorySource::new(root).unwrap();
        let extractor = MetadataExtractor::default();

        let api = extractor.extract_project(&source, "api", "api");
        assert!(api.is_git_repo);
        assert_eq!(api.total_commits, 1);
        assert_eq!(api.last_commit_date, DateTime::from_timestamp(1_700_000_000, 0));
        // .git 目录被忽略，不计入文件
        assert_eq!(api.total_files, 1);
        assert!(api.last_modified_date.is_some());

        let web = extractor.extract_project(&source, "web", "web");
        assert!(!web.is_git_repo);
        assert_eq!(web.total_commits, 0);
    }

    #[test]
    fn test_last_modified_date_from_archive() {
        let stamp = |day: u8| zip::DateTime::from_date_and_time(2024, 3, day, 8, 0, 0).unwrap();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, day) in [("app/main.py", 2), ("app/util.py", 9), ("other/notes.md", 20)] {
            let options = SimpleFileOptions::default().last_modified_time(stamp(day));
            writer.start_file(name, options).unwrap();
            writer.write_all(b"x").unwrap();
        }
        // 压缩包里的 .git 只用于判断仓库，不读取提交
        writer
            .start_file("app/.git/HEAD", SimpleFileOptions::default().last_modified_time(stamp(1)))
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let source = ArchiveSource::from_reader("stamped", Cursor::new(bytes)).unwrap();

        let metadata = MetadataExtractor::default().extract_project(&source, "app", "app");
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(metadata.last_modified_date, Some(expected));
        assert!(metadata.is_git_repo);
        assert_eq!(metadata.total_commits, 0);
        assert_eq!(metadata.last_commit_date, None);
    }

    #[test]
    fn test_oversized_files_are_counted_but_not_categorized() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        write(root, "big.py", &"x".repeat(64));
        write(root, "small.py", "x");

        let options = ExtractorOptions {
            max_file_size: 16,
            ..ExtractorOptions::default()
        };
        let source = DirectorySource::new(root).unwrap();
        let metadata = MetadataExtractor::new(options).extract_project(&source, "", "demo");

        assert_eq!(metadata.total_files, 2);
        assert_eq!(metadata.total_size, 65);
        assert_eq!(metadata.skipped_files, 1);
        assert_eq!(metadata.code_files, 1);
        assert_eq!(
            metadata.largest_file,
            Some(LargestFile {
                path: "big.py".to_string(),
                size: 64
            })
        );
    }
}
