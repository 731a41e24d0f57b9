use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::models::{AnalysisReport, Classification};
use crate::scanner::{MetadataExtractor, ProjectClassifier};
use crate::source::open_source;

/// 一次分析的结果
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// 输入的显示名称
    pub source: String,

    /// 目录分类结果
    pub classification: Classification,

    /// 元数据报告（只在 `analyze_path` 时生成）
    pub report: Option<AnalysisReport>,

    /// 耗时
    pub elapsed: Duration,
}

/// 扫描调度器 - 打开输入、运行分类并提取元数据
///
/// 分类在阻塞线程池中作为一个整体执行，外层只有一个粗粒度的超时。
#[derive(Debug, Clone, Default)]
pub struct ProjectScanner {
    config: Config,
}

impl ProjectScanner {
    /// 创建新的扫描调度器
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 只做目录分类
    pub async fn classify_path(&self, path: &Path) -> Result<ScanOutcome> {
        self.run(path, false).await
    }

    /// 分类并提取每个项目的元数据
    pub async fn analyze_path(&self, path: &Path) -> Result<ScanOutcome> {
        self.run(path, true).await
    }

    async fn run(&self, path: &Path, with_metadata: bool) -> Result<ScanOutcome> {
        // 创建进度条（在测试时禁用）
        let progress = if cfg!(test) || !self.config.display.progress {
            ProgressBar::hidden()
        } else {
            self.create_progress_bar()
        };
        progress.set_message(format!("分析: {}", path.display()));

        let scanner = self.clone();
        let input: PathBuf = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || scanner.scan_blocking(&input, with_metadata));

        let joined = match self.timeout() {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    progress.finish_and_clear();
                    anyhow::bail!("分析超时（{} 秒）: {}", limit.as_secs(), path.display());
                }
            },
            None => task.await,
        };

        let outcome = joined.context("分析任务异常退出").and_then(|result| result);
        match &outcome {
            Ok(outcome) => progress.finish_with_message(format!(
                "分析完成！发现 {} 个项目，访问了 {} 个目录",
                outcome.classification.project_count(),
                outcome.classification.stats.directories
            )),
            Err(_) => progress.finish_and_clear(),
        }
        outcome
    }

    /// 同步执行完整分析，供阻塞线程或非异步调用方使用
    ///
    /// 输入错误（路径不存在、压缩包损坏、根目录不可读）以 `SourceError` 返回，
    /// 可以通过 `downcast_ref` 取回。
    pub fn scan_blocking(&self, path: &Path, with_metadata: bool) -> Result<ScanOutcome> {
        let started = Instant::now();
        let source = open_source(path, self.config.classifier.follow_symlinks)?;

        let classifier =
            ProjectClassifier::new(self.config.indicator_table(), self.config.classifier_options());

        let classification = if classifier.options().parallel {
            let threads = self.config.classifier.effective_worker_threads();
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("无法创建线程池")?;
            tracing::debug!("使用 {} 个线程并行列目录", threads);
            pool.install(|| classifier.classify(source.as_ref()))?
        } else {
            classifier.classify(source.as_ref())?
        };

        let report = with_metadata.then(|| {
            MetadataExtractor::new(self.config.extractor_options())
                .extract(source.as_ref(), &classification)
        });

        let elapsed = started.elapsed();
        tracing::info!(
            "{} 分析完成，耗时 {:.2?}，项目 {} 个",
            source.label(),
            elapsed,
            classification.project_count()
        );

        Ok(ScanOutcome {
            source: source.label().to_string(),
            classification,
            report,
            elapsed,
        })
    }

    fn timeout(&self) -> Option<Duration> {
        match self.config.classifier.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// 创建进度条
    fn create_progress_bar(&self) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}
