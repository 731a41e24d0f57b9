use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::defaults::DefaultConfig;
use crate::output::OutputFormat;
use crate::scanner::{
    ClassifierOptions, ExtractorOptions, IndicatorTable, DEFAULT_THRESHOLD, STRICT_THRESHOLD,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 分类器配置
    pub classifier: ClassifierConfig,

    /// 指示文件配置
    pub indicators: IndicatorConfig,

    /// 元数据提取配置
    pub extractor: ExtractorConfig,

    /// 显示配置
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// 分数阈值
    pub threshold: i32,

    /// 严格模式（阈值固定为 75）
    pub strict: bool,

    /// 第一遍是否并行列目录
    pub parallel: bool,

    /// 并行线程数，0 表示使用 CPU 核心数
    pub worker_threads: usize,

    /// 是否跟随符号链接
    pub follow_symlinks: bool,

    /// 整个分类过程的超时时间（秒），0 表示不限制
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// 额外的指示文件（或覆盖内置权重）
    pub extra: BTreeMap<String, i32>,

    /// 禁用的内置指示文件
    pub disabled: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// 提取元数据时忽略的目录名
    pub ignore_dirs: BTreeSet<String>,

    /// 参与分类的单文件大小上限（字节）
    pub max_file_size: u64,

    /// 解析的依赖清单大小上限（字节）
    pub max_manifest_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// 默认输出格式
    pub format: OutputFormat,

    /// 表格中是否列出非项目目录
    pub show_all: bool,

    /// 是否显示进度
    pub progress: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strict: false,
            parallel: false,
            worker_threads: 0,
            follow_symlinks: false,
            timeout_secs: DefaultConfig::default_timeout_secs(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: DefaultConfig::default_ignore_dirs(),
            max_file_size: DefaultConfig::default_max_file_size(),
            max_manifest_size: DefaultConfig::default_max_manifest_size(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            show_all: false,
            progress: true,
        }
    }
}

impl ClassifierConfig {
    /// 实际使用的阈值，严格模式优先
    pub fn effective_threshold(&self) -> i32 {
        if self.strict {
            STRICT_THRESHOLD
        } else {
            self.threshold
        }
    }

    /// 并行线程数，未设置时使用 CPU 核心数
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get()
        } else {
            self.worker_threads
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件 {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("配置文件格式错误 {}", path.display()))?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        // 确保目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("无法写入配置文件 {}", path.display()))?;
        Ok(())
    }

    /// 获取默认配置文件路径
    pub fn default_config_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法找到配置目录"))?;
        path.push("project-miner");
        path.push("config.toml");
        Ok(path)
    }

    /// 加载配置，如果文件不存在则创建默认配置
    pub fn load_or_create_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            tracing::info!("已创建默认配置文件: {}", config_path.display());
            Ok(config)
        }
    }

    /// 内置指示文件表加上配置中的增删
    pub fn indicator_table(&self) -> IndicatorTable {
        let mut table = IndicatorTable::default();
        for name in &self.indicators.disabled {
            if table.remove(name).is_none() {
                tracing::warn!("禁用的指示文件不在内置表中: {}", name);
            }
        }
        for (name, weight) in &self.indicators.extra {
            table.insert(name.clone(), *weight);
        }
        table
    }

    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions::default()
            .with_threshold(self.classifier.effective_threshold())
            .with_parallel(self.classifier.parallel)
    }

    pub fn extractor_options(&self) -> ExtractorOptions {
        ExtractorOptions {
            ignore_dirs: self.extractor.ignore_dirs.clone(),
            max_file_size: self.extractor.max_file_size,
            max_manifest_size: self.extractor.max_manifest_size,
        }
    }
}
