use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use project_miner::config::Config;
use project_miner::output::OutputFormat;

#[derive(Parser)]
#[command(name = "project-miner")]
#[command(about = "识别目录或 zip 压缩包中的项目边界，并提取项目元数据")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 分类目录，输出每个目录的分数和项目判定
    Analyze {
        #[command(flatten)]
        scan: ScanArgs,

        /// 同时列出非项目目录
        #[arg(short, long)]
        all: bool,
    },

    /// 分类后提取每个项目的元数据报告
    Report {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// 列出当前生效的指示文件及权重
    Indicators,

    /// 管理配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// 分析类命令共用的参数
#[derive(Args)]
pub struct ScanArgs {
    /// 要分析的目录或 zip 压缩包
    pub path: PathBuf,

    /// 严格模式（阈值 75）
    #[arg(long)]
    pub strict: bool,

    /// 自定义分数阈值
    #[arg(short, long, conflicts_with = "strict")]
    pub threshold: Option<i32>,

    /// 并行列出目录
    #[arg(long)]
    pub parallel: bool,

    /// 跟随符号链接
    #[arg(long)]
    pub follow_symlinks: bool,

    /// 输出格式
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// 保存结果到文件
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ScanArgs {
    /// 命令行参数覆盖配置文件
    pub fn apply(&self, config: &mut Config) {
        if self.strict {
            config.classifier.strict = true;
        }
        if let Some(threshold) = self.threshold {
            config.classifier.strict = false;
            config.classifier.threshold = threshold;
        }
        if self.parallel {
            config.classifier.parallel = true;
        }
        if self.follow_symlinks {
            config.classifier.follow_symlinks = true;
        }
        if let Some(format) = self.format {
            config.display.format = format;
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// 显示当前配置
    Show,

    /// 重置为默认配置
    Reset,

    /// 显示配置文件路径
    Path,
}
