mod cli;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use cli::{Cli, Commands, ConfigAction};
use project_miner::config::Config;
use project_miner::output;
use project_miner::scanner::ProjectScanner;
use project_miner::utils::format_duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 日志输出到 stderr，避免混入结果
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // 配置命令自己处理配置文件，格式错误时也能重置
    if let Commands::Config { action } = &cli.command {
        return run_config(action, cli.config.clone());
    }

    // 加载配置
    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_file(config_path)?
    } else {
        Config::load_or_create_default()?
    };

    // 根据命令执行相应操作
    match cli.command {
        Commands::Analyze { scan, all } => {
            scan.apply(&mut config);
            if all {
                config.display.show_all = true;
            }

            let outcome = ProjectScanner::new(config.clone())
                .classify_path(&scan.path)
                .await?;
            tracing::info!("耗时 {}", format_duration(outcome.elapsed));

            let content = output::render_classification(
                &outcome.classification,
                config.display.format,
                config.display.show_all,
            )?;
            output::write_output(&content, scan.output.as_deref())?;
        }
        Commands::Report { scan } => {
            scan.apply(&mut config);

            let outcome = ProjectScanner::new(config.clone())
                .analyze_path(&scan.path)
                .await?;
            tracing::info!("耗时 {}", format_duration(outcome.elapsed));

            if let Some(report) = &outcome.report {
                let content = output::render_report(report, config.display.format)?;
                output::write_output(&content, scan.output.as_deref())?;
            }
        }
        Commands::Indicators => {
            print!("{}", output::render_indicators(&config.indicator_table()));
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn run_config(action: &ConfigAction, custom_path: Option<PathBuf>) -> Result<()> {
    let path = match custom_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    match action {
        ConfigAction::Show => {
            let config = if path.exists() {
                Config::load_from_file(&path)?
            } else {
                Config::default()
            };
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save_to_file(&path)?;
            println!("已重置配置: {}", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}
