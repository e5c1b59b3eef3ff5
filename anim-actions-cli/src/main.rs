//! # anim-actions - 无头演示宿主
//!
//! 在独立的引擎线程上播放动画，在主线程上执行挂载的开始 / 结束动作，
//! 逐个场景验证注册表的生命周期行为。
//!
//! ## 命令
//!
//! - `run [SCENARIO...]`: 运行场景（默认全部）
//! - `list`: 列出所有场景
//! - `init-config [PATH]`: 写出默认配置文件

mod config;
mod engine;
mod scenario;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use config::AppConfig;
use scenario::ScenarioKind;

#[derive(Debug, Parser)]
#[command(name = "anim-actions", version, about = "动画开始/结束动作演示宿主")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "anim-actions.json")]
    config: PathBuf,

    /// 日志级别（覆盖配置文件）
    #[arg(long)]
    log_level: Option<String>,

    /// 动画时长（秒，覆盖配置文件）
    #[arg(long)]
    duration: Option<f32>,

    /// 引擎每帧推进的时间（秒，覆盖配置文件）
    #[arg(long)]
    tick: Option<f32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// 运行场景（默认全部）
    Run {
        #[arg(value_enum)]
        scenarios: Vec<ScenarioKind>,
    },
    /// 列出所有场景
    List,
    /// 写出默认配置文件
    InitConfig {
        /// 输出路径（默认使用 --config）
        path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match real_main() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("anim-actions error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// # 返回
/// 所有场景是否通过
fn real_main() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level()?)
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::List) => {
            for kind in ScenarioKind::all() {
                println!("{:<16} {}", kind.name(), kind.description());
            }
            Ok(true)
        }
        Some(Commands::InitConfig { path }) => {
            let path = path.unwrap_or(cli.config);
            AppConfig::default()
                .save(&path)
                .with_context(|| format!("写出配置文件失败: {}", path.display()))?;
            info!(path = %path.display(), "已写出默认配置");
            Ok(true)
        }
        Some(Commands::Run { scenarios }) => run_scenarios(&scenarios, &config),
        None => run_scenarios(&[], &config),
    }
}

/// 加载配置：命令行 > 配置文件 > 默认值
fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("加载配置文件失败: {}", cli.config.display()))?;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(duration) = cli.duration {
        config.playback.duration_secs = duration;
    }
    if let Some(tick) = cli.tick {
        config.playback.tick_secs = tick;
    }

    config.validate()?;
    Ok(config)
}

fn run_scenarios(selected: &[ScenarioKind], config: &AppConfig) -> anyhow::Result<bool> {
    let kinds = if selected.is_empty() {
        ScenarioKind::all()
    } else {
        selected
    };

    let mut all_passed = true;
    for kind in kinds {
        let report = scenario::run(*kind, config)?;
        let status = if report.passed() { "PASS" } else { "FAIL" };
        println!("[{status}] {} - {}", kind.name(), kind.description());
        for check in &report.checks {
            let mark = if check.passed { "✓" } else { "✗" };
            println!("    {mark} {}", check.description);
        }
        all_passed &= report.passed();
    }

    Ok(all_passed)
}
