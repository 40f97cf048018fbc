use std::path::{Path, PathBuf};

use clap::Parser;
use kmod_config::{AppConfig, ConfigError};
use kmod_core::arc::ArcSegmentation;
use kmod_engine::AttributeEngine;
use kmod_io::{FootprintLoader, KicadModFacade};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod summary;

/// 读取 `.kicad_mod` 封装并打印属性转换结果。
#[derive(Debug, Parser)]
#[command(name = "kmod-app", version, about)]
struct Cli {
    /// 配置文件路径，缺省时按 `KMOD_CONFIG` 或 `./config/default.toml` 查找
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 待检查的封装文件
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // 帮助与版本信息正常退出，其余参数错误统一返回 1
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    let Cli {
        config: config_override,
        files,
    } = cli;

    // 配置加载失败不终止检查，日志初始化后再报告
    let (config, config_error) = match load_configuration(config_override.as_deref()) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    init_logging(&config.logging.level);
    if let Some(err) = config_error {
        warn!(error = %err, "加载配置失败，使用内建默认值");
    }
    info!(file_count = files.len(), "启动封装属性检查");

    let tessellation = &config.tessellation;
    let segmentation = ArcSegmentation::new(
        tessellation.segment_length_mm,
        tessellation.min_segments,
        tessellation.max_segments,
    );
    let engine = AttributeEngine::new().with_segmentation(segmentation);
    let loader = KicadModFacade::new();

    let mut failed = false;
    for path in &files {
        match loader.load(path) {
            Ok(footprint) => {
                for line in summary::render_footprint(&engine, &footprint) {
                    println!("{line}");
                }
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "加载封装失败");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    // 重复初始化时忽略
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
