use anyhow::Context;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// # 日志配置
///
/// 库代码只使用 `tracing` 宏，订阅者只在 `main.rs` 里通过 [`setup_logging`] 安装。
///
/// - 默认 INFO 级别，`-v/--verbose` 或调试模式下为 DEBUG，`RUST_LOG` 优先
/// - 配置了 `log_file` 时每次运行先清空该文件，日志写入文件
/// - 没有日志文件，或开启调试模式时，同时输出到终端
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
}

impl LogOptions {
    /// 只输出到终端
    pub fn console(verbose: bool) -> Self {
        Self {
            verbose,
            ..Default::default()
        }
    }

    pub fn level(&self) -> &'static str {
        if self.verbose || self.debug { "debug" } else { "info" }
    }

    pub fn console_enabled(&self) -> bool {
        self.log_file.is_none() || self.debug
    }
}

/// 清空(必要时创建)日志文件
pub fn clear_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}

pub fn setup_logging(options: &LogOptions) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.level()));

    // 文件输出使用详细格式便于排查
    let file_layer = match &options.log_file {
        Some(path) => {
            let file = clear_log_file(path)
                .with_context(|| format!("无法打开日志文件: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    let console_layer = options.console_enabled().then(|| {
        fmt::layer()
            .with_target(false)
            .with_line_number(false)
            .without_time()
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();
    Ok(())
}
