use clap::Parser;
use loader_core::{LoaderError, config::AppConfig};
use sheet_loader::{Cli, LogOptions, SheetLoaderApp, setup_logging};
use tracing::error;

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 日志文件路径在配置里，先加载配置再设置日志
    let config = match AppConfig::find_and_load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let _ = setup_logging(&LogOptions::console(cli.verbose));
            if matches!(e, LoaderError::ConfigNotFound) {
                match &cli.config {
                    Some(path) => error!("❌ 配置文件 '{}' 未找到。", path.display()),
                    None => error!("❌ 当前目录下没有找到配置文件 (config.toml / sheet-loader.toml / .sheet-loader.toml)。"),
                }
            } else {
                error!("❌ 配置加载失败: {}", e.chain());
            }
            std::process::exit(1);
        }
    };

    let log_options = LogOptions {
        verbose: cli.verbose,
        debug: config.debug_mode || cli.debug_requested(),
        log_file: config.log_file_path(),
    };
    if let Err(e) = setup_logging(&log_options) {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }

    // 运行命令
    let app = SheetLoaderApp::new(config);
    if let Err(e) = app.run_command(cli.command).await {
        if e.is_fatal() {
            error!("❌ 导入中止: {}", e.chain());
        } else {
            error!("❌ 操作失败: {}", e.chain());
        }
        std::process::exit(1);
    }
}
