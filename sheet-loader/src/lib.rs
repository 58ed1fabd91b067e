// 私有模块声明
mod app;
mod cli;
mod utils;

// 通过 pub use 精确控制对外暴露的接口
pub use app::SheetLoaderApp;
pub use cli::{Cli, Commands};
pub use utils::{LogOptions, clear_log_file, setup_logging};
