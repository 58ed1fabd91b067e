use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sheet-loader")]
#[command(about = "把电子表格数据同步到 MySQL/MariaDB 或 SQLite 表")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径，不指定时按 config.toml -> sheet-loader.toml -> .sheet-loader.toml 查找
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// 读取表格数据，建表后写入数据库
    Sync {
        /// 开启调试模式(同时输出到终端)
        #[arg(long)]
        debug: bool,
        /// 写入数据，不指定时使用配置文件中的 insert_mode
        #[arg(long)]
        insert: bool,
        /// 先删除再重建目标表
        #[arg(long)]
        recreate: bool,
    },
    /// 只建表，不读取表格
    CreateTable {
        /// 先删除再重建目标表
        #[arg(long)]
        recreate: bool,
    },
    /// 打印建表语句
    Ddl {
        /// 生成嵌入式数据库方言，不指定时跟随配置中的 backend
        #[arg(long)]
        embedded: bool,
    },
}

impl Cli {
    /// 命令行是否要求调试模式
    pub fn debug_requested(&self) -> bool {
        matches!(self.command, Commands::Sync { debug: true, .. })
    }
}
