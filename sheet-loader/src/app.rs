use loader_core::{
    config::{AppConfig, Backend},
    db::{DatabaseClient, SqliteDb},
    error::{LoaderError, Result},
    schema::{TableSpec, generate_create_table_sql, generate_embedded_create_table_sql},
    sheet::ConfiguredSheet,
    sync::{SyncOptions, SyncReport, run_sync},
};
use tracing::info;

use crate::cli::Commands;

#[derive(Debug, Clone)]
pub struct SheetLoaderApp {
    pub config: AppConfig,
}

impl SheetLoaderApp {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// 运行应用命令
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Sync {
                insert, recreate, ..
            } => {
                let options = SyncOptions {
                    insert_mode: self.config.insert_mode || insert,
                    recreate,
                };
                self.sync(options).await.map(|_| ())
            }
            Commands::CreateTable { recreate } => self.create_table(recreate).await,
            Commands::Ddl { embedded } => {
                println!("{}", self.ddl(embedded));
                Ok(())
            }
        }
    }

    /// 读取表格并写入数据库
    pub async fn sync(&self, options: SyncOptions) -> Result<SyncReport> {
        info!(
            "🚀 开始同步: {} -> {}",
            self.config.spreadsheet.name, self.config.table.name
        );
        let source = ConfiguredSheet::from_config(&self.config)?;
        let report = run_sync(&self.config, &source, options).await?;
        match &report.summary {
            Some(summary) => info!(
                "✅ 同步完成: 读取 {} 条, 写入 {} 条",
                report.records,
                summary.inserted()
            ),
            None => info!("✅ 读取完成: {} 条，未写入", report.records),
        }
        Ok(report)
    }

    /// 按配置的后端建表
    pub async fn create_table(&self, recreate: bool) -> Result<()> {
        let table = &self.config.table;
        match self.config.backend {
            Backend::Server => {
                let client = self.config.server_client();
                ensure_table(&client, table, recreate).await
            }
            Backend::Embedded => {
                let client = SqliteDb::from_table(table, self.config.exec_dir.as_deref())?;
                ensure_table(&client, table, recreate).await
            }
        }
    }

    /// 生成建表语句
    pub fn ddl(&self, embedded: bool) -> String {
        if embedded || self.config.backend == Backend::Embedded {
            generate_embedded_create_table_sql(&self.config.table)
        } else {
            generate_create_table_sql(&self.config.table)
        }
    }
}

async fn ensure_table<C: DatabaseClient>(client: &C, table: &TableSpec, recreate: bool) -> Result<()> {
    match client.create_table(table, recreate).await {
        Some(_) => {
            info!("✅ 表已就绪: {}", client.qualify(&table.name));
            Ok(())
        }
        // 具体错误已由 create_table 写入日志
        None => Err(LoaderError::custom(format!(
            "建表失败: {}",
            client.qualify(&table.name)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_job(dir: &Path) -> AppConfig {
        let config = format!(
            r#"
backend = "embedded"
exec_dir = "{}"

[spreadsheet]
name = "members"
file = "sheet.json"
pair = [
    {{ col = "name", idx = 1 }},
    {{ col = "email", idx = 2 }},
]

[table]
name = "member_t"
db_file = "member.db"
ignore = ["id"]

[[table.columns]]
name = "id"
type = "INT"
allow_null = false
option = "PRIMARY KEY AUTOINCREMENT"

[[table.columns]]
name = "name"
type = "varchar(64)"

[[table.columns]]
name = "email"
type = "varchar(255)"

[[table.columns]]
name = "created"
type = "timestamp"
"#,
            dir.display()
        );
        let path = dir.join("config.toml");
        std::fs::write(&path, config).unwrap();
        std::fs::write(
            dir.join("sheet.json"),
            r#"[["no","name","email"],["1","Alice","a@example.com"],["2","Bob","b@example.com"]]"#,
        )
        .unwrap();
        AppConfig::load_from_file(&path).unwrap()
    }

    #[test]
    fn test_ddl_follows_backend() {
        let temp_dir = tempdir().unwrap();
        let mut app = SheetLoaderApp::new(write_job(temp_dir.path()));

        let embedded = app.ddl(false);
        assert!(embedded.starts_with("CREATE TABLE IF NOT EXISTS `member_t`"));
        assert!(embedded.contains("`id` INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(embedded.contains("`created` DATETIME"));

        app.config.backend = Backend::Server;
        let server = app.ddl(false);
        assert!(server.contains("`name` varchar(64) NOT NULL"));
        assert_eq!(app.ddl(true), embedded);
    }

    #[tokio::test]
    async fn test_create_table_embedded() {
        let temp_dir = tempdir().unwrap();
        let app = SheetLoaderApp::new(write_job(temp_dir.path()));

        app.run_command(Commands::CreateTable { recreate: true })
            .await
            .unwrap();
        assert!(temp_dir.path().join("member.db").exists());
    }

    #[tokio::test]
    async fn test_sync_command_insert_flag() {
        let temp_dir = tempdir().unwrap();
        let app = SheetLoaderApp::new(write_job(temp_dir.path()));
        assert!(!app.config.insert_mode);

        let report = app
            .sync(SyncOptions {
                insert_mode: true,
                recreate: false,
            })
            .await
            .unwrap();
        assert_eq!(report.records, 2);
        assert_eq!(report.summary.map(|s| s.inserted()), Some(2));

        let db = SqliteDb::from_table(&app.config.table, app.config.exec_dir.as_deref()).unwrap();
        let names = db
            .fetch_column("SELECT name FROM member_t ORDER BY id")
            .await
            .unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].as_str(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_sync_missing_sheet_file_fails() {
        let temp_dir = tempdir().unwrap();
        let app = SheetLoaderApp::new(write_job(temp_dir.path()));
        std::fs::remove_file(temp_dir.path().join("sheet.json")).unwrap();

        let result = app
            .run_command(Commands::Sync {
                debug: false,
                insert: true,
                recreate: false,
            })
            .await;
        assert!(result.is_err());
    }
}
