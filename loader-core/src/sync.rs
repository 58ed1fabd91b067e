use crate::config::{AppConfig, Backend, ColumnPair};
use crate::constants::sync::{CREATED_COLUMN, CREATED_FORMAT};
use crate::db::{DatabaseClient, LoadSummary, SqliteDb, Value, insert_with_fallback};
use crate::error::Result;
use crate::schema::TableSpec;
use crate::sheet::SheetSource;
use tracing::{debug, info, warn};

/// 同步任务选项，命令行参数会覆盖配置文件
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub insert_mode: bool,
    pub recreate: bool,
}

/// 同步结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// 从表格中读出的记录数(不含表头)
    pub records: usize,
    /// 建表是否成功
    pub table_ready: bool,
    /// 未开启写入时为 `None`
    pub summary: Option<LoadSummary>,
}

/// 按 pair 从表格行中取出各列，跳过第一行表头
///
/// 行比 `idx` 短时(表格末尾的空单元格不会返回)取空字符串。
pub fn extract_records(rows: &[Vec<String>], pairs: &[ColumnPair]) -> Vec<Vec<String>> {
    rows.iter()
        .skip(1)
        .map(|row| {
            pairs
                .iter()
                .map(|pair| row.get(pair.idx).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

/// 写入的列：pair 中的列加上创建时间列
pub fn insert_columns(pairs: &[ColumnPair]) -> Vec<String> {
    let mut columns: Vec<String> = pairs.iter().map(|p| p.col.clone()).collect();
    columns.push(CREATED_COLUMN.to_string());
    columns
}

/// 把记录转成插入参数，每行末尾追加创建时间
pub fn build_insert_rows(records: Vec<Vec<String>>, created: &str) -> Vec<Vec<Value>> {
    records
        .into_iter()
        .map(|record| {
            let mut row: Vec<Value> = record.into_iter().map(Value::Text).collect();
            row.push(Value::from(created));
            row
        })
        .collect()
}

/// 当前时间，格式 `YYYY-MM-DD HH:MM:SS`
pub fn created_now() -> String {
    chrono::Local::now().format(CREATED_FORMAT).to_string()
}

/// 读取表格并写入配置中的目标表
pub async fn run_sync<S: SheetSource>(
    config: &AppConfig,
    source: &S,
    options: SyncOptions,
) -> Result<SyncReport> {
    let rows = source.fetch_rows(&config.spreadsheet.name).await?;
    let records = extract_records(&rows, &config.spreadsheet.pair);
    info!("读取记录: {} 条", records.len());
    debug!("records: {:?}", records);

    let columns = insert_columns(&config.spreadsheet.pair);
    let count = records.len();
    let insert_rows = build_insert_rows(records, &created_now());

    match config.backend {
        Backend::Server => {
            let client = config.server_client();
            info!(
                "写入目标: {}:{}/{}",
                client.config().host,
                client.config().port,
                client.config().db
            );
            load_table(&client, &config.table, &columns, &insert_rows, options, count, true).await
        }
        Backend::Embedded => {
            let client = SqliteDb::from_table(&config.table, config.exec_dir.as_deref())?;
            info!("写入目标: {}", client.db_path().display());
            load_table(&client, &config.table, &columns, &insert_rows, options, count, false).await
        }
    }
}

/// 建表、清空、写入
///
/// `with_fallback` 为真时批量失败会切换逐行插入；否则批量失败直接返回错误。
/// 清空和写入不是原子操作，清空成功而写入失败时表会是空的。
pub async fn load_table<C: DatabaseClient>(
    client: &C,
    table: &TableSpec,
    columns: &[String],
    rows: &[Vec<Value>],
    options: SyncOptions,
    records: usize,
    with_fallback: bool,
) -> Result<SyncReport> {
    let created = client.create_table(table, options.recreate).await;
    info!("Result(create table): {:?}", created);

    if !options.insert_mode {
        info!("Skipped insert data.");
        return Ok(SyncReport {
            records,
            table_ready: created.is_some(),
            summary: None,
        });
    }

    if client.truncate_table(&table.name).await.is_none() {
        warn!("⚠️ 清空表 {} 失败，继续写入", table.name);
    }

    let summary = if with_fallback {
        insert_with_fallback(client, &table.name, columns, rows).await
    } else if rows.is_empty() {
        info!("没有需要插入的数据，跳过: {}", table.name);
        LoadSummary::Empty
    } else {
        LoadSummary::Bulk(client.insert_many(&table.name, columns, rows).await?)
    };
    info!("Insert Results: {}", summary);

    Ok(SyncReport {
        records,
        table_ready: created.is_some(),
        summary: Some(summary),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpreadsheetConfig;
    use crate::connection::ConnectionOverrides;
    use crate::schema::ColumnSpec;
    use crate::sheet::JsonSheet;
    use std::path::Path;
    use tempfile::tempdir;

    fn pairs() -> Vec<ColumnPair> {
        vec![
            ColumnPair {
                col: "name".to_string(),
                idx: 1,
            },
            ColumnPair {
                col: "email".to_string(),
                idx: 2,
            },
        ]
    }

    fn embedded_config(dir: &Path) -> AppConfig {
        let mut table = TableSpec::new(
            "member_t",
            vec![
                ColumnSpec::new("id", "int(11)", false)
                    .with_option("PRIMARY KEY AUTOINCREMENT"),
                ColumnSpec::new("name", "varchar(64)", true),
                ColumnSpec::new("email", "varchar(255)", true),
                ColumnSpec::new("created", "TIMESTAMP", true),
            ],
        )
        .with_db_file("member.db");
        table.ignore = vec!["id".to_string()];

        AppConfig {
            db_host: "localhost".to_string(),
            db_name: None,
            debug_mode: false,
            insert_mode: true,
            log_file: None,
            exec_dir: Some(dir.to_path_buf()),
            backend: Backend::Embedded,
            profile: None,
            database: ConnectionOverrides::default(),
            spreadsheet: SpreadsheetConfig {
                id: None,
                name: "members".to_string(),
                api_key: None,
                file: Some("sheet.json".into()),
                pair: pairs(),
            },
            table,
        }
    }

    fn write_sheet(dir: &Path) {
        std::fs::write(
            dir.join("sheet.json"),
            r#"{"members": [
                ["no", "name", "email"],
                ["1", "Alice", "alice@example.com"],
                ["2", "Bob"]
            ]}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_extract_records_skips_header() {
        let rows = vec![
            vec!["no".to_string(), "name".to_string(), "email".to_string()],
            vec!["1".to_string(), "a".to_string(), "a@x".to_string()],
            vec!["2".to_string()],
        ];
        let records = extract_records(&rows, &pairs());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec!["a", "a@x"]);
        assert_eq!(records[1], vec!["", ""]);
    }

    #[test]
    fn test_insert_rows_append_created() {
        assert_eq!(insert_columns(&pairs()), vec!["name", "email", "created"]);

        let rows = build_insert_rows(vec![vec!["a".to_string(), "b".to_string()]], "2024-01-02 03:04:05");
        assert_eq!(
            rows[0],
            vec![
                Value::from("a"),
                Value::from("b"),
                Value::from("2024-01-02 03:04:05")
            ]
        );
    }

    #[test]
    fn test_created_format() {
        let created = created_now();
        assert!(chrono::NaiveDateTime::parse_from_str(&created, CREATED_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn test_sync_into_embedded() {
        let temp_dir = tempdir().unwrap();
        write_sheet(temp_dir.path());
        let config = embedded_config(temp_dir.path());
        let source = JsonSheet::new(temp_dir.path().join("sheet.json"));
        let options = SyncOptions {
            insert_mode: true,
            recreate: false,
        };

        let report = run_sync(&config, &source, options).await.unwrap();
        assert_eq!(report.records, 2);
        assert!(report.table_ready);
        assert_eq!(report.summary, Some(LoadSummary::Bulk(2)));

        let db = SqliteDb::from_table(&config.table, config.exec_dir.as_deref()).unwrap();
        let rows = db
            .fetch_all("SELECT id, name, email, created FROM member_t ORDER BY id")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&Value::from("Alice")));
        assert_eq!(rows[1].get("email"), Some(&Value::from("")));
        assert_eq!(rows[0].get("id").and_then(Value::as_i64), Some(1));
        let created = rows[0].get("created").and_then(Value::as_str).unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(created, CREATED_FORMAT).is_ok());

        // 再次同步会先清空表，不会重复写入
        run_sync(&config, &source, options).await.unwrap();
        assert_eq!(db.fetch_all("SELECT id FROM member_t").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_without_insert_mode() {
        let temp_dir = tempdir().unwrap();
        write_sheet(temp_dir.path());
        let config = embedded_config(temp_dir.path());
        let source = JsonSheet::new(temp_dir.path().join("sheet.json"));

        let report = run_sync(&config, &source, SyncOptions::default()).await.unwrap();
        assert_eq!(report.records, 2);
        assert!(report.summary.is_none());

        let db = SqliteDb::from_table(&config.table, config.exec_dir.as_deref()).unwrap();
        assert!(db.fetch_all("SELECT id FROM member_t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embedded_bulk_failure_is_fatal() {
        let temp_dir = tempdir().unwrap();
        let db = SqliteDb::new("member.db", Some(temp_dir.path()));
        let table = TableSpec::new("t", vec![ColumnSpec::new("a", "int", true)]);
        let columns = vec!["a".to_string()];
        let rows = vec![vec![Value::from(1)], vec![Value::from(1), Value::from(2)]];
        let options = SyncOptions {
            insert_mode: true,
            recreate: true,
        };

        let err = load_table(&db, &table, &columns, &rows, options, 2, false)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
