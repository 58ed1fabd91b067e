use super::client::DatabaseClient;
use super::statement::{check_row_width, embedded_insert_sql};
use super::value::{InsertOutcome, Row, Table, Value};
use crate::error::{LoaderError, Result};
use crate::schema::{TableSpec, generate_embedded_create_table_sql};
use rusqlite::{Connection, params_from_iter};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// 嵌入式文件数据库(SQLite)客户端
///
/// 每次操作都重新打开数据库文件，操作结束后关闭。
/// 单文件单命名空间，表名不加库名前缀。
#[derive(Debug, Clone)]
pub struct SqliteDb {
    db_path: PathBuf,
}

impl SqliteDb {
    /// `exec_dir` 不为空时，`db_file` 按相对于该目录的路径解析
    pub fn new<P: AsRef<Path>>(db_file: P, exec_dir: Option<&Path>) -> Self {
        let db_path = match exec_dir {
            Some(dir) => dir.join(db_file),
            None => db_file.as_ref().to_path_buf(),
        };
        Self { db_path }
    }

    /// 使用表定义中的 `db_file` 创建客户端
    pub fn from_table(table: &TableSpec, exec_dir: Option<&Path>) -> Result<Self> {
        let db_file = table.db_file.as_deref().ok_or_else(|| {
            LoaderError::invalid_table(format!("表 {} 缺少 db_file 配置", table.name))
        })?;
        Ok(Self::new(db_file, exec_dir))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        debug!("打开数据库文件: {}", self.db_path.display());
        Ok(conn)
    }

    fn query_rows(&self, sql: &str, limit: Option<usize>) -> Result<Vec<Row>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, name) in names.iter().enumerate() {
                record.push(name.as_str(), Value::from(row.get_ref(idx)?));
            }
            result.push(record);
            if limit.is_some_and(|n| result.len() >= n) {
                break;
            }
        }
        Ok(result)
    }

    // 结果为空时也保留列名
    fn query_table(&self, sql: &str) -> Result<Table> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query([])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let record = (0..width)
                .map(|idx| row.get_ref(idx).map(Value::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            values.push(record);
        }
        Ok(Table {
            columns,
            rows: values,
        })
    }

    fn load_batch(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<u64> {
        let sql = embedded_insert_sql(table, columns);
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                check_row_width(columns, row)?;
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(rows.len() as u64)
    }
}

/// 表的主键是否为单列 `INTEGER PRIMARY KEY`(即 rowid 的别名)
fn has_rowid_key(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT type, pk FROM pragma_table_info(?1)")?;
    let keys = stmt
        .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter(|(_, pk)| *pk > 0)
        .collect::<Vec<_>>();
    Ok(matches!(keys.as_slice(), [(ty, _)] if ty.eq_ignore_ascii_case("INTEGER")))
}

impl DatabaseClient for SqliteDb {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn qualify(&self, table: &str) -> String {
        table.to_string()
    }

    fn create_table_sql(&self, table: &TableSpec) -> String {
        generate_embedded_create_table_sql(table)
    }

    // SQLite 没有 TRUNCATE
    fn truncate_table_sql(&self, table: &str) -> String {
        format!("DELETE FROM {table}")
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let conn = self.connect()?;
        let affected = conn.execute(sql, [])?;
        Ok(affected as u64)
    }

    async fn fetch_one(&self, sql: &str) -> Result<Option<Row>> {
        Ok(self.query_rows(sql, Some(1))?.into_iter().next())
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>> {
        self.query_rows(sql, None)
    }

    async fn fetch_table(&self, sql: &str) -> Result<Table> {
        self.query_table(sql)
    }

    async fn insert(&self, table: &str, columns: &[String], values: &[Value]) -> Result<InsertOutcome> {
        check_row_width(columns, values)?;
        let sql = embedded_insert_sql(table, columns);
        let conn = self.connect()?;
        let affected = conn.execute(&sql, params_from_iter(values.iter()))?;
        // 每张表都有隐式 rowid，只有 INTEGER PRIMARY KEY 列时它才是真正的主键
        let last_id = if has_rowid_key(&conn, table)? {
            u64::try_from(conn.last_insert_rowid()).unwrap_or(0)
        } else {
            0
        };
        Ok(InsertOutcome::from_parts(affected as u64, last_id))
    }

    /// 在一个事务里逐行执行插入，最后统一提交
    ///
    /// 任意一行失败时整个批次回滚，并返回 [`LoaderError::BulkLoad`]，
    /// 由调用方决定是否终止整个导入任务。
    async fn insert_many(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<u64> {
        if rows.is_empty() {
            info!("没有需要插入的数据: {}", table);
            return Ok(0);
        }

        match self.load_batch(table, columns, rows) {
            Ok(count) => {
                info!("InsertResults: {}", count);
                Ok(count)
            }
            Err(e) => {
                error!("❌ 批量插入失败 {}: {}", table, e.chain());
                error!("columns: {:?}", columns);
                Err(LoaderError::bulk_load(table, e))
            }
        }
    }
}
