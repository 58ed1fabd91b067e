use super::bulk::{LoadSummary, insert_with_fallback};
use super::client::DatabaseClient;
use super::statement::{check_row_width, server_insert_sql};
use super::value::{InsertOutcome, Row, Value};
use crate::connection::ConnectionConfig;
use crate::constants::server::MAX_BIND_PARAMS;
use crate::error::Result;
use crate::schema::{TableSpec, generate_create_table_sql};
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::query_builder::Separated;
use sqlx::{Column, Connection, QueryBuilder, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};

/// 服务端数据库(MySQL/MariaDB)客户端
///
/// 不持有连接：每个访问数据库的方法都会新建一条连接，成功后关闭。
#[derive(Debug, Clone)]
pub struct MariaDb {
    config: ConnectionConfig,
}

impl MariaDb {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// 给表名加上库名前缀：`orders` -> `shop.orders`
    pub fn with_scheme(&self, table: &str) -> String {
        format!("{}.{}", self.config.db, table)
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        let options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.pass)
            .database(&self.config.db);
        let conn = MySqlConnection::connect_with(&options).await?;
        debug!(
            "连接数据库成功: {}:{}/{}",
            self.config.host, self.config.port, self.config.db
        );
        Ok(conn)
    }

    /// 批量插入，失败时切换为逐行插入
    ///
    /// 逐行插入遇到第一条失败的行就停止，错误只写日志不向外抛出。
    /// 返回的字符串是给人看的结果摘要。
    pub async fn insert_many_iferr_switch_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> String {
        self.insert_many_with_fallback(table, columns, rows)
            .await
            .to_string()
    }

    /// 与 [`Self::insert_many_iferr_switch_insert`] 相同，返回结构化结果
    pub async fn insert_many_with_fallback(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> LoadSummary {
        insert_with_fallback(self, table, columns, rows).await
    }
}

impl DatabaseClient for MariaDb {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    fn qualify(&self, table: &str) -> String {
        self.with_scheme(table)
    }

    fn create_table_sql(&self, table: &TableSpec) -> String {
        generate_create_table_sql(table)
    }

    fn truncate_table_sql(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.with_scheme(table))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let mut conn = self.connect().await?;
        // 不带参数的语句走文本协议，DDL 也能执行
        let result = sqlx::raw_sql(sql).execute(&mut conn).await?;
        conn.close().await?;
        Ok(result.rows_affected())
    }

    async fn fetch_one(&self, sql: &str) -> Result<Option<Row>> {
        let mut conn = self.connect().await?;
        let row = sqlx::query(sql).fetch_optional(&mut conn).await?;
        conn.close().await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(sql).fetch_all(&mut conn).await?;
        conn.close().await?;
        rows.iter().map(decode_row).collect()
    }

    async fn insert(&self, table: &str, columns: &[String], values: &[Value]) -> Result<InsertOutcome> {
        check_row_width(columns, values)?;
        let sql = server_insert_sql(&self.with_scheme(table), columns);

        let mut conn = self.connect().await?;
        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }
        let result = query.execute(&mut conn).await?;
        conn.close().await?;

        Ok(InsertOutcome::from_parts(
            result.rows_affected(),
            result.last_insert_id(),
        ))
    }

    /// 多行插入：`INSERT INTO db.t (c1, c2) VALUES (?, ?), (?, ?)`
    ///
    /// 行数多时按占位符上限分成几条语句，在同一条连接的同一个事务里执行。
    async fn insert_many(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> Result<u64> {
        if rows.is_empty() {
            info!("没有需要插入的数据: {}", table);
            return Ok(0);
        }
        for row in rows {
            check_row_width(columns, row)?;
        }

        let qualified = self.with_scheme(table);
        let chunk_size = rows_per_statement(columns.len());

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;
        let mut affected = 0;
        for chunk in rows.chunks(chunk_size) {
            let mut builder = bulk_insert_builder(&qualified, columns, chunk);
            debug!("批量插入 {} 行: {}", chunk.len(), qualified);
            affected += builder.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        conn.close().await?;
        Ok(affected)
    }
}

/// 一条多行 INSERT 最多容纳的行数
fn rows_per_statement(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns.max(1)).max(1)
}

fn bulk_insert_builder(
    qualified: &str,
    columns: &[String],
    rows: &[Vec<Value>],
) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        qualified,
        columns.join(", ")
    ));
    builder.push_values(rows, |mut separated, row| {
        for value in row {
            push_bind_value(&mut separated, value);
        }
    });
    builder
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(v) => query.bind(*v),
        Value::Real(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Blob(v) => query.bind(v.clone()),
    }
}

fn push_bind_value(separated: &mut Separated<'_, '_, MySql, &'static str>, value: &Value) {
    match value {
        Value::Null => separated.push_bind(None::<String>),
        Value::Integer(v) => separated.push_bind(*v),
        Value::Real(v) => separated.push_bind(*v),
        Value::Text(v) => separated.push_bind(v.clone()),
        Value::Blob(v) => separated.push_bind(v.clone()),
    };
}

/// 把一行结果转成列名到值的映射
fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut record = Row::new();
    for column in row.columns() {
        let value = decode_cell(row, column.ordinal(), column.type_info().name())?;
        record.push(column.name(), value);
    }
    Ok(record)
}

fn decode_cell(row: &MySqlRow, idx: usize, type_name: &str) -> Result<Value> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Integer(row.try_get_unchecked::<i64, _>(idx)?)
        }
        name if name.ends_with(" UNSIGNED") => {
            let v = row.try_get_unchecked::<u64, _>(idx)?;
            match i64::try_from(v) {
                Ok(v) => Value::Integer(v),
                Err(_) => Value::Text(v.to_string()),
            }
        }
        "FLOAT" | "DOUBLE" => Value::Real(row.try_get_unchecked::<f64, _>(idx)?),
        "DATETIME" | "TIMESTAMP" => {
            let v = row.try_get::<chrono::NaiveDateTime, _>(idx)?;
            Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        "DATE" => Value::Text(row.try_get::<chrono::NaiveDate, _>(idx)?.to_string()),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?)
        }
        _ => match row.try_get_unchecked::<String, _>(idx) {
            Ok(v) => Value::Text(v),
            Err(_) => Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        },
    };
    Ok(value)
}
