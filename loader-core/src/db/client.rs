use super::statement::drop_table_sql;
use super::value::{InsertOutcome, Row, Table, Value};
use crate::error::Result;
use crate::schema::TableSpec;
use tracing::{error, info};

/// 服务端与嵌入式数据库共用的访问接口
///
/// 每个方法内部自行建立连接，执行完成后释放，实例之间不共享连接。
///
/// 错误处理分两类：
/// - 读操作(`fetch_*`)和数据写入(`insert*`)返回 `Result`，错误交给调用方；
/// - 管理类操作(`create_table`/`drop_table`/`truncate_table`)不向外抛错，
///   失败时记录错误日志和 SQL 语句并返回 `None`。
#[allow(async_fn_in_trait)]
pub trait DatabaseClient {
    /// 后端名称，写日志用
    fn backend(&self) -> &'static str;

    /// 把表名转成执行时使用的名字
    fn qualify(&self, table: &str) -> String;

    /// 生成该后端使用的 CREATE TABLE 语句
    fn create_table_sql(&self, table: &TableSpec) -> String;

    /// 生成清空表数据的语句
    fn truncate_table_sql(&self, table: &str) -> String;

    /// 执行一条语句并提交，返回受影响的行数
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// 返回第一行，没有数据时返回 `None`
    async fn fetch_one(&self, sql: &str) -> Result<Option<Row>>;

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Row>>;

    /// 只取每一行的第一列
    async fn fetch_column(&self, sql: &str) -> Result<Vec<Value>> {
        let rows = self.fetch_all(sql).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_values().into_iter().next())
            .collect())
    }

    /// 以表格形式返回全部结果(列名 + 行)
    async fn fetch_table(&self, sql: &str) -> Result<Table> {
        Ok(Table::from_rows(self.fetch_all(sql).await?))
    }

    /// 单行参数化插入
    async fn insert(&self, table: &str, columns: &[String], values: &[Value])
        -> Result<InsertOutcome>;

    /// 多行参数化插入，空输入不执行任何语句并返回 0
    async fn insert_many(&self, table: &str, columns: &[String], rows: &[Vec<Value>])
        -> Result<u64>;

    /// 建表；`recreate` 为真时先删除旧表
    async fn create_table(&self, table: &TableSpec, recreate: bool) -> Option<u64> {
        if let Err(e) = table.validate() {
            error!("❌ 表定义无效，跳过建表 {}: {}", table.name, e);
            return None;
        }

        if recreate {
            info!("重建表: {}", table.name);
            self.drop_table(&table.name).await;
        }

        let sql = self.create_table_sql(table);
        match self.execute(&sql).await {
            Ok(result) => {
                info!("create table: {} ({})", table.name, self.backend());
                Some(result)
            }
            Err(e) => {
                error!("❌ 建表失败 {}: {}", table.name, e.chain());
                error!("CREATE TABLE SQL: {}", sql);
                None
            }
        }
    }

    /// 删除表，表不存在时不算错误
    async fn drop_table(&self, table: &str) -> Option<u64> {
        let sql = drop_table_sql(table);
        match self.execute(&sql).await {
            Ok(result) => {
                info!("{}", sql);
                Some(result)
            }
            Err(e) => {
                error!("❌ 删除表失败 {}: {}", table, e.chain());
                error!("DROP TABLE SQL: {}", sql);
                None
            }
        }
    }

    async fn truncate_table(&self, table: &str) -> Option<u64> {
        let sql = self.truncate_table_sql(table);
        match self.execute(&sql).await {
            Ok(result) => {
                info!("{}", sql);
                Some(result)
            }
            Err(e) => {
                error!("❌ 清空表失败 {}: {}", table, e.chain());
                error!("TRUNCATE SQL: {}", sql);
                None
            }
        }
    }
}
