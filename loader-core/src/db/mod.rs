// 数据库访问模块
//
// 两种后端共用 DatabaseClient 接口：
// - MariaDb: 服务端数据库(MySQL/MariaDB)，每次调用新建网络连接
// - SqliteDb: 嵌入式文件数据库，每次调用打开数据库文件
//
// 批量插入失败后切换逐行插入的逻辑在 bulk 模块，对两种后端通用。

pub mod bulk;
mod client;
mod mariadb;
mod sqlite;
mod statement;
mod value;

// 公开核心接口
pub use bulk::{LoadSummary, insert_with_fallback};
pub use client::DatabaseClient;
pub use mariadb::MariaDb;
pub use sqlite::SqliteDb;
pub use statement::{embedded_insert_sql, server_insert_sql};
pub use value::{InsertOutcome, Row, Table, Value};
