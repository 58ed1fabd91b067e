use super::client::DatabaseClient;
use super::value::Value;
use std::fmt;
use tracing::{error, info, warn};

/// 批量导入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSummary {
    /// 输入为空，没有执行任何语句
    Empty,
    /// 批量插入成功，值为受影响行数
    Bulk(u64),
    /// 批量插入失败后逐行插入，`inserted` 为成功的行数
    Fallback { inserted: usize, total: usize },
}

impl LoadSummary {
    /// 实际写入的行数
    pub fn inserted(&self) -> u64 {
        match self {
            LoadSummary::Empty => 0,
            LoadSummary::Bulk(n) => *n,
            LoadSummary::Fallback { inserted, .. } => *inserted as u64,
        }
    }
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadSummary::Empty => write!(f, "INSERT skipped: no rows"),
            LoadSummary::Bulk(n) => write!(f, "BULK INSERT Results:{n}"),
            LoadSummary::Fallback { inserted, .. } => write!(f, "INSERT(fallback): {inserted}"),
        }
    }
}

/// 先尝试批量插入，失败后改为逐行插入
///
/// 逐行插入只做一轮，遇到第一条失败的行就停止，失败的行和错误写入日志。
pub async fn insert_with_fallback<C: DatabaseClient>(
    client: &C,
    table: &str,
    columns: &[String],
    rows: &[Vec<Value>],
) -> LoadSummary {
    if rows.is_empty() {
        info!("没有需要插入的数据，跳过: {}", table);
        return LoadSummary::Empty;
    }

    let err = match client.insert_many(table, columns, rows).await {
        Ok(count) => return LoadSummary::Bulk(count),
        Err(e) => e,
    };

    warn!("⚠️ 批量插入失败，切换为逐行插入: {}", err.chain());

    let mut inserted = 0;
    for row in rows {
        match client.insert(table, columns, row).await {
            Ok(_) => inserted += 1,
            Err(e) => {
                error!("❌ 逐行插入失败，停止剩余数据: {}", e.chain());
                error!("columns: {:?}", columns);
                error!("row: {:?}", row);
                break;
            }
        }
    }

    info!("逐行插入完成: {}/{}", inserted, rows.len());
    LoadSummary::Fallback {
        inserted,
        total: rows.len(),
    }
}
