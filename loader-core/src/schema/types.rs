use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};

/// 表列定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    /// 后端相关的类型写法，例如 `int(11)`、`varchar(255)`
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub allow_null: bool,
    #[serde(default)]
    pub default: Option<String>,
    /// 原样追加到列定义末尾的 DDL 片段，例如 `AUTO_INCREMENT`
    #[serde(default)]
    pub option: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, allow_null: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            allow_null,
            default: None,
            option: None,
            comment: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.option = Some(option.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// 表定义
///
/// 由调用方构造，生成 DDL 和写入数据时只读使用。
/// `comment`/`engine` 只对服务端有效，`db_file` 只对嵌入式数据库有效。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub primary_key: Option<String>,
    /// 每个列名生成一个单列索引
    #[serde(default)]
    pub index: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub db_file: Option<String>,
    /// 写入数据时跳过的列(自增主键等)
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: None,
            index: Vec::new(),
            comment: None,
            engine: None,
            db_file: None,
            ignore: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn with_index(mut self, column: impl Into<String>) -> Self {
        self.index.push(column.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn with_db_file(mut self, db_file: impl Into<String>) -> Self {
        self.db_file = Some(db_file.into());
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// 检查表定义是否满足基本约束
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LoaderError::invalid_table("表名为空"));
        }
        if self.columns.is_empty() {
            return Err(LoaderError::invalid_table(format!(
                "表 {} 没有任何列定义",
                self.name
            )));
        }
        if let Some(pk) = &self.primary_key {
            if !self.has_column(pk) {
                return Err(LoaderError::invalid_table(format!(
                    "主键 {pk} 不在表 {} 的列定义中",
                    self.name
                )));
            }
        }
        for column in &self.index {
            if !self.has_column(column) {
                return Err(LoaderError::invalid_table(format!(
                    "索引列 {column} 不在表 {} 的列定义中",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// 写入数据时使用的列：全部列去掉 `ignore` 中的列
    pub fn insert_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !self.ignore.contains(&c.name))
            .map(|c| c.name.clone())
            .collect()
    }
}
