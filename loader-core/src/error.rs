use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("TOML 配置解析错误: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML 配置解析错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MySQL 数据库错误: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("SQLite 数据库错误: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("表定义无效: {0}")]
    InvalidTable(String),

    #[error("行数据列数不匹配: 期望 {expected} 列，实际 {actual} 列")]
    RowWidth { expected: usize, actual: usize },

    #[error("批量插入 {table} 失败: {source}")]
    BulkLoad {
        table: String,
        #[source]
        source: Box<LoaderError>,
    },

    #[error("电子表格读取失败: {0}")]
    Sheet(String),

    #[error("配置文件未找到")]
    ConfigNotFound,

    #[error("不支持的配置文件格式: {0}")]
    UnsupportedConfigFormat(String),

    #[error("自定义错误: {0}")]
    Custom(String),
}

impl LoaderError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn invalid_table(msg: impl Into<String>) -> Self {
        Self::InvalidTable(msg.into())
    }

    pub fn sheet(msg: impl Into<String>) -> Self {
        Self::Sheet(msg.into())
    }

    pub fn bulk_load(table: impl Into<String>, source: LoaderError) -> Self {
        Self::BulkLoad {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// 把错误及其 source 链拼成一行，写日志用
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(" <- ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }

    /// 是否为需要终止整个导入任务的错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BulkLoad { .. })
    }
}
