use crate::connection::{ConnectionConfig, ConnectionOverrides, Profile, open_server};
use crate::constants::{config, server};
use crate::db::MariaDb;
use crate::error::{LoaderError, Result};
use crate::schema::TableSpec;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 应用配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务端数据库主机
    #[serde(default = "default_db_host", alias = "DB_HOST")]
    pub db_host: String,
    /// 目标库名，优先于 profile 预设
    #[serde(default, alias = "DB_NAME")]
    pub db_name: Option<String>,
    #[serde(default, alias = "DEBUG_MODE")]
    pub debug_mode: bool,
    /// 为假时只读取数据，不写入数据库
    #[serde(default, alias = "INSERT_MODE")]
    pub insert_mode: bool,
    #[serde(default, alias = "LOG_FILE")]
    pub log_file: Option<String>,
    /// 相对路径(嵌入式数据库文件、日志文件)的基准目录
    #[serde(default)]
    pub exec_dir: Option<PathBuf>,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub profile: Option<Profile>,
    /// 最后一层连接参数覆盖
    #[serde(default)]
    pub database: ConnectionOverrides,
    pub spreadsheet: SpreadsheetConfig,
    pub table: TableSpec,
}

/// 写入目标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// MySQL/MariaDB
    #[default]
    Server,
    /// SQLite 文件
    Embedded,
}

/// 电子表格相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetConfig {
    /// Google 表格 ID
    #[serde(default)]
    pub id: Option<String>,
    /// 工作表名
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// 本地 JSON 数据文件，设置后不访问 Google
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// 表格列到数据库列的对应关系
    pub pair: Vec<ColumnPair>,
}

/// 数据库列 `col` 取表格第 `idx` 列(从 0 开始)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub col: String,
    #[serde(deserialize_with = "deserialize_index")]
    pub idx: usize,
}

fn default_db_host() -> String {
    server::DEFAULT_HOST.to_string()
}

// 旧配置里 idx 可能写成字符串
fn deserialize_index<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Number(usize),
        Text(String),
    }

    match Index::deserialize(deserializer)? {
        Index::Number(n) => Ok(n),
        Index::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl AppConfig {
    /// 智能查找并加载配置文件
    /// 显式给出路径时只加载该文件；否则按优先级查找：
    /// config.toml -> sheet-loader.toml -> .sheet-loader.toml
    pub fn find_and_load_config(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(LoaderError::ConfigNotFound);
            }
            return Self::load_from_file(path);
        }

        for config_file in config::CONFIG_FILE_CANDIDATES {
            if Path::new(config_file).exists() {
                tracing::info!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        Err(LoaderError::ConfigNotFound)
    }

    /// 从指定文件加载配置，格式按扩展名判断(toml/yaml/yml/json)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("toml")
            .to_ascii_lowercase();

        let config: AppConfig = match extension.as_str() {
            "toml" => toml::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            other => return Err(LoaderError::UnsupportedConfigFormat(other.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    /// 检查配置是否完整
    pub fn validate(&self) -> Result<()> {
        self.table.validate()?;
        if self.spreadsheet.pair.is_empty() {
            return Err(LoaderError::custom("spreadsheet.pair 不能为空"));
        }
        // pair 只能写入表中未被 ignore 的列
        let writable = self.table.insert_columns();
        if let Some(pair) = self.spreadsheet.pair.iter().find(|p| !writable.contains(&p.col)) {
            return Err(LoaderError::custom(format!(
                "spreadsheet.pair 中的列 {} 不是表 {} 的可写入列",
                pair.col, self.table.name
            )));
        }
        if self.spreadsheet.file.is_none() && self.spreadsheet.id.is_none() {
            return Err(LoaderError::custom(
                "spreadsheet.id 和 spreadsheet.file 至少需要设置一个",
            ));
        }
        if self.backend == Backend::Embedded && self.table.db_file.is_none() {
            return Err(LoaderError::custom("嵌入式数据库需要设置 table.db_file"));
        }
        Ok(())
    }

    /// 服务端连接参数：基础配置 -> profile -> db_host/db_name -> [database]
    pub fn connection_config(&self) -> ConnectionConfig {
        let profile = self.profile.unwrap_or(Profile::Primary);
        let job = ConnectionOverrides {
            host: Some(self.db_host.clone()),
            db: self.db_name.clone(),
            ..Default::default()
        };
        ConnectionConfig::layered(&[profile.defaults(), job, self.database.clone()])
    }

    /// 相对路径按 `exec_dir` 解析
    pub fn resolve_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        match &self.exec_dir {
            Some(dir) => dir.join(path),
            None => path.as_ref().to_path_buf(),
        }
    }

    /// 日志文件完整路径
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(|f| self.resolve_path(f))
    }

    /// 服务端数据库客户端
    ///
    /// 配置了 `db_name` 或 `[database]` 时按完整连接参数连接，否则使用 profile 预设。
    pub fn server_client(&self) -> MariaDb {
        let explicit = (self.db_name.is_some() || !self.database.is_empty())
            .then(|| self.connection_config());
        open_server(self.profile, &self.db_host, explicit)
            .unwrap_or_else(|| MariaDb::new(self.connection_config()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE_TOML: &str = r#"
db_host = "db.internal"
db_name = "school_db"
insert_mode = true
log_file = "sync.log"
profile = "analytics"

[database]
port = 3366
user = "root"
pass = "root"

[spreadsheet]
id = "sheet-id"
name = "members"
api_key = "KEY"
pair = [
    { col = "name", idx = 1 },
    { col = "email", idx = "2" },
]

[table]
name = "member_t"
primary_key = "id"
engine = "InnoDB"
ignore = ["id"]

[[table.columns]]
name = "id"
type = "int(11)"
allow_null = false
option = "AUTO_INCREMENT"

[[table.columns]]
name = "name"
type = "varchar(64)"
allow_null = true

[[table.columns]]
name = "email"
type = "varchar(255)"
allow_null = true

[[table.columns]]
name = "created"
type = "datetime"
allow_null = true
"#;

    #[test]
    fn test_load_toml() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE_TOML).unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.backend, Backend::Server);
        assert_eq!(config.profile, Some(Profile::Analytics));
        assert_eq!(config.spreadsheet.pair[1].idx, 2);
        assert!(!config.debug_mode);

        let conn = config.connection_config();
        assert_eq!(conn.host, "db.internal");
        assert_eq!(conn.port, 3366);
        assert_eq!(conn.db, "school_db");
        assert_eq!(conn.user, "root");
    }

    #[test]
    fn test_load_yaml_and_json() {
        let config: AppConfig = toml::from_str(SAMPLE_TOML).unwrap();
        let temp_dir = tempdir().unwrap();

        let yaml_path = temp_dir.path().join("config.yaml");
        std::fs::write(&yaml_path, serde_yaml::to_string(&config).unwrap()).unwrap();
        let from_yaml = AppConfig::load_from_file(&yaml_path).unwrap();
        assert_eq!(from_yaml.table, config.table);

        let json_path = temp_dir.path().join("config.json");
        std::fs::write(&json_path, serde_json::to_string(&config).unwrap()).unwrap();
        let from_json = AppConfig::load_from_file(&json_path).unwrap();
        assert_eq!(from_json.spreadsheet.pair, config.spreadsheet.pair);
    }

    #[test]
    fn test_upper_case_keys() {
        let content = r#"{
            "DB_HOST": "10.0.0.8",
            "DB_NAME": "legacy_db",
            "DEBUG_MODE": true,
            "INSERT_MODE": true,
            "LOG_FILE": "legacy.log",
            "spreadsheet": {"id": "sheet-id", "name": "members", "pair": [{"col": "name", "idx": "1"}]},
            "table": {"name": "member_t", "columns": [{"name": "name", "type": "varchar(64)"}]}
        }"#;
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, content).unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.db_host, "10.0.0.8");
        assert_eq!(config.db_name.as_deref(), Some("legacy_db"));
        assert!(config.debug_mode);
        assert!(config.insert_mode);
        assert_eq!(config.log_file.as_deref(), Some("legacy.log"));
    }

    #[test]
    fn test_unknown_extension() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            AppConfig::load_from_file(&path),
            Err(LoaderError::UnsupportedConfigFormat(_))
        ));
    }

    #[test]
    fn test_missing_explicit_config() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nope.toml");
        assert!(matches!(
            AppConfig::find_and_load_config(Some(&path)),
            Err(LoaderError::ConfigNotFound)
        ));
    }

    #[test]
    fn test_server_client() {
        let mut config: AppConfig = toml::from_str(SAMPLE_TOML).unwrap();
        let db = config.server_client();
        assert_eq!(db.config(), &config.connection_config());
        assert_eq!(db.with_scheme("member_t"), "school_db.member_t");

        config.db_name = None;
        config.database = ConnectionOverrides::default();
        let db = config.server_client();
        assert_eq!(db.config().host, "db.internal");
        assert_eq!(db.config().db, "MB_analytics_db");

        config.profile = None;
        assert_eq!(config.server_client().config().db, "db_name");
    }

    #[test]
    fn test_pair_must_target_writable_column() {
        let mut config: AppConfig = toml::from_str(SAMPLE_TOML).unwrap();
        assert!(config.validate().is_ok());

        // id 在 ignore 中
        config.spreadsheet.pair.push(ColumnPair {
            col: "id".to_string(),
            idx: 0,
        });
        assert!(config.validate().is_err());

        config.spreadsheet.pair.pop();
        config.spreadsheet.pair.push(ColumnPair {
            col: "nickname".to_string(),
            idx: 3,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embedded_requires_db_file() {
        let mut config: AppConfig = toml::from_str(SAMPLE_TOML).unwrap();
        config.backend = Backend::Embedded;
        assert!(config.validate().is_err());

        config.table.db_file = Some("member.db".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_path() {
        let mut config: AppConfig = toml::from_str(SAMPLE_TOML).unwrap();
        assert_eq!(config.log_file_path(), Some(PathBuf::from("sync.log")));

        config.exec_dir = Some(PathBuf::from("/opt/job"));
        assert_eq!(config.log_file_path(), Some(PathBuf::from("/opt/job/sync.log")));
    }
}
