use crate::constants::{profile, server};
use crate::db::MariaDb;
use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// 服务端数据库连接参数
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub pass: String,
}

// 避免把密码打进日志
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("user", &self.user)
            .field("pass", &"***")
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
            db: server::DEFAULT_DB.to_string(),
            user: server::DEFAULT_USER.to_string(),
            pass: server::DEFAULT_PASS.to_string(),
        }
    }
}

/// 一层连接参数覆盖，未设置的字段保持下层的值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOverrides {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub db: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
}

impl ConnectionOverrides {
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl ConnectionConfig {
    /// 在当前配置上应用一层覆盖
    pub fn apply(&mut self, layer: &ConnectionOverrides) {
        if let Some(host) = &layer.host {
            self.host = host.clone();
        }
        if let Some(port) = layer.port {
            self.port = port;
        }
        if let Some(db) = &layer.db {
            self.db = db.clone();
        }
        if let Some(user) = &layer.user {
            self.user = user.clone();
        }
        if let Some(pass) = &layer.pass {
            self.pass = pass.clone();
        }
    }

    /// 从服务端基础配置出发，按顺序应用各层覆盖
    pub fn layered(layers: &[ConnectionOverrides]) -> Self {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer);
        }
        config
    }

    /// 基础配置 -> 预设 profile -> 调用方覆盖
    pub fn for_profile(profile: Profile, overrides: &ConnectionOverrides) -> Self {
        Self::layered(&[profile.defaults(), overrides.clone()])
    }
}

/// 预设的服务端数据库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// 基干库，直接使用基础配置
    #[serde(alias = "core")]
    Primary,
    /// 在线业务库
    Online,
    /// 分析库
    Analytics,
}

impl Profile {
    /// 该 profile 在基础配置之上的覆盖
    pub fn defaults(&self) -> ConnectionOverrides {
        match self {
            Profile::Primary => ConnectionOverrides::default(),
            Profile::Online => ConnectionOverrides {
                db: Some(profile::ONLINE_DB.to_string()),
                ..Default::default()
            },
            Profile::Analytics => ConnectionOverrides {
                db: Some(profile::ANALYTICS_DB.to_string()),
                ..Default::default()
            },
        }
    }
}

impl FromStr for Profile {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "primary" | "core" => Ok(Profile::Primary),
            "online" => Ok(Profile::Online),
            "analytics" => Ok(Profile::Analytics),
            other => Err(LoaderError::custom(format!("未知的数据库 profile: {other}"))),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Profile::Primary => "primary",
            Profile::Online => "online",
            Profile::Analytics => "analytics",
        };
        write!(f, "{name}")
    }
}

/// 选择服务端数据库
///
/// 优先使用完整的显式连接配置；否则按 profile 取预设值，并把主机设为 `host`。
/// 两者都没有时返回 `None`。
pub fn open_server(
    profile: Option<Profile>,
    host: &str,
    explicit: Option<ConnectionConfig>,
) -> Option<MariaDb> {
    if let Some(config) = explicit {
        debug!("使用显式连接配置: {:?}", config);
        return Some(MariaDb::new(config));
    }
    let profile = profile?;
    let config = ConnectionConfig::for_profile(profile, &ConnectionOverrides::host(host));
    debug!("使用预设 profile {}: {:?}", profile, config);
    Some(MariaDb::new(config))
}
