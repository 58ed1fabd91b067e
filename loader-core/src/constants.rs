/// 服务端数据库(MySQL/MariaDB)默认连接参数
pub mod server {
    /// 默认主机
    pub const DEFAULT_HOST: &str = "localhost";

    /// 默认端口
    pub const DEFAULT_PORT: u16 = 3306;

    /// 基础配置的默认库名
    pub const DEFAULT_DB: &str = "db_name";

    /// 默认用户
    pub const DEFAULT_USER: &str = "db_user";

    /// 默认密码
    pub const DEFAULT_PASS: &str = "db_pass";

    /// 单条预处理语句允许的占位符上限
    pub const MAX_BIND_PARAMS: usize = 65_535;
}

/// 预设连接配置(profile)
pub mod profile {
    /// 在线业务库
    pub const ONLINE_DB: &str = "bh_learning_db";

    /// 分析库
    pub const ANALYTICS_DB: &str = "MB_analytics_db";
}

/// 嵌入式数据库相关常量
pub mod embedded {
    /// 类型转换表：按顺序匹配，命中第一条即停止
    ///
    /// 前两条按子串匹配，`TIMESTAMP` 需要整体相等
    pub const TYPE_RULES: &[(&str, &str, bool)] = &[
        ("int", "INTEGER", false),
        ("varchar", "TEXT", false),
        ("timestamp", "DATETIME", true),
    ];
}

/// 配置文件相关常量
pub mod config {
    /// 按优先级查找的配置文件名
    pub const CONFIG_FILE_CANDIDATES: &[&str] =
        &["config.toml", "sheet-loader.toml", ".sheet-loader.toml"];
}

/// 同步任务相关常量
pub mod sync {
    /// 自动追加的记录创建时间列
    pub const CREATED_COLUMN: &str = "created";

    /// 创建时间格式
    pub const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}

/// Google Sheets API
pub mod sheets {
    /// values 接口地址
    pub const VALUES_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
}
