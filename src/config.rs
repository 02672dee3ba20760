use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 默认配置文件 (可选)
pub const DEFAULT_CONFIG_FILE: &str = "config/landed_cost";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub allocation: AllocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// 等待空闲连接的上限 (秒)
    pub acquire_timeout_secs: u32,
    /// 超过该耗时 (毫秒) 的语句以 warn 级别记录，0 表示关闭
    pub slow_statement_ms: u32,
}

/// 分摊参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// 费用账户中标识定向 (NGP) 费用的子串，不区分大小写
    pub tag_marker: String,
    /// 份额四舍五入的小数位
    pub scale: i64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            tag_marker: "ngp".to_string(),
            scale: 2,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/landed_cost".to_string(),
                max_connections: 20,
                acquire_timeout_secs: 10,
                slow_statement_ms: 2000,
            },
            allocation: AllocationConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    ///
    /// 优先级: 环境变量 (`APP__SERVER__PORT` 等、`DATABASE_URL`) > 配置文件 > 默认值。
    /// 配置文件路径可由 `LANDED_COST_CONFIG` 指定。
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("LANDED_COST_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load(&path)
    }

    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("database.acquire_timeout_secs", i64::from(defaults.database.acquire_timeout_secs))?
            .set_default("database.slow_statement_ms", i64::from(defaults.database.slow_statement_ms))?
            .set_default("allocation.tag_marker", defaults.allocation.tag_marker)?
            .set_default("allocation.scale", defaults.allocation.scale)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
    }
}
