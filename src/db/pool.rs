use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// 解析连接串并按配置设置慢语句日志
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let options = PgConnectOptions::from_str(&config.url)?;
    let options = match config.slow_statement_ms {
        0 => options.disable_statement_logging(),
        ms => options.log_slow_statements(
            tracing::log::LevelFilter::Warn,
            Duration::from_millis(u64::from(ms)),
        ),
    };
    Ok(options)
}

pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(u64::from(config.acquire_timeout_secs)))
}

/// 创建凭证库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = connect_options(config)?;
    tracing::debug!(
        "连接池: 最大连接 {}, 获取超时 {}s, 慢语句阈值 {}ms",
        config.max_connections, config.acquire_timeout_secs, config.slow_statement_ms
    );
    pool_options(config).connect_with(options).await
}
