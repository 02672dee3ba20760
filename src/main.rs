use axum::Router;
use landed_cost_allocator::{api, create_pool, AppConfig, LandedCostCalculator, LandedCostService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    // 重算器在两类路由间共享
    let calculator = LandedCostCalculator::from_config(&config.allocation);
    let service = Arc::new(LandedCostService::new(pool, calculator.clone()));

    let app = Router::new()
        .merge(api::stateless_routes(Arc::new(calculator)))
        .merge(api::voucher_routes(service))
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/landed-cost/recompute            - inline voucher");
    info!("  POST /api/landed-cost/recompute/csv        - inline voucher, CSV table");
    info!("  POST /api/landed-cost/recompute/batch      - inline vouchers, parallel");
    info!("  POST /api/landed-cost/vouchers/recompute   - stored vouchers");
    info!("  POST /api/visit-target/period              - visit target period");
    info!("  POST /api/visit-target/rows/validate       - visit target rows check");
    info!("  POST /api/visit-target/visits              - count a submitted visit");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
