pub mod handlers;

pub use handlers::*;

use crate::service::{LandedCostCalculator, LandedCostService};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// 不依赖数据库的路由: 健康检查、请求内重算、拜访周期
pub fn stateless_routes(calculator: Arc<LandedCostCalculator>) -> Router {
    let recompute_routes = Router::new()
        .route("/api/landed-cost/recompute", post(recompute))
        .route("/api/landed-cost/recompute/csv", post(recompute_csv))
        .route("/api/landed-cost/recompute/batch", post(recompute_batch))
        .with_state(calculator);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/visit-target/period", post(derive_visit_period))
        .route("/api/visit-target/rows/validate", post(validate_target_rows))
        .route("/api/visit-target/visits", post(record_visit))
        .merge(recompute_routes)
}

/// 依赖数据库的路由
pub fn voucher_routes(service: Arc<LandedCostService>) -> Router {
    Router::new()
        .route("/api/landed-cost/vouchers/recompute", post(recompute_vouchers))
        .with_state(service)
}
