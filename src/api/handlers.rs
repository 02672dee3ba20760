use crate::models::{
    validate_rows, AllocationOutcome, LandedCostVoucher, PeriodWindow, TagTable, VisitLog,
    VisitTargetRow,
};
use crate::service::{
    apply_period, record_visit_log, LandedCostCalculator, LandedCostService, RecomputeInput,
    ServiceError,
};
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: 凭证 + 预先解析好的物料标签
#[derive(Debug, Deserialize)]
pub struct RecomputeRequest {
    pub voucher: LandedCostVoucher,
    #[serde(default)]
    pub item_tags: TagTable,
}

/// 请求体: 多张凭证
#[derive(Debug, Deserialize)]
pub struct BatchRecomputeRequest {
    pub requests: Vec<RecomputeRequest>,
}

/// 请求体: 凭证名列表 (从数据库读取)
#[derive(Debug, Deserialize)]
pub struct VoucherRecomputeRequest {
    pub voucher_names: Vec<String>,
    #[serde(default)]
    pub persist: bool,
}

/// 请求体: 拜访目标行 + 可选的基准日期
#[derive(Debug, Deserialize)]
pub struct PeriodRequest {
    #[serde(flatten)]
    pub row: VisitTargetRow,
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// 请求体: 销售员的拜访目标行
#[derive(Debug, Deserialize)]
pub struct TargetRowsRequest {
    pub rows: Vec<VisitTargetRow>,
}

/// 请求体: 拜访目标行 + 一条已提交的拜访记录
#[derive(Debug, Deserialize)]
pub struct VisitRequest {
    pub rows: Vec<VisitTargetRow>,
    pub visit: VisitLog,
}

/// 单张凭证响应体
#[derive(Debug, Serialize)]
pub struct RecomputeResponse {
    pub success: bool,
    pub message: String,
    pub outcome: Option<AllocationOutcome>,
}

/// 批量响应体
#[derive(Debug, Serialize)]
pub struct BatchRecomputeResponse {
    pub success: bool,
    pub message: String,
    pub outcomes: Option<Vec<AllocationOutcome>>,
    /// 失败前已完成的凭证 (persist 时已回写)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed: Vec<String>,
}

/// 周期推导响应体
#[derive(Debug, Serialize)]
pub struct PeriodResponse {
    pub success: bool,
    pub message: String,
    pub row: Option<VisitTargetRow>,
    pub window: Option<PeriodWindow>,
}

/// 拜访目标行响应体
#[derive(Debug, Serialize)]
pub struct TargetRowsResponse {
    pub success: bool,
    pub message: String,
    pub matched_row: Option<usize>, // 行号从 1 开始
    pub rows: Option<Vec<VisitTargetRow>>,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

fn recompute_error(status: StatusCode, message: String) -> Response {
    let response = RecomputeResponse {
        success: false,
        message,
        outcome: None,
    };
    (status, Json(response)).into_response()
}

fn batch_error(status: StatusCode, message: String) -> Response {
    let response = BatchRecomputeResponse {
        success: false,
        message,
        outcomes: None,
        completed: Vec::new(),
    };
    (status, Json(response)).into_response()
}

/// 单张凭证重算 (请求内携带数据)
pub async fn recompute(
    State(calculator): State<Arc<LandedCostCalculator>>,
    Json(req): Json<RecomputeRequest>,
) -> Response {
    if let Err(e) = req.voucher.validate() {
        return recompute_error(StatusCode::UNPROCESSABLE_ENTITY, format!("Error: {}", e));
    }

    let outcome = calculator.recompute(&req.voucher, &req.item_tags);
    let response = RecomputeResponse {
        success: true,
        message: format!(
            "Allocated {} across {} items",
            outcome.summary.total_charges,
            outcome.items.len()
        ),
        outcome: Some(outcome),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 单张凭证重算并导出 CSV 分摊表
pub async fn recompute_csv(
    State(calculator): State<Arc<LandedCostCalculator>>,
    Json(req): Json<RecomputeRequest>,
) -> Response {
    if let Err(e) = req.voucher.validate() {
        return recompute_error(StatusCode::UNPROCESSABLE_ENTITY, format!("Error: {}", e));
    }

    let outcome = calculator.recompute(&req.voucher, &req.item_tags);
    match outcome.to_csv() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => recompute_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)),
    }
}

/// 批量重算 (请求内携带数据)，在阻塞线程池上并行计算
pub async fn recompute_batch(
    State(calculator): State<Arc<LandedCostCalculator>>,
    Json(req): Json<BatchRecomputeRequest>,
) -> Response {
    if let Some(e) = req.requests.iter().find_map(|r| r.voucher.validate().err()) {
        return batch_error(StatusCode::UNPROCESSABLE_ENTITY, format!("Error: {}", e));
    }

    let count = req.requests.len();
    let worker = tokio::task::spawn_blocking(move || {
        let inputs: Vec<RecomputeInput<'_>> = req
            .requests
            .iter()
            .map(|r| RecomputeInput {
                voucher: &r.voucher,
                tags: &r.item_tags,
            })
            .collect();
        calculator.recompute_batch(&inputs)
    });

    match worker.await {
        Ok(outcomes) => {
            let response = BatchRecomputeResponse {
                success: true,
                message: format!("Successfully recomputed {} vouchers", count),
                outcomes: Some(outcomes),
                completed: Vec::new(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => batch_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)),
    }
}

/// 从数据库读取凭证并重算，可选回写
pub async fn recompute_vouchers(
    State(service): State<Arc<LandedCostService>>,
    Json(req): Json<VoucherRecomputeRequest>,
) -> Response {
    match service.recompute_vouchers(&req.voucher_names, req.persist).await {
        Ok(outcomes) => {
            let response = BatchRecomputeResponse {
                success: true,
                message: format!(
                    "Successfully recomputed {} vouchers{}",
                    req.voucher_names.len(),
                    if req.persist { " and saved charges" } else { "" }
                ),
                outcomes: Some(outcomes),
                completed: Vec::new(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(failure) => {
            let status = match failure.source {
                ServiceError::VoucherNotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::InvalidVoucher(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::UnresolvedTags { .. } => StatusCode::SERVICE_UNAVAILABLE,
            };
            let response = BatchRecomputeResponse {
                success: false,
                message: format!("Error: {}", failure),
                outcomes: None,
                completed: failure.completed,
            };
            (status, Json(response)).into_response()
        }
    }
}

/// 拜访目标: 按周期类型推导起止日期
pub async fn derive_visit_period(Json(req): Json<PeriodRequest>) -> Response {
    let today = req
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut row = req.row;

    match apply_period(&mut row, today) {
        Ok(window) => {
            let response = PeriodResponse {
                success: true,
                message: "Period applied".to_string(),
                row: Some(row),
                window: Some(window),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let response = PeriodResponse {
                success: false,
                message: format!("Error: {}", e),
                row: None,
                window: None,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(response)).into_response()
        }
    }
}

fn target_rows_error(message: String) -> Response {
    let response = TargetRowsResponse {
        success: false,
        message,
        matched_row: None,
        rows: None,
    };
    (StatusCode::UNPROCESSABLE_ENTITY, Json(response)).into_response()
}

/// 拜访目标: 保存前的多行校验
pub async fn validate_target_rows(Json(req): Json<TargetRowsRequest>) -> Response {
    match validate_rows(&req.rows) {
        Ok(()) => {
            let response = TargetRowsResponse {
                success: true,
                message: format!("{} rows valid", req.rows.len()),
                matched_row: None,
                rows: Some(req.rows),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => target_rows_error(format!("Error: {}", e)),
    }
}

/// 拜访记录提交: 给第一个匹配的目标行累加完成次数
pub async fn record_visit(Json(req): Json<VisitRequest>) -> Response {
    let mut rows = req.rows;
    match record_visit_log(&mut rows, &req.visit) {
        Ok(matched) => {
            let message = match matched {
                Some(idx) => format!("Visit counted on row #{}", idx + 1),
                None => "No matching Visit Target found".to_string(),
            };
            let response = TargetRowsResponse {
                success: matched.is_some(),
                message,
                matched_row: matched.map(|idx| idx + 1),
                rows: Some(rows),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => target_rows_error(format!("Error: {}", e)),
    }
}
