use crate::db::queries;
use crate::models::{AllocationOutcome, VoucherError};
use crate::service::recompute::LandedCostCalculator;
use crate::service::tag_cache::{TagCache, TagResolution};
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("voucher {0} not found")]
    VoucherNotFound(String),
    #[error(transparent)]
    InvalidVoucher(#[from] VoucherError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("voucher {voucher}: tag lookup failed for {codes:?}, charges not saved")]
    UnresolvedTags { voucher: String, codes: Vec<String> },
}

/// 批量重算中途失败: 携带失败前已完成 (及已回写) 的凭证名
#[derive(Debug, thiserror::Error)]
#[error("{source} (completed before failure: {completed:?})")]
pub struct BatchFailure {
    pub completed: Vec<String>,
    #[source]
    pub source: ServiceError,
}

/// 有物料标签未能解析时不允许回写，避免把错误的分摊结果落库
pub fn ensure_persistable(voucher: &str, resolution: &TagResolution) -> Result<(), ServiceError> {
    if resolution.is_complete() {
        return Ok(());
    }
    Err(ServiceError::UnresolvedTags {
        voucher: voucher.to_string(),
        codes: resolution.unresolved.clone(),
    })
}

/// 基于数据库的到岸成本服务: 读取凭证 -> 解析标签 -> 重算 -> (可选) 回写
pub struct LandedCostService {
    pool: PgPool,
    tags: TagCache,
    calculator: LandedCostCalculator,
}

impl LandedCostService {
    pub fn new(pool: PgPool, calculator: LandedCostCalculator) -> Self {
        Self {
            tags: TagCache::new(pool.clone()),
            pool,
            calculator,
        }
    }

    /// 批量重算入口，任一凭证失败即停止；已完成的凭证名随错误一起返回
    pub async fn recompute_vouchers(
        &self,
        names: &[String],
        persist: bool,
    ) -> Result<Vec<AllocationOutcome>, BatchFailure> {
        let mut outcomes = Vec::with_capacity(names.len());

        for (idx, name) in names.iter().enumerate() {
            match self.recompute_voucher(name, persist).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!("Voucher {} recompute failed: {}", name, e);
                    return Err(BatchFailure {
                        completed: names[..idx].to_vec(),
                        source: e,
                    });
                }
            }

            let remaining = names.len() - idx - 1;
            if remaining > 0 && (idx + 1) % 50 == 0 {
                tracing::info!("凭证进度: {}/{}, 标签缓存: {}", idx + 1, names.len(), self.tags.len());
            }
        }

        Ok(outcomes)
    }

    async fn recompute_voucher(
        &self,
        name: &str,
        persist: bool,
    ) -> Result<AllocationOutcome, ServiceError> {
        let Some(voucher) = queries::load_voucher(&self.pool, name).await? else {
            return Err(ServiceError::VoucherNotFound(name.to_string()));
        };
        voucher.validate()?;

        tracing::info!(
            "[Landed-Cost] Voucher {}: {} 条明细, {} 条费用",
            name, voucher.items.len(), voucher.charges.len()
        );

        // 只有存在定向费用时才需要查询标签
        let resolution = if self.calculator.needs_tags(&voucher) {
            self.tags.resolve_all(&voucher.item_codes()).await
        } else {
            TagResolution::default()
        };

        let mut outcome = self.calculator.recompute(&voucher, &resolution.tags);
        for code in &resolution.unresolved {
            outcome.trace.push(format!("Tag lookup failed for {code}, treated as untagged"));
        }

        if persist {
            ensure_persistable(name, &resolution)?;
            let updated = queries::save_applicable_charges(&self.pool, &outcome.items).await?;
            tracing::info!("[Landed-Cost] Voucher {}: 回写 {} 条明细", name, updated);
        }

        Ok(outcome)
    }
}
