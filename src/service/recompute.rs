use crate::config::AllocationConfig;
use crate::models::{
    AllocationOutcome, AllocationSummary, ItemAllocation, JournalPreview, LandedCostCharge,
    LandedCostItem, LandedCostVoucher, TagTable,
};
use crate::service::allocator::{normalize_scale, round_half_up, Allocator};
use crate::service::selector::select_by_tag;
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use rayon::prelude::*;

/// 到岸成本重算 (纯计算，不访问数据库)
#[derive(Debug, Clone)]
pub struct LandedCostCalculator {
    allocator: Allocator,
    tag_marker: String,
}

/// 一次重算的输入: 凭证 + 预先解析好的标签表
#[derive(Debug, Clone, Copy)]
pub struct RecomputeInput<'a> {
    pub voucher: &'a LandedCostVoucher,
    pub tags: &'a TagTable,
}

impl LandedCostCalculator {
    pub fn new(allocator: Allocator, tag_marker: impl Into<String>) -> Self {
        Self {
            allocator,
            tag_marker: tag_marker.into(),
        }
    }

    pub fn from_config(config: &AllocationConfig) -> Self {
        Self::new(Allocator::new(config.scale), config.tag_marker.clone())
    }

    /// 定向费用返回其标签
    pub fn charge_tag<'c>(&self, charge: &'c LandedCostCharge) -> Option<&'c str> {
        charge.tag_for_marker(&self.tag_marker)
    }

    pub fn needs_tags(&self, voucher: &LandedCostVoucher) -> bool {
        voucher.charges.iter().any(|c| self.charge_tag(c).is_some())
    }

    /// 重算整张凭证: 先清零，再按单据顺序逐条累加各费用的分摊额
    pub fn recompute(&self, voucher: &LandedCostVoucher, tags: &TagTable) -> AllocationOutcome {
        let mut totals: IndexMap<&str, BigDecimal> = voucher
            .items
            .iter()
            .map(|i| (i.id.as_str(), BigDecimal::zero()))
            .collect();
        let codes: IndexMap<&str, &str> = voucher
            .items
            .iter()
            .map(|i| (i.id.as_str(), i.item_code.as_str()))
            .collect();
        let mut trace: Vec<String> = Vec::new();

        for charge in &voucher.charges {
            let Some(amount) = charge.amount.as_ref().filter(|a| **a > BigDecimal::zero()) else {
                trace.push(format!("Skipped charge {}: no positive amount", charge_label(charge)));
                continue;
            };

            let (kind, shares) = match self.charge_tag(charge) {
                Some(tag) => {
                    trace.push("=== TAGGED CHARGE ===".to_string());
                    trace.push(format!("Tag: {tag}"));
                    trace.push(format!("Amount: {amount}"));
                    trace.push(format!("Account: {}", account_label(charge)));

                    let subset = select_by_tag(&voucher.items, tags, tag);
                    for item in &subset {
                        trace.push(format!("Matched item: {}", item.item_code));
                    }
                    if subset.is_empty() {
                        tracing::warn!(
                            "Voucher {}: charge {} tag {} matches no item, skipping",
                            voucher_label(voucher), charge_label(charge), tag
                        );
                        trace.push(format!("No item found for tag {tag}"));
                        continue;
                    }
                    ("Tagged", self.allocator.allocate(amount, &subset, voucher.basis))
                }
                None => {
                    trace.push("=== STANDARD CHARGE ===".to_string());
                    trace.push(format!("Amount: {amount}"));
                    trace.push(format!("Account: {}", account_label(charge)));

                    let all: Vec<&LandedCostItem> = voucher.items.iter().collect();
                    ("Standard", self.allocator.allocate(amount, &all, voucher.basis))
                }
            };

            if shares.is_empty() {
                trace.push("Distribution base is zero, charge not allocated".to_string());
                continue;
            }

            for (id, share) in shares {
                let code = codes.get(id.as_str()).copied().unwrap_or(id.as_str());
                trace.push(format!("{kind} share for {code}: {share}"));
                if let Some(total) = totals.get_mut(id.as_str()) {
                    *total += share;
                }
            }
        }

        for line in &trace {
            tracing::debug!("[Landed-Cost] {}", line);
        }

        let outcome = self.build_outcome(voucher, totals, trace);
        tracing::info!(
            "[Landed-Cost] Voucher {}: 重算完成 - 初始价值: {}, 费用合计: {}, 最终价值: {}",
            voucher_label(voucher),
            outcome.summary.initial_value,
            outcome.summary.total_charges,
            outcome.summary.final_value
        );
        outcome
    }

    /// 批量重算: 单据之间互不依赖，可以并行；单据内部仍按顺序处理
    pub fn recompute_batch(&self, inputs: &[RecomputeInput<'_>]) -> Vec<AllocationOutcome> {
        inputs
            .par_iter()
            .map(|input| self.recompute(input.voucher, input.tags))
            .collect()
    }

    fn build_outcome(
        &self,
        voucher: &LandedCostVoucher,
        totals: IndexMap<&str, BigDecimal>,
        trace: Vec<String>,
    ) -> AllocationOutcome {
        let mut initial_value = BigDecimal::zero();
        let mut total_charges = BigDecimal::zero();
        let mut items = Vec::with_capacity(voucher.items.len());

        let scale = self.allocator.scale();
        for item in &voucher.items {
            let charges = totals
                .get(item.id.as_str())
                .cloned()
                .unwrap_or_else(BigDecimal::zero);
            initial_value += &item.amount;
            total_charges += &charges;
            // 明细金额统一到币种精度 (输入精度更高时保留，数值不变)
            items.push(ItemAllocation {
                id: item.id.clone(),
                item_code: item.item_code.clone(),
                amount: normalize_scale(&item.amount, scale),
                final_value: normalize_scale(&(&item.amount + &charges), scale),
                applicable_charges: normalize_scale(&charges, scale),
            });
        }

        let final_value = &initial_value + &total_charges;
        let summary = AllocationSummary {
            initial_value: round_half_up(&initial_value, scale),
            total_charges: round_half_up(&total_charges, scale),
            final_value: round_half_up(&final_value, scale),
        };

        AllocationOutcome {
            voucher: voucher.name.clone(),
            basis: voucher.basis,
            items,
            journal: JournalPreview::from(&summary),
            summary,
            trace,
        }
    }
}

impl Default for LandedCostCalculator {
    fn default() -> Self {
        Self::from_config(&AllocationConfig::default())
    }
}

fn charge_label(charge: &LandedCostCharge) -> &str {
    if charge.id.is_empty() {
        "<unnamed>"
    } else {
        &charge.id
    }
}

fn account_label(charge: &LandedCostCharge) -> &str {
    charge.expense_account.as_deref().unwrap_or("unspecified")
}

fn voucher_label(voucher: &LandedCostVoucher) -> &str {
    voucher.name.as_deref().unwrap_or("<inline>")
}
