use crate::models::{DistributionBasis, LandedCostItem};
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;

/// 默认币种精度 (小数位)
pub const DEFAULT_SCALE: i64 = 2;

/// 四舍五入到 `scale` 位小数，0.5 远离零进位
pub fn round_half_up(value: &BigDecimal, scale: i64) -> BigDecimal {
    // with_scale 向零截断
    let truncated = value.with_scale(scale);
    let residue = value - &truncated;
    let half = BigDecimal::new(5.into(), scale + 1);
    if residue.abs() < half {
        return truncated;
    }
    let unit = BigDecimal::new(1.into(), scale);
    if residue > BigDecimal::zero() {
        truncated + unit
    } else {
        truncated - unit
    }
}

/// 去掉多余的尾随零，但至少保留 `floor` 位小数 (不改变数值)
pub fn normalize_scale(value: &BigDecimal, floor: i64) -> BigDecimal {
    let (_, mut scale) = value.as_bigint_and_exponent();
    while scale > floor && value.with_scale(scale - 1) == *value {
        scale -= 1;
    }
    value.with_scale(scale.max(floor))
}

/// 比例分摊器
///
/// 除最后一个候选外，每个候选按权重比例分得四舍五入后的份额；
/// 最后一个候选拿走剩余金额，保证份额之和恰好等于费用金额。
#[derive(Debug, Clone, Copy)]
pub struct Allocator {
    scale: i64,
}

impl Allocator {
    pub fn new(scale: i64) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// 返回 明细行ID -> 份额，顺序与候选顺序一致。
    /// 候选为空或分摊基数为零时返回空映射 (不分摊)。
    pub fn allocate(
        &self,
        amount: &BigDecimal,
        candidates: &[&LandedCostItem],
        basis: DistributionBasis,
    ) -> IndexMap<String, BigDecimal> {
        let mut shares = IndexMap::with_capacity(candidates.len());
        let Some((last, rest)) = candidates.split_last() else {
            return shares;
        };

        let base = candidates
            .iter()
            .fold(BigDecimal::zero(), |acc, c| acc + basis.weight(c));
        if base.is_zero() {
            return shares;
        }

        let mut distributed = BigDecimal::zero();
        for item in rest {
            let proportional = amount * basis.weight(item) / &base;
            let share = round_half_up(&proportional, self.scale);
            distributed += &share;
            *shares.entry(item.id.clone()).or_insert_with(BigDecimal::zero) += share;
        }

        // 最后一个候选吸收全部舍入误差
        let remainder = amount - &distributed;
        *shares.entry(last.id.clone()).or_insert_with(BigDecimal::zero) += remainder;

        shares
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}
