use crate::models::DistributionBasis;
use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 单个明细的分摊结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAllocation {
    pub id: String,
    pub item_code: String,
    pub amount: BigDecimal,
    pub applicable_charges: BigDecimal, // 累计分摊费用
    pub final_value: BigDecimal,        // amount + applicable_charges
}

/// 最终核对汇总 (已按币种精度四舍五入)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub initial_value: BigDecimal,
    pub total_charges: BigDecimal,
    pub final_value: BigDecimal,
}

/// 预计会计分录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalPreview {
    pub debit_stock: BigDecimal,
    pub credit_charges: BigDecimal,
    pub credit_initial_stock: BigDecimal,
}

impl From<&AllocationSummary> for JournalPreview {
    fn from(summary: &AllocationSummary) -> Self {
        Self {
            debit_stock: summary.final_value.clone(),
            credit_charges: summary.total_charges.clone(),
            credit_initial_stock: summary.initial_value.clone(),
        }
    }
}

/// 一次重算的完整输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub voucher: Option<String>,
    pub basis: DistributionBasis,
    pub items: Vec<ItemAllocation>,
    pub summary: AllocationSummary,
    pub journal: JournalPreview,
    pub trace: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer error: {0}")]
    Buffer(#[from] std::io::Error),
    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl AllocationOutcome {
    /// 明细行ID -> 累计分摊费用 (按明细顺序)
    pub fn allocations(&self) -> IndexMap<&str, &BigDecimal> {
        self.items
            .iter()
            .map(|i| (i.id.as_str(), &i.applicable_charges))
            .collect()
    }

    pub fn charges_for(&self, item_id: &str) -> Option<&BigDecimal> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .map(|i| &i.applicable_charges)
    }

    /// 导出分摊表
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["id", "item_code", "amount", "applicable_charges", "final_value"])?;
        for item in &self.items {
            writer.write_record([
                item.id.clone(),
                item.item_code.clone(),
                item.amount.to_string(),
                item.applicable_charges.to_string(),
                item.final_value.to_string(),
            ])?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }
}
