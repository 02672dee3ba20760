use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};

/// 物料编码 -> 标签 (NGP 编码)，重算前必须全部解析完毕
pub type TagTable = HashMap<String, String>;

/// 分摊依据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionBasis {
    #[serde(rename = "Amount")]
    ByAmount,
    #[serde(rename = "Qty", alias = "Quantity")]
    ByQuantity,
}

impl DistributionBasis {
    /// 按宿主系统字段值解析: 只有 "Amount" 按金额，其余一律按数量
    pub fn from_host_label(label: &str) -> Self {
        if label == "Amount" {
            DistributionBasis::ByAmount
        } else {
            DistributionBasis::ByQuantity
        }
    }

    pub fn weight<'a>(&self, item: &'a LandedCostItem) -> &'a BigDecimal {
        match self {
            DistributionBasis::ByAmount => &item.amount,
            DistributionBasis::ByQuantity => &item.qty,
        }
    }
}

impl Default for DistributionBasis {
    fn default() -> Self {
        DistributionBasis::ByAmount
    }
}

/// 到岸成本明细行 (Landed Cost Item)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LandedCostItem {
    pub id: String,        // 明细行ID (单据内唯一)
    pub item_code: String, // 物料编码，用于查询标签
    pub amount: BigDecimal,
    pub qty: BigDecimal,
}

/// 税费行 (Landed Cost Taxes and Charges)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LandedCostCharge {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub expense_account: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl LandedCostCharge {
    /// 账户包含标记串且带标签时才算定向费用
    pub fn tag_for_marker(&self, marker: &str) -> Option<&str> {
        let account = self.expense_account.as_deref()?;
        if !account.to_lowercase().contains(&marker.to_lowercase()) {
            return None;
        }
        self.tag.as_deref().filter(|t| !t.is_empty())
    }
}

/// 到岸成本凭证
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandedCostVoucher {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "distribute_charges_based_on")]
    pub basis: DistributionBasis,
    #[serde(default)]
    pub items: Vec<LandedCostItem>,
    #[serde(default, alias = "taxes")]
    pub charges: Vec<LandedCostCharge>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoucherError {
    #[error("duplicate item row id: {0}")]
    DuplicateItem(String),
}

impl LandedCostVoucher {
    /// 明细行ID必须唯一，分摊结果以它为键
    pub fn validate(&self) -> Result<(), VoucherError> {
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(VoucherError::DuplicateItem(item.id.clone()));
            }
        }
        Ok(())
    }

    /// 需要查询标签的物料编码 (去重、保序)
    pub fn item_codes(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .map(|i| i.item_code.as_str())
            .filter(|code| seen.insert(*code))
            .collect()
    }
}

/// 凭证表头行
#[derive(Debug, Clone, FromRow)]
pub struct VoucherHeader {
    pub name: String,
    pub distribute_charges_based_on: Option<String>,
}
