use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 拜访目标的周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodType {
    #[serde(rename = "Current Month")]
    CurrentMonth,
    #[serde(rename = "Current Quarter")]
    CurrentQuarter,
    #[serde(rename = "Next 30 Days")]
    Next30Days,
    #[serde(rename = "Custom Range")]
    CustomRange,
}

impl PeriodType {
    /// 无法识别的标签视为未指定
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Current Month" => Some(PeriodType::CurrentMonth),
            "Current Quarter" => Some(PeriodType::CurrentQuarter),
            "Next 30 Days" => Some(PeriodType::Next30Days),
            "Custom Range" => Some(PeriodType::CustomRange),
            _ => None,
        }
    }
}

/// 拜访目标明细行 (Visit Target Detail)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitTargetRow {
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub territory: Option<String>,
    #[serde(default)]
    pub period_type: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed_visits: u32, // 已完成拜访次数
}

/// 拜访记录 (Sales Visit Log)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitLog {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sales_person: Option<String>,
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub customer: Option<String>,
}

impl VisitLog {
    /// 销售员、日期、客户缺一不可
    pub fn validate(&self) -> Result<(NaiveDate, &str), VisitTargetError> {
        let missing = || {
            VisitTargetError::IncompleteVisitLog(self.name.clone().unwrap_or_default())
        };
        if !is_present(&self.sales_person) {
            return Err(missing());
        }
        let visit_date = self.visit_date.ok_or_else(missing)?;
        let customer = self
            .customer
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(missing)?;
        Ok((visit_date, customer))
    }
}

/// 由周期类型推导出的日期区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VisitTargetError {
    #[error("Please specify either a Customer or a Territory. One of them is required.")]
    MissingCustomerOrTerritory,
    #[error("Row #{0}: Please specify either a Customer or a Territory in Visit Target Details. One of them is required.")]
    MissingCustomerOrTerritoryAt(usize),
    #[error("Sales Visit Log {0} missing Sales Person, Visit Date, or Customer.")]
    IncompleteVisitLog(String),
    #[error("date out of range while deriving period from {0}")]
    DateOutOfRange(NaiveDate),
}

impl VisitTargetRow {
    pub fn validate(&self) -> Result<(), VisitTargetError> {
        if !is_present(&self.customer) && !is_present(&self.territory) {
            return Err(VisitTargetError::MissingCustomerOrTerritory);
        }
        Ok(())
    }

    /// 把推导结果回填到本行的起止日期
    pub fn apply(&mut self, window: &PeriodWindow) {
        self.start_date = window.start_date;
        self.end_date = window.end_date;
    }

    /// 客户一致且拜访日期落在 [start_date, end_date] 内 (两端包含)
    pub fn covers(&self, customer: &str, visit_date: NaiveDate) -> bool {
        if self.customer.as_deref() != Some(customer) {
            return false;
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= visit_date && visit_date <= end,
            _ => false,
        }
    }
}

/// 多行校验: 报告第一个既无客户也无区域的行 (行号从 1 开始)
pub fn validate_rows(rows: &[VisitTargetRow]) -> Result<(), VisitTargetError> {
    match rows.iter().position(|row| row.validate().is_err()) {
        Some(idx) => Err(VisitTargetError::MissingCustomerOrTerritoryAt(idx + 1)),
        None => Ok(()),
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}
