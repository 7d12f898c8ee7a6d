//! 收入换算
//!
//! 设置界面在写入 `hourlyIncome` 之前，把周薪、月薪、年薪按每周工作小时数
//! 换算为时薪：一个月按 4 周、一年按 52 周计算，结果保留两位小数。

use serde::{Deserialize, Serialize};

use crate::error::{WorkTimeError, WorkTimeResult};

/// 收入类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeBasis {
    Hourly,
    Weekly,
    Monthly,
    Annual,
}

impl IncomeBasis {
    /// 一个计薪周期包含的周数；时薪返回 None
    pub fn weeks(&self) -> Option<f64> {
        match self {
            IncomeBasis::Hourly => None,
            IncomeBasis::Weekly => Some(1.0),
            IncomeBasis::Monthly => Some(4.0),
            IncomeBasis::Annual => Some(52.0),
        }
    }
}

impl std::str::FromStr for IncomeBasis {
    type Err = WorkTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Ok(IncomeBasis::Hourly),
            "weekly" => Ok(IncomeBasis::Weekly),
            "monthly" => Ok(IncomeBasis::Monthly),
            "annual" | "yearly" => Ok(IncomeBasis::Annual),
            other => Err(WorkTimeError::InvalidIncome(format!("未知的收入类型: {}", other))),
        }
    }
}

/// 换算时薪
///
/// `weekly_hours` 对时薪类型不使用。
pub fn hourly_income(basis: IncomeBasis, amount: f64, weekly_hours: f64) -> WorkTimeResult<f64> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(WorkTimeError::InvalidIncome(format!("收入必须大于0: {}", amount)));
    }

    let Some(weeks) = basis.weeks() else {
        return Ok(amount);
    };

    if !(weekly_hours.is_finite() && weekly_hours > 0.0) {
        return Err(WorkTimeError::InvalidIncome(format!(
            "每周工作小时数必须大于0: {}",
            weekly_hours
        )));
    }

    let hourly = amount / (weekly_hours * weeks);
    Ok((hourly * 100.0).round() / 100.0)
}
