//! 工作时长格式化

use crate::error::{WorkTimeError, WorkTimeResult};
use crate::i18n::WorkTimeMessages;

/// 金额 / 时薪 = 工作小时数
pub fn work_hours(amount: f64, hourly_income: f64) -> WorkTimeResult<f64> {
    if !(hourly_income.is_finite() && hourly_income > 0.0) {
        return Err(WorkTimeError::ConfigError(format!(
            "时薪必须大于0，当前为 {}",
            hourly_income
        )));
    }
    Ok(amount / hourly_income)
}

/// 把小时数格式化为 "1 h and 30 min of work" 形式
///
/// 先按分钟四舍五入，再拆分为小时和分钟；不足一分钟时输出 "1 min"。
pub fn format_work_time(hours: f64, messages: &WorkTimeMessages) -> String {
    let total_minutes = (hours * 60.0).round();
    let total_minutes = if total_minutes.is_finite() && total_minutes > 0.0 {
        total_minutes as u64
    } else {
        0
    };

    let whole_hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    let mut time = String::new();

    if whole_hours > 0 {
        time.push_str(&format!("{} {}", whole_hours, messages.hours));
    }

    if minutes > 0 {
        if whole_hours > 0 {
            time.push_str(&format!(" {} ", messages.and));
        }
        time.push_str(&format!("{} {}", minutes, messages.minutes));
    }

    if time.is_empty() {
        time = format!("1 {}", messages.minutes);
    }

    format!("{} {}", time, messages.of_work)
}
