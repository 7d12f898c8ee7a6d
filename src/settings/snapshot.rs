use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::keys;
use super::store::SettingsValues;
use crate::config::constants;
use crate::i18n::normalize_language;

/// 设置快照，每次变更时整体替换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// 时薪；缺省或 <= 0 表示未设置
    pub hourly_income: Option<f64>,
    /// 货币代码，如 "EUR"
    pub currency: String,
    /// 两位语言代码
    pub language: String,
    /// 是否启用
    pub enabled: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            hourly_income: None,
            currency: constants::DEFAULT_CURRENCY.to_string(),
            language: crate::env::default_language(),
            enabled: true,
        }
    }
}

impl SettingsSnapshot {
    pub fn new(hourly_income: Option<f64>, currency: &str, language: &str, enabled: bool) -> Self {
        Self {
            hourly_income,
            currency: currency.to_string(),
            language: normalize_language(language),
            enabled,
        }
    }

    /// 只有有限且大于 0 的时薪才算已设置
    pub fn effective_income(&self) -> Option<f64> {
        self.hourly_income
            .filter(|income| income.is_finite() && *income > 0.0)
    }

    /// 是否应当转换页面文本
    pub fn is_active(&self) -> bool {
        self.enabled && self.effective_income().is_some()
    }

    /// 从存储中的原始值构建，缺失的键使用默认值
    pub fn from_values(values: &SettingsValues) -> Self {
        let mut snapshot = Self::default();

        snapshot.hourly_income = values.get(keys::HOURLY_INCOME).and_then(number_value);

        if let Some(language) = non_empty_string(values.get(keys::PREFERRED_LANGUAGE)) {
            snapshot.language = normalize_language(language);
        }

        if let Some(currency) = non_empty_string(values.get(keys::PREFERRED_CURRENCY)) {
            snapshot.currency = currency.to_string();
        }

        if let Some(Value::Bool(enabled)) = values.get(keys::EXTENSION_ENABLED) {
            snapshot.enabled = *enabled;
        }

        snapshot
    }
}

/// 数字或数字字符串
fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(&str, Value)]) -> SettingsValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_defaults_for_missing_keys() {
        let snapshot = SettingsSnapshot::from_values(&SettingsValues::new());
        assert_eq!(snapshot.hourly_income, None);
        assert_eq!(snapshot.currency, "EUR");
        assert!(snapshot.enabled);
        assert_eq!(snapshot.language.len(), 2);
        assert!(!snapshot.is_active());
    }

    #[test]
    fn test_values_are_read() {
        let snapshot = SettingsSnapshot::from_values(&values(&[
            ("hourlyIncome", json!(12.5)),
            ("preferredLanguage", json!("it")),
            ("preferredCurrency", json!("USD")),
            ("extensionEnabled", json!(false)),
        ]));
        assert_eq!(snapshot.effective_income(), Some(12.5));
        assert_eq!(snapshot.language, "it");
        assert_eq!(snapshot.currency, "USD");
        assert!(!snapshot.enabled);
        assert!(!snapshot.is_active());
    }

    #[test]
    fn test_non_positive_income_is_unset() {
        for income in [json!(0), json!(-3), json!("abc"), Value::Null] {
            let snapshot = SettingsSnapshot::from_values(&values(&[("hourlyIncome", income)]));
            assert_eq!(snapshot.effective_income(), None);
        }

        let snapshot =
            SettingsSnapshot::from_values(&values(&[("hourlyIncome", json!("20"))]));
        assert_eq!(snapshot.effective_income(), Some(20.0));
        assert!(snapshot.is_active());
    }

    #[test]
    fn test_empty_strings_fall_back_to_defaults() {
        let snapshot = SettingsSnapshot::from_values(&values(&[
            ("preferredCurrency", json!("")),
            ("extensionEnabled", json!("yes")),
        ]));
        assert_eq!(snapshot.currency, "EUR");
        assert!(snapshot.enabled);
    }
}
