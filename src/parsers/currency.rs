//! 货币金额识别
//!
//! 构建一个同时匹配 "符号/代码 + 数字" 与 "数字 + 符号/代码" 的正则表达式，
//! 对文本做一次从左到右、不重叠、不区分大小写的扫描。

use std::ops::Range;

use regex::{Captures, Regex};

use crate::config::CurrencyDef;
use crate::error::{WorkTimeError, WorkTimeResult};

/// 1-3 位数字，若干组 "分隔符 + 3 位数字"，可选 "分隔符 + 2 位数字"
pub const NUMBER_PATTERN: &str = r"[0-9]{1,3}(?:[.,][0-9]{3})*(?:[.,][0-9]{2})?";

/// 一次匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyMatch {
    /// 原文中的货币记号（符号或代码，保持原样）
    pub currency: String,
    /// 原文中的数字字面量
    pub amount: String,
    /// 整个匹配在原文中的字节范围
    pub span: Range<usize>,
    /// 货币记号是否写在数字前面
    pub currency_first: bool,
}

/// 货币匹配器
#[derive(Debug, Clone)]
pub struct CurrencyMatcher {
    regex: Regex,
    currencies: Vec<CurrencyDef>,
}

impl CurrencyMatcher {
    /// 根据货币表构建匹配器
    pub fn new(currencies: &[CurrencyDef]) -> WorkTimeResult<Self> {
        if currencies.is_empty() {
            return Err(WorkTimeError::ConfigError("货币列表不能为空".to_string()));
        }

        let regex = Regex::new(&build_pattern(currencies))
            .map_err(|e| WorkTimeError::ConfigError(format!("无法构建货币正则: {}", e)))?;

        Ok(Self {
            regex,
            currencies: currencies.to_vec(),
        })
    }

    /// 找出文本中所有的货币金额
    pub fn find_all(&self, text: &str) -> Vec<CurrencyMatch> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| match_from_captures(&caps))
            .collect()
    }

    /// 逐个匹配替换；回调返回 None 时保留原文
    pub fn replace_all<F>(&self, text: &str, mut replacement: F) -> String
    where
        F: FnMut(&CurrencyMatch) -> Option<String>,
    {
        let mut result = String::with_capacity(text.len());
        let mut last_end = 0;

        for found in self.find_all(text) {
            result.push_str(&text[last_end..found.span.start]);
            match replacement(&found) {
                Some(replaced) => result.push_str(&replaced),
                None => result.push_str(&text[found.span.clone()]),
            }
            last_end = found.span.end;
        }

        result.push_str(&text[last_end..]);
        result
    }

    /// 根据原文记号找到货币定义
    pub fn lookup(&self, token: &str) -> Option<&CurrencyDef> {
        self.currencies
            .iter()
            .find(|c| c.symbol == token || c.code.eq_ignore_ascii_case(token))
    }

    pub fn currencies(&self) -> &[CurrencyDef] {
        &self.currencies
    }
}

/// 便利函数：一次性匹配
pub fn find_all(text: &str, currencies: &[CurrencyDef]) -> WorkTimeResult<Vec<CurrencyMatch>> {
    Ok(CurrencyMatcher::new(currencies)?.find_all(text))
}

/// 先符号后代码的交替模式
fn build_pattern(currencies: &[CurrencyDef]) -> String {
    let alternatives: Vec<String> = currencies
        .iter()
        .map(|c| regex::escape(&c.symbol))
        .chain(currencies.iter().map(|c| regex::escape(&c.code)))
        .collect();
    let currency = format!("(?:{})", alternatives.join("|"));

    format!(
        r"(?i)(?P<c1>{currency})\s*(?P<a1>{number})|(?P<a2>{number})\s*(?P<c2>{currency})",
        currency = currency,
        number = NUMBER_PATTERN,
    )
}

fn match_from_captures(caps: &Captures<'_>) -> Option<CurrencyMatch> {
    let whole = caps.get(0)?;

    let (currency, amount, currency_first) = match (caps.name("c1"), caps.name("a1")) {
        (Some(currency), Some(amount)) => (currency, amount, true),
        _ => (caps.name("c2")?, caps.name("a2")?, false),
    };

    if currency.as_str().is_empty() || amount.as_str().is_empty() {
        return None;
    }

    Some(CurrencyMatch {
        currency: currency.as_str().to_string(),
        amount: amount.as_str().to_string(),
        span: whole.range(),
        currency_first,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn matcher() -> CurrencyMatcher {
        CurrencyMatcher::new(&EngineConfig::default().currencies).unwrap()
    }

    #[test]
    fn test_symbol_before_grouped_amount() {
        let found = matcher().find_all("Price: $1,200.50 today");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].currency, "$");
        assert_eq!(found[0].amount, "1,200.50");
        assert_eq!(found[0].span, 7..16);
        assert!(found[0].currency_first);
    }

    #[test]
    fn test_amount_before_code_is_case_insensitive() {
        let found = matcher().find_all("solo 49,90 eur al mese");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].currency, "eur");
        assert_eq!(found[0].amount, "49,90");
        assert!(!found[0].currency_first);
    }

    #[test]
    fn test_multiple_non_overlapping_matches() {
        let found = matcher().find_all("€5 or £7.99 or 1.000 ¥ or USD 20");
        let pairs: Vec<(&str, &str)> = found
            .iter()
            .map(|m| (m.currency.as_str(), m.amount.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("€", "5"), ("£", "7.99"), ("¥", "1.000"), ("USD", "20")]
        );
        assert!(!found[2].currency_first);
    }

    #[test]
    fn test_text_without_currency_has_no_matches() {
        assert!(matcher().find_all("Call 555 1234 now").is_empty());
        assert!(matcher().find_all("").is_empty());
        assert!(matcher().find_all("$ alone").is_empty());
    }

    #[test]
    fn test_space_between_currency_and_amount() {
        let found = matcher().find_all("Total: EUR 1.234,56");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, "1.234,56");
        assert_eq!(found[0].span.end, "Total: EUR 1.234,56".len());
    }

    #[test]
    fn test_replace_all_keeps_unreplaced_spans() {
        let text = "A $10 B $20 C";
        let replaced = matcher().replace_all(text, |m| {
            if m.amount == "10" {
                Some("[ten]".to_string())
            } else {
                None
            }
        });
        assert_eq!(replaced, "A [ten] B $20 C");
    }

    #[test]
    fn test_lookup_by_symbol_or_code() {
        let matcher = matcher();
        assert_eq!(matcher.lookup("€").unwrap().code, "EUR");
        assert_eq!(matcher.lookup("gbp").unwrap().symbol, "£");
        assert!(matcher.lookup("CHF").is_none());
    }

    #[test]
    fn test_custom_currency_symbols_are_escaped() {
        let currencies = vec![CurrencyDef::new("CHF", "Fr.")];
        let found = find_all("Fr. 12.50 but not Frx12", &currencies).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, "12.50");
    }

    #[test]
    fn test_empty_currency_table_is_rejected() {
        assert!(CurrencyMatcher::new(&[]).is_err());
    }
}
