//! 金额数字解析
//!
//! 将可能采用不同区域格式的数字字符串（"1.234,56"、"1,234"、"12.50"）
//! 解析为带符号的小数。千位分隔符与小数点的判断是启发式的：
//! "1.234" 总是被当作 1234，这是已知且接受的歧义。

use crate::error::{WorkTimeError, WorkTimeResult};

/// 解析金额字符串
///
/// 输入中允许数字、`.`、`,`、前导 `-` 以及任意空白；其他字符会被丢弃。
///
/// 规则：
/// 1. 同时出现 `.` 和 `,`：`.` 为千位分隔符，`,` 为小数点（欧洲习惯）
/// 2. 只有 `.`：最后一个 `.` 之后恰好 3 位数字时视为千位分隔符，否则为小数点
/// 3. 只有 `,`：视为小数点
/// 4. 没有分隔符：直接解析
pub fn parse_amount(raw: &str) -> WorkTimeResult<f64> {
    let mut sanitized: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let is_negative = sanitized.starts_with('-');
    if is_negative {
        sanitized.remove(0);
    }

    let has_dot = sanitized.contains('.');
    let has_comma = sanitized.contains(',');

    let canonical = if has_dot && has_comma {
        replace_last(&sanitized.replace('.', ""), ',', '.')
    } else if has_dot {
        let fraction_digits = sanitized.rsplit('.').next().map_or(0, str::len);
        if fraction_digits == 3 {
            sanitized.replace('.', "")
        } else {
            sanitized
        }
    } else if has_comma {
        sanitized.replacen(',', ".", 1)
    } else {
        sanitized
    };

    let value = leading_float(&canonical)
        .ok_or_else(|| WorkTimeError::ParseFailure(raw.to_string()))?;

    Ok(if is_negative { -value } else { value })
}

/// 替换最后一次出现的字符
fn replace_last(text: &str, from: char, to: char) -> String {
    match text.rfind(from) {
        Some(index) => {
            let mut result = String::with_capacity(text.len());
            result.push_str(&text[..index]);
            result.push(to);
            result.push_str(&text[index + from.len_utf8()..]);
            result
        }
        None => text.to_string(),
    }
}

/// 解析最长的合法前缀，如 "12.5.3" → 12.5，"1.2,3" → 1.2
fn leading_float(text: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_point = false;

    for (index, c) in text.char_indices() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                end = index + 1;
            }
            '.' if !seen_point => {
                seen_point = true;
            }
            _ => break,
        }
    }

    if !seen_digit {
        return None;
    }

    text[..end].parse::<f64>().ok().filter(|value| value.is_finite())
}
