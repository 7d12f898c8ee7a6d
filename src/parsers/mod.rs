//! # 解析器模块
//!
//! - `number` - 区域格式不确定的金额数字解析
//! - `currency` - 货币符号/代码与金额的识别
//! - `css` - 判断可见性所需的样式声明与样式表解析
//! - `html` - HTML文档解析、DOM操作、序列化

pub mod css;
pub mod currency;
pub mod html;
pub mod number;

pub use css::{parse_declarations, Declaration, StyleProperty, StyleSheetIndex};
pub use currency::{CurrencyMatch, CurrencyMatcher};
pub use html::{get_charset, html_to_dom, serialize_document};
pub use number::parse_amount;
