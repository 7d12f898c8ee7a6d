//! CSS 解析器模块
//!
//! 只解析判断可见性所需的那一小部分 CSS：
//!
//! - **声明块**: `style` 属性或规则块中的 `display`、`visibility`、
//!   `text-decoration`、`text-decoration-line`，以及 `!important`
//! - **样式表**: `<style>` 中的普通规则，选择器限于由类型、`.class`、`#id`、
//!   `*` 组成的复合选择器及其列表；带组合符的选择器和 @ 规则内部的规则被忽略
//!
//! 其余属性与语法一律跳过，不报错。

use std::fmt;

use cssparser::{serialize_identifier, ParseError, Parser, ParserInput, Token};
use markup5ever_rcdom::Handle;

use super::html::dom::{find_nodes, get_node_attr, get_node_name, get_text};

/// 关心的属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleProperty {
    Display,
    Visibility,
    TextDecoration,
}

impl StyleProperty {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "display" => Some(StyleProperty::Display),
            "visibility" => Some(StyleProperty::Visibility),
            // 简写与长写形式对删除线的含义相同
            "text-decoration" | "text-decoration-line" => Some(StyleProperty::TextDecoration),
            _ => None,
        }
    }
}

/// 一条声明，值只保留小写的关键字
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: StyleProperty,
    pub keywords: Vec<String>,
    pub important: bool,
}

impl Declaration {
    /// 声明对该属性给出的布尔结论；没有关键字（如 `var()`）时不参与层叠
    pub fn flag(&self) -> Option<bool> {
        if self.keywords.is_empty() {
            return None;
        }

        let has = |keyword: &str| self.keywords.iter().any(|k| k == keyword);

        Some(match self.property {
            StyleProperty::Display => has("none"),
            StyleProperty::Visibility => has("hidden") || has("collapse"),
            StyleProperty::TextDecoration => has("line-through"),
        })
    }
}

/// 解析声明列表，如 `display: none; color: red`
pub fn parse_declarations(css: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    read_declarations(&mut parser)
}

fn read_declarations(parser: &mut Parser<'_, '_>) -> Vec<Declaration> {
    let mut declarations = Vec::new();

    loop {
        let token = match parser.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        let name = match token {
            Token::Ident(name) => name.to_ascii_lowercase(),
            Token::Semicolon => continue,
            _ => {
                skip_to_semicolon(parser);
                continue;
            }
        };

        match parser.next() {
            Ok(Token::Colon) => {}
            Ok(Token::Semicolon) => continue,
            Ok(_) => {
                skip_to_semicolon(parser);
                continue;
            }
            Err(_) => break,
        }

        let mut keywords = Vec::new();
        let mut important = false;

        loop {
            let token = match parser.next() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };

            match token {
                Token::Semicolon => break,
                Token::Ident(value) => keywords.push(value.to_ascii_lowercase()),
                Token::Delim('!') => {
                    if let Ok(Token::Ident(flag)) = parser.next() {
                        important = flag.eq_ignore_ascii_case("important");
                    }
                }
                // 函数、数字等与可见性无关
                _ => {}
            }
        }

        if let Some(property) = StyleProperty::from_name(&name) {
            declarations.push(Declaration {
                property,
                keywords,
                important,
            });
        }
    }

    declarations
}

fn skip_to_semicolon(parser: &mut Parser<'_, '_>) {
    while let Ok(token) = parser.next() {
        if *token == Token::Semicolon {
            break;
        }
    }
}

/// 复合选择器：可选的类型、若干 id 与 class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
}

impl CompoundSelector {
    /// 选择器优先级 (id, class, type)
    pub fn specificity(&self) -> (usize, usize, usize) {
        (
            self.ids.len(),
            self.classes.len(),
            usize::from(self.tag.is_some()),
        )
    }

    /// 元素是否匹配
    pub fn matches(&self, element: &Handle) -> bool {
        let Some(name) = get_node_name(element) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(name) {
                return false;
            }
        }

        if !self.ids.is_empty() {
            let id = get_node_attr(element, "id").unwrap_or_default();
            if self.ids.iter().any(|wanted| *wanted != id) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class_attr = get_node_attr(element, "class").unwrap_or_default();
            let classes: Vec<&str> = class_attr.split_ascii_whitespace().collect();
            if !self.classes.iter().all(|wanted| classes.contains(&wanted.as_str())) {
                return false;
            }
        }

        true
    }

    /// 从一组 token 解析；出现组合符或其他不支持的语法时返回 None
    fn from_tokens(tokens: &[Token<'_>]) -> Option<Self> {
        let mut selector = CompoundSelector::default();
        let mut iter = tokens.iter();
        let mut first = true;
        let mut empty = true;

        while let Some(token) = iter.next() {
            match token {
                Token::Ident(tag) if first => {
                    selector.tag = Some(tag.to_ascii_lowercase());
                }
                Token::Delim('*') if first => {}
                Token::Delim('.') => match iter.next() {
                    Some(Token::Ident(class)) => selector.classes.push(class.to_string()),
                    _ => return None,
                },
                Token::IDHash(id) => selector.ids.push(id.to_string()),
                _ => return None,
            }
            first = false;
            empty = false;
        }

        (!empty).then_some(selector)
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => serialize_identifier(tag, f)?,
            None if self.ids.is_empty() && self.classes.is_empty() => f.write_str("*")?,
            None => {}
        }
        for id in &self.ids {
            f.write_str("#")?;
            serialize_identifier(id, f)?;
        }
        for class in &self.classes {
            f.write_str(".")?;
            serialize_identifier(class, f)?;
        }
        Ok(())
    }
}

/// 样式表中的一条规则
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: CompoundSelector,
    pub declarations: Vec<Declaration>,
    /// 在所有样式表中的出现顺序
    pub order: usize,
}

/// 文档中所有 `<style>` 的规则索引
#[derive(Debug, Clone, Default)]
pub struct StyleSheetIndex {
    rules: Vec<StyleRule>,
}

impl StyleSheetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集文档中全部 `<style>` 元素
    pub fn from_document(document: &Handle) -> Self {
        let mut index = Self::new();

        for style in find_nodes(document, &["style"]) {
            let css: String = style
                .children
                .borrow()
                .iter()
                .filter_map(get_text)
                .collect();
            index.add_stylesheet(&css);
        }

        tracing::debug!("样式表索引包含 {} 条规则", index.rules.len());
        index
    }

    /// 追加一段样式表
    pub fn add_stylesheet(&mut self, css: &str) {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut prelude: Vec<Token<'_>> = Vec::new();

        loop {
            let token = match parser.next_including_whitespace() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };

            match token {
                Token::AtKeyword(_) => {
                    prelude.clear();
                    skip_at_rule(&mut parser);
                }
                Token::CurlyBracketBlock => {
                    let result: Result<Vec<Declaration>, ParseError<'_, ()>> =
                        parser.parse_nested_block(|block| Ok(read_declarations(block)));
                    let declarations = result.unwrap_or_default();

                    for selector in parse_selector_list(&prelude) {
                        let order = self.rules.len();
                        self.rules.push(StyleRule {
                            selector,
                            declarations: declarations.clone(),
                            order,
                        });
                    }
                    prelude.clear();
                }
                Token::CDO | Token::CDC => {}
                other => prelude.push(other),
            }
        }
    }

    /// 匹配元素的规则，按出现顺序
    pub fn matching_rules<'a>(&'a self, element: &'a Handle) -> impl Iterator<Item = &'a StyleRule> {
        self.rules
            .iter()
            .filter(move |rule| rule.selector.matches(element))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// @ 规则读到分号或块为止，块本身由下一次 `next` 跳过
fn skip_at_rule(parser: &mut Parser<'_, '_>) {
    while let Ok(token) = parser.next() {
        if matches!(token, Token::Semicolon | Token::CurlyBracketBlock) {
            break;
        }
    }
}

/// 按逗号拆分选择器列表；不支持的选择器被丢弃
fn parse_selector_list(prelude: &[Token<'_>]) -> Vec<CompoundSelector> {
    prelude
        .split(|token| *token == Token::Comma)
        .filter_map(|group| {
            let start = group
                .iter()
                .position(|t| !matches!(t, Token::WhiteSpace(_)))?;
            let end = group
                .iter()
                .rposition(|t| !matches!(t, Token::WhiteSpace(_)))?;
            let selector = CompoundSelector::from_tokens(&group[start..=end]);
            if selector.is_none() {
                tracing::trace!("忽略不支持的选择器");
            }
            selector
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    fn flags(css: &str) -> Vec<(StyleProperty, Option<bool>, bool)> {
        parse_declarations(css)
            .iter()
            .map(|d| (d.property, d.flag(), d.important))
            .collect()
    }

    #[test]
    fn test_inline_declarations() {
        assert_eq!(
            flags("color: red; DISPLAY: None; text-decoration: underline line-through"),
            vec![
                (StyleProperty::Display, Some(true), false),
                (StyleProperty::TextDecoration, Some(true), false),
            ]
        );
        assert_eq!(
            flags("visibility: collapse !important"),
            vec![(StyleProperty::Visibility, Some(true), true)]
        );
        assert_eq!(
            flags("display: block"),
            vec![(StyleProperty::Display, Some(false), false)]
        );
    }

    #[test]
    fn test_malformed_declarations_are_skipped() {
        assert_eq!(
            flags("display none; ; 12px: x; visibility: hidden"),
            vec![(StyleProperty::Visibility, Some(true), false)]
        );
        assert_eq!(flags("display: var(--x)")[0].1, None);
        assert!(flags("").is_empty());
    }

    #[test]
    fn test_stylesheet_rules() {
        let mut index = StyleSheetIndex::new();
        index.add_stylesheet(
            "/* c */ .old, del.price { text-decoration: line-through }
             @media print { .x { display: none } }
             @import url(a.css);
             div p { display: none }
             #promo { visibility: hidden }
             * { color: red }",
        );

        let selectors: Vec<String> = index
            .rules
            .iter()
            .map(|r| r.selector.to_string())
            .collect();
        assert_eq!(selectors, vec![".old", "del.price", "#promo", "*"]);
    }

    #[test]
    fn test_selector_matching() {
        let dom = html_to_dom(
            b"<span id=a class=\"x y\">1</span><p class=x>2</p>",
            "utf-8",
        )
        .unwrap();
        let span = find_nodes(&dom.document, &["span"]).remove(0);
        let p = find_nodes(&dom.document, &["p"]).remove(0);

        let mut index = StyleSheetIndex::new();
        index.add_stylesheet("span.x.y { display: none } p#a { display: none } .x { display: none }");

        assert_eq!(index.matching_rules(&span).count(), 2);
        assert_eq!(index.matching_rules(&p).count(), 1);
    }

    #[test]
    fn test_specificity() {
        let selector = CompoundSelector {
            tag: Some("p".to_string()),
            ids: vec!["a".to_string()],
            classes: vec!["b".to_string(), "c".to_string()],
        };
        assert_eq!(selector.specificity(), (1, 2, 1));
        assert_eq!(CompoundSelector::default().specificity(), (0, 0, 0));
    }

    #[test]
    fn test_index_from_document() {
        let dom = html_to_dom(
            b"<html><head><style>.gone { display: none }</style></head><body><style>.s { text-decoration: line-through }</style></body></html>",
            "utf-8",
        )
        .unwrap();
        assert_eq!(StyleSheetIndex::from_document(&dom.document).len(), 2);
    }
}
