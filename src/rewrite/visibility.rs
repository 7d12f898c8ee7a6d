//! 可见性判断
//!
//! 从文本节点的父元素开始向上检查祖先链（不含文档节点），遇到第一个
//! 带删除线、被隐藏或可编辑的祖先即判定为不可转换。
//!
//! 元素的样式按以下顺序层叠，后者优先：浏览器默认样式、`<style>` 规则
//! （按优先级和出现顺序）、`style` 属性；`!important` 声明优先于普通声明。

use markup5ever_rcdom::Handle;

use crate::config::constants;
use crate::parsers::css::{parse_declarations, Declaration, StyleProperty, StyleSheetIndex};
use crate::parsers::html::{ancestors, get_node_attr, get_node_name, is_document, is_element};

/// 判断结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eligibility {
    Eligible,
    /// 祖先带删除线
    StruckThrough,
    /// 祖先 display:none 或 visibility:hidden
    Hidden,
    /// 祖先可编辑或是表单控件
    Editable,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// 元素上与判断相关的计算样式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    pub display_none: bool,
    pub visibility_hidden: bool,
    pub line_through: bool,
}

impl ComputedStyle {
    pub fn is_hidden(&self) -> bool {
        self.display_none || self.visibility_hidden
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Origin {
    UserAgent,
    Author,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Priority {
    important: bool,
    origin: Origin,
    specificity: (usize, usize, usize),
    order: usize,
}

/// 单个属性的层叠结果
#[derive(Debug, Default)]
struct Cascade {
    winner: Option<(Priority, bool)>,
}

impl Cascade {
    fn apply(&mut self, priority: Priority, value: bool) {
        match self.winner {
            Some((current, _)) if current > priority => {}
            _ => self.winner = Some((priority, value)),
        }
    }

    fn value(&self) -> bool {
        self.winner.map_or(false, |(_, value)| value)
    }
}

/// 可见性分类器
#[derive(Debug, Clone, Default)]
pub struct VisibilityClassifier {
    stylesheet: StyleSheetIndex,
}

impl VisibilityClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取文档中的样式表
    pub fn from_document(document: &Handle) -> Self {
        Self {
            stylesheet: StyleSheetIndex::from_document(document),
        }
    }

    /// 重新读取样式表
    pub fn refresh(&mut self, document: &Handle) {
        self.stylesheet = StyleSheetIndex::from_document(document);
    }

    pub fn stylesheet(&self) -> &StyleSheetIndex {
        &self.stylesheet
    }

    /// 判断节点（通常是文本节点）
    pub fn classify(&self, node: &Handle) -> Eligibility {
        for ancestor in ancestors(node) {
            if is_document(&ancestor) {
                break;
            }
            if !is_element(&ancestor) {
                continue;
            }

            let style = self.computed_style(&ancestor);
            if style.line_through {
                return Eligibility::StruckThrough;
            }
            if style.is_hidden() {
                return Eligibility::Hidden;
            }
            if is_editable(&ancestor) {
                return Eligibility::Editable;
            }
        }

        Eligibility::Eligible
    }

    pub fn is_eligible(&self, node: &Handle) -> bool {
        self.classify(node).is_eligible()
    }

    /// 计算单个元素的样式（不考虑继承）
    pub fn computed_style(&self, element: &Handle) -> ComputedStyle {
        let mut display = Cascade::default();
        let mut visibility = Cascade::default();
        let mut decoration = Cascade::default();

        let user_agent = Priority {
            important: false,
            origin: Origin::UserAgent,
            specificity: (0, 0, 0),
            order: 0,
        };

        let name = get_node_name(element).unwrap_or_default();
        if constants::UA_HIDDEN_ELEMENTS.contains(&name) || get_node_attr(element, "hidden").is_some() {
            display.apply(user_agent, true);
        }
        if constants::UA_LINE_THROUGH_ELEMENTS.contains(&name) {
            decoration.apply(user_agent, true);
        }

        let mut apply = |declaration: &Declaration, priority: Priority| {
            let Some(value) = declaration.flag() else {
                return;
            };
            let priority = Priority {
                important: declaration.important,
                ..priority
            };
            match declaration.property {
                StyleProperty::Display => display.apply(priority, value),
                StyleProperty::Visibility => visibility.apply(priority, value),
                StyleProperty::TextDecoration => decoration.apply(priority, value),
            }
        };

        for rule in self.stylesheet.matching_rules(element) {
            let priority = Priority {
                important: false,
                origin: Origin::Author,
                specificity: rule.selector.specificity(),
                order: rule.order,
            };
            for declaration in &rule.declarations {
                apply(declaration, priority);
            }
        }

        if let Some(inline) = get_node_attr(element, "style") {
            for (order, declaration) in parse_declarations(&inline).iter().enumerate() {
                let priority = Priority {
                    important: false,
                    origin: Origin::Inline,
                    specificity: (0, 0, 0),
                    order,
                };
                apply(declaration, priority);
            }
        }

        ComputedStyle {
            display_none: display.value(),
            visibility_hidden: visibility.value(),
            line_through: decoration.value(),
        }
    }
}

/// 元素本身是否可编辑：表单控件或 contenteditable
pub fn is_editable(element: &Handle) -> bool {
    let name = get_node_name(element).unwrap_or_default();
    if constants::EDITABLE_ELEMENTS
        .iter()
        .any(|editable| editable.eq_ignore_ascii_case(name))
    {
        return true;
    }

    match get_node_attr(element, "contenteditable") {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "" | "true" | "plaintext-only"
        ),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::{html_to_dom, text_descendants, walk_descendants, WalkControl};

    /// 返回 id 为 target 的元素下第一个文本节点的判断结果
    fn classify(html: &str, target: &str) -> Eligibility {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let classifier = VisibilityClassifier::from_document(&dom.document);

        let mut element = None;
        walk_descendants(&dom.document, &mut |node| {
            if element.is_none() && get_node_attr(node, "id").as_deref() == Some(target) {
                element = Some(node.clone());
            }
            WalkControl::Continue
        });

        let text = text_descendants(&element.unwrap()).remove(0);
        classifier.classify(&text)
    }

    #[test]
    fn test_plain_text_is_eligible() {
        assert_eq!(classify("<p id=t>$5</p>", "t"), Eligibility::Eligible);
    }

    #[test]
    fn test_struck_through() {
        assert_eq!(classify("<del id=t>$5</del>", "t"), Eligibility::StruckThrough);
        assert_eq!(
            classify("<span style=\"text-decoration: line-through\"><b id=t>$5</b></span>", "t"),
            Eligibility::StruckThrough
        );
        assert_eq!(
            classify("<style>.old { text-decoration-line: line-through }</style><span class=old id=t>$5</span>", "t"),
            Eligibility::StruckThrough
        );
        assert_eq!(
            classify("<s style=\"text-decoration: none\" id=t>$5</s>", "t"),
            Eligibility::Eligible
        );
    }

    #[test]
    fn test_hidden() {
        assert_eq!(classify("<div hidden><p id=t>$5</p></div>", "t"), Eligibility::Hidden);
        assert_eq!(
            classify("<p style=\"display:none\" id=t>$5</p>", "t"),
            Eligibility::Hidden
        );
        assert_eq!(
            classify("<style>#t { visibility: hidden }</style><p id=t>$5</p>", "t"),
            Eligibility::Hidden
        );
    }

    #[test]
    fn test_editable() {
        assert_eq!(
            classify("<div contenteditable><p id=t>$5</p></div>", "t"),
            Eligibility::Editable
        );
        assert_eq!(
            classify("<div contenteditable=false><p id=t>$5</p></div>", "t"),
            Eligibility::Eligible
        );
        assert_eq!(
            classify("<select><option id=t>$5</option></select>", "t"),
            Eligibility::Editable
        );
    }

    #[test]
    fn test_nearest_disqualifying_ancestor_wins() {
        assert_eq!(
            classify("<div contenteditable=true><del id=t>$5</del></div>", "t"),
            Eligibility::StruckThrough
        );
    }

    #[test]
    fn test_cascade_precedence() {
        // 更具体的选择器优先
        assert_eq!(
            classify(
                "<style>p.x { display: none } .x { display: block }</style><p class=x id=t>$5</p>",
                "t"
            ),
            Eligibility::Hidden
        );
        // 同优先级时后出现的规则优先
        assert_eq!(
            classify(
                "<style>.x { display: none } .x { display: block }</style><p class=x id=t>$5</p>",
                "t"
            ),
            Eligibility::Eligible
        );
        // 内联样式优先于样式表
        assert_eq!(
            classify(
                "<style>#t { display: none }</style><p style=\"display: block\" id=t>$5</p>",
                "t"
            ),
            Eligibility::Eligible
        );
        // !important 优先于内联样式
        assert_eq!(
            classify(
                "<style>.x { display: none !important }</style><p class=x style=\"display: block\" id=t>$5</p>",
                "t"
            ),
            Eligibility::Hidden
        );
    }
}
