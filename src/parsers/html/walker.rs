//! DOM 遍历
//!
//! 深度优先、文档顺序的遍历工具。遍历前先复制子节点列表，
//! 因此回调中修改文本内容是安全的。

use markup5ever_rcdom::{Handle, NodeData};

use super::dom::get_parent_node;

/// 深度优先访问 `node` 的所有后代（不含自身）
pub fn walk_descendants<F>(node: &Handle, visit: &mut F)
where
    F: FnMut(&Handle) -> WalkControl,
{
    let children: Vec<Handle> = node.children.borrow().iter().cloned().collect();

    for child in children.iter() {
        match visit(child) {
            WalkControl::Continue => walk_descendants(child, visit),
            WalkControl::SkipChildren => {}
        }
    }
}

/// 遍历控制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    SkipChildren,
}

/// 按文档顺序收集所有后代文本节点
pub fn text_descendants(node: &Handle) -> Vec<Handle> {
    let mut texts = Vec::new();
    walk_descendants(node, &mut |child| {
        if let NodeData::Text { .. } = child.data {
            texts.push(child.clone());
        }
        WalkControl::Continue
    });
    texts
}

/// 祖先链（不含自身），由近及远
pub fn ancestors(node: &Handle) -> Vec<Handle> {
    let mut chain = Vec::new();
    let mut current = get_parent_node(node);
    while let Some(parent) = current {
        current = get_parent_node(&parent);
        chain.push(parent);
    }
    chain
}

/// `ancestor` 是否为 `node` 本身或其祖先
pub fn is_inclusive_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    if std::rc::Rc::ptr_eq(ancestor, node) {
        return true;
    }
    ancestors(node)
        .iter()
        .any(|parent| std::rc::Rc::ptr_eq(parent, ancestor))
}

/// 节点当前是否挂在以 `root` 为根的树上
pub fn is_connected(root: &Handle, node: &Handle) -> bool {
    is_inclusive_ancestor(root, node)
}
